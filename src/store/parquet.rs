use std::fs::File;
use std::io::Write;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use ::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use ::parquet::arrow::ArrowWriter;
use ::parquet::basic::{Compression, ZstdLevel};
use ::parquet::file::properties::WriterProperties;

use crate::error::{Result, ScorpionError};
use crate::model::{Cell, Column, ColumnType};

fn data_type(ty: ColumnType) -> DataType {
    match ty {
        ColumnType::Int => DataType::Int64,
        ColumnType::Float => DataType::Float64,
        ColumnType::Text => DataType::Utf8,
        ColumnType::Bool => DataType::Boolean,
        ColumnType::Date => DataType::Date32,
    }
}

fn schema(columns: &[Column]) -> Schema {
    Schema::new(
        columns
            .iter()
            .map(|c| Field::new(c.name, data_type(c.ty), true))
            .collect::<Vec<_>>(),
    )
}

fn epoch() -> NaiveDate {
    DateTime::<Utc>::UNIX_EPOCH.date_naive()
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    (date - epoch()).num_days() as i32
}

fn date_from_days(days: i32) -> Result<NaiveDate> {
    epoch()
        .checked_add_signed(TimeDelta::days(days.into()))
        .ok_or_else(|| ScorpionError::Schema(format!("date {days} days from epoch out of range")))
}

/// All rows as a single zstd-compressed row group.
pub(super) fn write_rows<W: Write + Send>(
    writer: W,
    columns: &[Column],
    rows: &[Vec<Cell>],
) -> Result<()> {
    let schema = Arc::new(schema(columns));
    let arrays = columns
        .iter()
        .enumerate()
        .map(|(index, column)| column_array(index, column, rows))
        .collect::<Result<Vec<_>>>()?;
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;

    let properties = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .build();
    let mut writer = ArrowWriter::try_new(writer, schema, Some(properties))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn column_array(index: usize, column: &Column, rows: &[Vec<Cell>]) -> Result<ArrayRef> {
    let cells = rows.iter().map(|row| {
        row.get(index)
            .filter(|cell| cell.ty() == column.ty)
            .ok_or_else(|| ScorpionError::Schema(format!("row has no {} cell", column.name)))
    });
    let array: ArrayRef = match column.ty {
        ColumnType::Int => Arc::new(
            cells
                .map(|cell| cell.map(|c| if let Cell::Int(v) = c { *v } else { None }))
                .collect::<Result<Int64Array>>()?,
        ),
        ColumnType::Float => Arc::new(
            cells
                .map(|cell| cell.map(|c| if let Cell::Float(v) = c { *v } else { None }))
                .collect::<Result<Float64Array>>()?,
        ),
        ColumnType::Text => Arc::new(
            cells
                .map(|cell| {
                    cell.map(|c| match c {
                        Cell::Text(v) => v.as_deref(),
                        _ => None,
                    })
                })
                .collect::<Result<StringArray>>()?,
        ),
        ColumnType::Bool => Arc::new(
            cells
                .map(|cell| cell.map(|c| if let Cell::Bool(v) = c { *v } else { None }))
                .collect::<Result<BooleanArray>>()?,
        ),
        ColumnType::Date => Arc::new(
            cells
                .map(|cell| {
                    cell.map(|c| match c {
                        Cell::Date(v) => v.map(days_since_epoch),
                        _ => None,
                    })
                })
                .collect::<Result<Date32Array>>()?,
        ),
    };
    Ok(array)
}

pub(super) fn read_rows(file: File, columns: &[Column]) -> Result<Vec<Vec<Cell>>> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let found = builder
        .schema()
        .fields()
        .iter()
        .map(|f| (f.name().clone(), f.data_type().clone()))
        .collect::<Vec<_>>();
    let expected = columns
        .iter()
        .map(|c| (c.name.to_owned(), data_type(c.ty)))
        .collect::<Vec<_>>();
    if found != expected {
        return Err(ScorpionError::Schema(format!(
            "parquet columns {found:?}, expected {expected:?}"
        )));
    }

    let mut rows = vec![];
    for batch in builder.build()? {
        let batch = batch?;
        let mut batch_rows = vec![Vec::with_capacity(columns.len()); batch.num_rows()];
        for (column, array) in columns.iter().zip(batch.columns()) {
            let cells = column_cells(column, array.as_ref())?;
            for (row, cell) in batch_rows.iter_mut().zip(cells) {
                row.push(cell);
            }
        }
        rows.extend(batch_rows);
    }
    Ok(rows)
}

fn downcast<'a, A: Array + 'static>(column: &Column, array: &'a dyn Array) -> Result<&'a A> {
    array
        .as_any()
        .downcast_ref::<A>()
        .ok_or_else(|| ScorpionError::Schema(format!("column {} has the wrong type", column.name)))
}

fn column_cells(column: &Column, array: &dyn Array) -> Result<Vec<Cell>> {
    let cells: Vec<Cell> = match column.ty {
        ColumnType::Int => downcast::<Int64Array>(column, array)?
            .iter()
            .map(Cell::Int)
            .collect(),
        ColumnType::Float => downcast::<Float64Array>(column, array)?
            .iter()
            .map(Cell::Float)
            .collect(),
        ColumnType::Text => downcast::<StringArray>(column, array)?
            .iter()
            .map(|v| Cell::Text(v.map(str::to_owned)))
            .collect(),
        ColumnType::Bool => downcast::<BooleanArray>(column, array)?
            .iter()
            .map(Cell::Bool)
            .collect(),
        ColumnType::Date => downcast::<Date32Array>(column, array)?
            .iter()
            .map(|v| v.map(date_from_days).transpose().map(Cell::Date))
            .collect::<Result<_>>()?,
    };
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[Column] = &[
        Column::new("RankingID", ColumnType::Int),
        Column::new("Date", ColumnType::Date),
        Column::new("Nation", ColumnType::Text),
    ];

    #[test]
    fn test_dates_survive_the_epoch_conversion() {
        for date in [
            NaiveDate::from_ymd_opt(1969, 12, 31).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
        ] {
            assert_eq!(date_from_days(days_since_epoch(date)).unwrap(), date);
        }
        assert_eq!(days_since_epoch(epoch()), 0);
    }

    #[test]
    fn test_schema_mismatch_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ranking_history.parquet");
        let rows = vec![vec![
            Cell::from(417u32),
            Cell::from(NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()),
            Cell::Text(None),
        ]];
        write_rows(File::create(&path).unwrap(), COLUMNS, &rows).unwrap();

        let renamed = &[
            Column::new("RankingID", ColumnType::Int),
            Column::new("Date", ColumnType::Text),
            Column::new("Nation", ColumnType::Text),
        ];
        let err = read_rows(File::open(&path).unwrap(), renamed).unwrap_err();
        assert!(matches!(err, ScorpionError::Schema(_)));

        let read = read_rows(File::open(&path).unwrap(), COLUMNS).unwrap();
        assert_eq!(read, rows);
    }
}
