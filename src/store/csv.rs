use std::io::{Read, Write};

use itertools::Itertools;

use crate::error::{Result, ScorpionError};
use crate::model::{Cell, Column};

/// Header row of column names, then one rendered line per row.
pub(super) fn write_rows<W: Write>(writer: W, columns: &[Column], rows: &[Vec<Cell>]) -> Result<()> {
    let mut writer = ::csv::Writer::from_writer(writer);
    writer.write_record(columns.iter().map(|c| c.name))?;
    for row in rows {
        writer.write_record(row.iter().map(Cell::render))?;
    }
    writer.flush().map_err(::csv::Error::from)?;
    Ok(())
}

pub(super) fn read_rows<R: Read>(reader: R, columns: &[Column]) -> Result<Vec<Vec<Cell>>> {
    let mut reader = ::csv::Reader::from_reader(reader);
    let header = reader.headers()?.iter().map(str::to_owned).collect_vec();
    let expected = columns.iter().map(|c| c.name).collect_vec();
    if header != expected {
        return Err(ScorpionError::Schema(format!(
            "csv header {header:?}, expected {expected:?}"
        )));
    }

    let mut rows = vec![];
    for record in reader.records() {
        let record = record?;
        let row = columns
            .iter()
            .zip(record.iter())
            .map(|(column, raw)| Cell::parse(column, raw))
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }
    Ok(rows)
}
