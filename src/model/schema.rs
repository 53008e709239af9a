use chrono::NaiveDate;

use crate::error::{Result, ScorpionError};

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Logical type of a snapshot column. Every column is nullable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ColumnType {
    Int,
    Float,
    Text,
    Bool,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

impl Column {
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self { name, ty }
    }
}

/// A single typed value of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
    Bool(Option<bool>),
    Date(Option<NaiveDate>),
}

impl Cell {
    pub fn ty(&self) -> ColumnType {
        match self {
            Cell::Int(_) => ColumnType::Int,
            Cell::Float(_) => ColumnType::Float,
            Cell::Text(_) => ColumnType::Text,
            Cell::Bool(_) => ColumnType::Bool,
            Cell::Date(_) => ColumnType::Date,
        }
    }

    /// Text form used by the CSV snapshot; null renders as an empty field.
    pub fn render(&self) -> String {
        match self {
            Cell::Int(v) => v.map(|v| v.to_string()).unwrap_or_default(),
            Cell::Float(v) => v.map(|v| v.to_string()).unwrap_or_default(),
            Cell::Text(v) => v.clone().unwrap_or_default(),
            Cell::Bool(v) => match v {
                Some(true) => "Yes".to_owned(),
                Some(false) => "No".to_owned(),
                None => String::new(),
            },
            Cell::Date(v) => v
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
        }
    }

    /// Inverse of [`Cell::render`] for a column of the given type.
    pub fn parse(column: &Column, raw: &str) -> Result<Cell> {
        let raw = raw.trim();
        let invalid = || {
            ScorpionError::Schema(format!(
                "column {} expects {}, found {raw:?}",
                column.name, column.ty
            ))
        };
        if raw.is_empty() {
            return Ok(Cell::null(column.ty));
        }
        let cell = match column.ty {
            ColumnType::Int => Cell::Int(Some(raw.parse().map_err(|_| invalid())?)),
            ColumnType::Float => Cell::Float(Some(raw.parse().map_err(|_| invalid())?)),
            ColumnType::Text => Cell::Text(Some(raw.to_owned())),
            ColumnType::Bool => match raw {
                "Yes" | "yes" | "true" => Cell::Bool(Some(true)),
                "No" | "no" | "false" => Cell::Bool(Some(false)),
                _ => return Err(invalid()),
            },
            ColumnType::Date => Cell::Date(Some(
                NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| invalid())?,
            )),
        };
        Ok(cell)
    }

    pub fn null(ty: ColumnType) -> Cell {
        match ty {
            ColumnType::Int => Cell::Int(None),
            ColumnType::Float => Cell::Float(None),
            ColumnType::Text => Cell::Text(None),
            ColumnType::Bool => Cell::Bool(None),
            ColumnType::Date => Cell::Date(None),
        }
    }
}

impl From<u32> for Cell {
    fn from(v: u32) -> Self {
        Cell::Int(Some(v.into()))
    }
}

impl From<Option<u32>> for Cell {
    fn from(v: Option<u32>) -> Self {
        Cell::Int(v.map(Into::into))
    }
}

impl From<Option<f64>> for Cell {
    fn from(v: Option<f64>) -> Self {
        Cell::Float(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(Some(v.to_owned()))
    }
}

impl From<Option<&str>> for Cell {
    fn from(v: Option<&str>) -> Self {
        Cell::Text(v.map(str::to_owned))
    }
}

impl From<bool> for Cell {
    fn from(v: bool) -> Self {
        Cell::Bool(Some(v))
    }
}

impl From<NaiveDate> for Cell {
    fn from(v: NaiveDate) -> Self {
        Cell::Date(Some(v))
    }
}

impl From<Option<NaiveDate>> for Cell {
    fn from(v: Option<NaiveDate>) -> Self {
        Cell::Date(v)
    }
}

/// Sequential typed access to the cells of one decoded row.
pub struct RowReader {
    columns: std::slice::Iter<'static, Column>,
    cells: std::vec::IntoIter<Cell>,
}

impl RowReader {
    pub fn new(columns: &'static [Column], cells: Vec<Cell>) -> Result<Self> {
        if columns.len() != cells.len() {
            return Err(ScorpionError::Schema(format!(
                "expected {} columns, found {}",
                columns.len(),
                cells.len()
            )));
        }
        Ok(Self {
            columns: columns.iter(),
            cells: cells.into_iter(),
        })
    }

    fn next(&mut self) -> Result<(&'static Column, Cell)> {
        match (self.columns.next(), self.cells.next()) {
            (Some(column), Some(cell)) if cell.ty() == column.ty => Ok((column, cell)),
            (Some(column), Some(cell)) => Err(ScorpionError::Schema(format!(
                "column {} expects {}, found {}",
                column.name,
                column.ty,
                cell.ty()
            ))),
            _ => Err(ScorpionError::Schema("row is shorter than the schema".into())),
        }
    }

    fn required<T>(column: &Column, value: Option<T>) -> Result<T> {
        value.ok_or_else(|| ScorpionError::Schema(format!("column {} is null", column.name)))
    }

    pub fn opt_u32(&mut self) -> Result<Option<u32>> {
        let (column, cell) = self.next()?;
        match cell {
            Cell::Int(Some(v)) => u32::try_from(v).map(Some).map_err(|_| {
                ScorpionError::Schema(format!("column {} value {v} out of range", column.name))
            }),
            _ => Ok(None),
        }
    }

    pub fn u32(&mut self) -> Result<u32> {
        let column = self.columns.as_slice().first().copied();
        let value = self.opt_u32()?;
        match column {
            Some(column) => Self::required(&column, value),
            None => Err(ScorpionError::Schema("row is shorter than the schema".into())),
        }
    }

    pub fn opt_f64(&mut self) -> Result<Option<f64>> {
        match self.next()? {
            (_, Cell::Float(v)) => Ok(v),
            _ => Ok(None),
        }
    }

    pub fn opt_text(&mut self) -> Result<Option<String>> {
        match self.next()? {
            (_, Cell::Text(v)) => Ok(v),
            _ => Ok(None),
        }
    }

    /// Required text; a null cell reads back as the empty string.
    pub fn text(&mut self) -> Result<String> {
        Ok(self.opt_text()?.unwrap_or_default())
    }

    pub fn bool(&mut self) -> Result<bool> {
        match self.next()? {
            (column, Cell::Bool(v)) => Self::required(column, v),
            (column, _) => Self::required(column, None),
        }
    }

    pub fn opt_date(&mut self) -> Result<Option<NaiveDate>> {
        match self.next()? {
            (_, Cell::Date(v)) => Ok(v),
            _ => Ok(None),
        }
    }
}
