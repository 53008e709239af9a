//! Snapshot files, one per entity, rewritten atomically.

mod csv;
mod parquet;

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::error::{Result, ScorpionError};
use crate::model::{Cell, Entity, Record, RowReader, Snapshot};

/// On-disk encoding of a snapshot.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum Format {
    Csv,
    Parquet,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Parquet => "parquet",
        }
    }

    fn other(self) -> Format {
        match self {
            Format::Csv => Format::Parquet,
            Format::Parquet => Format::Csv,
        }
    }
}

/// Reads and writes the snapshots under one data directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    data_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, entity: Entity, format: Format) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", entity.file_stem(), format.extension()))
    }

    /// Whether a snapshot of `entity` exists in either format.
    pub fn exists(&self, entity: Entity) -> bool {
        [Format::Csv, Format::Parquet]
            .into_iter()
            .any(|format| self.path_for(entity, format).is_file())
    }

    /// Load the snapshot of `R`, preferring `format` but accepting the
    /// other format's file when only that one exists.
    #[instrument(skip(self), fields(entity = %R::ENTITY))]
    pub fn load<R: Record>(&self, format: Format) -> Result<Option<Snapshot<R>>> {
        let Some((path, found)) = [format, format.other()]
            .into_iter()
            .map(|f| (self.path_for(R::ENTITY, f), f))
            .find(|(path, _)| path.is_file())
        else {
            debug!("no snapshot on disk");
            return Ok(None);
        };

        let file = File::open(&path).map_err(|e| ScorpionError::io(&path, e))?;
        let rows = match found {
            Format::Csv => csv::read_rows(BufReader::new(file), R::COLUMNS)?,
            Format::Parquet => parquet::read_rows(file, R::COLUMNS)?,
        };

        let mut snapshot = Snapshot::<R>::new();
        for cells in rows {
            let record = R::from_row(&mut RowReader::new(R::COLUMNS, cells)?)?;
            snapshot.insert(record.key(), record);
        }
        debug!(path = %path.display(), records = snapshot.len(), "loaded snapshot");
        Ok(Some(snapshot))
    }

    /// Replace the snapshot of `R` in `format`.
    ///
    /// The file is written next to its target and renamed over it only once
    /// complete, so a failed write leaves the previous snapshot in place.
    #[instrument(skip(self, snapshot), fields(entity = %R::ENTITY, records = snapshot.len()))]
    pub fn save<R: Record>(&self, snapshot: &Snapshot<R>, format: Format) -> Result<PathBuf> {
        let path = self.path_for(R::ENTITY, format);
        fs::create_dir_all(&self.data_dir).map_err(|e| ScorpionError::io(&self.data_dir, e))?;

        let mut temp =
            NamedTempFile::new_in(&self.data_dir).map_err(|e| ScorpionError::io(&self.data_dir, e))?;
        let rows: Vec<Vec<Cell>> = snapshot.values().map(Record::to_row).collect();
        match format {
            Format::Csv => csv::write_rows(temp.as_file_mut(), R::COLUMNS, &rows)?,
            Format::Parquet => parquet::write_rows(temp.as_file_mut(), R::COLUMNS, &rows)?,
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| ScorpionError::io(temp.path(), e))?;
        temp.persist(&path)
            .map_err(|e| ScorpionError::io(&path, e.error))?;

        debug!(path = %path.display(), "snapshot written");
        Ok(path)
    }
}
