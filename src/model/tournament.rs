use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use super::{Cell, Column, ColumnType, Entity, Record, RowReader};
use crate::error::Result;

/// A tournament from the archive, enriched with its detail page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tournament {
    pub id: u32,
    pub name: String,
    pub kind: TournamentKind,
    pub date: Option<NaiveDate>,
    pub location: Option<String>,
}

/// Whether a tournament is played by individuals or by teams.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    strum_macros::EnumString,
    strum_macros::Display,
)]
pub enum TournamentKind {
    Individual,
    Team,
    #[default]
    Unknown,
}

impl TournamentKind {
    /// Parse the free text of the "Tournament type" row.
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        TournamentKind::from_str(text)
            .or_else(|_| TournamentKind::from_str(&capitalize(text)))
            .unwrap_or_default()
    }
}

fn capitalize(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One row of the tournament archive listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TournamentListing {
    pub id: u32,
    pub name: String,
}

/// A "Schedule and results" link of a tournament stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLink {
    pub id: u32,
    pub sequence: Option<u32>,
    pub url: String,
}

impl Record for Tournament {
    type Key = u32;

    const ENTITY: Entity = Entity::Tournaments;
    const COLUMNS: &'static [Column] = &[
        Column::new("ID", ColumnType::Int),
        Column::new("Name", ColumnType::Text),
        Column::new("Type", ColumnType::Text),
        Column::new("Date", ColumnType::Date),
        Column::new("Location", ColumnType::Text),
    ];

    fn key(&self) -> u32 {
        self.id
    }

    fn to_row(&self) -> Vec<Cell> {
        vec![
            self.id.into(),
            self.name.as_str().into(),
            self.kind.to_string().as_str().into(),
            self.date.into(),
            self.location.as_deref().into(),
        ]
    }

    fn from_row(row: &mut RowReader) -> Result<Self> {
        Ok(Self {
            id: row.u32()?,
            name: row.text()?,
            kind: TournamentKind::from_text(&row.text()?),
            date: row.opt_date()?,
            location: row.opt_text()?,
        })
    }
}
