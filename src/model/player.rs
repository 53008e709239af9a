use serde::Serialize;

use super::{Cell, Column, ColumnType, Entity, Record, RowReader};
use crate::error::Result;

/// Profile data of a registered player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Player {
    pub id: u32,
    pub name: String,
    /// Position in the ITHF world ranking at scrape time.
    pub world_rank: Option<u32>,
    /// ITHF id, links the profile to the ranking history.
    pub ranking_id: Option<u32>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub date_of_birth: Option<String>,
    pub sex: Option<String>,
}

impl Record for Player {
    type Key = u32;

    const ENTITY: Entity = Entity::Players;
    const COLUMNS: &'static [Column] = &[
        Column::new("PlayerID", ColumnType::Int),
        Column::new("Name", ColumnType::Text),
        Column::new("WorldRank", ColumnType::Int),
        Column::new("RankingID", ColumnType::Int),
        Column::new("Country", ColumnType::Text),
        Column::new("City", ColumnType::Text),
        Column::new("DateOfBirth", ColumnType::Text),
        Column::new("Sex", ColumnType::Text),
    ];

    fn key(&self) -> u32 {
        self.id
    }

    fn to_row(&self) -> Vec<Cell> {
        vec![
            self.id.into(),
            self.name.as_str().into(),
            self.world_rank.into(),
            self.ranking_id.into(),
            self.country.as_deref().into(),
            self.city.as_deref().into(),
            self.date_of_birth.as_deref().into(),
            self.sex.as_deref().into(),
        ]
    }

    fn from_row(row: &mut RowReader) -> Result<Self> {
        Ok(Self {
            id: row.u32()?,
            name: row.text()?,
            world_rank: row.opt_u32()?,
            ranking_id: row.opt_u32()?,
            country: row.opt_text()?,
            city: row.opt_text()?,
            date_of_birth: row.opt_text()?,
            sex: row.opt_text()?,
        })
    }
}
