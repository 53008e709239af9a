use chrono::NaiveDate;
use serde::Serialize;

use super::{Cell, Column, ColumnType, Entity, PlayerRef, Record, RowReader};
use crate::error::{Result, ScorpionError};

/// One line of a monthly ITHF world ranking list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    /// Id of the monthly list on the ranking site.
    pub ranking_id: u32,
    pub date: NaiveDate,
    pub rank: u32,
    pub player_name: String,
    pub player_id: Option<u32>,
    pub nation: Option<String>,
    pub points: Option<u32>,
}

impl Record for RankingEntry {
    type Key = (u32, PlayerRef);

    const ENTITY: Entity = Entity::Rankings;
    const COLUMNS: &'static [Column] = &[
        Column::new("RankingID", ColumnType::Int),
        Column::new("Date", ColumnType::Date),
        Column::new("Rank", ColumnType::Int),
        Column::new("PlayerName", ColumnType::Text),
        Column::new("PlayerID", ColumnType::Int),
        Column::new("Nation", ColumnType::Text),
        Column::new("Points", ColumnType::Int),
    ];

    fn key(&self) -> Self::Key {
        (
            self.ranking_id,
            PlayerRef::new(self.player_id, &self.player_name),
        )
    }

    fn to_row(&self) -> Vec<Cell> {
        vec![
            self.ranking_id.into(),
            self.date.into(),
            self.rank.into(),
            self.player_name.as_str().into(),
            self.player_id.into(),
            self.nation.as_deref().into(),
            self.points.into(),
        ]
    }

    fn from_row(row: &mut RowReader) -> Result<Self> {
        let ranking_id = row.u32()?;
        let date = row.opt_date()?.ok_or_else(|| {
            ScorpionError::Schema(format!("ranking {ranking_id} has no date"))
        })?;
        Ok(Self {
            ranking_id,
            date,
            rank: row.u32()?,
            player_name: row.text()?,
            player_id: row.opt_u32()?,
            nation: row.opt_text()?,
            points: row.opt_u32()?,
        })
    }
}

/// One month of a single player's ranking history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerRankingPoint {
    pub year: i32,
    pub month: String,
    pub rank: Option<u32>,
    pub points: Option<u32>,
}
