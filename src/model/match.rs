use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use super::{Cell, Column, ColumnType, Entity, PlayerRef, Record, RowReader};
use crate::error::{Result, ScorpionError};

/// A single played game between two players.
///
/// Playoff series are stored one row per game, numbered by
/// `playoff_game_number`; round-robin games carry the tour number in
/// `round_number` instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub stage_id: u32,
    pub player1: String,
    pub player1_id: Option<u32>,
    pub player2: String,
    pub player2_id: Option<u32>,
    pub goals_player1: u32,
    pub goals_player2: u32,
    pub overtime: bool,
    pub stage: StageKind,
    pub round_number: Option<f64>,
    pub playoff_game_number: Option<u32>,
    /// Number of the game's row on the stage page, which tells apart
    /// rematches of a pair within one stage.
    pub schedule_row: Option<u32>,
    pub date: Option<NaiveDate>,
    pub tournament_name: String,
    pub tournament_id: u32,
    pub stage_sequence: Option<u32>,
}

impl Match {
    pub fn is_playoff_draw(&self) -> bool {
        self.stage == StageKind::Playoff && self.goals_player1 == self.goals_player2
    }

    /// Profile ids of both players, where linked.
    pub fn player_ids(&self) -> impl Iterator<Item = u32> {
        self.player1_id.into_iter().chain(self.player2_id)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::EnumString, strum_macros::Display,
)]
pub enum StageKind {
    Playoff,
    #[strum(serialize = "Round-Robin")]
    #[serde(rename = "Round-Robin")]
    RoundRobin,
}

/// Identifies one game: its stage, its position in the stage and the pairing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchKey {
    pub tournament_id: u32,
    pub stage_id: u32,
    pub schedule_row: Option<u32>,
    /// `f64::to_bits` of the round number, which is never negative.
    pub round: Option<u64>,
    pub game: Option<u32>,
    pub player1: PlayerRef,
    pub player2: PlayerRef,
}

impl Record for Match {
    type Key = MatchKey;

    const ENTITY: Entity = Entity::Matches;
    const COLUMNS: &'static [Column] = &[
        Column::new("StageID", ColumnType::Int),
        Column::new("Player1", ColumnType::Text),
        Column::new("Player1ID", ColumnType::Int),
        Column::new("Player2", ColumnType::Text),
        Column::new("Player2ID", ColumnType::Int),
        Column::new("GoalsPlayer1", ColumnType::Int),
        Column::new("GoalsPlayer2", ColumnType::Int),
        Column::new("Overtime", ColumnType::Bool),
        Column::new("Stage", ColumnType::Text),
        Column::new("RoundNumber", ColumnType::Float),
        Column::new("PlayoffGameNumber", ColumnType::Int),
        Column::new("ScheduleRow", ColumnType::Int),
        Column::new("Date", ColumnType::Date),
        Column::new("TournamentName", ColumnType::Text),
        Column::new("TournamentID", ColumnType::Int),
        Column::new("StageSequence", ColumnType::Int),
    ];

    fn key(&self) -> MatchKey {
        MatchKey {
            tournament_id: self.tournament_id,
            stage_id: self.stage_id,
            schedule_row: self.schedule_row,
            round: self.round_number.map(f64::to_bits),
            game: self.playoff_game_number,
            player1: PlayerRef::new(self.player1_id, &self.player1),
            player2: PlayerRef::new(self.player2_id, &self.player2),
        }
    }

    fn to_row(&self) -> Vec<Cell> {
        vec![
            self.stage_id.into(),
            self.player1.as_str().into(),
            self.player1_id.into(),
            self.player2.as_str().into(),
            self.player2_id.into(),
            self.goals_player1.into(),
            self.goals_player2.into(),
            self.overtime.into(),
            self.stage.to_string().as_str().into(),
            self.round_number.into(),
            self.playoff_game_number.into(),
            self.schedule_row.into(),
            self.date.into(),
            self.tournament_name.as_str().into(),
            self.tournament_id.into(),
            self.stage_sequence.into(),
        ]
    }

    fn from_row(row: &mut RowReader) -> Result<Self> {
        Ok(Self {
            stage_id: row.u32()?,
            player1: row.text()?,
            player1_id: row.opt_u32()?,
            player2: row.text()?,
            player2_id: row.opt_u32()?,
            goals_player1: row.u32()?,
            goals_player2: row.u32()?,
            overtime: row.bool()?,
            stage: {
                let stage = row.text()?;
                StageKind::from_str(&stage)
                    .map_err(|_| ScorpionError::Schema(format!("unknown stage {stage:?}")))?
            },
            round_number: row.opt_f64()?,
            playoff_game_number: row.opt_u32()?,
            schedule_row: row.opt_u32()?,
            date: row.opt_date()?,
            tournament_name: row.text()?,
            tournament_id: row.u32()?,
            stage_sequence: row.opt_u32()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(game_number: Option<u32>, goals: (u32, u32)) -> Match {
        Match {
            stage_id: 10,
            player1: "Anna".into(),
            player1_id: Some(1),
            player2: "Ben".into(),
            player2_id: None,
            goals_player1: goals.0,
            goals_player2: goals.1,
            overtime: false,
            stage: StageKind::Playoff,
            round_number: Some(0.25),
            playoff_game_number: game_number,
            schedule_row: Some(1),
            date: None,
            tournament_name: "Riga Open".into(),
            tournament_id: 5,
            stage_sequence: Some(2),
        }
    }

    #[test]
    fn test_key_distinguishes_series_games() {
        assert_ne!(game(Some(1), (2, 1)).key(), game(Some(2), (2, 1)).key());
        assert_eq!(game(Some(1), (2, 1)).key(), game(Some(1), (0, 3)).key());
    }

    #[test]
    fn test_key_distinguishes_rematches_without_round() {
        let mut first = game(None, (3, 1));
        first.stage = StageKind::RoundRobin;
        first.round_number = None;
        let mut second = first.clone();
        second.goals_player1 = 0;
        second.goals_player2 = 4;
        second.schedule_row = Some(2);
        assert_ne!(first.key(), second.key());
    }

    #[test]
    fn test_key_falls_back_to_name() {
        let key = game(Some(1), (1, 0)).key();
        assert_eq!(key.player1, PlayerRef::Id(1));
        assert_eq!(key.player2, PlayerRef::Name("Ben".into()));
    }

    #[test]
    fn test_playoff_draw() {
        assert!(game(Some(1), (2, 2)).is_playoff_draw());
        let mut round_robin = game(None, (2, 2));
        round_robin.stage = StageKind::RoundRobin;
        assert!(!round_robin.is_playoff_draw());
    }

    #[test]
    fn test_stage_kind_text() {
        assert_eq!(StageKind::RoundRobin.to_string(), "Round-Robin");
        assert_eq!(StageKind::from_str("Playoff").unwrap(), StageKind::Playoff);
    }
}
