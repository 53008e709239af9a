mod r#match;
mod player;
mod ranking;
mod schema;
mod tournament;

use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::Serialize;

pub use player::*;
pub use r#match::*;
pub use ranking::*;
pub use schema::*;
pub use tournament::*;

use crate::error::Result;

/// The entity types that each own one snapshot file.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    strum_macros::Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
    Tournaments,
    Matches,
    Players,
    Rankings,
}

impl Entity {
    /// File name of the snapshot without extension.
    pub fn file_stem(self) -> &'static str {
        match self {
            Entity::Tournaments => "tournaments",
            Entity::Matches => "matches",
            Entity::Players => "players",
            Entity::Rankings => "ranking_history",
        }
    }
}

/// A row type persisted in a snapshot.
///
/// `COLUMNS` is the single schema shared by every on-disk format, and
/// `to_row`/`from_row` must agree with it column for column.
pub trait Record: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// Natural identifier used to deduplicate and merge.
    type Key: Ord + Clone + Debug + Send + Sync;

    const ENTITY: Entity;
    const COLUMNS: &'static [Column];

    fn key(&self) -> Self::Key;

    fn to_row(&self) -> Vec<Cell>;

    fn from_row(row: &mut RowReader) -> Result<Self>;
}

/// The persisted state of one entity type, ordered by identifier.
pub type Snapshot<R> = BTreeMap<<R as Record>::Key, R>;

/// A player reference inside a keyed record: the profile id when the
/// source linked one, the display name otherwise.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlayerRef {
    Id(u32),
    Name(String),
}

impl PlayerRef {
    pub fn new(id: Option<u32>, name: &str) -> Self {
        match id {
            Some(id) => PlayerRef::Id(id),
            None => PlayerRef::Name(name.to_owned()),
        }
    }
}
