use std::collections::btree_map::Entry;
use std::collections::BTreeSet;
use std::fmt;

use crate::model::{Record, Snapshot};

/// How a fresh batch changed a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Keys that were not in the previous snapshot.
    pub inserted: usize,
    /// Existing keys whose record changed.
    pub updated: usize,
    /// Existing keys re-extracted with an identical record.
    pub unchanged: usize,
    /// Previous keys absent from the fresh batch, kept as they were.
    pub retained: usize,
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inserted, {} updated, {} unchanged, {} retained",
            self.inserted, self.updated, self.unchanged, self.retained
        )
    }
}

/// Merge a freshly extracted batch into the previous snapshot.
///
/// The fresh record replaces the stored one whole; keys missing from the
/// batch are kept. When the batch itself repeats a key the later record
/// wins.
pub fn merge<R, I>(previous: Snapshot<R>, fresh: I) -> (Snapshot<R>, MergeStats)
where
    R: Record,
    I: IntoIterator<Item = R>,
{
    let previous_len = previous.len();
    let mut merged = previous;
    let mut stats = MergeStats::default();
    // Keys already seen in this batch; repeats are not counted twice.
    let mut seen = BTreeSet::new();

    for record in fresh {
        let key = record.key();
        let first_sighting = seen.insert(key.clone());
        match merged.entry(key) {
            Entry::Vacant(slot) => {
                stats.inserted += 1;
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                if first_sighting && slot.get() == &record {
                    stats.unchanged += 1;
                } else if first_sighting {
                    stats.updated += 1;
                }
                slot.insert(record);
            }
        }
    }

    let revisited = stats.updated + stats.unchanged;
    stats.retained = previous_len - revisited;
    (merged, stats)
}
