use crate::models::Entry;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadColumns {
    pub mine: Vec<Entry>,
    pub theirs: Vec<Entry>,
}

/// Partitions a snapshot into the two display columns. Pure function of the
/// snapshot and the viewer's identity; recomputed in full on every snapshot.
/// Entries authored by neither party are dropped.
pub fn project(entries: &[Entry], viewer: &str, partner: &str) -> ThreadColumns {
    let mut columns = ThreadColumns::default();
    for entry in entries {
        if entry.author == viewer {
            columns.mine.push(entry.clone());
        } else if entry.author == partner {
            columns.theirs.push(entry.clone());
        }
    }
    columns
}
