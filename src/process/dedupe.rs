use std::collections::HashSet;
use tracing::debug;

use super::row::{FlatRow, FlatTable};

/// Drop exact-duplicate rows (equality over all ten fields), keeping the
/// first occurrence.
pub fn dedupe(rows: Vec<FlatRow>) -> FlatTable {
    dedupe_indexed(rows).0
}

/// Like `dedupe`, also returning the input position of every kept row.
pub fn dedupe_indexed(rows: Vec<FlatRow>) -> (FlatTable, Vec<usize>) {
    let before = rows.len();
    let mut seen: HashSet<FlatRow> = HashSet::with_capacity(rows.len());
    let mut unique = Vec::with_capacity(rows.len());
    let mut kept = Vec::with_capacity(rows.len());

    for (idx, row) in rows.into_iter().enumerate() {
        if !seen.contains(&row) {
            seen.insert(row.clone());
            unique.push(row);
            kept.push(idx);
        }
    }

    debug!(before, after = unique.len(), "dedupe");
    (FlatTable::from_unique(unique), kept)
}
