use rayon::prelude::*;

use crate::record::Record;

// Below this many rows the scan stays on the calling thread.
const PARALLEL_THRESHOLD: usize = 4096;

/// Keeps the rows whose name contains `query`, ignoring case. Order is kept.
pub fn filter(records: &[Record], rows: &[usize], query: &str) -> Vec<usize> {
    if query.is_empty() {
        return rows.to_vec();
    }
    let needle = query.to_lowercase();
    let matches = |&&row: &&usize| records[row].name.to_lowercase().contains(&needle);

    if rows.len() < PARALLEL_THRESHOLD {
        rows.iter().filter(matches).copied().collect()
    } else {
        rows.par_iter().filter(matches).copied().collect()
    }
}
