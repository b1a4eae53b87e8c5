//! Header row detection.
//!
//! Statements put free-form text (account holder, period, disclaimers) above
//! the transaction grid, and the lattice finder returns those lines as table
//! rows too. The real header is the first row carrying the transaction-time
//! label; everything after it is data.

use crate::record::TIMESTAMP_FIELD;
use crate::table::{RawFragment, RawRow};

/// Position of the header row within the concatenated rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLocation {
    /// Index of the header row.
    pub header: usize,
    /// Index of the first data row (`header + 1`).
    pub data_start: usize,
}

/// Concatenate fragments in order (fragment order first, then row order).
pub fn concat_fragments(fragments: impl IntoIterator<Item = RawFragment>) -> Vec<RawRow> {
    fragments.into_iter().flatten().collect()
}

/// Find the first row with a cell exactly equal to the header marker.
///
/// Returns `None` when no row matches.
pub fn locate_header(rows: &[RawRow]) -> Option<HeaderLocation> {
    rows.iter()
        .position(|row| {
            row.iter()
                .any(|cell| cell.as_deref() == Some(TIMESTAMP_FIELD))
        })
        .map(|header| HeaderLocation {
            header,
            data_start: header + 1,
        })
}
