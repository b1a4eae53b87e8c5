//! One statement in, one record set out.

use std::path::Path;

use billplumber_core::{
    ExtractWarning, PdfError, RawFragment, RecordSet, TableSettings, concat_fragments,
    locate_header, normalize,
};
use tracing::{debug, info};

use crate::Pdf;
use crate::extract::extract_fragments_with_progress;

/// The outcome of parsing one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// `None` when no table or no header row was found.
    pub records: Option<RecordSet>,
    pub warnings: Vec<ExtractWarning>,
}

/// Turn raw fragments into a record set.
///
/// Returns `None` when there are no fragments or no row carries the
/// transaction-time header.
pub fn build_record_set(fragments: Vec<RawFragment>) -> Option<RecordSet> {
    if fragments.is_empty() {
        debug!("no table fragments");
        return None;
    }

    let rows = concat_fragments(fragments);
    let Some(location) = locate_header(&rows) else {
        debug!(rows = rows.len(), "no header row");
        return None;
    };

    let records = normalize(&rows[location.header], &rows[location.data_start..]);
    debug!(
        header = location.header,
        fields = records.fields().len(),
        rows = records.len(),
        "record set built"
    );
    Some(records)
}

/// Parse a statement from bytes, reporting page progress.
///
/// # Errors
///
/// Returns [`PdfError::CannotOpen`] when the document opens neither without
/// a password nor with `password`.
pub fn parse_statement_bytes(
    bytes: &[u8],
    password: Option<&str>,
    settings: &TableSettings,
    on_page: impl FnMut(usize, usize),
) -> Result<Statement, PdfError> {
    let pdf = Pdf::open_with_fallback(bytes, password, None)?;
    let extraction = extract_fragments_with_progress(&pdf, settings, on_page);
    Ok(Statement {
        records: build_record_set(extraction.fragments),
        warnings: extraction.warnings,
    })
}

/// Parse the statement at `path` into a record set.
///
/// `Ok(None)` means the document opened but held no recognizable
/// transaction table.
///
/// # Errors
///
/// Returns [`PdfError`] if the file cannot be read or opened.
pub fn parse_statement(
    path: impl AsRef<Path>,
    password: Option<&str>,
    settings: &TableSettings,
) -> Result<Option<RecordSet>, PdfError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let statement = parse_statement_bytes(&bytes, password, settings, |_, _| {})?;
    info!(
        path = %path.display(),
        rows = statement.records.as_ref().map_or(0, RecordSet::len),
        warnings = statement.warnings.len(),
        "statement parsed"
    );
    Ok(statement.records)
}
