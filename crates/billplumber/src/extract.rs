//! Whole-document table extraction.
//!
//! Every page is scanned for lattice tables and each table becomes one raw
//! fragment. A page that cannot be interpreted is skipped with a warning so
//! one damaged page does not lose the rest of the statement.

use billplumber_core::{ExtractWarning, ExtractWarningCode, RawFragment, TableSettings};
use tracing::{debug, warn};

use crate::Pdf;

/// Raw table fragments of one document plus the issues met on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Fragments in page order, tables top to bottom within a page.
    pub fragments: Vec<RawFragment>,
    pub warnings: Vec<ExtractWarning>,
}

impl Extraction {
    /// Pages that were skipped because they failed to interpret.
    pub fn skipped_pages(&self) -> Vec<usize> {
        self.warnings
            .iter()
            .filter(|w| w.code == ExtractWarningCode::PageSkipped)
            .filter_map(|w| w.page)
            .collect()
    }
}

/// Extract the table fragments of every page.
pub fn extract_fragments(pdf: &Pdf, settings: &TableSettings) -> Extraction {
    extract_fragments_with_progress(pdf, settings, |_, _| {})
}

/// Like [`extract_fragments`], calling `on_page(done, total)` after each page.
pub fn extract_fragments_with_progress(
    pdf: &Pdf,
    settings: &TableSettings,
    mut on_page: impl FnMut(usize, usize),
) -> Extraction {
    let total = pdf.page_count();
    let mut extraction = Extraction::default();

    for (index, page) in pdf.pages_iter().enumerate() {
        match page {
            Ok(page) => {
                extraction.warnings.extend_from_slice(page.warnings());
                let tables = page.extract_tables(settings);
                debug!(page = index, tables = tables.len(), "tables detected");
                extraction.fragments.extend(tables);
            }
            Err(err) => {
                warn!(page = index, error = %err, "skipping page");
                extraction.warnings.push(
                    ExtractWarning::new(ExtractWarningCode::PageSkipped, err.to_string())
                        .on_page(index),
                );
            }
        }
        on_page(index + 1, total);
    }

    extraction
}
