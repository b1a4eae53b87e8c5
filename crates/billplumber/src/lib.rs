//! billplumber: turn PDF bill statements into typed transaction records.
//!
//! This is the public API facade crate. It re-exports the types of
//! billplumber-core, uses billplumber-parse for reading PDFs, and adds the
//! document-level pipeline plus spreadsheet and report export.
//!
//! # Architecture
//!
//! - **billplumber-core**: Backend-independent data types and algorithms
//! - **billplumber-parse**: PDF parsing and content stream interpretation
//! - **billplumber** (this crate): Statement pipeline, xlsx and HTML output
//!
//! # Example
//!
//! ```ignore
//! use billplumber::{TableSettings, merge, parse_statement, write_xlsx};
//!
//! let settings = TableSettings::default();
//! let a = parse_statement("2024-01.pdf", None, &settings)?;
//! let b = parse_statement("2024-02.pdf", Some("123456"), &settings)?;
//! if let Some(all) = merge(a.into_iter().chain(b).collect()) {
//!     write_xlsx(&all, "bill.xlsx")?;
//! }
//! ```

mod export;
mod extract;
mod page;
mod pdf;
mod report;
mod statement;

pub use billplumber_core;
pub use billplumber_parse;

pub use billplumber_core::{
    AMOUNT_FIELD, BBox, Char, Edge, ExtractOptions, ExtractWarning, ExtractWarningCode, Field,
    FieldKind, HeaderLocation, Line, PdfError, RawFragment, RawRow, RecordSet, Rect,
    TIMESTAMP_FIELD, Table, TableSettings, Value, concat_fragments, locate_header, merge,
    normalize,
};
pub use export::{DATETIME_FORMAT, ExportError, write_xlsx, xlsx_bytes};
pub use extract::{Extraction, extract_fragments, extract_fragments_with_progress};
pub use page::Page;
pub use pdf::{OpenAttempt, PagesIter, Pdf};
pub use report::{
    COUNTERPARTY_FIELD, EXPENSE, INCOME, MonthlyFlow, OTHERS_LABEL, REPORT_TITLE, ReportSummary,
    TYPE_FIELDS, render_html, write_html,
};
pub use statement::{Statement, build_record_set, parse_statement, parse_statement_bytes};
