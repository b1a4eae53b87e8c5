//! Error and warning types.
//!
//! [`PdfError`] is fatal for the current document, [`ExtractWarning`] records
//! a non-fatal issue that extraction recovered from.

use std::fmt;

/// Fatal error types for PDF processing.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfError {
    /// Error parsing PDF structure or syntax.
    ParseError(String),
    /// I/O error reading PDF data.
    IoError(String),
    /// Error resolving font or encoding information.
    FontError(String),
    /// Error during content stream interpretation.
    InterpreterError(String),
    /// The PDF is encrypted and requires a password to open.
    PasswordRequired,
    /// The supplied password is incorrect for this encrypted PDF.
    InvalidPassword,
    /// Every open attempt failed; carries the last cause.
    CannotOpen(String),
    /// Any other error not covered by specific variants.
    Other(String),
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::ParseError(msg) => write!(f, "parse error: {msg}"),
            PdfError::IoError(msg) => write!(f, "I/O error: {msg}"),
            PdfError::FontError(msg) => write!(f, "font error: {msg}"),
            PdfError::InterpreterError(msg) => write!(f, "interpreter error: {msg}"),
            PdfError::PasswordRequired => write!(f, "PDF is encrypted and requires a password"),
            PdfError::InvalidPassword => write!(f, "the supplied password is incorrect"),
            PdfError::CannotOpen(msg) => write!(f, "cannot open PDF: {msg}"),
            PdfError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PdfError {}

impl From<std::io::Error> for PdfError {
    fn from(err: std::io::Error) -> Self {
        PdfError::IoError(err.to_string())
    }
}

/// Machine-readable category of an [`ExtractWarning`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractWarningCode {
    /// A referenced font was not found in page resources.
    MissingFont,
    /// A content stream operator had missing or mistyped operands.
    MalformedOperator,
    /// A PDF object is malformed or has unexpected structure.
    MalformedObject,
    /// A whole page was left out of table extraction.
    PageSkipped,
    Other,
}

impl ExtractWarningCode {
    pub fn as_str(&self) -> &str {
        match self {
            ExtractWarningCode::MissingFont => "MISSING_FONT",
            ExtractWarningCode::MalformedOperator => "MALFORMED_OPERATOR",
            ExtractWarningCode::MalformedObject => "MALFORMED_OBJECT",
            ExtractWarningCode::PageSkipped => "PAGE_SKIPPED",
            ExtractWarningCode::Other => "OTHER",
        }
    }
}

impl fmt::Display for ExtractWarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal warning encountered during extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractWarning {
    pub code: ExtractWarningCode,
    pub description: String,
    /// Page index (0-based), if applicable.
    pub page: Option<usize>,
    pub font_name: Option<String>,
}

impl ExtractWarning {
    pub fn new(code: ExtractWarningCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            page: None,
            font_name: None,
        }
    }

    /// Attach page context.
    pub fn on_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Attach font context.
    pub fn with_font(mut self, font_name: impl Into<String>) -> Self {
        self.font_name = Some(font_name.into());
        self
    }
}

impl fmt::Display for ExtractWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.description)?;
        if let Some(page) = self.page {
            write!(f, " (page {page})")?;
        }
        if let Some(ref font_name) = self.font_name {
            write!(f, " [font {font_name}]")?;
        }
        Ok(())
    }
}

/// Resource limits for content stream interpretation.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Maximum nesting depth of Form XObjects (default: 10).
    pub max_recursion_depth: usize,
    /// Maximum decoded content bytes per page (default: 100 MB).
    pub max_stream_bytes: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_recursion_depth: 10,
            max_stream_bytes: 100 * 1024 * 1024,
        }
    }
}
