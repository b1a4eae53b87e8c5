//! PDF parsing backend trait.
//!
//! Defines the [`PdfBackend`] trait that abstracts opening a document,
//! walking its pages and interpreting page content into a [`ContentHandler`].

use billplumber_core::{BBox, ExtractOptions, PdfError};

use crate::handler::ContentHandler;

/// Trait abstracting PDF parsing operations.
///
/// # Associated Types
///
/// - `Document`: The parsed PDF document representation.
/// - `Page`: A reference to a single page within a document.
/// - `Error`: Backend-specific error type, convertible to [`PdfError`].
///
/// # Usage
///
/// ```ignore
/// let doc = MyBackend::open(pdf_bytes)?;
/// let page = MyBackend::get_page(&doc, 0)?;
/// let media_box = MyBackend::page_media_box(&doc, &page)?;
/// MyBackend::interpret_page(&doc, &page, &mut handler, &options)?;
/// ```
pub trait PdfBackend {
    /// The parsed PDF document type.
    type Document;

    /// A reference to a single page within a document.
    type Page;

    /// Backend-specific error type, convertible to [`PdfError`].
    type Error: std::error::Error + Into<PdfError>;

    /// Parse PDF bytes into a document without a password.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a PDF, or
    /// [`PdfError::PasswordRequired`] if the document is encrypted with a
    /// non-empty user password.
    fn open(bytes: &[u8]) -> Result<Self::Document, Self::Error>;

    /// Parse PDF bytes, decrypting with `password` if the document is
    /// encrypted. The password is ignored for unencrypted documents.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::InvalidPassword`] if the password is wrong.
    fn open_with_password(bytes: &[u8], password: &str) -> Result<Self::Document, Self::Error>;

    /// Return the number of pages in the document.
    fn page_count(doc: &Self::Document) -> usize;

    /// Access a page by 0-based index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range.
    fn get_page(doc: &Self::Document, index: usize) -> Result<Self::Page, Self::Error>;

    /// The page's MediaBox as `[x0, y0, x1, y1]` in PDF units, inherited
    /// from ancestors in the page tree when the page has none.
    ///
    /// # Errors
    ///
    /// Returns an error if no MediaBox is found or it is malformed.
    fn page_media_box(doc: &Self::Document, page: &Self::Page) -> Result<BBox, Self::Error>;

    /// Interpret the page's content stream, reporting glyphs, painted paths
    /// and warnings to `handler`.
    ///
    /// # Errors
    ///
    /// Returns an error if content stream parsing fails or a resource limit
    /// is exceeded.
    fn interpret_page(
        doc: &Self::Document,
        page: &Self::Page,
        handler: &mut dyn ContentHandler,
        options: &ExtractOptions,
    ) -> Result<(), Self::Error>;
}
