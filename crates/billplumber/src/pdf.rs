//! Top-level PDF document type for opening and extracting content.

use billplumber_core::{Char, ExtractOptions, ExtractWarning, Line, PaintedPath, PdfError, Rect, extract_shapes};
use billplumber_parse::{
    CharEvent, ContentHandler, LopdfBackend, LopdfDocument, PdfBackend, char_from_event,
};
use tracing::debug;

use crate::Page;

/// Iterator over pages of a PDF document, yielding each page on demand.
///
/// Created by [`Pdf::pages_iter()`]. Pages are not retained after being
/// yielded; the caller owns the `Page` value.
pub struct PagesIter<'a> {
    pdf: &'a Pdf,
    current: usize,
    count: usize,
}

impl Iterator for PagesIter<'_> {
    type Item = Result<Page, PdfError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.count {
            return None;
        }
        let result = self.pdf.page(self.current);
        self.current += 1;
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.current;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PagesIter<'_> {}

/// Progress of [`Pdf::open_with_fallback`].
///
/// `NoAttempt → WithoutPassword → WithPassword → Opened | Failed`. The
/// password step is skipped when no password is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAttempt {
    NoAttempt,
    WithoutPassword,
    WithPassword,
    Opened,
    Failed,
}

impl OpenAttempt {
    /// The state after the attempt made in `self` succeeded or failed.
    pub fn next(self, succeeded: bool, has_password: bool) -> Self {
        match (self, succeeded) {
            (OpenAttempt::NoAttempt, _) => OpenAttempt::WithoutPassword,
            (OpenAttempt::WithoutPassword | OpenAttempt::WithPassword, true) => OpenAttempt::Opened,
            (OpenAttempt::WithoutPassword, false) if has_password => OpenAttempt::WithPassword,
            (OpenAttempt::WithoutPassword | OpenAttempt::WithPassword, false) => {
                OpenAttempt::Failed
            }
            (terminal, _) => terminal,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OpenAttempt::Opened | OpenAttempt::Failed)
    }
}

/// A PDF document opened for extraction.
///
/// # Example
///
/// ```ignore
/// let pdf = Pdf::open_with_fallback(&bytes, Some("123456"), None)?;
/// for page in pdf.pages_iter() {
///     let tables = page?.find_tables(&TableSettings::default());
/// }
/// ```
pub struct Pdf {
    doc: LopdfDocument,
    options: ExtractOptions,
}

/// Collects content stream events for one page.
struct CollectingHandler {
    chars: Vec<CharEvent>,
    paths: Vec<PaintedPath>,
    warnings: Vec<ExtractWarning>,
    page_index: usize,
}

impl CollectingHandler {
    fn new(page_index: usize) -> Self {
        Self {
            chars: Vec::new(),
            paths: Vec::new(),
            warnings: Vec::new(),
            page_index,
        }
    }
}

impl ContentHandler for CollectingHandler {
    fn on_char(&mut self, event: CharEvent) {
        self.chars.push(event);
    }

    fn on_path_painted(&mut self, path: PaintedPath) {
        self.paths.push(path);
    }

    fn on_warning(&mut self, mut warning: ExtractWarning) {
        if warning.page.is_none() {
            warning.page = Some(self.page_index);
        }
        self.warnings.push(warning);
    }
}

impl Pdf {
    /// Open a PDF document from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::PasswordRequired`] if the PDF is encrypted.
    /// Returns [`PdfError`] if the bytes are not a valid PDF document.
    pub fn open(bytes: &[u8], options: Option<ExtractOptions>) -> Result<Self, PdfError> {
        let doc = LopdfBackend::open(bytes).map_err(PdfError::from)?;
        Ok(Self::from_doc(doc, options))
    }

    /// Open an encrypted PDF document from bytes with a password.
    ///
    /// If the PDF is not encrypted, the password is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::InvalidPassword`] if the password is incorrect.
    pub fn open_with_password(
        bytes: &[u8],
        password: &str,
        options: Option<ExtractOptions>,
    ) -> Result<Self, PdfError> {
        let doc = LopdfBackend::open_with_password(bytes, password).map_err(PdfError::from)?;
        Ok(Self::from_doc(doc, options))
    }

    /// Open without a password first, then with `password` if one is given.
    /// An empty password counts as none.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::CannotOpen`] carrying the last failure when every
    /// attempt fails.
    pub fn open_with_fallback(
        bytes: &[u8],
        password: Option<&str>,
        options: Option<ExtractOptions>,
    ) -> Result<Self, PdfError> {
        let password = password.filter(|p| !p.is_empty());
        let has_password = password.is_some();
        let mut state = OpenAttempt::NoAttempt.next(false, has_password);
        let mut last_error: Option<PdfError> = None;
        let mut opened: Option<Self> = None;

        while !state.is_terminal() {
            let attempt = match (state, password) {
                (OpenAttempt::WithPassword, Some(password)) => {
                    Self::open_with_password(bytes, password, options.clone())
                }
                _ => Self::open(bytes, options.clone()),
            };
            match attempt {
                Ok(pdf) => {
                    debug!(?state, "document opened");
                    opened = Some(pdf);
                    state = state.next(true, has_password);
                }
                Err(err) => {
                    debug!(?state, error = %err, "open attempt failed");
                    last_error = Some(err);
                    state = state.next(false, has_password);
                }
            }
        }

        opened.ok_or_else(|| {
            PdfError::CannotOpen(
                last_error.map_or_else(|| "no open attempt was made".to_string(), |e| e.to_string()),
            )
        })
    }

    fn from_doc(doc: LopdfDocument, options: Option<ExtractOptions>) -> Self {
        Self {
            doc,
            options: options.unwrap_or_default(),
        }
    }

    /// Return the number of pages in the document.
    pub fn page_count(&self) -> usize {
        LopdfBackend::page_count(&self.doc)
    }

    /// Iterate pages lazily; each page is interpreted when yielded.
    pub fn pages_iter(&self) -> PagesIter<'_> {
        PagesIter {
            pdf: self,
            current: 0,
            count: self.page_count(),
        }
    }

    /// Access a page by 0-based index, extracting chars and ruling shapes.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] if the index is out of range, the page geometry
    /// is missing, or content interpretation fails.
    pub fn page(&self, index: usize) -> Result<Page, PdfError> {
        let lopdf_page = LopdfBackend::get_page(&self.doc, index).map_err(PdfError::from)?;
        let media_box =
            LopdfBackend::page_media_box(&self.doc, &lopdf_page).map_err(PdfError::from)?;

        let mut handler = CollectingHandler::new(index);
        LopdfBackend::interpret_page(&self.doc, &lopdf_page, &mut handler, &self.options)
            .map_err(PdfError::from)?;

        // y-flip reference: the top edge of the MediaBox in PDF space
        let flip_y = media_box.bottom;

        let chars: Vec<Char> = handler
            .chars
            .iter()
            .map(|event| char_from_event(event, flip_y))
            .collect();

        let mut lines: Vec<Line> = Vec::new();
        let mut rects: Vec<Rect> = Vec::new();
        for painted in &handler.paths {
            let (l, r) = extract_shapes(painted, flip_y);
            lines.extend(l);
            rects.extend(r);
        }

        debug!(
            page = index,
            chars = chars.len(),
            lines = lines.len(),
            rects = rects.len(),
            "page interpreted"
        );

        Ok(Page::with_geometry(
            index,
            media_box.width(),
            media_box.height(),
            chars,
            lines,
            rects,
        )
        .with_warnings(handler.warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Document, Object, Stream, dictionary};

    fn pdf_with_content(content: &[u8]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn open_attempt_transitions() {
        use OpenAttempt::*;
        assert_eq!(NoAttempt.next(false, false), WithoutPassword);
        assert_eq!(WithoutPassword.next(true, true), Opened);
        assert_eq!(WithoutPassword.next(false, true), WithPassword);
        assert_eq!(WithoutPassword.next(false, false), Failed);
        assert_eq!(WithPassword.next(true, true), Opened);
        assert_eq!(WithPassword.next(false, true), Failed);
        assert_eq!(Failed.next(true, true), Failed);
        assert!(Opened.is_terminal());
        assert!(!WithPassword.is_terminal());
    }

    #[test]
    fn fallback_opens_plain_document_without_password() {
        let bytes = pdf_with_content(b"");
        let pdf = Pdf::open_with_fallback(&bytes, Some("unused"), None).unwrap();
        assert_eq!(pdf.page_count(), 1);
    }

    #[test]
    fn fallback_fails_with_cannot_open() {
        let err = Pdf::open_with_fallback(b"garbage", Some("pw"), None)
            .err()
            .unwrap();
        assert!(matches!(err, PdfError::CannotOpen(_)));

        let err = Pdf::open_with_fallback(b"garbage", None, None).err().unwrap();
        assert!(matches!(err, PdfError::CannotOpen(_)));
    }

    #[test]
    fn page_converts_events_to_top_left_coordinates() {
        let bytes = pdf_with_content(b"1 w 72 700 m 540 700 l S BT /F1 12 Tf 72 720 Td (Hi) Tj ET");
        let pdf = Pdf::open(&bytes, None).unwrap();
        let page = pdf.page(0).unwrap();

        assert_eq!(page.width(), 612.0);
        assert_eq!(page.height(), 792.0);
        assert_eq!(page.chars().len(), 2);
        assert_eq!(page.chars()[0].text, "H");
        assert!((page.chars()[0].bbox.bottom - 75.0).abs() < 0.01);
        assert_eq!(page.lines().len(), 1);
        assert!((page.lines()[0].top - 92.0).abs() < 0.01);
        assert!(page.warnings().is_empty());
    }

    #[test]
    fn pages_iter_is_exact_size() {
        let bytes = pdf_with_content(b"");
        let pdf = Pdf::open(&bytes, None).unwrap();
        let iter = pdf.pages_iter();
        assert_eq!(iter.len(), 1);
        assert_eq!(iter.filter(Result::is_ok).count(), 1);
    }

    #[test]
    fn page_out_of_range_is_an_error() {
        let bytes = pdf_with_content(b"");
        let pdf = Pdf::open(&bytes, None).unwrap();
        assert!(pdf.page(5).is_err());
    }

    #[test]
    fn warnings_carry_the_page_index() {
        let bytes = pdf_with_content(b"BT /F7 12 Tf (x) Tj ET");
        let pdf = Pdf::open(&bytes, None).unwrap();
        let page = pdf.page(0).unwrap();
        assert_eq!(page.warnings().len(), 1);
        assert_eq!(page.warnings()[0].page, Some(0));
    }
}
