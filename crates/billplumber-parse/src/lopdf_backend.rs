//! lopdf-based PDF parsing backend.
//!
//! Implements [`PdfBackend`] using the [lopdf](https://crates.io/crates/lopdf)
//! crate for PDF document parsing and decryption.

use billplumber_core::{BBox, ExtractOptions, PdfError};

use crate::backend::PdfBackend;
use crate::error::BackendError;
use crate::font::resolve;
use crate::handler::ContentHandler;
use crate::interpreter::interpret_content_stream;
use crate::interpreter_state::InterpreterState;
use crate::text_state::TextState;

/// A parsed PDF document backed by lopdf.
pub struct LopdfDocument {
    inner: lopdf::Document,
    /// Page object ids in page order.
    page_ids: Vec<lopdf::ObjectId>,
}

impl LopdfDocument {
    fn new(inner: lopdf::Document) -> Self {
        // get_pages returns a BTreeMap keyed by 1-based page number
        let page_ids = inner.get_pages().values().copied().collect();
        Self { inner, page_ids }
    }

    /// Access the underlying lopdf document.
    pub fn inner(&self) -> &lopdf::Document {
        &self.inner
    }
}

impl std::fmt::Debug for LopdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LopdfDocument")
            .field("page_count", &self.page_ids.len())
            .finish_non_exhaustive()
    }
}

/// A reference to a single page within a [`LopdfDocument`].
#[derive(Debug, Clone, Copy)]
pub struct LopdfPage {
    /// The lopdf object ID for this page.
    pub object_id: lopdf::ObjectId,
    /// The 0-based page index.
    pub index: usize,
}

/// The lopdf-based PDF backend.
///
/// ```ignore
/// use billplumber_parse::{LopdfBackend, PdfBackend};
///
/// let doc = LopdfBackend::open_with_password(pdf_bytes, "123456")?;
/// let page = LopdfBackend::get_page(&doc, 0)?;
/// ```
pub struct LopdfBackend;

/// Extract a [`BBox`] from a lopdf array of 4 numbers `[x0, y0, x1, y1]`.
fn extract_bbox_from_array(array: &[lopdf::Object]) -> Result<BBox, BackendError> {
    if array.len() != 4 {
        return Err(BackendError::Parse(format!(
            "expected 4-element array for box, got {}",
            array.len()
        )));
    }
    let x0 = object_to_f64(&array[0])?;
    let y0 = object_to_f64(&array[1])?;
    let x1 = object_to_f64(&array[2])?;
    let y1 = object_to_f64(&array[3])?;
    Ok(BBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)))
}

fn object_to_f64(obj: &lopdf::Object) -> Result<f64, BackendError> {
    match obj {
        lopdf::Object::Integer(i) => Ok(*i as f64),
        lopdf::Object::Real(f) => Ok(f64::from(*f)),
        _ => Err(BackendError::Parse(format!("expected number, got {obj:?}"))),
    }
}

/// Look up a key in the page dictionary, walking up the page tree
/// (via /Parent) if the key is not found on the page itself.
fn resolve_inherited<'a>(
    doc: &'a lopdf::Document,
    page_id: lopdf::ObjectId,
    key: &[u8],
) -> Result<Option<&'a lopdf::Object>, BackendError> {
    let mut current_id = page_id;
    // a malformed tree may loop back on itself
    for _ in 0..64 {
        let dict = doc
            .get_object(current_id)
            .and_then(|o| o.as_dict())
            .map_err(|e| BackendError::Parse(format!("failed to get page dictionary: {e}")))?;

        if let Ok(value) = dict.get(key) {
            return Ok(Some(value));
        }

        match dict.get(b"Parent") {
            Ok(parent_obj) => {
                current_id = parent_obj
                    .as_reference()
                    .map_err(|e| BackendError::Parse(format!("invalid /Parent reference: {e}")))?;
            }
            Err(_) => return Ok(None),
        }
    }
    Err(BackendError::Parse(
        "page tree /Parent chain is too deep".to_string(),
    ))
}

fn parse_error(e: lopdf::Error) -> BackendError {
    match e {
        lopdf::Error::InvalidPassword => BackendError::Core(PdfError::InvalidPassword),
        other => BackendError::Parse(format!("failed to parse PDF: {other}")),
    }
}

impl PdfBackend for LopdfBackend {
    type Document = LopdfDocument;
    type Page = LopdfPage;
    type Error = BackendError;

    fn open(bytes: &[u8]) -> Result<Self::Document, Self::Error> {
        let inner = lopdf::Document::load_mem(bytes).map_err(parse_error)?;

        // lopdf leaves the document encrypted when the empty user password fails
        if inner.is_encrypted() {
            return Err(BackendError::Core(PdfError::PasswordRequired));
        }

        Ok(LopdfDocument::new(inner))
    }

    fn open_with_password(bytes: &[u8], password: &str) -> Result<Self::Document, Self::Error> {
        let inner = lopdf::Document::load_mem_with_password(bytes, password).map_err(parse_error)?;

        if inner.is_encrypted() {
            return Err(BackendError::Core(PdfError::InvalidPassword));
        }

        Ok(LopdfDocument::new(inner))
    }

    fn page_count(doc: &Self::Document) -> usize {
        doc.page_ids.len()
    }

    fn get_page(doc: &Self::Document, index: usize) -> Result<Self::Page, Self::Error> {
        let object_id = doc.page_ids.get(index).copied().ok_or_else(|| {
            BackendError::Parse(format!(
                "page index {index} out of range (0..{})",
                doc.page_ids.len()
            ))
        })?;
        Ok(LopdfPage { object_id, index })
    }

    fn page_media_box(doc: &Self::Document, page: &Self::Page) -> Result<BBox, Self::Error> {
        let obj = resolve_inherited(&doc.inner, page.object_id, b"MediaBox")?
            .ok_or_else(|| BackendError::Parse("MediaBox not found on page or ancestors".into()))?;
        let array = resolve(&doc.inner, obj)
            .as_array()
            .map_err(|e| BackendError::Parse(format!("MediaBox is not an array: {e}")))?;
        extract_bbox_from_array(array)
    }

    fn interpret_page(
        doc: &Self::Document,
        page: &Self::Page,
        handler: &mut dyn ContentHandler,
        options: &ExtractOptions,
    ) -> Result<(), Self::Error> {
        let inner = &doc.inner;

        let page_dict = inner
            .get_object(page.object_id)
            .and_then(|o| o.as_dict())
            .map_err(|e| BackendError::Parse(format!("failed to get page dictionary: {e}")))?;

        let content_bytes = get_page_content_bytes(inner, page_dict)?;
        if content_bytes.len() > options.max_stream_bytes {
            return Err(BackendError::Interpreter(format!(
                "page content of {} bytes exceeds limit {}",
                content_bytes.len(),
                options.max_stream_bytes
            )));
        }

        let resources = get_page_resources(inner, page.object_id)?;

        let mut gstate = InterpreterState::new();
        let mut tstate = TextState::new();

        interpret_content_stream(
            inner,
            &content_bytes,
            resources,
            handler,
            options,
            0,
            &mut gstate,
            &mut tstate,
        )
    }
}

/// Get the content stream bytes from a page dictionary.
///
/// Handles both single stream references and arrays of stream references.
fn get_page_content_bytes(
    doc: &lopdf::Document,
    page_dict: &lopdf::Dictionary,
) -> Result<Vec<u8>, BackendError> {
    let Ok(contents_obj) = page_dict.get(b"Contents") else {
        return Ok(Vec::new());
    };

    match resolve(doc, contents_obj) {
        lopdf::Object::Stream(stream) => decode_content_stream(stream),
        lopdf::Object::Array(arr) => {
            let mut content = Vec::new();
            for item in arr {
                let stream = resolve(doc, item).as_stream().map_err(|e| {
                    BackendError::Parse(format!("/Contents array item is not a stream: {e}"))
                })?;
                let bytes = decode_content_stream(stream)?;
                if !content.is_empty() {
                    content.push(b' ');
                }
                content.extend_from_slice(&bytes);
            }
            Ok(content)
        }
        _ => Err(BackendError::Parse(
            "/Contents is not a stream or array".to_string(),
        )),
    }
}

/// Decode a content stream, decompressing if needed.
fn decode_content_stream(stream: &lopdf::Stream) -> Result<Vec<u8>, BackendError> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| BackendError::Parse(format!("failed to decompress content stream: {e}")))
    } else {
        Ok(stream.content.clone())
    }
}

/// Get the resources dictionary for a page, handling inheritance.
fn get_page_resources(
    doc: &lopdf::Document,
    page_id: lopdf::ObjectId,
) -> Result<&lopdf::Dictionary, BackendError> {
    match resolve_inherited(doc, page_id, b"Resources")? {
        Some(obj) => resolve(doc, obj)
            .as_dict()
            .map_err(|_| BackendError::Parse("/Resources is not a dictionary".to_string())),
        None => {
            static EMPTY_DICT: std::sync::LazyLock<lopdf::Dictionary> =
                std::sync::LazyLock::new(lopdf::Dictionary::new);
            Ok(&EMPTY_DICT)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::CharEvent;
    use billplumber_core::{ExtractWarning, PaintedPath};
    use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};

    #[derive(Default)]
    struct CollectingHandler {
        chars: Vec<CharEvent>,
        paths: Vec<PaintedPath>,
        warnings: Vec<ExtractWarning>,
    }

    impl ContentHandler for CollectingHandler {
        fn on_char(&mut self, event: CharEvent) {
            self.chars.push(event);
        }

        fn on_path_painted(&mut self, path: PaintedPath) {
            self.paths.push(path);
        }

        fn on_warning(&mut self, warning: ExtractWarning) {
            self.warnings.push(warning);
        }
    }

    /// A document whose pages each carry `content` and a Helvetica font.
    fn build_doc(page_count: usize, content: &[u8]) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id: ObjectId = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for _ in 0..page_count {
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count as i64,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
                "Resources" => resources_id,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    fn save(mut doc: Document) -> Vec<u8> {
        let mut buf = Vec::new();
        doc.save_to(&mut buf).expect("failed to save test PDF");
        buf
    }

    fn encrypted(user_password: &str) -> Vec<u8> {
        let mut doc = build_doc(1, b"BT /F1 12 Tf 72 720 Td (Hi) Tj ET");
        doc.trailer.set(
            "ID",
            vec![
                Object::String(vec![7u8; 16], StringFormat::Literal),
                Object::String(vec![9u8; 16], StringFormat::Literal),
            ],
        );
        let version = lopdf::EncryptionVersion::V2 {
            document: &doc,
            owner_password: "owner",
            user_password,
            key_length: 128,
            permissions: lopdf::Permissions::all(),
        };
        let state = lopdf::EncryptionState::try_from(version).unwrap();
        doc.encrypt(&state).unwrap();
        save(doc)
    }

    #[test]
    fn open_counts_pages() {
        let bytes = save(build_doc(3, b""));
        let doc = LopdfBackend::open(&bytes).unwrap();
        assert_eq!(LopdfBackend::page_count(&doc), 3);
    }

    #[test]
    fn open_garbage_fails_with_parse_error() {
        let err = LopdfBackend::open(b"not a pdf").unwrap_err();
        assert!(matches!(err, BackendError::Parse(_)));
    }

    #[test]
    fn get_page_out_of_range() {
        let bytes = save(build_doc(1, b""));
        let doc = LopdfBackend::open(&bytes).unwrap();
        assert_eq!(LopdfBackend::get_page(&doc, 0).unwrap().index, 0);
        assert!(LopdfBackend::get_page(&doc, 1).is_err());
    }

    #[test]
    fn media_box_is_inherited() {
        let bytes = save(build_doc(1, b""));
        let doc = LopdfBackend::open(&bytes).unwrap();
        let page = LopdfBackend::get_page(&doc, 0).unwrap();
        let media_box = LopdfBackend::page_media_box(&doc, &page).unwrap();
        assert_eq!(media_box.width(), 595.0);
        assert_eq!(media_box.height(), 842.0);
    }

    #[test]
    fn interpret_page_reports_chars_and_paths() {
        let bytes = save(build_doc(
            1,
            b"0 0 m 100 0 l S BT /F1 12 Tf 72 720 Td (Hi) Tj ET",
        ));
        let doc = LopdfBackend::open(&bytes).unwrap();
        let page = LopdfBackend::get_page(&doc, 0).unwrap();
        let mut handler = CollectingHandler::default();
        LopdfBackend::interpret_page(&doc, &page, &mut handler, &ExtractOptions::default())
            .unwrap();

        let text: String = handler
            .chars
            .iter()
            .filter_map(|c| c.unicode.clone())
            .collect();
        assert_eq!(text, "Hi");
        assert_eq!(handler.paths.len(), 1);
        assert!(handler.warnings.is_empty());
    }

    #[test]
    fn oversized_content_is_rejected() {
        let bytes = save(build_doc(1, b"0 0 m 100 0 l S"));
        let doc = LopdfBackend::open(&bytes).unwrap();
        let page = LopdfBackend::get_page(&doc, 0).unwrap();
        let options = ExtractOptions {
            max_stream_bytes: 4,
            ..ExtractOptions::default()
        };
        let err = LopdfBackend::interpret_page(
            &doc,
            &page,
            &mut CollectingHandler::default(),
            &options,
        )
        .unwrap_err();
        assert!(matches!(err, BackendError::Interpreter(_)));
    }

    #[test]
    fn encrypted_document_requires_password() {
        let bytes = encrypted("123456");
        let err = LopdfBackend::open(&bytes).unwrap_err();
        assert!(matches!(err, BackendError::Core(PdfError::PasswordRequired)));
    }

    #[test]
    fn encrypted_document_opens_with_password() {
        let bytes = encrypted("123456");
        let doc = LopdfBackend::open_with_password(&bytes, "123456").unwrap();
        let page = LopdfBackend::get_page(&doc, 0).unwrap();
        let mut handler = CollectingHandler::default();
        LopdfBackend::interpret_page(&doc, &page, &mut handler, &ExtractOptions::default())
            .unwrap();
        assert_eq!(handler.chars.len(), 2);
    }

    #[test]
    fn encrypted_document_rejects_wrong_password() {
        let bytes = encrypted("123456");
        let err = LopdfBackend::open_with_password(&bytes, "000000").unwrap_err();
        assert!(matches!(err, BackendError::Core(PdfError::InvalidPassword)));
    }

    #[test]
    fn password_is_ignored_for_plain_documents() {
        let bytes = save(build_doc(2, b""));
        let doc = LopdfBackend::open_with_password(&bytes, "anything").unwrap();
        assert_eq!(LopdfBackend::page_count(&doc), 2);
    }
}
