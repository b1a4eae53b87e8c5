//! billplumber-parse: lopdf document backend and content stream interpreter.
//!
//! Opens (optionally encrypted) PDFs, walks pages and interprets their
//! content into glyph and painted-path events for the lattice table finder
//! in `billplumber-core`.

pub mod backend;
pub mod char_extraction;
pub mod cjk_encoding;
pub mod cmap;
pub mod error;
pub mod font;
pub mod handler;
mod interpreter;
pub mod interpreter_state;
pub mod lopdf_backend;
pub mod text_state;

pub use backend::PdfBackend;
pub use billplumber_core;
pub use char_extraction::char_from_event;
pub use error::BackendError;
pub use handler::{CharEvent, ContentHandler};
pub use lopdf_backend::{LopdfBackend, LopdfDocument, LopdfPage};
