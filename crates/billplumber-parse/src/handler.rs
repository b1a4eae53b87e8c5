//! Content handler callback trait.
//!
//! The interpreter calls [`ContentHandler`] methods as it walks a page's
//! content stream; implementors collect whatever they need.

use billplumber_core::{ExtractWarning, PaintedPath};

/// A rendered glyph with everything needed to compute its bounding box.
#[derive(Debug, Clone)]
pub struct CharEvent {
    /// The character code from the content stream.
    pub char_code: u32,
    /// Unicode text if the font maps the code.
    pub unicode: Option<String>,
    /// Font name with any subset prefix removed.
    pub font_name: String,
    /// Font size in text space units.
    pub font_size: f64,
    /// Text matrix at the time of rendering.
    pub text_matrix: [f64; 6],
    /// CTM at the time of rendering.
    pub ctm: [f64; 6],
    /// Glyph width in 1/1000 text space units.
    pub displacement: f64,
    /// Horizontal scaling as a fraction (100% = 1.0).
    pub h_scaling: f64,
    pub rise: f64,
    /// Font ascent in 1/1000 units.
    pub ascent: f64,
    /// Font descent in 1/1000 units (negative).
    pub descent: f64,
}

/// Callback handler for content stream interpretation.
///
/// Every method has a no-op default.
pub trait ContentHandler {
    /// Called for each rendered glyph.
    fn on_char(&mut self, _event: CharEvent) {}

    /// Called when a path is stroked, filled, or both.
    fn on_path_painted(&mut self, _path: PaintedPath) {}

    /// Called for recoverable problems; interpretation continues.
    fn on_warning(&mut self, _warning: ExtractWarning) {}
}
