//! Text state for the content stream interpreter.
//!
//! Tracks the text object (`BT`/`ET`), font selection (`Tf`), the text and
//! line matrices, and the positioning operators (`Td`, `TD`, `T*`, `Tm`).

use billplumber_core::Ctm;

/// Text parameters that belong to the graphics state and follow `q`/`Q`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStateSnapshot {
    pub char_spacing: f64,
    pub word_spacing: f64,
    pub h_scaling: f64,
    pub leading: f64,
    pub font_name: String,
    pub font_size: f64,
    pub rise: f64,
}

/// Text state tracked while interpreting a content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct TextState {
    /// `Tc`: extra space after every glyph.
    pub char_spacing: f64,
    /// `Tw`: extra space after single-byte code 32.
    pub word_spacing: f64,
    /// `Tz` as a percentage (100 = normal).
    pub h_scaling: f64,
    /// `TL`
    pub leading: f64,
    pub font_name: String,
    pub font_size: f64,
    /// `Ts`
    pub rise: f64,
    in_text_object: bool,
    text_matrix: Ctm,
    line_matrix: Ctm,
}

impl Default for TextState {
    fn default() -> Self {
        Self::new()
    }
}

impl TextState {
    pub fn new() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scaling: 100.0,
            leading: 0.0,
            font_name: String::new(),
            font_size: 0.0,
            rise: 0.0,
            in_text_object: false,
            text_matrix: Ctm::identity(),
            line_matrix: Ctm::identity(),
        }
    }

    pub fn in_text_object(&self) -> bool {
        self.in_text_object
    }

    pub fn text_matrix(&self) -> &Ctm {
        &self.text_matrix
    }

    pub fn text_matrix_array(&self) -> [f64; 6] {
        let m = &self.text_matrix;
        [m.a, m.b, m.c, m.d, m.e, m.f]
    }

    /// Horizontal scaling as a fraction.
    pub fn h_scaling_normalized(&self) -> f64 {
        self.h_scaling / 100.0
    }

    /// `BT`: both matrices reset to identity.
    pub fn begin_text(&mut self) {
        self.in_text_object = true;
        self.text_matrix = Ctm::identity();
        self.line_matrix = Ctm::identity();
    }

    /// `ET`
    pub fn end_text(&mut self) {
        self.in_text_object = false;
    }

    pub fn set_font(&mut self, font_name: String, font_size: f64) {
        self.font_name = font_name;
        self.font_size = font_size;
    }

    /// `Tm`: sets both the text matrix and the line matrix.
    pub fn set_text_matrix(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        let m = Ctm::new(a, b, c, d, e, f);
        self.text_matrix = m;
        self.line_matrix = m;
    }

    /// `Td`: start a new line offset from the start of the current one.
    pub fn move_text_position(&mut self, tx: f64, ty: f64) {
        let m = Ctm::new(1.0, 0.0, 0.0, 1.0, tx, ty).concat(&self.line_matrix);
        self.text_matrix = m;
        self.line_matrix = m;
    }

    /// `TD`: like `Td`, also setting the leading to `-ty`.
    pub fn move_text_position_and_set_leading(&mut self, tx: f64, ty: f64) {
        self.leading = -ty;
        self.move_text_position(tx, ty);
    }

    /// `T*`
    pub fn move_to_next_line(&mut self) {
        self.move_text_position(0.0, -self.leading);
    }

    /// Advance the text matrix horizontally after showing a glyph.
    pub fn advance_text_position(&mut self, tx: f64) {
        self.text_matrix = Ctm::new(1.0, 0.0, 0.0, 1.0, tx, 0.0).concat(&self.text_matrix);
    }

    pub fn save_snapshot(&self) -> TextStateSnapshot {
        TextStateSnapshot {
            char_spacing: self.char_spacing,
            word_spacing: self.word_spacing,
            h_scaling: self.h_scaling,
            leading: self.leading,
            font_name: self.font_name.clone(),
            font_size: self.font_size,
            rise: self.rise,
        }
    }

    pub fn restore_snapshot(&mut self, snapshot: TextStateSnapshot) {
        self.char_spacing = snapshot.char_spacing;
        self.word_spacing = snapshot.word_spacing;
        self.h_scaling = snapshot.h_scaling;
        self.leading = snapshot.leading;
        self.font_name = snapshot.font_name;
        self.font_size = snapshot.font_size;
        self.rise = snapshot.rise;
    }
}
