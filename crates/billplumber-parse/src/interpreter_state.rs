//! Graphics state stack for the content stream interpreter.
//!
//! Only the parts that affect geometry are tracked: the CTM and the line
//! width. `q` pushes a copy (together with the text parameters), `Q` pops it.

use billplumber_core::Ctm;

use crate::text_state::TextStateSnapshot;

#[derive(Debug, Clone)]
struct SavedState {
    ctm: Ctm,
    line_width: f64,
    text: Option<TextStateSnapshot>,
}

/// Interpreter-level graphics state.
#[derive(Debug, Clone)]
pub struct InterpreterState {
    ctm: Ctm,
    line_width: f64,
    stack: Vec<SavedState>,
}

impl Default for InterpreterState {
    fn default() -> Self {
        Self::new()
    }
}

impl InterpreterState {
    pub fn new() -> Self {
        Self::with_ctm(Ctm::identity())
    }

    /// State for a nested form XObject, starting from the caller's CTM.
    pub fn with_ctm(ctm: Ctm) -> Self {
        Self {
            ctm,
            line_width: 1.0,
            stack: Vec::new(),
        }
    }

    pub fn ctm(&self) -> &Ctm {
        &self.ctm
    }

    pub fn ctm_array(&self) -> [f64; 6] {
        let m = &self.ctm;
        [m.a, m.b, m.c, m.d, m.e, m.f]
    }

    pub fn line_width(&self) -> f64 {
        self.line_width
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// `q`
    pub fn save_state_with_text(&mut self, text: TextStateSnapshot) {
        self.stack.push(SavedState {
            ctm: self.ctm,
            line_width: self.line_width,
            text: Some(text),
        });
    }

    /// `Q`: returns the saved text parameters, or `None` on an unbalanced `Q`.
    pub fn restore_state_with_text(&mut self) -> Option<TextStateSnapshot> {
        let saved = self.stack.pop()?;
        self.ctm = saved.ctm;
        self.line_width = saved.line_width;
        saved.text
    }

    /// `cm`: CTM' = matrix × CTM.
    pub fn concat_matrix(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
        self.ctm = Ctm::new(a, b, c, d, e, f).concat(&self.ctm);
    }

    /// `w`
    pub fn set_line_width(&mut self, width: f64) {
        self.line_width = width;
    }
}
