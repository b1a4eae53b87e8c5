//! Page type for accessing extracted content from a PDF page.

use billplumber_core::{
    Char, Edge, ExtractWarning, Line, RawFragment, Rect, Table, TableFinder, TableSettings,
    derive_edges,
};

/// A single page from a PDF document.
///
/// Holds the characters and ruling shapes of one page in top-left
/// coordinates. Constructed by [`Pdf::page`](crate::Pdf::page).
pub struct Page {
    /// Page index (0-based).
    page_number: usize,
    width: f64,
    height: f64,
    chars: Vec<Char>,
    lines: Vec<Line>,
    rects: Vec<Rect>,
    /// Non-fatal issues met while interpreting this page.
    warnings: Vec<ExtractWarning>,
}

impl Page {
    /// Create a page with characters only.
    pub fn new(page_number: usize, width: f64, height: f64, chars: Vec<Char>) -> Self {
        Self::with_geometry(page_number, width, height, chars, Vec::new(), Vec::new())
    }

    /// Create a page with characters and ruling geometry.
    pub fn with_geometry(
        page_number: usize,
        width: f64,
        height: f64,
        chars: Vec<Char>,
        lines: Vec<Line>,
        rects: Vec<Rect>,
    ) -> Self {
        Self {
            page_number,
            width,
            height,
            chars,
            lines,
            rects,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<ExtractWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn page_number(&self) -> usize {
        self.page_number
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn chars(&self) -> &[Char] {
        &self.chars
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn warnings(&self) -> &[ExtractWarning] {
        &self.warnings
    }

    /// Ruling edges from lines and rectangle sides.
    pub fn edges(&self) -> Vec<Edge> {
        derive_edges(&self.lines, &self.rects)
    }

    /// Detect lattice tables and fill their cells with page text.
    pub fn find_tables(&self, settings: &TableSettings) -> Vec<Table> {
        TableFinder::new(self.edges(), settings.clone()).find_tables_with_text(&self.chars)
    }

    /// The text grids of every table on the page, top to bottom.
    pub fn extract_tables(&self, settings: &TableSettings) -> Vec<RawFragment> {
        self.find_tables(settings)
            .iter()
            .map(Table::text_rows)
            .collect()
    }
}
