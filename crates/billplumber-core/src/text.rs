use crate::geometry::BBox;

/// A single character extracted from a PDF page.
#[derive(Debug, Clone, PartialEq)]
pub struct Char {
    /// Decoded text (usually one scalar, more for ligatures).
    pub text: String,
    /// Bounding box in top-left origin coordinates.
    pub bbox: BBox,
    pub fontname: String,
    /// Font size in points after text and CTM scaling.
    pub size: f64,
    /// Raw character code from the content stream.
    pub char_code: u32,
}

impl Char {
    pub fn is_blank(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }
}

/// Returns `true` for CJK ideographs, kana, hangul and CJK punctuation.
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{3000}'..='\u{303F}'
        | '\u{3040}'..='\u{309F}'
        | '\u{30A0}'..='\u{30FF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{FF00}'..='\u{FFEF}'
        | '\u{20000}'..='\u{2A6DF}'
    )
}

/// Returns `true` if the first character of the text is CJK.
pub fn is_cjk_text(text: &str) -> bool {
    text.chars().next().is_some_and(is_cjk)
}
