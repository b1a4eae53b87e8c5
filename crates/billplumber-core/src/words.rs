use crate::geometry::BBox;
use crate::text::{Char, is_cjk_text};

/// Options for word extraction.
#[derive(Debug, Clone)]
pub struct WordOptions {
    /// Maximum horizontal gap between characters of one word.
    pub x_tolerance: f64,
    /// Maximum vertical offset between characters of one word.
    pub y_tolerance: f64,
    /// Keep whitespace characters inside words instead of splitting on them.
    pub keep_blank_chars: bool,
}

impl Default for WordOptions {
    fn default() -> Self {
        Self {
            x_tolerance: 3.0,
            y_tolerance: 3.0,
            keep_blank_chars: false,
        }
    }
}

/// A run of characters grouped by spatial proximity.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub bbox: BBox,
}

/// Groups characters into words (left-to-right, top-to-bottom text only).
pub struct WordExtractor;

impl WordExtractor {
    /// Extract words from the given characters.
    ///
    /// Characters are sorted by `top` then `x0`. A new word starts when the
    /// horizontal gap exceeds `x_tolerance` (the previous char width for CJK
    /// text, if larger) or the vertical offset exceeds `y_tolerance`.
    pub fn extract(chars: &[Char], options: &WordOptions) -> Vec<Word> {
        let mut sorted: Vec<&Char> = chars.iter().collect();
        sorted.sort_by(|a, b| {
            a.bbox
                .top
                .total_cmp(&b.bbox.top)
                .then(a.bbox.x0.total_cmp(&b.bbox.x0))
        });

        let mut words = Vec::new();
        let mut current: Vec<&Char> = Vec::new();

        for ch in sorted {
            if ch.is_blank() && !options.keep_blank_chars {
                if !current.is_empty() {
                    words.push(Self::make_word(&current));
                    current.clear();
                }
                continue;
            }

            if let Some(last) = current.last() {
                if Self::should_split(last, ch, options) {
                    words.push(Self::make_word(&current));
                    current.clear();
                }
            }
            current.push(ch);
        }

        if !current.is_empty() {
            words.push(Self::make_word(&current));
        }

        words
    }

    fn should_split(last: &Char, current: &Char, options: &WordOptions) -> bool {
        let x_gap =
            (last.bbox.x0.max(current.bbox.x0) - last.bbox.x1.min(current.bbox.x1)).max(0.0);
        let y_diff = (current.bbox.top - last.bbox.top).abs();
        let x_tol = if is_cjk_text(&last.text) || is_cjk_text(&current.text) {
            last.bbox.width().max(options.x_tolerance)
        } else {
            options.x_tolerance
        };
        x_gap > x_tol || y_diff > options.y_tolerance
    }

    fn make_word(chars: &[&Char]) -> Word {
        let text: String = chars.iter().map(|c| c.text.as_str()).collect();
        let bbox = chars[1..]
            .iter()
            .fold(chars[0].bbox, |acc, c| acc.union(&c.bbox));
        Word { text, bbox }
    }
}
