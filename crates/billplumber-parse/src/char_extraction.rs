//! Character bounding boxes from interpreter events.
//!
//! The text rendering matrix is `[Tfs*Th, 0, 0, Tfs, 0, Trise] × Tm × CTM`.
//! The glyph box spans its width horizontally and the font's descent to
//! ascent vertically, and is flipped to top-left origin.

use billplumber_core::{BBox, Char, Ctm, Point};

use crate::handler::CharEvent;

/// Convert a [`CharEvent`] into a [`Char`] in top-left page coordinates.
pub fn char_from_event(event: &CharEvent, page_height: f64) -> Char {
    let font_matrix = Ctm::new(
        event.font_size * event.h_scaling,
        0.0,
        0.0,
        event.font_size,
        0.0,
        event.rise,
    );
    let trm = font_matrix
        .concat(&Ctm::from_array(event.text_matrix))
        .concat(&Ctm::from_array(event.ctm));

    let width = event.displacement / 1000.0;
    let ascent = event.ascent / 1000.0;
    let descent = event.descent / 1000.0;

    let corners = [
        trm.transform_point(Point::new(0.0, descent)),
        trm.transform_point(Point::new(width, descent)),
        trm.transform_point(Point::new(width, ascent)),
        trm.transform_point(Point::new(0.0, ascent)),
    ];
    let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    let text = event.unicode.clone().unwrap_or_else(|| {
        char::from_u32(event.char_code)
            .filter(|c| !c.is_control())
            .map_or_else(|| "\u{FFFD}".to_string(), String::from)
    });

    // effective size: the vertical scale of the rendering matrix
    let size = (trm.c * trm.c + trm.d * trm.d).sqrt();

    Char {
        text,
        bbox: BBox::new(min_x, page_height - max_y, max_x, page_height - min_y),
        fontname: event.font_name.clone(),
        size,
        char_code: event.char_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_HEIGHT: f64 = 792.0;

    fn event() -> CharEvent {
        CharEvent {
            char_code: 65,
            unicode: Some("A".to_string()),
            font_name: "Helvetica".to_string(),
            font_size: 12.0,
            text_matrix: [1.0, 0.0, 0.0, 1.0, 72.0, 720.0],
            ctm: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            displacement: 667.0,
            h_scaling: 1.0,
            rise: 0.0,
            ascent: 750.0,
            descent: -250.0,
        }
    }

    fn approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 0.01,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn horizontal_text_bbox() {
        let ch = char_from_event(&event(), PAGE_HEIGHT);
        approx(ch.bbox.x0, 72.0);
        approx(ch.bbox.x1, 80.004);
        approx(ch.bbox.top, 63.0);
        approx(ch.bbox.bottom, 75.0);
        approx(ch.size, 12.0);
        assert_eq!(ch.text, "A");
        assert_eq!(ch.fontname, "Helvetica");
    }

    #[test]
    fn ctm_scales_the_box() {
        let ev = CharEvent {
            ctm: [2.0, 0.0, 0.0, 2.0, 0.0, 0.0],
            text_matrix: [1.0, 0.0, 0.0, 1.0, 10.0, 100.0],
            ..event()
        };
        let ch = char_from_event(&ev, PAGE_HEIGHT);
        approx(ch.bbox.x0, 20.0);
        approx(ch.bbox.width(), 16.008);
        approx(ch.bbox.height(), 24.0);
        approx(ch.size, 24.0);
    }

    #[test]
    fn rise_shifts_vertically() {
        let ev = CharEvent {
            rise: 5.0,
            ..event()
        };
        let ch = char_from_event(&ev, PAGE_HEIGHT);
        approx(ch.bbox.top, 58.0);
    }

    #[test]
    fn horizontal_scaling_narrows_the_box() {
        let ev = CharEvent {
            h_scaling: 0.5,
            ..event()
        };
        let ch = char_from_event(&ev, PAGE_HEIGHT);
        approx(ch.bbox.width(), 4.002);
    }

    #[test]
    fn missing_unicode_falls_back_to_code() {
        let ev = CharEvent {
            unicode: None,
            char_code: 0x42,
            ..event()
        };
        assert_eq!(char_from_event(&ev, PAGE_HEIGHT).text, "B");

        let ev = CharEvent {
            unicode: None,
            char_code: 0x01,
            ..event()
        };
        assert_eq!(char_from_event(&ev, PAGE_HEIGHT).text, "\u{FFFD}");
    }
}
