//! Content stream interpreter.
//!
//! Walks the decoded operators of a content stream, maintaining graphics and
//! text state, and reports glyphs and painted paths to a [`ContentHandler`].
//! Form XObjects are interpreted recursively through `Do`.

use std::collections::HashMap;

use billplumber_core::{
    Ctm, ExtractOptions, ExtractWarning, ExtractWarningCode, PaintOp, PathBuilder,
};
use lopdf::Object;
use lopdf::content::Content;

use crate::error::BackendError;
use crate::font::{LoadedFont, number, resolve, stream_bytes};
use crate::handler::{CharEvent, ContentHandler};
use crate::interpreter_state::InterpreterState;
use crate::text_state::TextState;

/// Interpret one content stream.
///
/// `depth` is 0 for the page itself and grows by one per nested form.
#[allow(clippy::too_many_arguments)]
pub(crate) fn interpret_content_stream(
    doc: &lopdf::Document,
    stream_bytes: &[u8],
    resources: &lopdf::Dictionary,
    handler: &mut dyn ContentHandler,
    options: &ExtractOptions,
    depth: usize,
    gstate: &mut InterpreterState,
    tstate: &mut TextState,
) -> Result<(), BackendError> {
    if depth > options.max_recursion_depth {
        return Err(BackendError::Interpreter(format!(
            "form XObject nesting depth {depth} exceeds limit {}",
            options.max_recursion_depth
        )));
    }

    let content = Content::decode(stream_bytes)
        .map_err(|e| BackendError::Interpreter(format!("malformed content stream: {e}")))?;

    let mut fonts: HashMap<String, LoadedFont> = HashMap::new();
    let mut path_builder = PathBuilder::new(*gstate.ctm());

    for op in &content.operations {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            // graphics state
            "q" => gstate.save_state_with_text(tstate.save_snapshot()),
            "Q" => {
                if let Some(snapshot) = gstate.restore_state_with_text() {
                    tstate.restore_snapshot(snapshot);
                }
                path_builder.set_ctm(*gstate.ctm());
            }
            "cm" => match numbers::<6>(operands) {
                Some([a, b, c, d, e, f]) => {
                    gstate.concat_matrix(a, b, c, d, e, f);
                    path_builder.set_ctm(*gstate.ctm());
                }
                None => malformed(handler, &op.operator),
            },
            "w" => match numbers::<1>(operands) {
                Some([w]) => gstate.set_line_width(w),
                None => malformed(handler, &op.operator),
            },

            // text state
            "BT" => tstate.begin_text(),
            "ET" => tstate.end_text(),
            "Tf" => match (operands.first().and_then(name_of), operands.get(1).and_then(number)) {
                (Some(font_name), Some(size)) => {
                    load_font_if_needed(doc, resources, &font_name, &mut fonts, handler);
                    tstate.set_font(font_name, size);
                }
                _ => malformed(handler, &op.operator),
            },
            "Tm" => match numbers::<6>(operands) {
                Some([a, b, c, d, e, f]) => tstate.set_text_matrix(a, b, c, d, e, f),
                None => malformed(handler, &op.operator),
            },
            "Td" => match numbers::<2>(operands) {
                Some([tx, ty]) => tstate.move_text_position(tx, ty),
                None => malformed(handler, &op.operator),
            },
            "TD" => match numbers::<2>(operands) {
                Some([tx, ty]) => tstate.move_text_position_and_set_leading(tx, ty),
                None => malformed(handler, &op.operator),
            },
            "T*" => tstate.move_to_next_line(),
            "Tc" => {
                if let Some([v]) = numbers::<1>(operands) {
                    tstate.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some([v]) = numbers::<1>(operands) {
                    tstate.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some([v]) = numbers::<1>(operands) {
                    tstate.h_scaling = v;
                }
            }
            "TL" => {
                if let Some([v]) = numbers::<1>(operands) {
                    tstate.leading = v;
                }
            }
            "Ts" => {
                if let Some([v]) = numbers::<1>(operands) {
                    tstate.rise = v;
                }
            }

            // text showing
            "Tj" => {
                if let Some(bytes) = operands.first().and_then(string_bytes) {
                    show_string(bytes, tstate, gstate, &fonts, handler);
                }
            }
            "'" => {
                tstate.move_to_next_line();
                if let Some(bytes) = operands.first().and_then(string_bytes) {
                    show_string(bytes, tstate, gstate, &fonts, handler);
                }
            }
            "\"" => match (numbers::<2>(operands), operands.get(2).and_then(string_bytes)) {
                (Some([aw, ac]), Some(bytes)) => {
                    tstate.word_spacing = aw;
                    tstate.char_spacing = ac;
                    tstate.move_to_next_line();
                    show_string(bytes, tstate, gstate, &fonts, handler);
                }
                _ => malformed(handler, &op.operator),
            },
            "TJ" => match operands.first().map(Object::as_array) {
                Some(Ok(items)) => show_positioned(items, tstate, gstate, &fonts, handler),
                _ => malformed(handler, &op.operator),
            },

            // XObjects
            "Do" => {
                if let Some(name) = operands.first().and_then(name_of) {
                    handle_do(doc, resources, handler, options, depth, gstate, tstate, &name)?;
                }
            }

            // path construction
            "m" => {
                if let Some([x, y]) = numbers::<2>(operands) {
                    path_builder.move_to(x, y);
                }
            }
            "l" => {
                if let Some([x, y]) = numbers::<2>(operands) {
                    path_builder.line_to(x, y);
                }
            }
            "c" => {
                if let Some([_, _, _, _, x3, y3]) = numbers::<6>(operands) {
                    path_builder.curve_to(x3, y3);
                }
            }
            "v" | "y" => {
                if let Some([_, _, x3, y3]) = numbers::<4>(operands) {
                    path_builder.curve_to(x3, y3);
                }
            }
            "re" => match numbers::<4>(operands) {
                Some([x, y, w, h]) => path_builder.rectangle(x, y, w, h),
                None => malformed(handler, &op.operator),
            },
            "h" => path_builder.close_path(),

            // path painting
            "S" => paint(&mut path_builder, PaintOp::Stroke, gstate, handler),
            "s" => {
                path_builder.close_path();
                paint(&mut path_builder, PaintOp::Stroke, gstate, handler);
            }
            "f" | "F" | "f*" => paint(&mut path_builder, PaintOp::Fill, gstate, handler),
            "B" | "B*" => paint(&mut path_builder, PaintOp::FillStroke, gstate, handler),
            "b" | "b*" => {
                path_builder.close_path();
                paint(&mut path_builder, PaintOp::FillStroke, gstate, handler);
            }
            "n" => path_builder.end_path(),

            // clipping, color, marked content and everything else do not
            // affect ruling lines or glyph positions
            _ => {}
        }
    }

    Ok(())
}

/// The first `N` operands as numbers, or `None` if any is missing or mistyped.
fn numbers<const N: usize>(operands: &[Object]) -> Option<[f64; N]> {
    if operands.len() < N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, operand) in out.iter_mut().zip(operands) {
        *slot = number(operand)?;
    }
    Some(out)
}

fn name_of(obj: &Object) -> Option<String> {
    obj.as_name()
        .ok()
        .map(|n| String::from_utf8_lossy(n).into_owned())
}

fn string_bytes(obj: &Object) -> Option<&[u8]> {
    obj.as_str().ok()
}

fn malformed(handler: &mut dyn ContentHandler, operator: &str) {
    handler.on_warning(ExtractWarning::new(
        ExtractWarningCode::MalformedOperator,
        format!("operator '{operator}' has missing or mistyped operands"),
    ));
}

fn paint(
    builder: &mut PathBuilder,
    op: PaintOp,
    gstate: &InterpreterState,
    handler: &mut dyn ContentHandler,
) {
    let painted = builder.paint(op, gstate.line_width());
    if !painted.path.segments.is_empty() {
        handler.on_path_painted(painted);
    }
}

fn load_font_if_needed(
    doc: &lopdf::Document,
    resources: &lopdf::Dictionary,
    font_name: &str,
    fonts: &mut HashMap<String, LoadedFont>,
    handler: &mut dyn ContentHandler,
) {
    if fonts.contains_key(font_name) {
        return;
    }

    let font_dict = resources
        .get(b"Font")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
        .and_then(|fonts| fonts.get(font_name.as_bytes()).ok())
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok());

    let font = match font_dict {
        Some(dict) => LoadedFont::load(doc, dict),
        None => {
            handler.on_warning(
                ExtractWarning::new(
                    ExtractWarningCode::MissingFont,
                    format!("font resource '{font_name}' not found"),
                )
                .with_font(font_name),
            );
            LoadedFont::fallback(font_name)
        }
    };
    fonts.insert(font_name.to_string(), font);
}

fn show_string(
    bytes: &[u8],
    tstate: &mut TextState,
    gstate: &InterpreterState,
    fonts: &HashMap<String, LoadedFont>,
    handler: &mut dyn ContentHandler,
) {
    let fallback;
    let font = match fonts.get(&tstate.font_name) {
        Some(font) => font,
        None => {
            fallback = LoadedFont::fallback(&tstate.font_name);
            &fallback
        }
    };

    let font_size = tstate.font_size;
    let h_scaling = tstate.h_scaling_normalized();

    for glyph in font.decode(bytes) {
        handler.on_char(CharEvent {
            char_code: glyph.code,
            unicode: glyph.unicode,
            font_name: font.base_name.clone(),
            font_size,
            text_matrix: tstate.text_matrix_array(),
            ctm: gstate.ctm_array(),
            displacement: glyph.width,
            h_scaling,
            rise: tstate.rise,
            ascent: font.ascent,
            descent: font.descent,
        });

        let mut tx = glyph.width / 1000.0 * font_size + tstate.char_spacing;
        if glyph.is_word_space {
            tx += tstate.word_spacing;
        }
        tstate.advance_text_position(tx * h_scaling);
    }
}

/// `TJ`: strings are shown, numbers move the position back by n/1000 em.
fn show_positioned(
    items: &[Object],
    tstate: &mut TextState,
    gstate: &InterpreterState,
    fonts: &HashMap<String, LoadedFont>,
    handler: &mut dyn ContentHandler,
) {
    for item in items {
        if let Some(bytes) = string_bytes(item) {
            show_string(bytes, tstate, gstate, fonts, handler);
        } else if let Some(adjust) = number(item) {
            let tx = -adjust / 1000.0 * tstate.font_size * tstate.h_scaling_normalized();
            tstate.advance_text_position(tx);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_do(
    doc: &lopdf::Document,
    resources: &lopdf::Dictionary,
    handler: &mut dyn ContentHandler,
    options: &ExtractOptions,
    depth: usize,
    gstate: &InterpreterState,
    tstate: &TextState,
    name: &str,
) -> Result<(), BackendError> {
    let Some(stream) = resources
        .get(b"XObject")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
        .and_then(|xobjects| xobjects.get(name.as_bytes()).ok())
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_stream().ok())
    else {
        handler.on_warning(ExtractWarning::new(
            ExtractWarningCode::MalformedObject,
            format!("XObject '{name}' not found"),
        ));
        return Ok(());
    };

    let is_form = stream
        .dict
        .get(b"Subtype")
        .and_then(Object::as_name)
        .is_ok_and(|s| s == b"Form");
    if !is_form {
        return Ok(());
    }

    let matrix = stream
        .dict
        .get(b"Matrix")
        .ok()
        .and_then(|o| o.as_array().ok())
        .and_then(|arr| numbers::<6>(arr))
        .map_or_else(Ctm::identity, Ctm::from_array);

    let form_resources = stream
        .dict
        .get(b"Resources")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
        .unwrap_or(resources);

    let Some(bytes) = stream_bytes(stream) else {
        handler.on_warning(ExtractWarning::new(
            ExtractWarningCode::MalformedObject,
            format!("XObject '{name}' stream could not be decoded"),
        ));
        return Ok(());
    };
    if bytes.len() > options.max_stream_bytes {
        return Err(BackendError::Interpreter(format!(
            "XObject '{name}' content of {} bytes exceeds limit {}",
            bytes.len(),
            options.max_stream_bytes
        )));
    }

    let mut form_gstate = InterpreterState::with_ctm(matrix.concat(gstate.ctm()));
    form_gstate.set_line_width(gstate.line_width());
    let mut form_tstate = tstate.clone();
    interpret_content_stream(
        doc,
        &bytes,
        form_resources,
        handler,
        options,
        depth + 1,
        &mut form_gstate,
        &mut form_tstate,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use billplumber_core::{PaintedPath, PathSegment, Point};
    use lopdf::{Stream, dictionary};

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

    fn run(doc: &lopdf::Document, content: &[u8], resources: &lopdf::Dictionary) -> CollectingHandler {
        let mut handler = CollectingHandler::default();
        interpret_content_stream(
            doc,
            content,
            resources,
            &mut handler,
            &ExtractOptions::default(),
            0,
            &mut InterpreterState::new(),
            &mut TextState::new(),
        )
        .unwrap();
        handler
    }

    fn helvetica_resources(doc: &mut lopdf::Document) -> lopdf::Dictionary {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        dictionary! { "Font" => dictionary! { "F1" => font_id } }
    }

    #[test]
    fn simple_text_advances_by_width() {
        let mut doc = lopdf::Document::with_version("1.5");
        let resources = helvetica_resources(&mut doc);
        let handler = run(&doc, b"BT /F1 10 Tf 100 700 Td (AB) Tj ET", &resources);

        assert_eq!(handler.chars.len(), 2);
        assert_eq!(handler.chars[0].unicode.as_deref(), Some("A"));
        assert_eq!(handler.chars[0].text_matrix[4], 100.0);
        assert_eq!(handler.chars[1].text_matrix[4], 105.0);
        assert_eq!(handler.chars[1].text_matrix[5], 700.0);
        assert_eq!(handler.chars[0].font_name, "Helvetica");
        assert!(handler.warnings.is_empty());
    }

    #[test]
    fn tj_array_applies_kerning() {
        let mut doc = lopdf::Document::with_version("1.5");
        let resources = helvetica_resources(&mut doc);
        let handler = run(&doc, b"BT /F1 10 Tf 0 0 Td [(A) -1000 (B)] TJ ET", &resources);
        assert_eq!(handler.chars.len(), 2);
        // 5 for the glyph plus 10 from the -1000 adjustment
        assert_eq!(handler.chars[1].text_matrix[4], 15.0);
    }

    #[test]
    fn word_and_char_spacing() {
        let mut doc = lopdf::Document::with_version("1.5");
        let resources = helvetica_resources(&mut doc);
        let handler = run(&doc, b"BT /F1 10 Tf 2 Tw 1 Tc ( A) Tj ET", &resources);
        // space: 5 + 1 (Tc) + 2 (Tw)
        assert_eq!(handler.chars[1].text_matrix[4], 8.0);
    }

    #[test]
    fn ctm_reaches_char_events_and_paths() {
        let doc = lopdf::Document::with_version("1.5");
        let handler = run(
            &doc,
            b"q 1 0 0 1 10 20 cm 0 0 m 100 0 l S Q 0 0 m 5 0 l S",
            &lopdf::Dictionary::new(),
        );
        assert_eq!(handler.paths.len(), 2);
        assert_eq!(
            handler.paths[0].path.segments[0],
            PathSegment::MoveTo(Point::new(10.0, 20.0))
        );
        assert_eq!(
            handler.paths[1].path.segments[0],
            PathSegment::MoveTo(Point::new(0.0, 0.0))
        );
    }

    #[test]
    fn rectangle_fill_and_line_width() {
        let doc = lopdf::Document::with_version("1.5");
        let handler = run(&doc, b"0.5 w 10 10 100 50 re f 1 w 0 0 m n", &lopdf::Dictionary::new());
        assert_eq!(handler.paths.len(), 1);
        let painted = &handler.paths[0];
        assert!(painted.fill);
        assert!(!painted.stroke);
        assert_eq!(painted.line_width, 0.5);
        assert_eq!(painted.path.segments.len(), 5);
    }

    #[test]
    fn missing_font_warns_and_still_emits_chars() {
        let doc = lopdf::Document::with_version("1.5");
        let handler = run(&doc, b"BT /F9 12 Tf (x) Tj ET", &lopdf::Dictionary::new());
        assert_eq!(handler.chars.len(), 1);
        assert_eq!(handler.warnings.len(), 1);
        assert_eq!(handler.warnings[0].code, ExtractWarningCode::MissingFont);
        assert_eq!(handler.warnings[0].font_name.as_deref(), Some("F9"));
    }

    #[test]
    fn malformed_operator_warns() {
        let doc = lopdf::Document::with_version("1.5");
        let handler = run(&doc, b"1 0 cm 0 0 m 1 1 l S", &lopdf::Dictionary::new());
        assert_eq!(handler.warnings.len(), 1);
        assert_eq!(handler.warnings[0].code, ExtractWarningCode::MalformedOperator);
        assert_eq!(handler.paths.len(), 1);
    }

    #[test]
    fn form_xobject_is_interpreted_with_its_matrix() {
        let mut doc = lopdf::Document::with_version("1.5");
        let form = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 200.into(), 200.into()],
                "Matrix" => vec![1.into(), 0.into(), 0.into(), 1.into(), 50.into(), 60.into()],
            },
            b"0 0 m 10 0 l S".to_vec(),
        );
        let form_id = doc.add_object(form);
        let resources = dictionary! { "XObject" => dictionary! { "Fm1" => form_id } };

        let handler = run(&doc, b"/Fm1 Do", &resources);
        assert_eq!(handler.paths.len(), 1);
        assert_eq!(
            handler.paths[0].path.segments[0],
            PathSegment::MoveTo(Point::new(50.0, 60.0))
        );
    }

    #[test]
    fn recursion_limit_is_enforced() {
        let mut doc = lopdf::Document::with_version("1.5");
        let form_id = doc.new_object_id();
        let form = Stream::new(
            dictionary! {
                "Subtype" => "Form",
                "Resources" => dictionary! { "XObject" => dictionary! { "Fm1" => form_id } },
            },
            b"/Fm1 Do".to_vec(),
        );
        doc.objects.insert(form_id, Object::Stream(form));
        let resources = dictionary! { "XObject" => dictionary! { "Fm1" => form_id } };

        let mut handler = CollectingHandler::default();
        let result = interpret_content_stream(
            &doc,
            b"/Fm1 Do",
            &resources,
            &mut handler,
            &ExtractOptions::default(),
            0,
            &mut InterpreterState::new(),
            &mut TextState::new(),
        );
        assert!(matches!(result, Err(BackendError::Interpreter(_))));
    }
}
