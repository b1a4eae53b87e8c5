//! Font loading: widths, vertical metrics and text decoding.
//!
//! Simple fonts (Type1, TrueType, Type3) use one byte per code and the
//! `/Widths` array. Composite (Type0) fonts use two bytes per code with the
//! descendant's `/W` and `/DW`, or a legacy CJK code page when the encoding
//! names a predefined CMap. `/ToUnicode` wins over every other mapping.

use std::collections::HashMap;

use encoding_rs::Encoding;

use crate::cjk_encoding;
use crate::cmap::CMap;

/// Width used for simple-font codes with no `/Widths` entry.
pub const DEFAULT_SIMPLE_WIDTH: f64 = 500.0;
/// `/DW` default for CID fonts.
pub const DEFAULT_CID_WIDTH: f64 = 1000.0;

const DEFAULT_ASCENT: f64 = 750.0;
const DEFAULT_DESCENT: f64 = -250.0;

#[derive(Debug, Clone)]
enum Widths {
    Simple { first_char: u32, widths: Vec<f64> },
    Cid { widths: HashMap<u32, f64> },
}

#[derive(Debug, Clone, Copy)]
enum CodeLayout {
    SingleByte(Option<&'static Encoding>),
    TwoByte,
    Legacy(&'static Encoding),
}

/// One glyph decoded from a shown string.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub code: u32,
    pub unicode: Option<String>,
    /// Width in 1/1000 text space units.
    pub width: f64,
    /// Single-byte code 32, which also receives word spacing.
    pub is_word_space: bool,
}

/// A font resource resolved for interpretation.
#[derive(Debug, Clone)]
pub struct LoadedFont {
    pub base_name: String,
    pub ascent: f64,
    pub descent: f64,
    widths: Widths,
    missing_width: f64,
    layout: CodeLayout,
    to_unicode: Option<CMap>,
}

impl LoadedFont {
    /// Stand-in for a font that could not be resolved.
    pub fn fallback(name: &str) -> Self {
        Self {
            base_name: name.to_string(),
            ascent: DEFAULT_ASCENT,
            descent: DEFAULT_DESCENT,
            widths: Widths::Simple {
                first_char: 0,
                widths: Vec::new(),
            },
            missing_width: DEFAULT_SIMPLE_WIDTH,
            layout: CodeLayout::SingleByte(None),
            to_unicode: None,
        }
    }

    /// Resolve a font dictionary.
    pub fn load(doc: &lopdf::Document, font_dict: &lopdf::Dictionary) -> Self {
        let base_name = font_dict
            .get(b"BaseFont")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| strip_subset_prefix(&String::from_utf8_lossy(n)).to_string())
            .unwrap_or_default();

        let to_unicode = font_dict
            .get(b"ToUnicode")
            .ok()
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_stream().ok())
            .and_then(stream_bytes)
            .and_then(|bytes| CMap::parse(&bytes).ok());

        let is_type0 = font_dict
            .get(b"Subtype")
            .and_then(|o| o.as_name())
            .is_ok_and(|n| n == b"Type0");

        let mut font = if is_type0 {
            load_composite(doc, font_dict, base_name)
        } else {
            load_simple(doc, font_dict, base_name)
        };
        font.to_unicode = to_unicode;
        font
    }

    fn width(&self, code: u32) -> f64 {
        match &self.widths {
            Widths::Simple { first_char, widths } => code
                .checked_sub(*first_char)
                .and_then(|i| widths.get(i as usize))
                .copied()
                .unwrap_or(self.missing_width),
            Widths::Cid { widths } => widths.get(&code).copied().unwrap_or(self.missing_width),
        }
    }

    fn unicode_for(&self, code: u32, fallback: Option<String>) -> Option<String> {
        self.to_unicode
            .as_ref()
            .and_then(|cmap| cmap.lookup(code))
            .map(str::to_string)
            .or(fallback)
    }

    /// Split a shown string into glyphs.
    pub fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        match self.layout {
            CodeLayout::SingleByte(encoding) => bytes
                .iter()
                .map(|&b| {
                    let code = u32::from(b);
                    let fallback = match encoding {
                        Some(enc) if b >= 0x80 => Some(enc.decode(&[b]).0.into_owned()),
                        _ => char::from_u32(code).map(String::from),
                    };
                    Glyph {
                        code,
                        unicode: self.unicode_for(code, fallback),
                        width: self.width(code),
                        is_word_space: b == b' ',
                    }
                })
                .collect(),
            CodeLayout::TwoByte => bytes
                .chunks(2)
                .map(|pair| {
                    let code = pair.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
                    Glyph {
                        code,
                        unicode: self.unicode_for(code, None),
                        width: self.width(code),
                        is_word_space: false,
                    }
                })
                .collect(),
            CodeLayout::Legacy(encoding) => cjk_encoding::decode_cjk_string(bytes, encoding)
                .into_iter()
                .map(|c| Glyph {
                    code: c.char_code,
                    unicode: self.unicode_for(c.char_code, Some(c.unicode)),
                    width: if c.byte_len == 1 {
                        self.missing_width / 2.0
                    } else {
                        self.missing_width
                    },
                    is_word_space: c.byte_len == 1 && c.char_code == 32,
                })
                .collect(),
        }
    }
}

fn load_simple(doc: &lopdf::Document, font_dict: &lopdf::Dictionary, base_name: String) -> LoadedFont {
    let first_char = font_dict
        .get(b"FirstChar")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(0)
        .max(0) as u32;

    let widths = font_dict
        .get(b"Widths")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .map(|arr| {
            arr.iter()
                .map(|o| number(resolve(doc, o)).unwrap_or(0.0))
                .collect()
        })
        .unwrap_or_default();

    let descriptor = descriptor(doc, font_dict);
    let encoding = font_dict
        .get(b"Encoding")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| match o {
            lopdf::Object::Name(name) => Some(name.as_slice()),
            lopdf::Object::Dictionary(d) => d.get(b"BaseEncoding").and_then(|b| b.as_name()).ok(),
            _ => None,
        })
        .and_then(|name| match name {
            b"WinAnsiEncoding" => Some(encoding_rs::WINDOWS_1252),
            b"MacRomanEncoding" => Some(encoding_rs::MACINTOSH),
            _ => None,
        });

    LoadedFont {
        base_name,
        ascent: descriptor.ascent,
        descent: descriptor.descent,
        widths: Widths::Simple { first_char, widths },
        missing_width: descriptor.missing_width.unwrap_or(DEFAULT_SIMPLE_WIDTH),
        layout: CodeLayout::SingleByte(encoding),
        to_unicode: None,
    }
}

fn load_composite(
    doc: &lopdf::Document,
    font_dict: &lopdf::Dictionary,
    base_name: String,
) -> LoadedFont {
    let descendant = font_dict
        .get(b"DescendantFonts")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .and_then(|arr| arr.first())
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok());

    let widths = descendant
        .and_then(|d| d.get(b"W").ok())
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .map(|arr| parse_w_array(doc, arr))
        .unwrap_or_default();

    let default_width = descendant
        .and_then(|d| d.get(b"DW").ok())
        .and_then(|o| number(resolve(doc, o)))
        .unwrap_or(DEFAULT_CID_WIDTH);

    let descriptor = descendant.map(|d| descriptor(doc, d)).unwrap_or_default();

    let layout = font_dict
        .get(b"Encoding")
        .ok()
        .and_then(|o| o.as_name().ok())
        .and_then(|n| cjk_encoding::encoding_for_cmap(&String::from_utf8_lossy(n)))
        .map_or(CodeLayout::TwoByte, CodeLayout::Legacy);

    LoadedFont {
        base_name,
        ascent: descriptor.ascent,
        descent: descriptor.descent,
        widths: Widths::Cid { widths },
        missing_width: default_width,
        layout,
        to_unicode: None,
    }
}

/// Parse a CID `/W` array: `c [w1 w2 ...]` and `c_first c_last w` entries.
pub fn parse_w_array(doc: &lopdf::Document, objects: &[lopdf::Object]) -> HashMap<u32, f64> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < objects.len() {
        let Some(start) = number(resolve(doc, &objects[i])).map(|v| v as u32) else {
            i += 1;
            continue;
        };
        let Some(next) = objects.get(i + 1).map(|o| resolve(doc, o)) else {
            break;
        };

        if let Ok(arr) = next.as_array() {
            for (offset, w) in arr.iter().enumerate() {
                if let Some(w) = number(resolve(doc, w)) {
                    widths.insert(start + offset as u32, w);
                }
            }
            i += 2;
        } else if let Some(end) = number(next).map(|v| v as u32) {
            if let Some(w) = objects.get(i + 2).and_then(|o| number(resolve(doc, o))) {
                for cid in start..=end {
                    widths.insert(cid, w);
                }
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    widths
}

#[derive(Debug, Clone, Copy)]
struct Descriptor {
    ascent: f64,
    descent: f64,
    missing_width: Option<f64>,
}

impl Default for Descriptor {
    fn default() -> Self {
        Self {
            ascent: DEFAULT_ASCENT,
            descent: DEFAULT_DESCENT,
            missing_width: None,
        }
    }
}

fn descriptor(doc: &lopdf::Document, font_dict: &lopdf::Dictionary) -> Descriptor {
    let Some(desc) = font_dict
        .get(b"FontDescriptor")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
    else {
        return Descriptor::default();
    };

    let get = |key: &[u8]| desc.get(key).ok().and_then(|o| number(resolve(doc, o)));
    let defaults = Descriptor::default();
    Descriptor {
        ascent: get(b"Ascent").filter(|a| *a != 0.0).unwrap_or(defaults.ascent),
        descent: get(b"Descent").filter(|d| *d != 0.0).unwrap_or(defaults.descent),
        missing_width: get(b"MissingWidth"),
    }
}

/// `ABCDEF+SimSun` → `SimSun`.
pub fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((prefix, rest))
            if prefix.len() == 6 && prefix.bytes().all(|b| b.is_ascii_uppercase()) =>
        {
            rest
        }
        _ => name,
    }
}

pub(crate) fn resolve<'a>(doc: &'a lopdf::Document, obj: &'a lopdf::Object) -> &'a lopdf::Object {
    match obj {
        lopdf::Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

pub(crate) fn number(obj: &lopdf::Object) -> Option<f64> {
    obj.as_float().ok().map(f64::from)
}

/// Stream content with filters applied; unfiltered streams are returned as-is.
pub(crate) fn stream_bytes(stream: &lopdf::Stream) -> Option<Vec<u8>> {
    if stream.dict.get(b"Filter").is_ok() {
        stream.decompressed_content().ok()
    } else {
        Some(stream.content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Document, Object, Stream, dictionary};

    #[test]
    fn subset_prefix_is_stripped() {
        assert_eq!(strip_subset_prefix("ABCDEF+SimSun"), "SimSun");
        assert_eq!(strip_subset_prefix("SimSun"), "SimSun");
        assert_eq!(strip_subset_prefix("abc+Font"), "abc+Font");
    }

    #[test]
    fn simple_font_widths_and_text() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "FirstChar" => 65,
            "Widths" => vec![Object::Integer(667), Object::Integer(600)],
        };
        let loaded = LoadedFont::load(&doc, &font);
        assert_eq!(loaded.base_name, "Helvetica");

        let glyphs = loaded.decode(b"AB C");
        assert_eq!(glyphs.len(), 4);
        assert_eq!(glyphs[0].unicode.as_deref(), Some("A"));
        assert_eq!(glyphs[0].width, 667.0);
        assert_eq!(glyphs[1].width, 600.0);
        assert!(glyphs[2].is_word_space);
        assert_eq!(glyphs[2].width, DEFAULT_SIMPLE_WIDTH);
    }

    #[test]
    fn win_ansi_high_bytes() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Subtype" => "TrueType",
            "BaseFont" => "Arial",
            "Encoding" => "WinAnsiEncoding",
        };
        let glyphs = LoadedFont::load(&doc, &font).decode(&[0xA5]);
        assert_eq!(glyphs[0].unicode.as_deref(), Some("¥"));
    }

    #[test]
    fn type0_identity_uses_two_byte_codes_and_to_unicode() {
        let mut doc = Document::with_version("1.5");
        let cmap = b"beginbfchar\n<0001> <4EA4>\n<0002> <6613>\nendbfchar".to_vec();
        let cmap_id = doc.add_object(Stream::new(dictionary! {}, cmap));
        let cid_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => "SimSun",
            "DW" => 1000,
            "W" => vec![Object::Integer(1), Object::Array(vec![Object::Integer(900)])],
        });
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "ABCDEF+SimSun",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font_id)],
            "ToUnicode" => cmap_id,
        };
        let loaded = LoadedFont::load(&doc, &font);
        assert_eq!(loaded.base_name, "SimSun");

        let glyphs = loaded.decode(&[0x00, 0x01, 0x00, 0x02]);
        assert_eq!(glyphs.len(), 2);
        assert_eq!(glyphs[0].code, 1);
        assert_eq!(glyphs[0].unicode.as_deref(), Some("交"));
        assert_eq!(glyphs[0].width, 900.0);
        assert_eq!(glyphs[1].unicode.as_deref(), Some("易"));
        assert_eq!(glyphs[1].width, 1000.0);
    }

    #[test]
    fn type0_with_gbk_cmap() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Subtype" => "Type0",
            "BaseFont" => "SimHei",
            "Encoding" => "GBK-EUC-H",
        };
        let glyphs = LoadedFont::load(&doc, &font).decode(&[0xBD, 0xBB, 0x31]);
        assert_eq!(glyphs.len(), 2);
        assert_eq!(glyphs[0].unicode.as_deref(), Some("交"));
        assert_eq!(glyphs[0].width, DEFAULT_CID_WIDTH);
        assert_eq!(glyphs[1].unicode.as_deref(), Some("1"));
        assert_eq!(glyphs[1].width, DEFAULT_CID_WIDTH / 2.0);
    }

    #[test]
    fn w_array_both_forms() {
        let doc = Document::with_version("1.5");
        let objects = vec![
            Object::Integer(1),
            Object::Array(vec![Object::Integer(250), Object::Real(300.5)]),
            Object::Integer(10),
            Object::Integer(12),
            Object::Integer(500),
        ];
        let widths = parse_w_array(&doc, &objects);
        assert_eq!(widths.get(&1), Some(&250.0));
        assert!((widths[&2] - 300.5).abs() < 1e-3);
        assert_eq!(widths.get(&11), Some(&500.0));
        assert_eq!(widths.get(&13), None);
    }

    #[test]
    fn descriptor_metrics() {
        let mut doc = Document::with_version("1.5");
        let desc_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "Ascent" => 859,
            "Descent" => -140,
            "MissingWidth" => 333,
        });
        let font = dictionary! {
            "Subtype" => "TrueType",
            "BaseFont" => "SimSun",
            "FontDescriptor" => desc_id,
        };
        let loaded = LoadedFont::load(&doc, &font);
        assert_eq!(loaded.ascent, 859.0);
        assert_eq!(loaded.descent, -140.0);
        assert_eq!(loaded.decode(b"x")[0].width, 333.0);
    }

    #[test]
    fn fallback_font() {
        let font = LoadedFont::fallback("F9");
        let glyphs = font.decode(b"1");
        assert_eq!(glyphs[0].unicode.as_deref(), Some("1"));
        assert_eq!(glyphs[0].width, DEFAULT_SIMPLE_WIDTH);
    }
}
