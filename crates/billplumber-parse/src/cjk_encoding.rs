//! Legacy CJK encodings for predefined CMaps.
//!
//! Fonts using predefined CMaps such as `GBK-EUC-H` or `ETen-B5-H` encode
//! text as 1- or 2-byte sequences of the matching legacy code page; these
//! are decoded with `encoding_rs`.

use encoding_rs::Encoding;

/// One decoded character from a CJK byte string.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedChar {
    /// The raw code (1 or 2 bytes combined big-endian).
    pub char_code: u32,
    pub unicode: String,
    /// Bytes consumed from the input.
    pub byte_len: usize,
}

/// The legacy encoding behind a predefined CMap name, if any.
///
/// `Identity-H`/`Identity-V` and unknown names return `None`.
pub fn encoding_for_cmap(cmap_name: &str) -> Option<&'static Encoding> {
    let base = cmap_name
        .strip_suffix("-H")
        .or_else(|| cmap_name.strip_suffix("-V"))
        .unwrap_or(cmap_name);

    match base {
        "GBK-EUC" | "GBKp-EUC" | "GBK2K" | "GB-EUC" | "GBpc-EUC" => Some(encoding_rs::GBK),
        "B5pc" | "ETen-B5" | "HKscs-B5" | "ETenms-B5" => Some(encoding_rs::BIG5),
        "90ms-RKSJ" | "90pv-RKSJ" | "83pv-RKSJ" | "78-RKSJ" | "Add-RKSJ" | "Ext-RKSJ" => {
            Some(encoding_rs::SHIFT_JIS)
        }
        "EUC" | "78-EUC" => Some(encoding_rs::EUC_JP),
        "KSC-EUC" | "KSCms-UHC" | "KSCpc-EUC" => Some(encoding_rs::EUC_KR),
        _ => None,
    }
}

fn is_lead_byte(byte: u8, encoding: &'static Encoding) -> bool {
    if encoding == encoding_rs::SHIFT_JIS {
        (0x81..=0x9F).contains(&byte) || (0xE0..=0xFC).contains(&byte)
    } else if encoding == encoding_rs::EUC_JP {
        (0xA1..=0xFE).contains(&byte) || byte == 0x8E
    } else {
        (0x81..=0xFE).contains(&byte)
    }
}

/// Split a byte string into characters and decode each one.
pub fn decode_cjk_string(bytes: &[u8], encoding: &'static Encoding) -> Vec<DecodedChar> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let byte_len = if is_lead_byte(bytes[i], encoding) && i + 1 < bytes.len() {
            2
        } else {
            1
        };
        let raw = &bytes[i..i + byte_len];
        let char_code = raw.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
        let (decoded, _, _) = encoding.decode(raw);
        out.push(DecodedChar {
            char_code,
            unicode: decoded.into_owned(),
            byte_len,
        });
        i += byte_len;
    }
    out
}
