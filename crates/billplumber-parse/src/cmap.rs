//! ToUnicode CMap parsing.
//!
//! Reads the `bfchar` and `bfrange` sections of an embedded `/ToUnicode`
//! stream. Destinations are UTF-16BE hex strings; ranges may use either a
//! start value or an explicit array of destinations.

use std::collections::HashMap;

use crate::error::BackendError;

/// Character code to Unicode mapping from a ToUnicode stream.
#[derive(Debug, Clone, Default)]
pub struct CMap {
    mappings: HashMap<u32, String>,
}

/// A lexical token inside a CMap section.
#[derive(Debug, PartialEq)]
enum Token<'a> {
    Hex(&'a str),
    ArrayStart,
    ArrayEnd,
}

impl CMap {
    pub fn parse(data: &[u8]) -> Result<Self, BackendError> {
        let text = String::from_utf8_lossy(data);
        let mut mappings = HashMap::new();

        for section in sections(&text, "beginbfchar", "endbfchar") {
            let tokens = tokenize(section);
            for pair in tokens.chunks(2) {
                if let [Token::Hex(src), Token::Hex(dst)] = pair {
                    mappings.insert(parse_code(src)?, decode_utf16be(dst)?);
                }
            }
        }

        for section in sections(&text, "beginbfrange", "endbfrange") {
            parse_bfrange(&tokenize(section), &mut mappings)?;
        }

        Ok(CMap { mappings })
    }

    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.mappings.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Bodies of every `begin ... end` section, in order.
fn sections<'a>(text: &'a str, begin: &str, end: &str) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(begin) {
        let body = &rest[start + begin.len()..];
        let Some(stop) = body.find(end) else {
            break;
        };
        out.push(&body[..stop]);
        rest = &body[stop + end.len()..];
    }
    out
}

fn tokenize(section: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = section;
    while let Some(pos) = rest.find(['<', '[', ']']) {
        match rest.as_bytes()[pos] {
            b'[' => {
                tokens.push(Token::ArrayStart);
                rest = &rest[pos + 1..];
            }
            b']' => {
                tokens.push(Token::ArrayEnd);
                rest = &rest[pos + 1..];
            }
            _ => {
                let after = &rest[pos + 1..];
                let Some(close) = after.find('>') else {
                    break;
                };
                tokens.push(Token::Hex(after[..close].trim()));
                rest = &after[close + 1..];
            }
        }
    }
    tokens
}

fn parse_bfrange(tokens: &[Token<'_>], mappings: &mut HashMap<u32, String>) -> Result<(), BackendError> {
    let mut i = 0;
    while i + 2 < tokens.len() {
        let (Token::Hex(low), Token::Hex(high)) = (&tokens[i], &tokens[i + 1]) else {
            i += 1;
            continue;
        };
        let low = parse_code(low)?;
        let high = parse_code(high)?;

        match &tokens[i + 2] {
            Token::Hex(dst) => {
                let dst = decode_utf16be(dst)?;
                for (offset, code) in (low..=high).enumerate() {
                    if let Some(text) = offset_last_char(&dst, offset as u32) {
                        mappings.insert(code, text);
                    }
                }
                i += 3;
            }
            Token::ArrayStart => {
                let mut j = i + 3;
                let mut code = low;
                while j < tokens.len() && tokens[j] != Token::ArrayEnd {
                    if let Token::Hex(dst) = &tokens[j] {
                        if code <= high {
                            mappings.insert(code, decode_utf16be(dst)?);
                        }
                        code += 1;
                    }
                    j += 1;
                }
                i = j + 1;
            }
            Token::ArrayEnd => i += 3,
        }
    }
    Ok(())
}

/// Increment the last scalar of `base` by `offset`.
fn offset_last_char(base: &str, offset: u32) -> Option<String> {
    let mut chars: Vec<char> = base.chars().collect();
    let last = chars.pop()?;
    chars.push(char::from_u32(last as u32 + offset)?);
    Some(chars.into_iter().collect())
}

fn parse_code(hex: &str) -> Result<u32, BackendError> {
    u32::from_str_radix(hex, 16)
        .map_err(|e| BackendError::Parse(format!("invalid CMap code '{hex}': {e}")))
}

/// Decode hex digits as UTF-16BE; a lone byte is treated as `00XX`.
fn decode_utf16be(hex: &str) -> Result<String, BackendError> {
    let hex: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    let hex = if hex.len() == 2 { format!("00{hex}") } else { hex };
    if hex.len() % 4 != 0 {
        return Err(BackendError::Parse(format!(
            "UTF-16BE destination '{hex}' is not a whole number of code units"
        )));
    }

    let units = hex
        .as_bytes()
        .chunks(4)
        .map(|chunk| {
            std::str::from_utf8(chunk)
                .ok()
                .and_then(|s| u16::from_str_radix(s, 16).ok())
                .ok_or_else(|| BackendError::Parse(format!("invalid UTF-16BE hex '{hex}'")))
        })
        .collect::<Result<Vec<u16>, _>>()?;

    String::from_utf16(&units)
        .map_err(|e| BackendError::Parse(format!("invalid UTF-16BE sequence: {e}")))
}
