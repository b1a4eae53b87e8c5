//! Field normalization: raw cell text to typed [`Value`]s.
//!
//! Parsing never fails. An unreadable timestamp becomes [`Value::Null`], an
//! unreadable amount becomes `0.0`.

use chrono::{NaiveDate, NaiveDateTime};
use unicode_normalization::UnicodeNormalization;

use crate::record::{Field, FieldKind, RecordSet, Value};
use crate::table::RawRow;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%Y年%m月%d日 %H:%M:%S",
    "%Y%m%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y年%m月%d日"];

/// Remove every `\n` and `\r` from a header cell. Unnamed cells stay unnamed.
pub fn clean_column_name(name: Option<&str>) -> Option<String> {
    name.map(|n| n.chars().filter(|c| !matches!(c, '\n' | '\r')).collect())
}

/// Parse a statement timestamp.
///
/// Whitespace runs (including line breaks from wrapped cells) collapse to a
/// single space first. Date-only values mean midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(&text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse an amount by keeping only `[0-9.-]`; anything unreadable is `0.0`.
///
/// The text is NFKC-folded first, so full-width digits and signs count.
pub fn parse_amount(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };
    raw.nfkc()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        .collect::<String>()
        .parse()
        .unwrap_or(0.0)
}

fn is_blank(cell: &Option<String>) -> bool {
    cell.as_deref().is_none_or(|s| s.trim().is_empty())
}

/// Convert one raw cell according to the field kind.
pub fn coerce_cell(cell: Option<&str>, kind: FieldKind) -> Value {
    match kind {
        FieldKind::Timestamp => cell
            .and_then(parse_timestamp)
            .map_or(Value::Null, Value::Timestamp),
        FieldKind::Amount => Value::Amount(parse_amount(cell)),
        FieldKind::Text => cell.map_or(Value::Null, |s| Value::Text(s.to_string())),
    }
}

/// Build a typed record set from a header row and its data rows.
///
/// The width is the longest of the header and data rows; short rows are
/// padded with empty cells. Rows whose cells are all empty are dropped.
pub fn normalize(header: &RawRow, data: &[RawRow]) -> RecordSet {
    let width = data
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);

    let fields: Vec<Field> = (0..width)
        .map(|i| {
            let name = header.get(i).and_then(|c| c.as_deref());
            Field::new(clean_column_name(name))
        })
        .collect();

    let rows = data
        .iter()
        .filter(|row| !row.iter().all(is_blank))
        .map(|row| {
            fields
                .iter()
                .enumerate()
                .map(|(i, field)| {
                    let cell = row.get(i).and_then(|c| c.as_deref());
                    coerce_cell(cell, field.kind)
                })
                .collect()
        })
        .collect();

    RecordSet::new(fields, rows)
}

fn renormalize(value: &Value, kind: FieldKind) -> Value {
    match (value, kind) {
        (Value::Text(s), _) => coerce_cell(Some(s.as_str()), kind),
        (Value::Null, _) => coerce_cell(None, kind),
        (Value::Timestamp(_), FieldKind::Timestamp) | (Value::Amount(_), FieldKind::Amount) => {
            value.clone()
        }
        (Value::Timestamp(ts), _) => {
            coerce_cell(Some(ts.format("%Y-%m-%d %H:%M:%S").to_string().as_str()), kind)
        }
        (Value::Amount(v), _) => coerce_cell(Some(v.to_string().as_str()), kind),
    }
}

impl RecordSet {
    /// Re-apply the normalization rules.
    ///
    /// Column names lose any line breaks, field kinds follow the cleaned
    /// names, values are coerced to their field kind and all-null rows are
    /// dropped. A no-op on a record set produced by [`normalize`].
    pub fn normalized(&self) -> RecordSet {
        let fields: Vec<Field> = self
            .fields()
            .iter()
            .map(|f| Field::new(clean_column_name(f.name.as_deref())))
            .collect();

        let rows = self
            .rows()
            .iter()
            .filter(|row| {
                !row.iter().all(|v| match v {
                    Value::Null => true,
                    Value::Text(s) => s.trim().is_empty(),
                    _ => false,
                })
            })
            .map(|row| {
                row.iter()
                    .zip(&fields)
                    .map(|(v, f)| renormalize(v, f.kind))
                    .collect()
            })
            .collect();

        RecordSet::new(fields, rows)
    }
}
