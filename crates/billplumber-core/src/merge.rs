//! Combining the record sets of several statements.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::record::{Field, RecordSet, TIMESTAMP_FIELD, Value};

/// Merge record sets into one aggregate ordered by transaction time.
///
/// Returns `None` for fewer than two inputs: a lone statement is exported on
/// its own. The schema is the union of the inputs' fields in order of first
/// appearance (the n-th field of a name matches the n-th union field of that name;
/// unnamed fields likewise).
/// Missing values are `Null`. When a timestamp field exists, rows are
/// stable-sorted by it ascending with null timestamps last.
pub fn merge(record_sets: Vec<RecordSet>) -> Option<RecordSet> {
    if record_sets.len() < 2 {
        return None;
    }

    let mut fields: Vec<Field> = Vec::new();
    let mut mappings: Vec<Vec<usize>> = Vec::with_capacity(record_sets.len());

    for rs in &record_sets {
        // the n-th field of a given name (or the n-th unnamed field) of every
        // input shares one column
        let mut seen: HashMap<Option<&str>, usize> = HashMap::new();
        let mut mapping = Vec::with_capacity(rs.fields().len());
        for field in rs.fields() {
            let name = field.name.as_deref();
            let occurrence = seen.entry(name).or_default();
            let existing = fields
                .iter()
                .enumerate()
                .filter(|(_, f)| f.name.as_deref() == name)
                .nth(*occurrence)
                .map(|(idx, _)| idx);
            *occurrence += 1;
            mapping.push(existing.unwrap_or_else(|| {
                fields.push(field.clone());
                fields.len() - 1
            }));
        }
        mappings.push(mapping);
    }

    let width = fields.len();
    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (rs, mapping) in record_sets.into_iter().zip(mappings) {
        let (_, source_rows) = rs.into_parts();
        for source in source_rows {
            let mut row = vec![Value::Null; width];
            for (value, &target) in source.into_iter().zip(&mapping) {
                row[target] = value;
            }
            rows.push(row);
        }
    }

    if let Some(ts_idx) = fields
        .iter()
        .position(|f| f.name.as_deref() == Some(TIMESTAMP_FIELD))
    {
        rows.sort_by(|a, b| compare_timestamps(&a[ts_idx], &b[ts_idx]));
    }

    Some(RecordSet::new(fields, rows))
}

/// Ascending by time; anything that is not a timestamp sorts after all timestamps.
fn compare_timestamps(a: &Value, b: &Value) -> Ordering {
    match (a.as_timestamp(), b.as_timestamp()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::AMOUNT_FIELD;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn statement(rows: &[(Option<u32>, f64)]) -> RecordSet {
        RecordSet::new(
            vec![
                Field::new(Some(TIMESTAMP_FIELD.into())),
                Field::new(Some(AMOUNT_FIELD.into())),
            ],
            rows.iter()
                .map(|&(day, amount)| {
                    vec![
                        day.map_or(Value::Null, |d| Value::Timestamp(at(d))),
                        Value::Amount(amount),
                    ]
                })
                .collect(),
        )
    }

    fn amounts(rs: &RecordSet) -> Vec<f64> {
        rs.column(AMOUNT_FIELD)
            .unwrap()
            .filter_map(Value::as_amount)
            .collect()
    }

    #[test]
    fn test_fewer_than_two_inputs_do_not_merge() {
        assert!(merge(Vec::new()).is_none());
        assert!(merge(vec![statement(&[(Some(1), 1.0)])]).is_none());
    }

    #[test]
    fn test_merge_sorts_by_timestamp() {
        let a = statement(&[(Some(5), 5.0), (Some(1), 1.0)]);
        let b = statement(&[(Some(3), 3.0)]);
        let merged = merge(vec![a, b]).unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(amounts(&merged), [1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_null_timestamps_sort_last_and_keep_order() {
        let a = statement(&[(None, 10.0), (Some(2), 2.0)]);
        let b = statement(&[(None, 20.0), (Some(1), 1.0)]);
        let merged = merge(vec![a, b]).unwrap();
        assert_eq!(amounts(&merged), [1.0, 2.0, 10.0, 20.0]);
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let a = statement(&[(Some(1), 1.0)]);
        let b = statement(&[(Some(1), 2.0)]);
        let merged = merge(vec![a, b]).unwrap();
        assert_eq!(amounts(&merged), [1.0, 2.0]);
    }

    #[test]
    fn test_union_schema_fills_missing_with_null() {
        let a = statement(&[(Some(2), 2.0)]);
        let b = RecordSet::new(
            vec![
                Field::new(Some("交易对方".into())),
                Field::new(Some(TIMESTAMP_FIELD.into())),
            ],
            vec![vec![Value::Text("商店".into()), Value::Timestamp(at(1))]],
        );
        let merged = merge(vec![a, b]).unwrap();
        let names: Vec<&str> = merged
            .fields()
            .iter()
            .filter_map(|f| f.name.as_deref())
            .collect();
        assert_eq!(names, [TIMESTAMP_FIELD, AMOUNT_FIELD, "交易对方"]);
        assert_eq!(merged.get(0, "交易对方"), Some(&Value::Text("商店".into())));
        assert_eq!(merged.get(0, AMOUNT_FIELD), Some(&Value::Null));
        assert_eq!(merged.get(1, "交易对方"), Some(&Value::Null));
    }

    #[test]
    fn test_without_timestamp_field_order_is_concatenation() {
        let make = |v: &str| {
            RecordSet::new(
                vec![Field::new(Some("备注".into()))],
                vec![vec![Value::Text(v.into())]],
            )
        };
        let merged = merge(vec![make("b"), make("a")]).unwrap();
        let notes: Vec<&str> = merged
            .column("备注")
            .unwrap()
            .filter_map(Value::as_text)
            .collect();
        assert_eq!(notes, ["b", "a"]);
    }

    #[test]
    fn test_repeated_names_keep_every_column() {
        let make = |first: &str, second: &str| {
            RecordSet::new(
                vec![Field::new(Some("备注".into())), Field::new(Some("备注".into()))],
                vec![vec![Value::Text(first.into()), Value::Text(second.into())]],
            )
        };
        let merged = merge(vec![make("a1", "a2"), make("b1", "b2")]).unwrap();
        assert_eq!(merged.fields().len(), 2);
        let text = |s: &str| Value::Text(s.into());
        assert_eq!(
            merged.rows(),
            [vec![text("a1"), text("a2")], vec![text("b1"), text("b2")]]
        );
    }

    #[test]
    fn test_unnamed_fields_align_by_position() {
        let make = |v: &str| {
            RecordSet::new(
                vec![Field::new(None), Field::new(Some("备注".into())), Field::new(None)],
                vec![vec![Value::Text(v.into()), Value::Null, Value::Text(v.into())]],
            )
        };
        let merged = merge(vec![make("x"), make("y")]).unwrap();
        assert_eq!(merged.fields().len(), 3);
        assert_eq!(merged.rows()[1][2], Value::Text("y".into()));
    }
}
