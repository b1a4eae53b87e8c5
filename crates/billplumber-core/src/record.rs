//! Typed transaction records.
//!
//! A [`RecordSet`] is an ordered list of rows over a schema discovered at
//! parse time. Every row holds exactly one [`Value`] per field.

use chrono::NaiveDateTime;

/// Header label of the transaction time column. Also the header-row marker.
pub const TIMESTAMP_FIELD: &str = "交易时间";
/// Header label of the amount column.
pub const AMOUNT_FIELD: &str = "金额(元)";

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Null,
    Text(String),
    Timestamp(NaiveDateTime),
    Amount(f64),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_amount(&self) -> Option<f64> {
        match self {
            Value::Amount(v) => Some(*v),
            _ => None,
        }
    }
}

/// How the values of a field are typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldKind {
    Text,
    Timestamp,
    Amount,
}

impl FieldKind {
    /// Kind implied by a column name.
    pub fn for_name(name: Option<&str>) -> Self {
        match name {
            Some(TIMESTAMP_FIELD) => FieldKind::Timestamp,
            Some(AMOUNT_FIELD) => FieldKind::Amount,
            _ => FieldKind::Text,
        }
    }
}

/// A named (or unnamed) column.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Field {
    /// `None` when the header cell was empty.
    pub name: Option<String>,
    pub kind: FieldKind,
}

impl Field {
    pub fn new(name: Option<String>) -> Self {
        let kind = FieldKind::for_name(name.as_deref());
        Self { name, kind }
    }
}

/// Ordered, typed rows of one statement (or of several merged statements).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordSet {
    fields: Vec<Field>,
    rows: Vec<Vec<Value>>,
}

impl RecordSet {
    /// Build a record set; rows are padded with `Null` or truncated to the schema width.
    pub fn new(fields: Vec<Field>, rows: Vec<Vec<Value>>) -> Self {
        let width = fields.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { fields, rows }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first field called `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.as_deref() == Some(name))
    }

    /// All values of the field called `name`, in row order.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Value of field `name` in row `row`.
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    pub fn into_parts(self) -> (Vec<Field>, Vec<Vec<Value>>) {
        (self.fields, self.rows)
    }
}
