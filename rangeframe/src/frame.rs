use std::fmt::{Display, Formatter};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// A single cell of an [`OutputField`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// An explicitly empty slot: the source value was null.
    Null,
    Boolean(bool),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Bytes(v) => v.iter().try_for_each(|b| write!(f, "{b:02x}")),
            Value::Timestamp(v) => f.write_str(&v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float64(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A named column of an [`OutputFrame`], one value per row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputField {
    name: String,
    values: Vec<Value>,
}

impl OutputField {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Every value rendered to text; null slots render as empty strings.
    pub fn to_strings(&self) -> Vec<String> {
        self.values.iter().map(Value::to_string).collect()
    }
}

/// A generic, column-oriented result: ordered fields of equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputFrame {
    name: String,
    fields: Vec<OutputField>,
}

impl OutputFrame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_field(mut self, field: OutputField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn push_field(&mut self, field: OutputField) {
        self.fields.push(field);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[OutputField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&OutputField> {
        self.fields.iter().find(|field| field.name() == name)
    }

    /// Row count shared by all fields, zero for a frame without fields.
    pub fn num_rows(&self) -> usize {
        self.fields.first().map_or(0, OutputField::len)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Value::Null, "")]
    #[case(Value::Boolean(true), "true")]
    #[case(Value::Int64(-3), "-3")]
    #[case(Value::UInt64(18_446_744_073_709_551_615), "18446744073709551615")]
    #[case(Value::Float64(20.7), "20.7")]
    #[case(Value::from("Bob"), "Bob")]
    #[case(Value::Bytes(vec![0xde, 0xad, 0x01]), "dead01")]
    #[case(Value::Timestamp(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()), "2024-01-02T03:04:05Z")]
    fn renders_canonical_text(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(value.to_string(), expected);
    }

    #[test]
    fn option_maps_none_to_null() {
        assert!(Value::from(None::<i64>).is_null());
        assert_eq!(Value::from(Some(4i64)), Value::Int64(4));
    }

    #[test]
    fn serializes_untagged() {
        let frame = OutputFrame::new("t").with_field(OutputField::new(
            "a",
            vec![Value::Int64(1), Value::Null, Value::from("x")],
        ));
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"name":"t","fields":[{"name":"a","values":[1,null,"x"]}]}"#);
    }

    #[test]
    fn empty_frame_has_no_rows() {
        assert_eq!(OutputFrame::new("x").num_rows(), 0);
    }
}
