//! Decoding of protobuf `Struct` payloads as emitted by the gRPC client
//! libraries: `{fields: {name: {stringValue | numberValue | boolValue |
//! structValue | listValue}}}`.

use serde_json::{Map, Number, Value};

/// One decoded `google.protobuf.Value`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Number(Number),
    Bool(bool),
    Struct(Value),
    List(Value),
    /// Anything without a recognised tag, kept as-is.
    Opaque(Value),
}

impl FieldValue {
    pub fn decode(value: &Value) -> Self {
        let Some(tagged) = value.as_object() else {
            return Self::Opaque(value.clone());
        };

        if let Some(Value::String(s)) = tagged.get("stringValue") {
            Self::String(s.clone())
        } else if let Some(Value::Number(n)) = tagged.get("numberValue") {
            Self::Number(n.clone())
        } else if let Some(Value::Bool(b)) = tagged.get("boolValue") {
            Self::Bool(*b)
        } else if let Some(inner) = tagged.get("structValue") {
            Self::Struct(inner.clone())
        } else if let Some(inner) = tagged.get("listValue") {
            Self::List(inner.clone())
        } else {
            Self::Opaque(value.clone())
        }
    }

    pub fn into_plain(self) -> Value {
        match self {
            Self::String(s) => Value::String(s),
            Self::Number(n) => Value::Number(n),
            Self::Bool(b) => Value::Bool(b),
            Self::Struct(v) | Self::List(v) | Self::Opaque(v) => v,
        }
    }
}

pub fn flatten_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), FieldValue::decode(value).into_plain()))
        .collect()
}

/// `None` for anything that is not an object with at least one entry.
pub(crate) fn normalize(payload: &Value) -> Option<Value> {
    let object = payload.as_object()?;

    let plain = match object.get("fields") {
        Some(Value::Object(fields)) if object.len() == 1 => flatten_fields(fields),
        _ => object.clone(),
    };

    (!plain.is_empty()).then_some(Value::Object(plain))
}
