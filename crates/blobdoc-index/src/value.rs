//! Field extraction from document payloads.
//!
//! Extraction is total: every payload and field name yields a [`FieldValue`],
//! with absence and non-indexable values expressed as variants rather than
//! errors.

use std::fmt;

use serde_json::{Number, Value};

/// A scalar JSON value that can appear as a marker's value segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScalarValue {
    String(String),
    Number(Number),
    Bool(bool),
}

impl fmt::Display for ScalarValue {
    /// Strings render raw (unquoted); numbers and booleans use their JSON text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// The value a document holds for one field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    /// No document, a non-object document, no such key, or JSON `null`.
    Missing,
    /// An object or array; present but never indexed.
    Unindexable,
    /// A string, number or boolean.
    Scalar(ScalarValue),
}

impl FieldValue {
    /// Extract `field` from a possibly absent document.
    pub fn extract(document: Option<&Value>, field: &str) -> Self {
        let Some(Value::Object(map)) = document else {
            return Self::Missing;
        };
        match map.get(field) {
            None | Some(Value::Null) => Self::Missing,
            Some(Value::String(s)) => Self::Scalar(ScalarValue::String(s.clone())),
            Some(Value::Number(n)) => Self::Scalar(ScalarValue::Number(n.clone())),
            Some(Value::Bool(b)) => Self::Scalar(ScalarValue::Bool(*b)),
            Some(Value::Array(_)) | Some(Value::Object(_)) => Self::Unindexable,
        }
    }

    /// The marker value segment, if this value is indexable.
    pub fn marker_token(&self) -> Option<String> {
        match self {
            Self::Scalar(scalar) => Some(scalar.to_string()),
            Self::Missing | Self::Unindexable => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }
}

/// Decode a payload as JSON.
///
/// Payloads that are not JSON are stored untouched but never match a field,
/// so decode failure is `None` rather than an error.
pub fn parse_document(payload: &[u8]) -> Option<Value> {
    match serde_json::from_slice(payload) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "payload is not JSON; no fields will be indexed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn absent_document_is_missing() {
        assert_eq!(FieldValue::extract(None, "name"), FieldValue::Missing);
    }

    #[test]
    fn non_object_document_is_missing() {
        for doc in [json!(1), json!("name"), json!([{"name": "ada"}]), Value::Null] {
            assert_eq!(FieldValue::extract(Some(&doc), "name"), FieldValue::Missing);
        }
    }

    #[test]
    fn missing_key_and_null_are_missing() {
        let doc = json!({"other": 1, "name": null});
        assert_eq!(FieldValue::extract(Some(&doc), "age"), FieldValue::Missing);
        assert_eq!(FieldValue::extract(Some(&doc), "name"), FieldValue::Missing);
    }

    #[test]
    fn composite_values_are_unindexable() {
        let doc = json!({"tags": ["a"], "address": {"city": "x"}});
        assert_eq!(FieldValue::extract(Some(&doc), "tags"), FieldValue::Unindexable);
        assert_eq!(FieldValue::extract(Some(&doc), "address"), FieldValue::Unindexable);
        assert_eq!(FieldValue::Unindexable.marker_token(), None);
    }

    #[test]
    fn scalar_tokens() {
        let doc = json!({"name": "ada", "age": 36, "ratio": 0.5, "admin": true});
        let token = |f| FieldValue::extract(Some(&doc), f).marker_token();
        assert_eq!(token("name").as_deref(), Some("ada"));
        assert_eq!(token("age").as_deref(), Some("36"));
        assert_eq!(token("ratio").as_deref(), Some("0.5"));
        assert_eq!(token("admin").as_deref(), Some("true"));
    }

    #[test]
    fn numbers_keep_their_source_text() {
        for raw in ["1.50", "1e2", "123456789012345678901234567890", "-0", "7"] {
            let doc = parse_document(format!(r#"{{"n":{raw}}}"#).as_bytes()).unwrap();
            assert_eq!(
                FieldValue::extract(Some(&doc), "n").marker_token().as_deref(),
                Some(raw)
            );
        }
    }

    #[test]
    fn string_and_number_can_share_a_token() {
        let a = FieldValue::extract(Some(&json!({"n": "1"})), "n");
        let b = FieldValue::extract(Some(&json!({"n": 1})), "n");
        assert_ne!(a, b);
        assert_eq!(a.marker_token(), b.marker_token());
    }

    #[test]
    fn garbage_payload_does_not_parse() {
        assert!(parse_document(b"not json").is_none());
        assert_eq!(parse_document(b"{\"a\":1}"), Some(json!({"a": 1})));
    }

    proptest! {
        #[test]
        fn string_fields_render_verbatim(s in ".*") {
            let doc = json!({ "f": s.clone() });
            prop_assert_eq!(FieldValue::extract(Some(&doc), "f").marker_token(), Some(s));
        }
    }
}
