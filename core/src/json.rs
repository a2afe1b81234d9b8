//! JSON key-path navigation and the model construction contract.
//!
//! # Design
//! Responses are parsed into `serde_json::Value` first. A `KeyPath` then
//! descends into the envelope one object field at a time and every failing
//! step is reported as a `DecodeError::PathSegment` naming the segment.
//!
//! Resource types implement [`FromJson`] to build themselves from a JSON
//! object. Field access goes through [`Fields`], which turns missing or
//! mistyped fields into `DecodeError` values instead of panicking.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{kind_of, DecodeError};

pub type JsonObject = Map<String, Value>;

/// A dot-separated path into a response envelope, e.g. `droplet.networks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    raw: String,
}

impl KeyPath {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.raw.split('.')
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl From<&str> for KeyPath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for KeyPath {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Descend into `value` along `path`, taking ownership of the final node.
///
/// Each segment must name a field of a JSON object.
pub fn navigate(value: Value, path: &KeyPath) -> Result<Value, DecodeError> {
    path.segments().try_fold(value, |node, segment| {
        let missing = || DecodeError::PathSegment {
            segment: segment.to_string(),
            path: path.to_string(),
        };
        match node {
            Value::Object(mut map) => map.remove(segment).ok_or_else(missing),
            _ => Err(missing()),
        }
    })
}

/// Construction contract for decodable resource types.
///
/// Only `from_json` is required; the optional and collection forms are
/// derived from it.
pub trait FromJson: Sized {
    fn from_json(object: &JsonObject) -> Result<Self, DecodeError>;

    fn from_optional_json(object: Option<&JsonObject>) -> Result<Option<Self>, DecodeError> {
        object.map(Self::from_json).transpose()
    }

    fn from_value(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Object(object) => Self::from_json(object),
            other => Err(DecodeError::NotAnObject(kind_of(other))),
        }
    }

    /// Build one instance per element, preserving order.
    fn collection(values: &[Value]) -> Result<Vec<Self>, DecodeError> {
        values.iter().map(Self::from_value).collect()
    }
}

impl FromJson for JsonObject {
    fn from_json(object: &JsonObject) -> Result<Self, DecodeError> {
        Ok(object.clone())
    }
}

/// Typed field access over a JSON object.
///
/// Error messages name fields by their dotted path from the object the
/// accessor was created on.
#[derive(Debug, Clone)]
pub struct Fields<'a> {
    object: &'a JsonObject,
    prefix: Option<String>,
}

impl<'a> Fields<'a> {
    pub fn new(object: &'a JsonObject) -> Self {
        Self {
            object,
            prefix: None,
        }
    }

    fn field_name(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.to_string(),
        }
    }

    fn present(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key).filter(|v| !v.is_null())
    }

    /// A field that must be present and non-null.
    pub fn required<T: DeserializeOwned>(&self, key: &str) -> Result<T, DecodeError> {
        let value = self
            .present(key)
            .ok_or_else(|| DecodeError::MissingField(self.field_name(key)))?;
        self.convert(key, value)
    }

    /// A field that may be absent or null.
    pub fn optional<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DecodeError> {
        self.present(key)
            .map(|value| self.convert(key, value))
            .transpose()
    }

    /// Field access scoped to a nested object.
    pub fn object(&self, key: &str) -> Result<Fields<'a>, DecodeError> {
        let object = self.object_field(key)?;
        Ok(Fields {
            object,
            prefix: Some(self.field_name(key)),
        })
    }

    /// An array of nested objects.
    pub fn collection<T: FromJson>(&self, key: &str) -> Result<Vec<T>, DecodeError> {
        let value = self
            .present(key)
            .ok_or_else(|| DecodeError::MissingField(self.field_name(key)))?;
        match value {
            Value::Array(items) => T::collection(items).map_err(|err| self.rescope(key, err)),
            other => Err(DecodeError::InvalidField {
                field: self.field_name(key),
                reason: format!("expected an array, found {}", kind_of(other)),
            }),
        }
    }

    fn object_field(&self, key: &str) -> Result<&'a JsonObject, DecodeError> {
        match self.present(key) {
            Some(Value::Object(object)) => Ok(object),
            Some(other) => Err(DecodeError::InvalidField {
                field: self.field_name(key),
                reason: format!("expected an object, found {}", kind_of(other)),
            }),
            None => Err(DecodeError::MissingField(self.field_name(key))),
        }
    }

    fn convert<T: DeserializeOwned>(&self, key: &str, value: &'a Value) -> Result<T, DecodeError> {
        T::deserialize(value).map_err(|err| DecodeError::InvalidField {
            field: self.field_name(key),
            reason: err.to_string(),
        })
    }

    // Element decoders report fields relative to the element; prefix the
    // key that led into the array.
    fn rescope(&self, key: &str, err: DecodeError) -> DecodeError {
        let outer = self.field_name(key);
        match err {
            DecodeError::MissingField(field) => DecodeError::MissingField(format!("{outer}[].{field}")),
            DecodeError::InvalidField { field, reason } => DecodeError::InvalidField {
                field: format!("{outer}[].{field}"),
                reason,
            },
            DecodeError::NotAnObject(kind) | DecodeError::NotAnArray(kind) => {
                DecodeError::InvalidField {
                    field: outer,
                    reason: format!("unexpected {kind} element"),
                }
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Tag {
        name: String,
        count: u32,
    }

    impl FromJson for Tag {
        fn from_json(object: &JsonObject) -> Result<Self, DecodeError> {
            let fields = Fields::new(object);
            Ok(Self {
                name: fields.required("name")?,
                count: fields.optional("count")?.unwrap_or_default(),
            })
        }
    }

    #[derive(Debug, PartialEq)]
    struct Holder {
        label: String,
        note: Option<String>,
        all: Vec<Tag>,
    }

    impl FromJson for Holder {
        fn from_json(object: &JsonObject) -> Result<Self, DecodeError> {
            let fields = Fields::new(object);
            let meta = fields.object("meta")?;
            Ok(Self {
                label: meta.required("label")?,
                note: meta.optional("note")?,
                all: fields.collection("all")?,
            })
        }
    }

    #[test]
    fn navigate_descends_dotted_path() {
        let body = json!({"droplet": {"networks": {"v4": []}}, "meta": {}});
        let value = navigate(body, &KeyPath::from("droplet.networks")).unwrap();
        assert_eq!(value, json!({"v4": []}));
    }

    #[test]
    fn navigate_single_segment_ignores_siblings() {
        let body = json!({"items": [1, 2, 3], "links": {"pages": {}}});
        let value = navigate(body, &KeyPath::from("items")).unwrap();
        assert_eq!(value, json!([1, 2, 3]));
    }

    #[test]
    fn navigate_reports_missing_segment() {
        let body = json!({"droplet": {}});
        let err = navigate(body, &KeyPath::from("droplet.networks")).unwrap_err();
        assert_eq!(
            err,
            DecodeError::PathSegment {
                segment: "networks".to_string(),
                path: "droplet.networks".to_string(),
            }
        );
    }

    #[test]
    fn navigate_rejects_descending_through_non_object() {
        let body = json!({"droplets": [{"id": 1}]});
        let err = navigate(body, &KeyPath::from("droplets.id")).unwrap_err();
        assert!(matches!(err, DecodeError::PathSegment { ref segment, .. } if segment == "id"));
    }

    #[test]
    fn from_optional_json_none_is_none() {
        assert_eq!(Tag::from_optional_json(None).unwrap(), None);
    }

    #[test]
    fn collection_preserves_order() {
        let values = vec![json!({"name": "b"}), json!({"name": "a", "count": 2})];
        let tags = Tag::collection(&values).unwrap();
        assert_eq!(
            tags,
            vec![
                Tag { name: "b".into(), count: 0 },
                Tag { name: "a".into(), count: 2 },
            ]
        );
    }

    #[test]
    fn collection_rejects_non_object_elements() {
        let values = vec![json!({"name": "ok"}), json!(5)];
        assert_eq!(
            Tag::collection(&values).unwrap_err(),
            DecodeError::NotAnObject("a number")
        );
    }

    #[test]
    fn missing_required_field_is_named() {
        let object = json!({"count": 1}).as_object().cloned().unwrap();
        assert_eq!(
            Tag::from_json(&object).unwrap_err(),
            DecodeError::MissingField("name".to_string())
        );
    }

    #[test]
    fn mistyped_field_is_invalid() {
        let object = json!({"name": 12}).as_object().cloned().unwrap();
        let err = Tag::from_json(&object).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField { ref field, .. } if field == "name"));
    }

    #[test]
    fn nested_object_errors_carry_the_outer_key() {
        let object = json!({"meta": {"note": "n"}, "all": []})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(
            Holder::from_json(&object).unwrap_err(),
            DecodeError::MissingField("meta.label".to_string())
        );
    }

    #[test]
    fn collection_element_errors_carry_the_array_key() {
        let object = json!({"meta": {"label": "l"}, "all": [{"name": "x"}, {"count": 1}]})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(
            Holder::from_json(&object).unwrap_err(),
            DecodeError::MissingField("all[].name".to_string())
        );
    }

    #[test]
    fn nested_optional_and_collection() {
        let object = json!({
            "meta": {"label": "l", "note": null},
            "all": [{"name": "x"}, {"name": "y"}]
        })
        .as_object()
        .cloned()
        .unwrap();
        let holder = Holder::from_json(&object).unwrap();
        assert_eq!(holder.label, "l");
        assert_eq!(holder.note, None);
        assert_eq!(holder.all.len(), 2);
    }

    #[test]
    fn collection_field_must_be_array() {
        let object = json!({"meta": {"label": "l"}, "all": {}})
            .as_object()
            .cloned()
            .unwrap();
        let err = Holder::from_json(&object).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField { ref field, .. } if field == "all"));
    }

    #[test]
    fn raw_object_decodes_to_itself() {
        let object = json!({"anything": [1, 2]}).as_object().cloned().unwrap();
        assert_eq!(JsonObject::from_json(&object).unwrap(), object);
    }
}
