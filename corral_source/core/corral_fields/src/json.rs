//! JSON projection of field trees, for container inspection and debugging.

use corral_ids::{RecordId, TypeTag};
use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};

use crate::field::{Field, FieldData, Scalar};

pub fn field_to_json(field: &Field) -> JsonValue {
    match &field.data {
        FieldData::Scalar(s) => scalar_to_json(s),
        FieldData::Pointer(p) => {
            let mut obj = JsonMap::new();
            obj.insert("file_ref".into(), JsonValue::from(p.file_ref.get()));
            obj.insert("record".into(), JsonValue::from(p.record.get()));
            JsonValue::Object(obj)
        }
        FieldData::Composite(children) => {
            let mut obj = JsonMap::new();
            for child in children {
                obj.insert(child.name.to_string(), field_to_json(child));
            }
            JsonValue::Object(obj)
        }
        FieldData::Array(a) => JsonValue::Array(a.items.iter().map(field_to_json).collect()),
    }
}

fn scalar_to_json(s: &Scalar) -> JsonValue {
    match s {
        Scalar::Bool(v) => JsonValue::Bool(*v),
        Scalar::I8(v) => JsonValue::from(*v),
        Scalar::U8(v) => JsonValue::from(*v),
        Scalar::I16(v) => JsonValue::from(*v),
        Scalar::U16(v) => JsonValue::from(*v),
        Scalar::I32(v) => JsonValue::from(*v),
        Scalar::U32(v) => JsonValue::from(*v),
        Scalar::I64(v) => JsonValue::from(*v),
        Scalar::U64(v) => JsonValue::from(*v),
        Scalar::F32(v) => JsonNumber::from_f64(*v as f64)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Scalar::F64(v) => JsonNumber::from_f64(*v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Scalar::Str(v) => JsonValue::String(v.to_string()),
    }
}

/// One stored record as JSON: identity plus the decoded payload.
pub fn record_to_json(id: RecordId, tag: TypeTag, tree: &Field) -> JsonValue {
    let mut obj = JsonMap::new();
    obj.insert("record".into(), JsonValue::from(id.get()));
    obj.insert("type_tag".into(), JsonValue::String(tag.to_string()));
    obj.insert("schema".into(), JsonValue::String(tree.schema.to_string()));
    obj.insert("fields".into(), field_to_json(tree));
    JsonValue::Object(obj)
}
