#![forbid(unsafe_code)]

pub mod codec;
pub mod field;
pub mod json;
pub mod template;

pub use field::*;
pub use template::{FieldTemplate, ScalarKind, TemplateData, TemplateRegistry};

#[cfg(test)]
mod tests {
    use corral_ids::{FileRef, RecordId, SUB_TYPE_MANIFEST, SUB_TYPE_NONE, TypeTag};

    use super::codec::{ByteReader, decode, encode};
    use super::json::field_to_json;
    use super::*;

    // -------------------- Field access --------------------

    #[test]
    fn accessors_reject_other_kinds() {
        let f = Field::scalar("width", "i32", Scalar::I32(640));
        assert_eq!(f.as_i32(), Some(640));
        assert_eq!(f.as_i64(), None);
        assert_eq!(f.as_str(), None);
        assert!(f.as_pointer().is_none());
        assert!(f.as_array().is_none());
    }

    #[test]
    fn setters_report_kind_mismatch() {
        let mut f = Field::scalar("name", "string", Scalar::Str("old".into()));
        assert!(f.set_str("new"));
        assert_eq!(f.as_str(), Some("new"));
        assert!(!f.set_i32(9));
        assert_eq!(f.as_str(), Some("new"));
    }

    #[test]
    fn child_path_walks_nested_composites() {
        let tree = Field::composite(
            "texture",
            "Texture",
            vec![Field::composite(
                "stream",
                "StreamInfo",
                vec![Field::scalar("path", "string", Scalar::Str("a.raw".into()))],
            )],
        );
        assert_eq!(
            tree.child_path(&["stream", "path"]).and_then(Field::as_str),
            Some("a.raw")
        );
        assert!(tree.child_path(&["stream", "nope"]).is_none());
        assert!(tree.child_path(&["nope"]).is_none());
    }

    #[test]
    fn script_pointer_detection_is_schema_exact() {
        let script = Field::pointer(
            "script",
            "Pointer<Script>",
            FileRef::SELF_FILE,
            RecordId::new(9),
        );
        let other = Field::pointer(
            "parent",
            "Pointer<Transform>",
            FileRef::SELF_FILE,
            RecordId::new(9),
        );
        assert!(script.is_script_pointer());
        assert!(!other.is_script_pointer());
    }

    #[test]
    fn array_push_keeps_declared_len_in_sync() {
        let mut f = Field::array("children", "Array<Pointer<Transform>>", ElemKind::Pointer, vec![]);
        let arr = f.as_array_mut().unwrap();
        arr.push(Field::pointer(
            "item",
            "Pointer<Transform>",
            FileRef::SELF_FILE,
            RecordId::new(4),
        ));
        assert_eq!(arr.declared_len, 1);

        arr.items.retain(|_| false);
        assert_eq!(arr.declared_len, 1);
        assert!(f.validate().is_err());

        let arr = f.as_array_mut().unwrap();
        arr.sync_len();
        assert!(f.validate().is_ok());
    }

    // -------------------- Templates --------------------

    #[test]
    fn builtin_registry_covers_known_tags() {
        let reg = TemplateRegistry::builtin();
        for tag in [
            TypeTag::ENTITY,
            TypeTag::TRANSFORM,
            TypeTag::BEHAVIOR,
            TypeTag::SCRIPT_CLASS,
            TypeTag::TEXTURE,
            TypeTag::AUDIO_CLIP,
            TypeTag::SHADER,
        ] {
            assert!(reg.get(tag).is_some(), "no template for {tag}");
        }
        assert!(reg.get(TypeTag::new(0x9999)).is_none());
    }

    #[test]
    fn for_record_distinguishes_manifest_sub_type() {
        let reg = TemplateRegistry::builtin();
        let behavior = reg.for_record(TypeTag::BEHAVIOR, SUB_TYPE_NONE).unwrap();
        let manifest = reg.for_record(TypeTag::BEHAVIOR, SUB_TYPE_MANIFEST).unwrap();
        assert_eq!(behavior.schema.as_ref(), "Behavior");
        assert_eq!(manifest.schema.as_ref(), "DependencyManifest");
        // Sub-type slots only matter for the behavior tag.
        let texture = reg.for_record(TypeTag::TEXTURE, SUB_TYPE_MANIFEST).unwrap();
        assert_eq!(texture.schema.as_ref(), "Texture");
    }

    #[test]
    fn instantiate_produces_null_defaults() {
        let reg = TemplateRegistry::builtin();
        let entity = reg.get(TypeTag::ENTITY).unwrap().instantiate();
        assert_eq!(entity.child("name").and_then(Field::as_str), Some(""));
        let comps = entity.child("components").and_then(Field::as_array).unwrap();
        assert_eq!(comps.declared_len, 0);
        assert!(comps.items.is_empty());
        assert_eq!(comps.elem, ElemKind::Composite);

        let transform = reg.get(TypeTag::TRANSFORM).unwrap().instantiate();
        let parent = transform.child("parent").and_then(Field::as_pointer).unwrap();
        assert!(parent.is_null());
        assert!(parent.file_ref.is_self());
    }

    // -------------------- Codec --------------------

    #[test]
    fn string_encoding_pads_to_four() {
        let f = Field::scalar("name", "string", Scalar::Str("abc".into()));
        let bytes = encode(&f);
        assert_eq!(bytes, vec![3, 0, 0, 0, b'a', b'b', b'c', 0]);

        let empty = Field::scalar("name", "string", Scalar::Str("".into()));
        assert_eq!(encode(&empty), vec![0, 0, 0, 0]);
    }

    #[test]
    fn pointer_encoding_is_twelve_bytes() {
        let f = Field::pointer(
            "ref",
            "Pointer<Component>",
            FileRef::COMPANION,
            RecordId::new(0x0102_0304_0506_0708),
        );
        let bytes = encode(&f);
        assert_eq!(bytes.len(), 12);
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_i32().unwrap(), 1);
        assert_eq!(r.read_i64().unwrap(), 0x0102_0304_0506_0708);
    }

    #[test]
    fn entity_roundtrip_through_template() {
        let reg = TemplateRegistry::builtin();
        let template = reg.get(TypeTag::ENTITY).unwrap();

        let mut entity = template.instantiate();
        entity.child_mut("name").unwrap().set_str("door");
        entity.child_mut("active").unwrap().set_bool(true);
        {
            let comps = entity
                .child_mut("components")
                .and_then(Field::as_array_mut)
                .unwrap();
            for id in [4_i64, 9, 11] {
                comps.push(Field::composite(
                    "item",
                    "ComponentRef",
                    vec![Field::pointer(
                        "ref",
                        "Pointer<Component>",
                        FileRef::SELF_FILE,
                        RecordId::new(id),
                    )],
                ));
            }
        }

        let bytes = encode(&entity);
        let decoded = decode(template, &bytes).unwrap();
        assert_eq!(decoded, entity);
        assert_eq!(
            decoded
                .child("components")
                .and_then(Field::as_array)
                .unwrap()
                .declared_len,
            3
        );
    }

    #[test]
    fn behavior_roundtrip_keeps_script_pointer() {
        let reg = TemplateRegistry::builtin();
        let template = reg.get(TypeTag::BEHAVIOR).unwrap();

        let mut behavior = template.instantiate();
        behavior.child_mut("name").unwrap().set_str("mover");
        behavior.child_mut("enabled").unwrap().set_i32(1);
        behavior
            .child_mut("script")
            .unwrap()
            .set_pointer(FileRef::new(2), RecordId::new(700));

        let bytes = encode(&behavior);
        let decoded = decode(template, &bytes).unwrap();
        let script = decoded.child("script").and_then(Field::as_pointer).unwrap();
        assert_eq!(script.file_ref, FileRef::new(2));
        assert_eq!(script.record, RecordId::new(700));
        assert!(decoded.child("script").unwrap().is_script_pointer());
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        let reg = TemplateRegistry::builtin();
        let template = reg.get(TypeTag::TRANSFORM).unwrap();
        let full = encode(&template.instantiate());

        let err = decode(template, &full[..full.len() - 4]).unwrap_err();
        assert!(matches!(err, FieldError::Truncated { .. }), "got {err:?}");
    }

    #[test]
    fn decode_rejects_negative_array_count() {
        let reg = TemplateRegistry::builtin();
        let template = reg.get(TypeTag::SHADER).unwrap();
        let mut bytes = encode(&template.instantiate());
        // First field is the empty name string; the next i32 is the blob count.
        bytes[4..8].copy_from_slice(&(-1_i32).to_le_bytes());
        let err = decode(template, &bytes).unwrap_err();
        assert!(
            matches!(err, FieldError::NegativeCount { count: -1, .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn decode_rejects_oversized_array_count() {
        let reg = TemplateRegistry::builtin();
        let template = reg.get(TypeTag::SHADER).unwrap();
        let mut bytes = encode(&template.instantiate());
        bytes[4..8].copy_from_slice(&(i32::MAX).to_le_bytes());
        let err = decode(template, &bytes).unwrap_err();
        assert!(matches!(err, FieldError::Truncated { .. }), "got {err:?}");
    }

    #[test]
    fn decode_rejects_bad_utf8() {
        let reg = TemplateRegistry::builtin();
        let template = reg.get(TypeTag::SCRIPT_CLASS).unwrap();
        let mut script = template.instantiate();
        script.child_mut("class_name").unwrap().set_str("Door");
        let mut bytes = encode(&script);
        // "name" is empty (4 bytes) then execution_order (4); class_name
        // payload starts at 12.
        bytes[12] = 0xFF;
        let err = decode(template, &bytes).unwrap_err();
        assert!(matches!(err, FieldError::BadString { .. }), "got {err:?}");
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let reg = TemplateRegistry::builtin();
        let template = reg.get(TypeTag::TRANSFORM).unwrap();
        let mut bytes = encode(&template.instantiate());
        bytes.extend_from_slice(&[0, 0, 0, 0]);
        let err = decode(template, &bytes).unwrap_err();
        assert!(
            matches!(err, FieldError::TrailingBytes { remaining: 4, .. }),
            "got {err:?}"
        );
    }

    // -------------------- JSON projection --------------------

    #[test]
    fn json_projection_shapes() {
        let reg = TemplateRegistry::builtin();
        let mut entity = reg.get(TypeTag::ENTITY).unwrap().instantiate();
        entity.child_mut("name").unwrap().set_str("lamp");

        let value = field_to_json(&entity);
        assert_eq!(value["name"], serde_json::json!("lamp"));
        assert!(value["components"].is_array());
        assert_eq!(value["active"], serde_json::json!(false));

        let ptr = Field::pointer(
            "ref",
            "Pointer<Component>",
            FileRef::COMPANION,
            RecordId::new(5),
        );
        let value = field_to_json(&ptr);
        assert_eq!(value["file_ref"], serde_json::json!(1));
        assert_eq!(value["record"], serde_json::json!(5));
    }
}
