//! manifest.rs - synthesized dependency manifests for entity roots
//!
//! One manifest per crawled entity records which source records its
//! same-container components came from, so downstream tooling can recover
//! pre-consolidation membership without reopening the source containers.
//! Manifests ride the behavior tag with the reserved manifest sub-type and a
//! placeholder script binding.

use corral_fields::{ArrayData, Field, PointerData, Scalar, TemplateRegistry, codec};
use corral_ids::{ContainerKind, FileRef, RecordId, SourceKey, TargetRef};

use crate::identity::IdentityMap;

/// Script binding every manifest carries; loaders substitute the real
/// manifest handler for this well-known pair.
pub const MANIFEST_SCRIPT_FILE_REF: FileRef = FileRef::new(2);
pub const MANIFEST_SCRIPT_RECORD: RecordId = RecordId::new(11_500_000);

/// The reference pointer of one components-array element: the element itself
/// or its first pointer child (the `ref` slot of a ComponentRef wrapper).
pub(crate) fn element_pointer(item: &Field) -> Option<&PointerData> {
    if let Some(ptr) = item.as_pointer() {
        return Some(ptr);
    }
    item.children()?.iter().find_map(Field::as_pointer)
}

/// Build the manifest payload for one entity root. `components` is the
/// entity's rewritten components array before compaction; elements that are
/// non-null and same-file are traced back to their source identity through
/// the map's inverse index.
pub(crate) fn build_manifest(
    map: &IdentityMap,
    entity_key: &SourceKey,
    entity_record: RecordId,
    components: &ArrayData,
) -> Vec<u8> {
    let mut tree = TemplateRegistry::builtin().manifest().instantiate();

    set_pointer(&mut tree, "entity", FileRef::SELF_FILE, entity_record);
    set_i32(&mut tree, "enabled", 1);
    set_pointer(
        &mut tree,
        "script",
        MANIFEST_SCRIPT_FILE_REF,
        MANIFEST_SCRIPT_RECORD,
    );
    set_pointer(
        &mut tree,
        "source_entity",
        FileRef::SELF_FILE,
        entity_key.record,
    );
    set_i64(&mut tree, "source_record", entity_key.record.get());

    if let Some(list) = tree.child_mut("components").and_then(Field::as_array_mut) {
        for item in &components.items {
            let Some(ptr) = element_pointer(item) else {
                continue;
            };
            if ptr.is_null() || !ptr.file_ref.is_self() {
                continue;
            }
            // Same-file components of an entity live in the scene container.
            let target = TargetRef::new(ContainerKind::Scene, ptr.record);
            match map.source_of(target) {
                Some(source) => list.push(manifest_component(source)),
                None => {
                    log::warn!("manifest for {entity_key}: no source behind component {target}")
                }
            }
        }
    }

    codec::encode(&tree)
}

fn manifest_component(source: &SourceKey) -> Field {
    Field::composite(
        "item",
        "ManifestComponent",
        vec![
            Field::scalar("origin", "string", Scalar::Str(source.origin.clone())),
            Field::scalar("record", "i64", Scalar::I64(source.record.get())),
        ],
    )
}

fn set_pointer(tree: &mut Field, name: &str, file_ref: FileRef, record: RecordId) {
    if let Some(field) = tree.child_mut(name) {
        field.set_pointer(file_ref, record);
    }
}

fn set_i32(tree: &mut Field, name: &str, value: i32) {
    if let Some(field) = tree.child_mut(name) {
        field.set_i32(value);
    }
}

fn set_i64(tree: &mut Field, name: &str, value: i64) {
    if let Some(field) = tree.child_mut(name) {
        field.set_i64(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_fields::ElemKind;
    use corral_ids::TypeTag;

    fn component_item(file_ref: i32, record: i64) -> Field {
        Field::composite(
            "item",
            "ComponentRef",
            vec![Field::pointer(
                "ref",
                "Pointer<Component>",
                FileRef::new(file_ref),
                RecordId::new(record),
            )],
        )
    }

    #[test]
    fn manifest_lists_same_file_components_by_source_identity() {
        let mut map = IdentityMap::new();
        let entity = SourceKey::new("level2", RecordId::new(100));
        map.register(entity.clone(), TypeTag::ENTITY);
        let transform = SourceKey::new("level2", RecordId::new(101));
        map.register(transform, TypeTag::TRANSFORM);
        map.register(SourceKey::new("level2", RecordId::new(102)), TypeTag::TEXTURE);

        // Rewritten pre-compaction view: the transform landed at scene record
        // 2, one slot was nulled, one crossed over to the asset container.
        let components = ArrayData {
            declared_len: 3,
            elem: ElemKind::Composite,
            items: vec![
                component_item(0, 2),
                component_item(0, 0),
                component_item(1, 1),
            ],
        };

        let bytes = build_manifest(&map, &entity, RecordId::new(1), &components);
        let tree = codec::decode(TemplateRegistry::builtin().manifest(), &bytes).unwrap();

        assert_eq!(
            tree.child("entity").and_then(Field::as_pointer),
            Some(&PointerData::new(FileRef::SELF_FILE, RecordId::new(1)))
        );
        assert_eq!(tree.child("enabled").and_then(Field::as_i32), Some(1));
        assert_eq!(
            tree.child("script").and_then(Field::as_pointer),
            Some(&PointerData::new(
                MANIFEST_SCRIPT_FILE_REF,
                MANIFEST_SCRIPT_RECORD
            ))
        );
        assert_eq!(
            tree.child("source_record").and_then(Field::as_i64),
            Some(100)
        );

        let list = tree.child("components").and_then(Field::as_array).unwrap();
        assert_eq!(list.declared_len, 1);
        let item = &list.items[0];
        assert_eq!(item.child("origin").and_then(Field::as_str), Some("level2"));
        assert_eq!(item.child("record").and_then(Field::as_i64), Some(101));
    }

    #[test]
    fn untraceable_component_is_skipped() {
        let mut map = IdentityMap::new();
        let entity = SourceKey::new("level2", RecordId::new(100));
        map.register(entity.clone(), TypeTag::ENTITY);

        // Points at scene record 9, which nothing was placed behind.
        let components = ArrayData {
            declared_len: 1,
            elem: ElemKind::Composite,
            items: vec![component_item(0, 9)],
        };

        let bytes = build_manifest(&map, &entity, RecordId::new(1), &components);
        let tree = codec::decode(TemplateRegistry::builtin().manifest(), &bytes).unwrap();
        let list = tree.child("components").and_then(Field::as_array).unwrap();
        assert!(list.items.is_empty());
        assert_eq!(list.declared_len, 0);
    }
}
