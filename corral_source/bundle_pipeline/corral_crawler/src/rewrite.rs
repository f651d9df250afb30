//! rewrite.rs - pointer translation against the frozen identity map

use corral_fields::{Field, FieldData, PointerData};
use corral_ids::{ContainerKind, FileRef, RecordId, SourceKey};

use crate::identity::IdentityMap;
use crate::source::AssetResolver;

/// Translate every pointer under `field` from source identity to target
/// identity. Null pointers stay byte-identical, pointers at records the map
/// does not place become null, and script pointers are left alone so the
/// structural pass can still resolve them in source space.
pub(crate) fn rewrite_tree<R: AssetResolver>(
    resolver: &R,
    map: &IdentityMap,
    key: &SourceKey,
    self_is_asset: bool,
    field: &mut Field,
) {
    if field.is_script_pointer() {
        return;
    }
    match &mut field.data {
        FieldData::Scalar(_) => {}
        FieldData::Composite(children) => {
            for child in children {
                rewrite_tree(resolver, map, key, self_is_asset, child);
            }
        }
        FieldData::Array(array) => {
            for item in &mut array.items {
                rewrite_tree(resolver, map, key, self_is_asset, item);
            }
        }
        FieldData::Pointer(ptr) => rewrite_pointer(resolver, map, key, self_is_asset, ptr),
    }
}

fn rewrite_pointer<R: AssetResolver>(
    resolver: &R,
    map: &IdentityMap,
    key: &SourceKey,
    self_is_asset: bool,
    ptr: &mut PointerData,
) {
    if ptr.is_null() {
        return;
    }

    match resolver.resolve(&key.origin, ptr.file_ref, ptr.record) {
        Ok(resolved) => match map.lookup(&resolved.key) {
            Some(placement) => {
                let crosses =
                    self_is_asset != (placement.target.container == ContainerKind::Asset);
                ptr.file_ref = if crosses {
                    FileRef::COMPANION
                } else {
                    FileRef::SELF_FILE
                };
                ptr.record = placement.target.record;
            }
            None => {
                log::debug!("nulling reference from {key} to unplaced {}", resolved.key);
                ptr.file_ref = FileRef::SELF_FILE;
                ptr.record = RecordId::NIL;
            }
        },
        // The crawl already warned about danglings under the prune policy.
        Err(_) => {
            ptr.file_ref = FileRef::SELF_FILE;
            ptr.record = RecordId::NIL;
        }
    }
}
