//! fixup.rs - per-type structural pass, run on each record after its rewrite
//!
//! Field access is Option-based throughout: a record missing a field the
//! fixup needs logs a warning and keeps its rewritten form, the run goes on.

use corral_fields::Field;
use corral_ids::{ContainerKind, FileRef, RecordId, SUB_TYPE_MANIFEST, SourceKey, TypeTag};

use crate::consolidate::Consolidator;
use crate::identity::Placement;
use crate::manifest;
use crate::patch::{Patch, PatchSet};
use crate::source::AssetResolver;

/// Assembly binding scripts carried before the module rename.
const LEGACY_ASSEMBLY: &str = "Assembly-CSharp.dll";
const REBOUND_ASSEMBLY: &str = "CorralCode.dll";

impl<'a, R: AssetResolver> Consolidator<'a, R> {
    pub(crate) fn apply_fixups(
        &mut self,
        key: &SourceKey,
        placement: Placement,
        tree: &mut Field,
        patches: &mut PatchSet,
    ) {
        match placement.type_tag {
            TypeTag::ENTITY => self.fixup_entity(key, placement, tree, patches),
            TypeTag::TEXTURE => self.fixup_payload_path(key, tree, &["stream", "path"]),
            TypeTag::AUDIO_CLIP => self.fixup_payload_path(key, tree, &["resource", "source"]),
            TypeTag::BEHAVIOR => self.fixup_behavior(key, tree),
            TypeTag::SCRIPT_CLASS => fixup_script_class(key, tree),
            _ => {}
        }
    }

    /// Compact the components array, synthesize the dependency manifest, and
    /// append a reference to it. The manifest consumes the next scene id and
    /// is built from the pre-compaction view so nulled slots still separate
    /// live components from pruned ones.
    fn fixup_entity(
        &mut self,
        key: &SourceKey,
        placement: Placement,
        tree: &mut Field,
        patches: &mut PatchSet,
    ) {
        let Some(pre_compaction) = tree.child("components").and_then(Field::as_array).cloned()
        else {
            log::warn!("{key} has no `components` array, skipping manifest");
            return;
        };

        let manifest_record = self.map.allocate(ContainerKind::Scene);
        let bytes =
            manifest::build_manifest(&self.map, key, placement.target.record, &pre_compaction);
        patches.push(Patch::with_sub_type(
            manifest_record,
            TypeTag::BEHAVIOR,
            SUB_TYPE_MANIFEST,
            bytes,
        ));
        log::debug!("{key} manifest queued as scene record {manifest_record}");

        let Some(components) = tree.child_mut("components").and_then(Field::as_array_mut) else {
            return;
        };
        components
            .items
            .retain(|item| manifest::element_pointer(item).is_some_and(|ptr| !ptr.is_null()));
        components.push(component_ref(manifest_record));
    }

    /// Re-root a streamed payload path in the source container's directory,
    /// which is where the payload actually stays after consolidation.
    fn fixup_payload_path(&self, key: &SourceKey, tree: &mut Field, path: &[&str]) {
        let Some(dir) = self.resolver.origin_dir(&key.origin) else {
            log::warn!("no directory known for origin of {key}, skipping path fixup");
            return;
        };
        let Some(field) = tree.child_path_mut(path) else {
            log::warn!("{key} has no `{}` field, skipping path fixup", path.join("."));
            return;
        };
        match field.as_str() {
            // An empty path means no external payload; nothing to re-root.
            Some("") => {}
            Some(old) => {
                let joined = dir.join(old);
                field.set_str(joined.to_string_lossy());
            }
            None => {
                log::warn!("{key} `{}` is not a string, skipping path fixup", path.join("."))
            }
        }
    }

    /// Behaviors keep their script pointer source-valued through rewriting;
    /// resolve it here to verify the binding and name the bound class.
    fn fixup_behavior(&self, key: &SourceKey, tree: &mut Field) {
        if tree.child("entity").and_then(Field::as_pointer).is_none() {
            log::warn!("{key} has no `entity` pointer, skipping script check");
            return;
        }
        let Some(script) = tree.child("script").and_then(Field::as_pointer).copied() else {
            log::warn!("{key} has no `script` pointer, skipping script check");
            return;
        };
        if script.is_null() {
            log::warn!("{key} has a null script binding");
            return;
        }

        match self.resolver.resolve(&key.origin, script.file_ref, script.record) {
            Ok(resolved) if resolved.type_tag == TypeTag::SCRIPT_CLASS => {
                let class = self.resolver.field_tree(&resolved.key).ok().and_then(|t| {
                    t.child("class_name")
                        .and_then(Field::as_str)
                        .map(str::to_owned)
                });
                match class {
                    Some(class) => log::debug!("{key} binds script class `{class}`"),
                    None => log::debug!("{key} binds script {}", resolved.key),
                }
            }
            Ok(resolved) => log::warn!(
                "{key} script reference lands on {} tagged {}",
                resolved.key,
                resolved.type_tag
            ),
            Err(err) => log::warn!("{key} script reference is dangling: {err}"),
        }
    }
}

/// Scripts that lived in the legacy assembly are rebound to the consolidated
/// module. Applied to the script-class record's own patch, so the result does
/// not depend on which behaviors were processed first.
fn fixup_script_class(key: &SourceKey, tree: &mut Field) {
    let Some(field) = tree.child_mut("assembly") else {
        log::warn!("{key} has no `assembly` field, skipping rebind");
        return;
    };
    if field.as_str() == Some(LEGACY_ASSEMBLY) {
        field.set_str(REBOUND_ASSEMBLY);
        log::debug!("{key} assembly rebound to {REBOUND_ASSEMBLY}");
    }
}

fn component_ref(record: RecordId) -> Field {
    Field::composite(
        "item",
        "ComponentRef",
        vec![Field::pointer(
            "ref",
            "Pointer<Component>",
            FileRef::SELF_FILE,
            record,
        )],
    )
}
