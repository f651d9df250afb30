//! patch.rs - finished record payloads queued for the target containers

use corral_ids::{RecordId, SUB_TYPE_NONE, TypeTag};

/// One finished record, ready to be written into its target container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patch {
    pub target_record: RecordId,
    pub type_tag: TypeTag,
    pub sub_type: u16,
    pub bytes: Vec<u8>,
}

impl Patch {
    pub fn new(target_record: RecordId, type_tag: TypeTag, bytes: Vec<u8>) -> Self {
        Self {
            target_record,
            type_tag,
            sub_type: SUB_TYPE_NONE,
            bytes,
        }
    }

    pub fn with_sub_type(
        target_record: RecordId,
        type_tag: TypeTag,
        sub_type: u16,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            target_record,
            type_tag,
            sub_type,
            bytes,
        }
    }
}

/// Per-container patch queues. Scene behaviors are kept apart so the scene
/// writer can emit them after the plain scene records.
#[derive(Debug, Default)]
pub struct PatchSet {
    pub scene: Vec<Patch>,
    pub asset: Vec<Patch>,
    pub scene_behavior: Vec<Patch>,
}

impl PatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a patch by its type tag: asset-like tags to the asset queue,
    /// behaviors to the trailing scene queue, everything else to the scene.
    pub fn push(&mut self, patch: Patch) {
        if patch.type_tag.is_asset() {
            self.asset.push(patch);
        } else if patch.type_tag == TypeTag::BEHAVIOR {
            self.scene_behavior.push(patch);
        } else {
            self.scene.push(patch);
        }
    }

    pub fn len(&self) -> usize {
        self.scene.len() + self.asset.len() + self.scene_behavior.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scene.is_empty() && self.asset.is_empty() && self.scene_behavior.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(record: i64, tag: TypeTag) -> Patch {
        Patch::new(RecordId::new(record), tag, vec![0xAA])
    }

    #[test]
    fn push_routes_by_tag() {
        let mut set = PatchSet::new();
        set.push(patch(1, TypeTag::ENTITY));
        set.push(patch(2, TypeTag::TEXTURE));
        set.push(patch(3, TypeTag::BEHAVIOR));
        set.push(patch(4, TypeTag::TRANSFORM));
        set.push(patch(5, TypeTag::AUDIO_CLIP));

        assert_eq!(set.scene.len(), 2);
        assert_eq!(set.asset.len(), 2);
        assert_eq!(set.scene_behavior.len(), 1);
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn queues_preserve_push_order() {
        let mut set = PatchSet::new();
        set.push(patch(3, TypeTag::TRANSFORM));
        set.push(patch(1, TypeTag::TRANSFORM));
        set.push(patch(2, TypeTag::TRANSFORM));

        let order: Vec<i64> = set.scene.iter().map(|p| p.target_record.get()).collect();
        assert_eq!(order, [3, 1, 2]);
    }

    #[test]
    fn default_sub_type_marks_regular_records() {
        let p = patch(1, TypeTag::SHADER);
        assert_eq!(p.sub_type, SUB_TYPE_NONE);
    }
}
