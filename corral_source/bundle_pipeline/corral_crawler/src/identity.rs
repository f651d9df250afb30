//! identity.rs - source-to-target identity assignment for one run
//!
//! The identity map is run-scoped and append-only:
//! 1. The crawl registers each newly discovered record, which assigns the
//!    next id in its classified target container (counters start at 1)
//! 2. Discovery order is preserved, so patch emission is deterministic
//! 3. After the crawl the map is read-only; the structural pass may still
//!    allocate fresh ids for synthesized records, but never re-place a source
//! 4. The reverse direction (target -> source) backs manifest synthesis

use corral_ids::{ContainerKind, RecordId, SourceKey, TargetRef, TypeTag};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

/// Where one source record lands, plus the tag that classified it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub target: TargetRef,
    pub type_tag: TypeTag,
}

#[derive(Debug)]
pub struct IdentityMap {
    /// Source identity to placement, in discovery order.
    placements: IndexMap<SourceKey, Placement>,
    /// Reverse lookup into `placements` by assigned target.
    by_target: FxHashMap<TargetRef, usize>,
    next_scene: i64,
    next_asset: i64,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self {
            placements: IndexMap::new(),
            by_target: FxHashMap::default(),
            next_scene: 1,
            next_asset: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn contains(&self, key: &SourceKey) -> bool {
        self.placements.contains_key(key)
    }

    pub fn lookup(&self, key: &SourceKey) -> Option<Placement> {
        self.placements.get(key).copied()
    }

    /// Register a record or return its existing placement. A fresh
    /// registration consumes the next id of the tag's target container.
    pub fn register(&mut self, key: SourceKey, type_tag: TypeTag) -> TargetRef {
        if let Some(placement) = self.placements.get(&key) {
            return placement.target;
        }

        let container = type_tag.container_kind();
        let target = TargetRef::new(container, self.allocate(container));
        let index = self.placements.len();
        self.placements.insert(key, Placement { target, type_tag });
        self.by_target.insert(target, index);
        target
    }

    /// Consume the next id of a target container without placing a source
    /// record behind it. Synthesized records are registered this way.
    pub fn allocate(&mut self, container: ContainerKind) -> RecordId {
        let counter = match container {
            ContainerKind::Scene => &mut self.next_scene,
            ContainerKind::Asset => &mut self.next_asset,
        };
        let id = RecordId::new(*counter);
        *counter += 1;
        id
    }

    /// Which source record was placed at `target`, if any.
    pub fn source_of(&self, target: TargetRef) -> Option<&SourceKey> {
        self.by_target
            .get(&target)
            .and_then(|&index| self.placements.get_index(index))
            .map(|(key, _)| key)
    }

    pub fn entry_at(&self, index: usize) -> Option<(&SourceKey, Placement)> {
        self.placements
            .get_index(index)
            .map(|(key, placement)| (key, *placement))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&SourceKey, Placement)> {
        self.placements.iter().map(|(key, placement)| (key, *placement))
    }
}

impl Default for IdentityMap {
    fn default() -> Self {
        Self::new()
    }
}
