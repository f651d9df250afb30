//! consolidate.rs - run driver: crawl roots, then rewrite and patch

use corral_fields::{Field, codec};
use corral_ids::{SourceKey, TargetRef};
use rustc_hash::FxHashMap;

use crate::error::{ConsolidateError, Result};
use crate::identity::IdentityMap;
use crate::patch::{Patch, PatchSet};
use crate::rewrite;
use crate::source::AssetResolver;

/// What to do with a reference whose source record cannot be resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnresolvedPolicy {
    /// Null the reference out and keep going.
    #[default]
    Prune,
    /// Abort the run with the resolve error.
    Fail,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Options {
    pub unresolved: UnresolvedPolicy,
}

/// Output of one consolidation run. Scene behaviors are already ordered
/// after the plain scene records; a container writer emits `scene` then
/// `scene_behavior` into the scene container and `asset` into the other.
#[derive(Debug)]
pub struct Consolidation {
    pub scene: Vec<Patch>,
    pub asset: Vec<Patch>,
    pub scene_behavior: Vec<Patch>,
    /// Source identity to final placement, in discovery order.
    pub remap: Vec<(SourceKey, TargetRef)>,
}

impl Consolidation {
    pub fn scene_record_count(&self) -> usize {
        self.scene.len() + self.scene_behavior.len()
    }

    pub fn asset_record_count(&self) -> usize {
        self.asset.len()
    }
}

/// Drives one run over a resolver. Roots are crawled first, which freezes
/// the identity map; `finish` then rewrites every placed record and queues
/// the patches.
pub struct Consolidator<'a, R: AssetResolver> {
    pub(crate) resolver: &'a R,
    pub(crate) options: Options,
    pub(crate) map: IdentityMap,
    /// Field trees cached by the crawl so `finish` does not fetch twice.
    pub(crate) trees: FxHashMap<SourceKey, Field>,
}

impl<'a, R: AssetResolver> Consolidator<'a, R> {
    pub fn new(resolver: &'a R, options: Options) -> Self {
        Self {
            resolver,
            options,
            map: IdentityMap::new(),
            trees: FxHashMap::default(),
        }
    }

    pub fn identity(&self) -> &IdentityMap {
        &self.map
    }

    /// Rewrite every placed record against the frozen identity map, apply
    /// the per-type structural pass, and queue the encoded payloads.
    pub fn finish(mut self) -> Result<Consolidation> {
        let mut patches = PatchSet::new();
        let mut remap = Vec::with_capacity(self.map.len());

        // Synthesized manifests only allocate counter ids, so the placement
        // list is stable while this loop runs.
        for index in 0..self.map.len() {
            let (key, placement) = match self.map.entry_at(index) {
                Some((key, placement)) => (key.clone(), placement),
                None => break,
            };

            let mut tree = match self.trees.remove(&key) {
                Some(tree) => tree,
                None => self
                    .resolver
                    .field_tree(&key)
                    .map_err(ConsolidateError::Unresolved)?,
            };

            rewrite::rewrite_tree(
                self.resolver,
                &self.map,
                &key,
                placement.type_tag.is_asset(),
                &mut tree,
            );
            self.apply_fixups(&key, placement, &mut tree, &mut patches);
            tree.validate()?;

            patches.push(Patch::new(
                placement.target.record,
                placement.type_tag,
                codec::encode(&tree),
            ));
            remap.push((key, placement.target));
        }

        log::info!(
            "consolidated {} source records into {} scene and {} asset patches",
            remap.len(),
            patches.scene.len() + patches.scene_behavior.len(),
            patches.asset.len(),
        );

        Ok(Consolidation {
            scene: patches.scene,
            asset: patches.asset,
            scene_behavior: patches.scene_behavior,
            remap,
        })
    }
}

/// Crawl `roots` and consolidate everything reachable from them.
pub fn consolidate<R: AssetResolver>(
    resolver: &R,
    roots: &[SourceKey],
    options: Options,
) -> Result<Consolidation> {
    let mut consolidator = Consolidator::new(resolver, options);
    for root in roots {
        consolidator.crawl_root(root)?;
    }
    consolidator.finish()
}
