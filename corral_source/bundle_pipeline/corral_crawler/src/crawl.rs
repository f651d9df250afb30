//! crawl.rs - reachability pass over the source record graph
//!
//! Pre-order, register-then-recurse: a record gets its target id the moment
//! it is first seen, so ids follow discovery order. Entity records are never
//! followed through pointers; they only enter the map as roots. Arrays of
//! scalars are skipped wholesale since nothing in them can refer anywhere.

use corral_fields::{ElemKind, Field, FieldData, PointerData};
use corral_ids::{FileRef, SourceKey};

use crate::consolidate::{Consolidator, UnresolvedPolicy};
use crate::error::{ConsolidateError, Result};
use crate::source::AssetResolver;

impl<'a, R: AssetResolver> Consolidator<'a, R> {
    /// Register `root` and crawl everything reachable from it. Roots that
    /// fail to resolve are an error under either policy.
    pub fn crawl_root(&mut self, root: &SourceKey) -> Result<()> {
        if self.map.contains(root) {
            return Ok(());
        }

        let resolved = self
            .resolver
            .resolve(&root.origin, FileRef::SELF_FILE, root.record)
            .map_err(|source| ConsolidateError::UnresolvedRoot {
                key: root.clone(),
                source,
            })?;
        if self.map.contains(&resolved.key) {
            return Ok(());
        }

        let target = self.map.register(resolved.key.clone(), resolved.type_tag);
        log::debug!("root {} placed as {target}", resolved.key);

        let tree = self
            .resolver
            .field_tree(&resolved.key)
            .map_err(|source| ConsolidateError::UnresolvedRoot {
                key: root.clone(),
                source,
            })?;
        self.visit(&resolved.key.origin, &tree)?;
        self.trees.insert(resolved.key, tree);
        Ok(())
    }

    fn visit(&mut self, origin: &str, field: &Field) -> Result<()> {
        match &field.data {
            FieldData::Scalar(_) => Ok(()),
            FieldData::Composite(children) => {
                for child in children {
                    self.visit(origin, child)?;
                }
                Ok(())
            }
            FieldData::Array(array) => {
                if array.elem == ElemKind::Scalar {
                    return Ok(());
                }
                for item in &array.items {
                    self.visit(origin, item)?;
                }
                Ok(())
            }
            FieldData::Pointer(ptr) => self.visit_pointer(origin, *ptr),
        }
    }

    fn visit_pointer(&mut self, origin: &str, ptr: PointerData) -> Result<()> {
        if ptr.is_null() {
            return Ok(());
        }

        let resolved = match self.resolver.resolve(origin, ptr.file_ref, ptr.record) {
            Ok(resolved) => resolved,
            Err(err) => {
                return match self.options.unresolved {
                    UnresolvedPolicy::Prune => {
                        log::warn!("pruning dangling reference: {err}");
                        Ok(())
                    }
                    UnresolvedPolicy::Fail => Err(err.into()),
                };
            }
        };

        // Entities are roots only. A pointer at one is kept for the rewrite
        // pass to translate, but the crawl does not descend into it.
        if resolved.type_tag.is_entity() {
            return Ok(());
        }
        if self.map.contains(&resolved.key) {
            return Ok(());
        }

        let target = self.map.register(resolved.key.clone(), resolved.type_tag);
        log::debug!("{} placed as {target}", resolved.key);

        let tree = self.resolver.field_tree(&resolved.key)?;
        self.visit(&resolved.key.origin, &tree)?;
        self.trees.insert(resolved.key, tree);
        Ok(())
    }
}
