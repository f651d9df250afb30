//! The resolver boundary: how the consolidation core reaches source
//! containers without knowing their storage or byte layout.

use std::path::PathBuf;
use std::sync::Arc;

use corral_fields::Field;
use corral_ids::{FileRef, RecordId, SourceKey, TypeTag};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no record {record} behind reference {file_ref} of {origin}")]
    Unresolved {
        origin: Arc<str>,
        file_ref: FileRef,
        record: RecordId,
    },

    #[error("container {origin} is not loaded")]
    UnknownOrigin { origin: Arc<str> },
}

/// Identity and classification of a resolved reference target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRecord {
    pub key: SourceKey,
    pub type_tag: TypeTag,
}

/// Read-only access to the loaded source containers. Resolution follows the
/// referring container's externals table and is side-effect-free; `field_tree`
/// hands out an owned tree the caller is free to mutate.
pub trait AssetResolver {
    fn resolve(
        &self,
        origin: &str,
        file_ref: FileRef,
        record: RecordId,
    ) -> std::result::Result<ResolvedRecord, ResolveError>;

    fn field_tree(&self, key: &SourceKey) -> std::result::Result<Field, ResolveError>;

    /// Directory the origin container was loaded from, for payload-path
    /// fixups. None when the container is not file-backed.
    fn origin_dir(&self, origin: &str) -> Option<PathBuf>;
}
