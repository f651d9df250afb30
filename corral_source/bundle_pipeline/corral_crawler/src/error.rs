use corral_fields::FieldError;
use corral_ids::SourceKey;
use thiserror::Error;

use crate::source::ResolveError;

/// Result type alias for consolidation runs.
pub type Result<T> = std::result::Result<T, ConsolidateError>;

#[derive(Error, Debug)]
pub enum ConsolidateError {
    /// A record payload or field tree violated its schema. Always fatal.
    #[error("malformed record payload: {0}")]
    Malformed(#[from] FieldError),

    /// A caller-supplied root did not resolve. Always fatal.
    #[error("root record {key} could not be resolved: {source}")]
    UnresolvedRoot {
        key: SourceKey,
        source: ResolveError,
    },

    /// A crawled reference did not resolve while running in strict mode.
    #[error(transparent)]
    Unresolved(#[from] ResolveError),
}
