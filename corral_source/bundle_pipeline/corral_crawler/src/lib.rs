#![forbid(unsafe_code)]

pub mod consolidate;
pub mod error;
pub mod identity;
pub mod manifest;
pub mod patch;
pub mod source;

mod crawl;
mod fixup;
mod rewrite;

pub use consolidate::{Consolidation, Consolidator, Options, UnresolvedPolicy, consolidate};
pub use error::{ConsolidateError, Result};
pub use identity::{IdentityMap, Placement};
pub use patch::{Patch, PatchSet};
pub use source::{AssetResolver, ResolveError, ResolvedRecord};
