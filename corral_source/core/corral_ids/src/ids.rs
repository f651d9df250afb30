//! Identity vocabulary for serialized record graphs.
//! A record lives in a container; `(origin, RecordId)` is its global identity.
//! `FileRef` indexes a container's externals table (0 = the container itself),
//! and `TypeTag` carries the structural schema of the record's payload.

use std::fmt;
use std::sync::Arc;

// ---- Raw ID newtypes ----

/// Defines a thin wrapper over a raw wire integer (RecordId, FileRef, TypeTag).
/// The display format is per-type since tags print in hex and ids in decimal.
macro_rules! define_raw_id {
    ($type_name:ident, $raw:ty, $fmt:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $type_name(pub $raw);

        impl $type_name {
            #[inline]
            pub const fn new(raw: $raw) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn get(self) -> $raw {
                self.0
            }
        }

        impl fmt::Debug for $type_name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($type_name), "(", $fmt, ")"), self.0)
            }
        }

        impl fmt::Display for $type_name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, $fmt, self.0)
            }
        }
    };
}

define_raw_id!(
    RecordId,
    i64,
    "{}",
    "Record ID local to one container. 0 is the nil/null id."
);
define_raw_id!(
    FileRef,
    i32,
    "{}",
    "Index into a container's externals table. 0 = the container itself."
);
define_raw_id!(
    TypeTag,
    i32,
    "{:#04x}",
    "Structural-schema tag of a record payload."
);

impl RecordId {
    pub const NIL: RecordId = RecordId(0);

    #[inline]
    pub const fn is_nil(self) -> bool {
        self.0 == 0
    }

    /// Parse a decimal (or 0x-prefixed hex) record id, e.g. for CLI arguments.
    pub fn parse_str(s: &str) -> Result<Self, String> {
        let parsed = if let Some(hex) = s.strip_prefix("0x") {
            i64::from_str_radix(hex, 16)
        } else {
            s.parse::<i64>()
        };
        parsed
            .map(Self::new)
            .map_err(|e| format!("Invalid record id `{s}`: {e}"))
    }
}

impl FileRef {
    /// The record's own container.
    pub const SELF_FILE: FileRef = FileRef(0);
    /// The companion target container (scene <-> asset).
    pub const COMPANION: FileRef = FileRef(1);

    #[inline]
    pub const fn is_self(self) -> bool {
        self.0 == 0
    }
}

impl TypeTag {
    pub const ENTITY: TypeTag = TypeTag(0x01);
    pub const TRANSFORM: TypeTag = TypeTag(0x04);
    pub const TEXTURE: TypeTag = TypeTag(0x1c);
    pub const SHADER: TypeTag = TypeTag(0x30);
    pub const AUDIO_CLIP: TypeTag = TypeTag(0x53);
    pub const BEHAVIOR: TypeTag = TypeTag(0x72);
    pub const SCRIPT_CLASS: TypeTag = TypeTag(0x73);

    /// Opaque payloads (textures, shaders, audio) are kept apart from scene
    /// records so the scene container never carries raw media blobs.
    #[inline]
    pub const fn is_asset(self) -> bool {
        matches!(
            self,
            TypeTag::TEXTURE | TypeTag::SHADER | TypeTag::AUDIO_CLIP
        )
    }

    #[inline]
    pub const fn is_entity(self) -> bool {
        self.0 == TypeTag::ENTITY.0
    }

    /// Which of the two target containers records of this tag land in.
    /// Total over all tags: everything that is not asset-like is scene-side.
    #[inline]
    pub const fn container_kind(self) -> ContainerKind {
        if self.is_asset() {
            ContainerKind::Asset
        } else {
            ContainerKind::Scene
        }
    }
}

// ---- Script sub-type slots ----

/// Sub-type slot of a record with no script binding.
pub const SUB_TYPE_NONE: u16 = 0xFFFF;
/// Sub-type slot of a synthesized dependency manifest.
pub const SUB_TYPE_MANIFEST: u16 = 0x0000;

// ---- Target containers ----

/// The two consolidation targets. Names are reserved and never collide with
/// source container origins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContainerKind {
    Scene,
    Asset,
}

impl ContainerKind {
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            ContainerKind::Scene => "corralscene",
            ContainerKind::Asset => "corralasset",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---- Graph-wide identities ----

/// Global identity of a source record: owning container origin + local id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub origin: Arc<str>,
    pub record: RecordId,
}

impl SourceKey {
    pub fn new(origin: impl Into<Arc<str>>, record: RecordId) -> Self {
        Self {
            origin: origin.into(),
            record,
        }
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.origin, self.record)
    }
}

/// Identity of a record in one of the two target containers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetRef {
    pub container: ContainerKind,
    pub record: RecordId,
}

impl TargetRef {
    pub const fn new(container: ContainerKind, record: RecordId) -> Self {
        Self { container, record }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.record)
    }
}
