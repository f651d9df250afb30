//! Decoded field trees: the in-memory form of one serialized record payload.
//! Pointer fields are a first-class variant so reference passes never have to
//! string-match schemas while walking; the schema string is still kept on the
//! field for the one place it matters (script pointers).

use std::fmt;
use std::sync::Arc;

use corral_ids::{FileRef, RecordId};
use thiserror::Error;

/// Schema carried by pointer fields that bind a behavior to its script class.
/// These stay source-valued through reference rewriting.
pub const SCRIPT_POINTER_SCHEMA: &str = "Pointer<Script>";

/// Errors for malformed payloads and schema violations. `MissingField` is the
/// one recoverable case (a fixup can be skipped); the rest abort a run.
#[derive(Error, Debug, PartialEq)]
pub enum FieldError {
    #[error("payload ended early at offset {offset} (needed {needed} more bytes)")]
    Truncated { offset: usize, needed: usize },

    #[error("string at offset {offset} is not valid UTF-8")]
    BadString { offset: usize },

    #[error("negative count {count} at offset {offset}")]
    NegativeCount { offset: usize, count: i32 },

    #[error("{remaining} trailing bytes after decoding `{schema}`")]
    TrailingBytes { schema: String, remaining: usize },

    #[error("array `{name}` declares {declared} elements but holds {actual}")]
    LengthMismatch {
        name: String,
        declared: u32,
        actual: usize,
    },

    #[error("required field `{name}` is missing")]
    MissingField { name: String },

    #[error("field `{name}` is not an array")]
    NotAnArray { name: String },

    #[error("field `{name}` is not a string")]
    NotAString { name: String },

    #[error("field `{name}` is not a pointer")]
    NotAPointer { name: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(Arc<str>),
}

impl Scalar {
    /// Integer value widened to i64; None for floats and strings.
    #[inline]
    pub fn as_i64_lossy(&self) -> Option<i64> {
        match *self {
            Scalar::Bool(v) => Some(v as i64),
            Scalar::I8(v) => Some(v as i64),
            Scalar::U8(v) => Some(v as i64),
            Scalar::I16(v) => Some(v as i64),
            Scalar::U16(v) => Some(v as i64),
            Scalar::I32(v) => Some(v as i64),
            Scalar::U32(v) => Some(v as i64),
            Scalar::I64(v) => Some(v),
            Scalar::U64(v) => i64::try_from(v).ok(),
            Scalar::F32(_) | Scalar::F64(_) | Scalar::Str(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::I8(v) => write!(f, "{v}"),
            Scalar::U8(v) => write!(f, "{v}"),
            Scalar::I16(v) => write!(f, "{v}"),
            Scalar::U16(v) => write!(f, "{v}"),
            Scalar::I32(v) => write!(f, "{v}"),
            Scalar::U32(v) => write!(f, "{v}"),
            Scalar::I64(v) => write!(f, "{v}"),
            Scalar::U64(v) => write!(f, "{v}"),
            Scalar::F32(v) => write!(f, "{v}"),
            Scalar::F64(v) => write!(f, "{v}"),
            Scalar::Str(v) => write!(f, "{:?}", v.as_ref()),
        }
    }
}

/// What an array holds, captured at build time so scalar arrays can be
/// pruned without inspecting elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElemKind {
    Scalar,
    Composite,
    Pointer,
}

/// The two-value payload of a pointer field: externals index + record id.
/// `record == 0` is the canonical null reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointerData {
    pub file_ref: FileRef,
    pub record: RecordId,
}

impl PointerData {
    pub const fn new(file_ref: FileRef, record: RecordId) -> Self {
        Self { file_ref, record }
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        self.record.is_nil()
    }
}

/// Array payload. `declared_len` is what gets serialized and may drift from
/// `items.len()` while a structural pass is mid-edit; `sync_len` restores it.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayData {
    pub declared_len: u32,
    pub elem: ElemKind,
    pub items: Vec<Field>,
}

impl ArrayData {
    pub fn push(&mut self, item: Field) {
        self.items.push(item);
        self.sync_len();
    }

    #[inline]
    pub fn sync_len(&mut self) {
        self.declared_len = self.items.len() as u32;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldData {
    Scalar(Scalar),
    Composite(Vec<Field>),
    Array(ArrayData),
    Pointer(PointerData),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: Arc<str>,
    pub schema: Arc<str>,
    pub data: FieldData,
}

// -------------------- Constructors --------------------

impl Field {
    pub fn scalar(name: impl Into<Arc<str>>, schema: impl Into<Arc<str>>, value: Scalar) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            data: FieldData::Scalar(value),
        }
    }

    pub fn composite(
        name: impl Into<Arc<str>>,
        schema: impl Into<Arc<str>>,
        children: Vec<Field>,
    ) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            data: FieldData::Composite(children),
        }
    }

    pub fn array(
        name: impl Into<Arc<str>>,
        schema: impl Into<Arc<str>>,
        elem: ElemKind,
        items: Vec<Field>,
    ) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            data: FieldData::Array(ArrayData {
                declared_len: items.len() as u32,
                elem,
                items,
            }),
        }
    }

    pub fn pointer(
        name: impl Into<Arc<str>>,
        schema: impl Into<Arc<str>>,
        file_ref: FileRef,
        record: RecordId,
    ) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            data: FieldData::Pointer(PointerData::new(file_ref, record)),
        }
    }
}

// -------------------- Accessors --------------------

impl Field {
    #[inline]
    pub fn is_pointer(&self) -> bool {
        matches!(self.data, FieldData::Pointer(_))
    }

    #[inline]
    pub fn is_script_pointer(&self) -> bool {
        self.is_pointer() && self.schema.as_ref() == SCRIPT_POINTER_SCHEMA
    }

    #[inline]
    pub fn as_pointer(&self) -> Option<&PointerData> {
        match &self.data {
            FieldData::Pointer(p) => Some(p),
            _ => None,
        }
    }

    #[inline]
    pub fn pointer_mut(&mut self) -> Option<&mut PointerData> {
        match &mut self.data {
            FieldData::Pointer(p) => Some(p),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array(&self) -> Option<&ArrayData> {
        match &self.data {
            FieldData::Array(a) => Some(a),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array_mut(&mut self) -> Option<&mut ArrayData> {
        match &mut self.data {
            FieldData::Array(a) => Some(a),
            _ => None,
        }
    }

    #[inline]
    pub fn children(&self) -> Option<&[Field]> {
        match &self.data {
            FieldData::Composite(c) => Some(c),
            _ => None,
        }
    }

    /// Child of a composite by field name.
    pub fn child(&self, name: &str) -> Option<&Field> {
        match &self.data {
            FieldData::Composite(children) => children.iter().find(|c| c.name.as_ref() == name),
            _ => None,
        }
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Field> {
        match &mut self.data {
            FieldData::Composite(children) => {
                children.iter_mut().find(|c| c.name.as_ref() == name)
            }
            _ => None,
        }
    }

    /// Walk nested composites, e.g. `child_path(&["stream", "path"])`.
    pub fn child_path(&self, path: &[&str]) -> Option<&Field> {
        let mut cur = self;
        for name in path {
            cur = cur.child(name)?;
        }
        Some(cur)
    }

    pub fn child_path_mut(&mut self, path: &[&str]) -> Option<&mut Field> {
        let mut cur = self;
        for name in path {
            cur = cur.child_mut(name)?;
        }
        Some(cur)
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match &self.data {
            FieldData::Scalar(Scalar::Str(s)) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self.data {
            FieldData::Scalar(Scalar::Bool(v)) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_i32(&self) -> Option<i32> {
        match self.data {
            FieldData::Scalar(Scalar::I32(v)) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self.data {
            FieldData::Scalar(Scalar::I64(v)) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_u64(&self) -> Option<u64> {
        match self.data {
            FieldData::Scalar(Scalar::U64(v)) => Some(v),
            _ => None,
        }
    }
}

// -------------------- Setters --------------------
// All return whether the value was applied; a kind mismatch leaves the
// field untouched.

impl Field {
    pub fn set_str(&mut self, value: impl AsRef<str>) -> bool {
        match &mut self.data {
            FieldData::Scalar(Scalar::Str(s)) => {
                *s = Arc::<str>::from(value.as_ref());
                true
            }
            _ => false,
        }
    }

    pub fn set_bool(&mut self, value: bool) -> bool {
        match &mut self.data {
            FieldData::Scalar(Scalar::Bool(v)) => {
                *v = value;
                true
            }
            _ => false,
        }
    }

    pub fn set_i32(&mut self, value: i32) -> bool {
        match &mut self.data {
            FieldData::Scalar(Scalar::I32(v)) => {
                *v = value;
                true
            }
            _ => false,
        }
    }

    pub fn set_i64(&mut self, value: i64) -> bool {
        match &mut self.data {
            FieldData::Scalar(Scalar::I64(v)) => {
                *v = value;
                true
            }
            _ => false,
        }
    }

    pub fn set_u64(&mut self, value: u64) -> bool {
        match &mut self.data {
            FieldData::Scalar(Scalar::U64(v)) => {
                *v = value;
                true
            }
            _ => false,
        }
    }

    pub fn set_pointer(&mut self, file_ref: FileRef, record: RecordId) -> bool {
        match &mut self.data {
            FieldData::Pointer(p) => {
                p.file_ref = file_ref;
                p.record = record;
                true
            }
            _ => false,
        }
    }
}

// -------------------- Validation --------------------

impl Field {
    /// Check declared array lengths against actual element counts, recursively.
    pub fn validate(&self) -> Result<(), FieldError> {
        match &self.data {
            FieldData::Scalar(_) | FieldData::Pointer(_) => Ok(()),
            FieldData::Composite(children) => {
                for child in children {
                    child.validate()?;
                }
                Ok(())
            }
            FieldData::Array(a) => {
                if a.declared_len as usize != a.items.len() {
                    return Err(FieldError::LengthMismatch {
                        name: self.name.to_string(),
                        declared: a.declared_len,
                        actual: a.items.len(),
                    });
                }
                for item in &a.items {
                    item.validate()?;
                }
                Ok(())
            }
        }
    }
}
