//! Field templates: the structural schemas records are decoded against.
//! The built-in registry covers the well-known type tags plus the synthesized
//! dependency manifest shape.

use std::collections::HashMap;
use std::sync::Arc;

use corral_ids::{FileRef, RecordId, SUB_TYPE_MANIFEST, TypeTag};
use once_cell::sync::Lazy;

use crate::field::{ArrayData, ElemKind, Field, FieldData, PointerData, Scalar};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Str,
}

#[derive(Clone, Debug)]
pub enum TemplateData {
    Scalar(ScalarKind),
    Composite(Vec<FieldTemplate>),
    /// Element template; the serialized form is an i32 count plus elements.
    Array(Box<FieldTemplate>),
    Pointer,
}

#[derive(Clone, Debug)]
pub struct FieldTemplate {
    pub name: Arc<str>,
    pub schema: Arc<str>,
    pub data: TemplateData,
}

impl FieldTemplate {
    pub fn scalar(name: &str, schema: &str, kind: ScalarKind) -> Self {
        Self {
            name: Arc::from(name),
            schema: Arc::from(schema),
            data: TemplateData::Scalar(kind),
        }
    }

    pub fn composite(name: &str, schema: &str, children: Vec<FieldTemplate>) -> Self {
        Self {
            name: Arc::from(name),
            schema: Arc::from(schema),
            data: TemplateData::Composite(children),
        }
    }

    pub fn array(name: &str, schema: &str, elem: FieldTemplate) -> Self {
        Self {
            name: Arc::from(name),
            schema: Arc::from(schema),
            data: TemplateData::Array(Box::new(elem)),
        }
    }

    /// Pointer to a record of the given target schema, e.g. `pointer("parent",
    /// "Transform")` carries schema `Pointer<Transform>`.
    pub fn pointer(name: &str, target: &str) -> Self {
        Self {
            name: Arc::from(name),
            schema: Arc::from(format!("Pointer<{target}>")),
            data: TemplateData::Pointer,
        }
    }

    /// The element classification an array of this template would carry.
    pub fn elem_kind(&self) -> ElemKind {
        match &self.data {
            TemplateData::Scalar(_) => ElemKind::Scalar,
            TemplateData::Pointer => ElemKind::Pointer,
            TemplateData::Composite(_) | TemplateData::Array(_) => ElemKind::Composite,
        }
    }

    /// Produce a default-valued field tree: zeroed scalars, empty strings and
    /// arrays, null pointers.
    pub fn instantiate(&self) -> Field {
        let data = match &self.data {
            TemplateData::Scalar(kind) => FieldData::Scalar(default_scalar(*kind)),
            TemplateData::Composite(children) => {
                FieldData::Composite(children.iter().map(FieldTemplate::instantiate).collect())
            }
            TemplateData::Array(elem) => FieldData::Array(ArrayData {
                declared_len: 0,
                elem: elem.elem_kind(),
                items: Vec::new(),
            }),
            TemplateData::Pointer => {
                FieldData::Pointer(PointerData::new(FileRef::SELF_FILE, RecordId::NIL))
            }
        };
        Field {
            name: self.name.clone(),
            schema: self.schema.clone(),
            data,
        }
    }
}

fn default_scalar(kind: ScalarKind) -> Scalar {
    match kind {
        ScalarKind::Bool => Scalar::Bool(false),
        ScalarKind::I8 => Scalar::I8(0),
        ScalarKind::U8 => Scalar::U8(0),
        ScalarKind::I16 => Scalar::I16(0),
        ScalarKind::U16 => Scalar::U16(0),
        ScalarKind::I32 => Scalar::I32(0),
        ScalarKind::U32 => Scalar::U32(0),
        ScalarKind::I64 => Scalar::I64(0),
        ScalarKind::U64 => Scalar::U64(0),
        ScalarKind::F32 => Scalar::F32(0.0),
        ScalarKind::F64 => Scalar::F64(0.0),
        ScalarKind::Str => Scalar::Str(Arc::from("")),
    }
}

/// Templates for every decodable record shape, keyed by type tag. Manifest
/// records share the behavior tag and are told apart by their sub-type slot.
pub struct TemplateRegistry {
    by_tag: HashMap<TypeTag, FieldTemplate>,
    manifest: FieldTemplate,
}

impl TemplateRegistry {
    pub fn builtin() -> &'static TemplateRegistry {
        &BUILTIN
    }

    pub fn get(&self, tag: TypeTag) -> Option<&FieldTemplate> {
        self.by_tag.get(&tag)
    }

    pub fn manifest(&self) -> &FieldTemplate {
        &self.manifest
    }

    /// Template for a stored record, taking the sub-type slot into account.
    pub fn for_record(&self, tag: TypeTag, sub_type: u16) -> Option<&FieldTemplate> {
        if tag == TypeTag::BEHAVIOR && sub_type == SUB_TYPE_MANIFEST {
            Some(&self.manifest)
        } else {
            self.get(tag)
        }
    }
}

static BUILTIN: Lazy<TemplateRegistry> = Lazy::new(|| {
    use FieldTemplate as T;
    use ScalarKind::*;

    let mut by_tag = HashMap::new();

    // 0x01: entity. The components array is what the structural pass compacts.
    by_tag.insert(
        TypeTag::ENTITY,
        T::composite(
            "entity",
            "Entity",
            vec![
                T::scalar("name", "string", Str),
                T::array(
                    "components",
                    "Array<ComponentRef>",
                    T::composite(
                        "item",
                        "ComponentRef",
                        vec![T::pointer("ref", "Component")],
                    ),
                ),
                T::scalar("layer", "u32", U32),
                T::scalar("active", "bool", Bool),
            ],
        ),
    );

    by_tag.insert(
        TypeTag::TRANSFORM,
        T::composite(
            "transform",
            "Transform",
            vec![
                T::pointer("entity", "Entity"),
                T::composite(
                    "local_position",
                    "Vec3",
                    vec![
                        T::scalar("x", "f32", F32),
                        T::scalar("y", "f32", F32),
                        T::scalar("z", "f32", F32),
                    ],
                ),
                T::pointer("parent", "Transform"),
                T::array("children", "Array<Pointer<Transform>>", T::pointer("item", "Transform")),
            ],
        ),
    );

    // 0x72: scripted behavior. The script pointer keeps its source value
    // through rewriting; refs carry arbitrary cross-record references.
    by_tag.insert(
        TypeTag::BEHAVIOR,
        T::composite(
            "behavior",
            "Behavior",
            vec![
                T::pointer("entity", "Entity"),
                T::scalar("enabled", "i32", I32),
                T::pointer("script", "Script"),
                T::scalar("name", "string", Str),
                T::array(
                    "refs",
                    "Array<ObjectRef>",
                    T::composite("item", "ObjectRef", vec![T::pointer("ref", "Object")]),
                ),
            ],
        ),
    );

    // 0x73: script class descriptor, the target of Pointer<Script>.
    by_tag.insert(
        TypeTag::SCRIPT_CLASS,
        T::composite(
            "script_class",
            "ScriptClass",
            vec![
                T::scalar("name", "string", Str),
                T::scalar("execution_order", "i32", I32),
                T::scalar("class_name", "string", Str),
                T::scalar("namespace", "string", Str),
                T::scalar("assembly", "string", Str),
            ],
        ),
    );

    by_tag.insert(
        TypeTag::TEXTURE,
        T::composite(
            "texture",
            "Texture",
            vec![
                T::scalar("name", "string", Str),
                T::scalar("width", "i32", I32),
                T::scalar("height", "i32", I32),
                T::scalar("format", "i32", I32),
                T::array("pixel_data", "Array<u8>", T::scalar("item", "u8", U8)),
                T::composite(
                    "stream",
                    "StreamInfo",
                    vec![
                        T::scalar("offset", "u64", U64),
                        T::scalar("size", "u32", U32),
                        T::scalar("path", "string", Str),
                    ],
                ),
            ],
        ),
    );

    by_tag.insert(
        TypeTag::AUDIO_CLIP,
        T::composite(
            "audio_clip",
            "AudioClip",
            vec![
                T::scalar("name", "string", Str),
                T::scalar("channels", "i32", I32),
                T::scalar("frequency", "i32", I32),
                T::composite(
                    "resource",
                    "StreamedResource",
                    vec![
                        T::scalar("source", "string", Str),
                        T::scalar("offset", "u64", U64),
                        T::scalar("size", "u64", U64),
                    ],
                ),
            ],
        ),
    );

    by_tag.insert(
        TypeTag::SHADER,
        T::composite(
            "shader",
            "Shader",
            vec![
                T::scalar("name", "string", Str),
                T::array("blob", "Array<u8>", T::scalar("item", "u8", U8)),
                T::array(
                    "dependencies",
                    "Array<Pointer<Shader>>",
                    T::pointer("item", "Shader"),
                ),
            ],
        ),
    );

    // Synthesized per entity root: records which source records its
    // components came from, so a later pass can diff against the originals.
    let manifest = T::composite(
        "manifest",
        "DependencyManifest",
        vec![
            T::pointer("entity", "Entity"),
            T::scalar("enabled", "i32", I32),
            T::pointer("script", "Script"),
            T::scalar("name", "string", Str),
            T::pointer("source_entity", "Entity"),
            T::scalar("source_record", "i64", I64),
            T::scalar("flags", "i32", I32),
            T::array(
                "components",
                "Array<ManifestComponent>",
                T::composite(
                    "item",
                    "ManifestComponent",
                    vec![
                        T::scalar("origin", "string", Str),
                        T::scalar("record", "i64", I64),
                    ],
                ),
            ),
            T::array(
                "overrides",
                "Array<ManifestComponent>",
                T::composite(
                    "item",
                    "ManifestComponent",
                    vec![
                        T::scalar("origin", "string", Str),
                        T::scalar("record", "i64", I64),
                    ],
                ),
            ),
        ],
    );

    TemplateRegistry { by_tag, manifest }
});
