//! Decoded `.crl` containers and the directory-wide resolver over them.
//!
//! `Container` eagerly decodes every record against its payload template, so
//! the consolidation crawl only ever sees field trees. `ContainerSet` is the
//! `AssetResolver` the crawler runs against, and `write_consolidated` turns a
//! finished consolidation back into the two target containers.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use corral_crawler::{AssetResolver, Consolidation, Patch, ResolveError, ResolvedRecord};
use corral_fields::{Field, TemplateRegistry, codec};
use corral_ids::{ContainerKind, FileRef, RecordId, SourceKey, TypeTag};

use crate::crl::archive::CrlArchive;
use crate::crl::packer::{CrlRecord, write_crl};

/// One record decoded out of a container.
#[derive(Debug, Clone)]
pub struct LoadedRecord {
    pub id: RecordId,
    pub type_tag: TypeTag,
    pub sub_type: u16,
    pub tree: Field,
}

/// A fully decoded container. The origin is the file stem, so `level1.crl`
/// holds the records of origin `level1`.
#[derive(Debug)]
pub struct Container {
    origin: String,
    dir: PathBuf,
    externals: Vec<String>,
    records: HashMap<RecordId, LoadedRecord>,
    order: Vec<RecordId>,
}

impl Container {
    /// Load a `.crl` file and decode every record in it.
    pub fn load(path: &Path) -> io::Result<Self> {
        let origin = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "Container path has no UTF-8 file stem",
                )
            })?
            .to_string();
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let archive = CrlArchive::open(path)?;
        let templates = TemplateRegistry::builtin();

        let mut records = HashMap::new();
        let mut order = Vec::new();
        for entry in archive.entries() {
            let id = RecordId::new(entry.record);
            let type_tag = TypeTag::new(entry.type_tag);
            let template = templates.for_record(type_tag, entry.sub_type).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Record {id} has unknown type tag {type_tag}"),
                )
            })?;

            let bytes = archive.read_entry(entry)?;
            let tree = codec::decode(template, &bytes).map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Record {id} failed to decode: {e}"),
                )
            })?;

            order.push(id);
            records.insert(
                id,
                LoadedRecord {
                    id,
                    type_tag,
                    sub_type: entry.sub_type,
                    tree,
                },
            );
        }

        log::debug!(
            "loaded container {origin}: {} records, {} externals",
            order.len(),
            archive.externals().len()
        );

        Ok(Self {
            origin,
            dir,
            externals: archive.externals().to_vec(),
            records,
            order,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Directory the container was loaded from. External payload paths get
    /// re-rooted here during consolidation.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn externals(&self) -> &[String] {
        &self.externals
    }

    /// Origin a `FileRef` points at: 0 is this container, N the Nth
    /// externals entry.
    pub fn referenced_origin(&self, file_ref: FileRef) -> Option<&str> {
        if file_ref.is_self() {
            return Some(&self.origin);
        }
        let slot = usize::try_from(file_ref.get()).ok()?.checked_sub(1)?;
        self.externals.get(slot).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: RecordId) -> Option<&LoadedRecord> {
        self.records.get(&id)
    }

    /// Records in container order.
    pub fn records_in_order(&self) -> impl Iterator<Item = &LoadedRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    /// Entity records in container order, the usual consolidation roots.
    pub fn entity_roots(&self) -> Vec<RecordId> {
        self.order
            .iter()
            .copied()
            .filter(|id| {
                self.records
                    .get(id)
                    .is_some_and(|record| record.type_tag.is_entity())
            })
            .collect()
    }
}

/// Every container found in one directory, addressable by origin.
#[derive(Default)]
pub struct ContainerSet {
    containers: HashMap<String, Container>,
}

impl ContainerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.crl` file under `dir`, in name order.
    pub fn load_dir(dir: &Path) -> io::Result<Self> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "crl") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut set = Self::new();
        for path in &paths {
            set.insert(Container::load(path)?);
        }
        log::info!("loaded {} containers from {}", set.len(), dir.display());
        Ok(set)
    }

    /// Later inserts replace an earlier container with the same origin.
    pub fn insert(&mut self, container: Container) {
        self.containers
            .insert(container.origin().to_string(), container);
    }

    pub fn get(&self, origin: &str) -> Option<&Container> {
        self.containers.get(origin)
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Known origins in sorted order.
    pub fn origins(&self) -> Vec<&str> {
        let mut origins: Vec<&str> = self.containers.keys().map(String::as_str).collect();
        origins.sort_unstable();
        origins
    }
}

impl AssetResolver for ContainerSet {
    fn resolve(
        &self,
        origin: &str,
        file_ref: FileRef,
        record: RecordId,
    ) -> Result<ResolvedRecord, ResolveError> {
        let container = self.get(origin).ok_or_else(|| ResolveError::UnknownOrigin {
            origin: Arc::from(origin),
        })?;

        // A reference whose target cannot be reached dangles, whatever the
        // missing piece is: externals slot, container, or record.
        let unresolved = || ResolveError::Unresolved {
            origin: Arc::from(origin),
            file_ref,
            record,
        };

        let target_origin = container
            .referenced_origin(file_ref)
            .ok_or_else(unresolved)?;
        let target = self.get(target_origin).ok_or_else(unresolved)?;
        let found = target.get(record).ok_or_else(unresolved)?;

        Ok(ResolvedRecord {
            key: SourceKey::new(target_origin, record),
            type_tag: found.type_tag,
        })
    }

    fn field_tree(&self, key: &SourceKey) -> Result<Field, ResolveError> {
        let container = self
            .get(&key.origin)
            .ok_or_else(|| ResolveError::UnknownOrigin {
                origin: key.origin.clone(),
            })?;
        let record = container
            .get(key.record)
            .ok_or_else(|| ResolveError::Unresolved {
                origin: key.origin.clone(),
                file_ref: FileRef::SELF_FILE,
                record: key.record,
            })?;
        Ok(record.tree.clone())
    }

    fn origin_dir(&self, origin: &str) -> Option<PathBuf> {
        self.get(origin).map(|container| container.dir.clone())
    }
}

/// File name of one of the two fixed consolidation targets.
pub fn target_file_name(kind: ContainerKind) -> String {
    format!("{}.crl", kind.name())
}

/// Write a consolidation out as the two target containers. Each lists the
/// other as its only external, so cross-domain references (`FileRef` 1)
/// resolve between the pair.
pub fn write_consolidated(out_dir: &Path, consolidation: &Consolidation) -> io::Result<()> {
    fs::create_dir_all(out_dir)?;

    let scene_records: Vec<CrlRecord<'_>> = consolidation
        .scene
        .iter()
        .chain(&consolidation.scene_behavior)
        .map(patch_record)
        .collect();
    let asset_records: Vec<CrlRecord<'_>> =
        consolidation.asset.iter().map(patch_record).collect();

    let scene_path = out_dir.join(target_file_name(ContainerKind::Scene));
    write_crl(&scene_path, &[ContainerKind::Asset.name()], &scene_records)?;

    let asset_path = out_dir.join(target_file_name(ContainerKind::Asset));
    write_crl(&asset_path, &[ContainerKind::Scene.name()], &asset_records)?;

    log::info!(
        "wrote {} scene and {} asset records under {}",
        scene_records.len(),
        asset_records.len(),
        out_dir.display()
    );
    Ok(())
}

fn patch_record(patch: &Patch) -> CrlRecord<'_> {
    CrlRecord {
        record: patch.target_record,
        type_tag: patch.type_tag,
        sub_type: patch.sub_type,
        payload: &patch.bytes,
    }
}
