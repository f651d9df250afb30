use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Seek, SeekFrom};
use std::path::Path;

use corral_ids::RecordId;

use super::common::{CrlEntryMeta, FLAG_COMPRESSED, read_externals, read_header, read_index_entry};
use crate::compression::decompress_deflate;

/// Parsed container handle. Payloads stay packed until read.
#[derive(Debug)]
pub struct CrlArchive {
    data: Vec<u8>,
    externals: Vec<String>,
    entries: Vec<CrlEntryMeta>,
    index: HashMap<i64, usize>,
}

impl CrlArchive {
    /// Open a `.crl` container from disk.
    pub fn open(path: &Path) -> io::Result<Self> {
        Self::from_bytes(fs::read(path)?)
    }

    /// Parse a container already in memory.
    pub fn from_bytes(data: Vec<u8>) -> io::Result<Self> {
        let mut cursor = Cursor::new(data.as_slice());
        let header = read_header(&mut cursor)?;
        let externals = read_externals(&mut cursor)?;

        cursor.seek(SeekFrom::Start(header.index_offset))?;
        let mut entries = Vec::new();
        let mut index = HashMap::new();
        for _ in 0..header.record_count {
            let entry = read_index_entry(&mut cursor)?;
            index.insert(entry.record, entries.len());
            entries.push(entry);
        }

        Ok(Self {
            data,
            externals,
            entries,
            index,
        })
    }

    /// Origins behind `FileRef` values 1..=N, in table order.
    pub fn externals(&self) -> &[String] {
        &self.externals
    }

    /// Index entries in container order.
    pub fn entries(&self) -> &[CrlEntryMeta] {
        &self.entries
    }

    pub fn record_count(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, record: RecordId) -> bool {
        self.index.contains_key(&record.get())
    }

    /// Read one record's payload, decompressing when flagged.
    pub fn read_record(&self, record: RecordId) -> io::Result<Vec<u8>> {
        let position = *self
            .index
            .get(&record.get())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Record not in container"))?;
        self.read_entry(&self.entries[position])
    }

    /// Read the payload behind one index entry.
    pub fn read_entry(&self, entry: &CrlEntryMeta) -> io::Result<Vec<u8>> {
        let start = entry.offset as usize;
        let end = start.saturating_add(entry.size as usize);
        let raw = self.data.get(start..end).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "Record data is out of bounds")
        })?;

        if entry.flags & FLAG_COMPRESSED == 0 {
            return Ok(raw.to_vec());
        }

        let decompressed = decompress_deflate(raw)?;

        // Verify decompressed size matches original_size for integrity
        if decompressed.len() as u64 != entry.original_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Decompressed size mismatch for record {}. Expected {} bytes, got {} bytes.",
                    entry.record,
                    entry.original_size,
                    decompressed.len()
                ),
            ));
        }

        Ok(decompressed)
    }
}
