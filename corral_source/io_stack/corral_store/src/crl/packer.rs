use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use rayon::prelude::*;

use corral_ids::{RecordId, TypeTag};

use super::common::{
    CRL_MAGIC, CRL_VERSION, CrlEntryMeta, CrlHeader, FLAG_COMPRESSED, write_externals,
    write_header, write_index_entry,
};
use crate::compression::compress_deflate_best;

/// One encoded record payload headed into a container.
#[derive(Debug, Clone, Copy)]
pub struct CrlRecord<'a> {
    pub record: RecordId,
    pub type_tag: TypeTag,
    pub sub_type: u16,
    pub payload: &'a [u8],
}

/// Build a `.crl` container from encoded record payloads.
///
/// Payloads go through deflate in parallel; the compressed form is kept
/// only when it is actually smaller than the original.
pub fn write_crl(output: &Path, externals: &[&str], records: &[CrlRecord<'_>]) -> io::Result<()> {
    let mut file = File::create(output)?;

    // Write placeholder header
    let header = CrlHeader {
        magic: CRL_MAGIC,
        version: CRL_VERSION,
        record_count: 0,
        index_offset: 0,
    };
    write_header(&mut file, &header)?;

    write_externals(&mut file, externals)?;

    let packed: Vec<Option<Vec<u8>>> = records
        .par_iter()
        .map(|record| {
            if record.payload.is_empty() {
                return Ok(None);
            }
            let compressed = compress_deflate_best(record.payload)?;

            // Only use compressed data if it's actually smaller
            if compressed.len() < record.payload.len() {
                Ok(Some(compressed))
            } else {
                Ok(None)
            }
        })
        .collect::<io::Result<_>>()?;

    let mut entries = Vec::new();

    for (record, compressed) in records.iter().zip(&packed) {
        let (data, flags): (&[u8], u32) = match compressed {
            Some(bytes) => (bytes, FLAG_COMPRESSED),
            None => (record.payload, 0),
        };

        let offset = file.stream_position()?;
        file.write_all(data)?;

        entries.push(CrlEntryMeta {
            record: record.record.get(),
            type_tag: record.type_tag.get(),
            sub_type: record.sub_type,
            flags,
            offset,
            size: data.len() as u64,
            original_size: record.payload.len() as u64,
        });
    }

    // Write index
    let index_offset = file.stream_position()?;
    for entry in &entries {
        write_index_entry(&mut file, entry)?;
    }

    // Rewrite header with correct counts
    file.seek(SeekFrom::Start(0))?;
    let header = CrlHeader {
        magic: CRL_MAGIC,
        version: CRL_VERSION,
        record_count: entries.len() as u32,
        index_offset,
    };
    write_header(&mut file, &header)?;

    Ok(())
}
