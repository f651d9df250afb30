//! On-disk layout of a `.crl` container:
//!
//! ```text
//! header | externals table | record payloads | index
//! ```
//!
//! All integers are little-endian. The index is addressed by record id, and
//! the externals table maps `FileRef` values 1..=N to the origins of other
//! containers (0 always means the container itself).

use std::io::{self, Read, Write};

pub const CRL_MAGIC: [u8; 4] = *b"CRL1";
pub const CRL_VERSION: u32 = 1;

pub const FLAG_COMPRESSED: u32 = 1; // Bit 0: payload is deflate compressed

/// Container header
#[derive(Debug, Clone, Copy)]
pub struct CrlHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub record_count: u32,
    pub index_offset: u64,
}

/// Entry metadata written into the index
#[derive(Debug, Clone)]
pub struct CrlEntryMeta {
    pub record: i64,
    pub type_tag: i32,
    pub sub_type: u16,
    pub flags: u32,
    pub offset: u64,
    pub size: u64, // Stored size (compressed if FLAG_COMPRESSED)
    pub original_size: u64,
}

fn read_exact_array<const N: usize, R: Read>(reader: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_u16<R: Read>(reader: &mut R) -> io::Result<u16> {
    Ok(u16::from_le_bytes(read_exact_array::<2, _>(reader)?))
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    Ok(u32::from_le_bytes(read_exact_array::<4, _>(reader)?))
}

fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    Ok(u64::from_le_bytes(read_exact_array::<8, _>(reader)?))
}

fn read_i32<R: Read>(reader: &mut R) -> io::Result<i32> {
    Ok(i32::from_le_bytes(read_exact_array::<4, _>(reader)?))
}

fn read_i64<R: Read>(reader: &mut R) -> io::Result<i64> {
    Ok(i64::from_le_bytes(read_exact_array::<8, _>(reader)?))
}

pub fn read_header<R: Read>(reader: &mut R) -> io::Result<CrlHeader> {
    let magic = read_exact_array::<4, _>(reader)?;
    if magic != CRL_MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Not a CRL container",
        ));
    }

    Ok(CrlHeader {
        magic,
        version: read_u32(reader)?,
        record_count: read_u32(reader)?,
        index_offset: read_u64(reader)?,
    })
}

pub fn write_header<W: Write>(writer: &mut W, header: &CrlHeader) -> io::Result<()> {
    writer.write_all(&header.magic)?;
    writer.write_all(&header.version.to_le_bytes())?;
    writer.write_all(&header.record_count.to_le_bytes())?;
    writer.write_all(&header.index_offset.to_le_bytes())?;
    Ok(())
}

pub fn read_externals<R: Read>(reader: &mut R) -> io::Result<Vec<String>> {
    let count = read_u32(reader)?;
    let mut externals = Vec::new();

    for _ in 0..count {
        let len = read_u16(reader)? as usize;
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;
        let origin = String::from_utf8(buf).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                "External origin is not valid UTF-8",
            )
        })?;
        externals.push(origin);
    }

    Ok(externals)
}

pub fn write_externals<W: Write>(writer: &mut W, externals: &[&str]) -> io::Result<()> {
    writer.write_all(&(externals.len() as u32).to_le_bytes())?;

    for origin in externals {
        let bytes = origin.as_bytes();
        if bytes.len() > u16::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "External origin name is too long",
            ));
        }
        writer.write_all(&(bytes.len() as u16).to_le_bytes())?;
        writer.write_all(bytes)?;
    }

    Ok(())
}

pub fn read_index_entry<R: Read>(reader: &mut R) -> io::Result<CrlEntryMeta> {
    let record = read_i64(reader)?;
    let type_tag = read_i32(reader)?;
    let sub_type = read_u16(reader)?;
    let flags = read_u32(reader)?;
    let offset = read_u64(reader)?;
    let size = read_u64(reader)?;
    let original_size = read_u64(reader)?;

    Ok(CrlEntryMeta {
        record,
        type_tag,
        sub_type,
        flags,
        offset,
        size,
        original_size,
    })
}

pub fn write_index_entry<W: Write>(writer: &mut W, meta: &CrlEntryMeta) -> io::Result<()> {
    writer.write_all(&meta.record.to_le_bytes())?;
    writer.write_all(&meta.type_tag.to_le_bytes())?;
    writer.write_all(&meta.sub_type.to_le_bytes())?;
    writer.write_all(&meta.flags.to_le_bytes())?;
    writer.write_all(&meta.offset.to_le_bytes())?;
    writer.write_all(&meta.size.to_le_bytes())?;
    writer.write_all(&meta.original_size.to_le_bytes())?;
    Ok(())
}
