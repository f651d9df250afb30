//! Little-endian payload codec. Strings are an i32 count plus UTF-8 bytes,
//! zero-padded to 4; arrays are an i32 count plus elements, padded the same
//! way; pointers are i32 file ref + i64 record id.

use std::sync::Arc;

use corral_ids::{FileRef, RecordId};

use crate::field::{ArrayData, Field, FieldData, FieldError, PointerData, Scalar};
use crate::template::{FieldTemplate, ScalarKind, TemplateData};

// ---- ByteWriter ----

/// Append-only little-endian writer backing the encode side.
#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Count-string: i32 length, UTF-8 bytes, zero padding to 4.
    pub fn write_str(&mut self, s: &str) {
        self.write_i32(s.len() as i32);
        self.buf.extend_from_slice(s.as_bytes());
        self.align4();
    }

    pub fn align4(&mut self) {
        while self.buf.len() % 4 != 0 {
            self.buf.push(0);
        }
    }
}

// ---- ByteReader ----

/// Bounds-checked reader over one record payload.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], FieldError> {
        if self.remaining() < n {
            return Err(FieldError::Truncated {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], FieldError> {
        let slice = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, FieldError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, FieldError> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, FieldError> {
        Ok(u16::from_le_bytes(self.take_array::<2>()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, FieldError> {
        Ok(i16::from_le_bytes(self.take_array::<2>()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, FieldError> {
        Ok(u32::from_le_bytes(self.take_array::<4>()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, FieldError> {
        Ok(i32::from_le_bytes(self.take_array::<4>()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, FieldError> {
        Ok(u64::from_le_bytes(self.take_array::<8>()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, FieldError> {
        Ok(i64::from_le_bytes(self.take_array::<8>()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, FieldError> {
        Ok(f32::from_le_bytes(self.take_array::<4>()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, FieldError> {
        Ok(f64::from_le_bytes(self.take_array::<8>()?))
    }

    pub fn read_str(&mut self) -> Result<Arc<str>, FieldError> {
        let offset = self.pos;
        let count = self.read_i32()?;
        if count < 0 {
            return Err(FieldError::NegativeCount { offset, count });
        }
        let bytes = self.take(count as usize)?;
        let s = std::str::from_utf8(bytes).map_err(|_| FieldError::BadString { offset })?;
        let s = Arc::<str>::from(s);
        self.align4()?;
        Ok(s)
    }

    /// Skip forward to the next 4-byte boundary. Running past the end of the
    /// payload is a truncation.
    pub fn align4(&mut self) -> Result<(), FieldError> {
        let target = (self.pos + 3) & !3;
        if target > self.buf.len() {
            return Err(FieldError::Truncated {
                offset: self.pos,
                needed: target - self.buf.len(),
            });
        }
        self.pos = target;
        Ok(())
    }
}

// ---- Record payload encode/decode ----

/// Serialize a field tree. Array fields write their declared length, so a
/// structural pass must keep lengths in sync before encoding.
pub fn encode(field: &Field) -> Vec<u8> {
    let mut w = ByteWriter::new();
    encode_field(field, &mut w);
    w.into_bytes()
}

fn encode_field(field: &Field, w: &mut ByteWriter) {
    match &field.data {
        FieldData::Scalar(s) => encode_scalar(s, w),
        FieldData::Pointer(p) => {
            w.write_i32(p.file_ref.get());
            w.write_i64(p.record.get());
        }
        FieldData::Composite(children) => {
            for child in children {
                encode_field(child, w);
            }
        }
        FieldData::Array(a) => {
            w.write_i32(a.declared_len as i32);
            for item in &a.items {
                encode_field(item, w);
            }
            w.align4();
        }
    }
}

fn encode_scalar(s: &Scalar, w: &mut ByteWriter) {
    match s {
        Scalar::Bool(v) => w.write_u8(*v as u8),
        Scalar::I8(v) => w.write_i8(*v),
        Scalar::U8(v) => w.write_u8(*v),
        Scalar::I16(v) => w.write_i16(*v),
        Scalar::U16(v) => w.write_u16(*v),
        Scalar::I32(v) => w.write_i32(*v),
        Scalar::U32(v) => w.write_u32(*v),
        Scalar::I64(v) => w.write_i64(*v),
        Scalar::U64(v) => w.write_u64(*v),
        Scalar::F32(v) => w.write_f32(*v),
        Scalar::F64(v) => w.write_f64(*v),
        Scalar::Str(v) => w.write_str(v),
    }
}

/// Decode one record payload against its template. The whole payload must be
/// consumed; leftover bytes mean the template does not match the data.
pub fn decode(template: &FieldTemplate, bytes: &[u8]) -> Result<Field, FieldError> {
    let mut r = ByteReader::new(bytes);
    let field = decode_field(template, &mut r)?;
    if r.remaining() > 0 {
        return Err(FieldError::TrailingBytes {
            schema: template.schema.to_string(),
            remaining: r.remaining(),
        });
    }
    Ok(field)
}

fn decode_field(template: &FieldTemplate, r: &mut ByteReader<'_>) -> Result<Field, FieldError> {
    let data = match &template.data {
        TemplateData::Scalar(kind) => FieldData::Scalar(decode_scalar(*kind, r)?),
        TemplateData::Pointer => {
            let file_ref = FileRef::new(r.read_i32()?);
            let record = RecordId::new(r.read_i64()?);
            FieldData::Pointer(PointerData::new(file_ref, record))
        }
        TemplateData::Composite(children) => {
            let mut fields = Vec::with_capacity(children.len());
            for child in children {
                fields.push(decode_field(child, r)?);
            }
            FieldData::Composite(fields)
        }
        TemplateData::Array(elem) => {
            let offset = r.position();
            let count = r.read_i32()?;
            if count < 0 {
                return Err(FieldError::NegativeCount { offset, count });
            }
            // Every element consumes at least one byte, so a count past the
            // end of the payload can be rejected before any allocation.
            if count as usize > r.remaining() {
                return Err(FieldError::Truncated {
                    offset: r.position(),
                    needed: count as usize - r.remaining(),
                });
            }
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(decode_field(elem, r)?);
            }
            r.align4()?;
            FieldData::Array(ArrayData {
                declared_len: count as u32,
                elem: elem.elem_kind(),
                items,
            })
        }
    };
    Ok(Field {
        name: template.name.clone(),
        schema: template.schema.clone(),
        data,
    })
}

fn decode_scalar(kind: ScalarKind, r: &mut ByteReader<'_>) -> Result<Scalar, FieldError> {
    Ok(match kind {
        ScalarKind::Bool => Scalar::Bool(r.read_u8()? != 0),
        ScalarKind::I8 => Scalar::I8(r.read_i8()?),
        ScalarKind::U8 => Scalar::U8(r.read_u8()?),
        ScalarKind::I16 => Scalar::I16(r.read_i16()?),
        ScalarKind::U16 => Scalar::U16(r.read_u16()?),
        ScalarKind::I32 => Scalar::I32(r.read_i32()?),
        ScalarKind::U32 => Scalar::U32(r.read_u32()?),
        ScalarKind::I64 => Scalar::I64(r.read_i64()?),
        ScalarKind::U64 => Scalar::U64(r.read_u64()?),
        ScalarKind::F32 => Scalar::F32(r.read_f32()?),
        ScalarKind::F64 => Scalar::F64(r.read_f64()?),
        ScalarKind::Str => Scalar::Str(r.read_str()?),
    })
}
