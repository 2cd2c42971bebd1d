//! Cache byte streams.
//!
//! Every numeric field is little-endian and fixed width: counts are `u64`,
//! points and vectors `3 x f64`, colors `3 x f32`, flags one byte.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::util::{Color, DVec3, Error, Result, UnitVector3};

/// Longest accepted node name inside a `[...]` tag.
const MAX_TAG_LEN: usize = 128;

/// Longest accepted `(...)` header field.
const MAX_HEADER_LEN: usize = 1024;

/// Position-tracking output stream.
pub struct OStream<W: Write> {
    writer: W,
    pos: u64,
}

impl OStream<BufWriter<File>> {
    /// Create (truncating) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::new(BufWriter::with_capacity(256 * 1024, file)))
    }
}

impl<W: Write> OStream<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, pos: 0 }
    }

    /// Bytes written so far.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.pos += 8;
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.writer.write_i32::<LittleEndian>(value)?;
        self.pos += 4;
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.writer.write_f32::<LittleEndian>(value)?;
        self.pos += 4;
        Ok(())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.writer.write_f64::<LittleEndian>(value)?;
        self.pos += 8;
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.writer.write_u8(u8::from(value))?;
        self.pos += 1;
        Ok(())
    }

    /// Element count of a following array.
    pub fn write_count(&mut self, n: usize) -> Result<()> {
        self.write_u64(n as u64)
    }

    pub fn write_point(&mut self, p: DVec3) -> Result<()> {
        self.write_f64(p.x)?;
        self.write_f64(p.y)?;
        self.write_f64(p.z)
    }

    pub fn write_unit_vector(&mut self, v: UnitVector3) -> Result<()> {
        self.write_point(v.get())
    }

    pub fn write_color(&mut self, c: Color) -> Result<()> {
        for v in c.to_array() {
            self.write_f32(v)?;
        }
        Ok(())
    }

    /// `[name]` node tag.
    pub fn write_tag(&mut self, name: &str) -> Result<()> {
        self.write_bytes(b"[")?;
        self.write_bytes(name.as_bytes())?;
        self.write_bytes(b"]")
    }

    /// `(text)` header field.
    pub fn write_header_field(&mut self, text: &str) -> Result<()> {
        self.write_bytes(b"(")?;
        self.write_bytes(text.as_bytes())?;
        self.write_bytes(b")")
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Cursor over an in-memory cache image.
pub struct IStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> IStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current byte offset.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos as u64
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::UnexpectedEof(self.data.len() as u64));
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.read_bytes(4)?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.read_bytes(8)?))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        let offset = self.pos();
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            v => Err(Error::InvalidData { offset, msg: format!("bad flag byte {v}") }),
        }
    }

    /// Array length, checked against the bytes left for `elem_size`-byte items.
    pub fn read_count(&mut self, elem_size: usize) -> Result<usize> {
        let offset = self.pos();
        let n = self.read_u64()?;
        let fits = usize::try_from(n)
            .ok()
            .and_then(|n| n.checked_mul(elem_size.max(1)))
            .is_some_and(|bytes| bytes <= self.remaining());
        if !fits {
            return Err(Error::InvalidData {
                offset,
                msg: format!("count {n} exceeds remaining data"),
            });
        }
        Ok(n as usize)
    }

    pub fn read_point(&mut self) -> Result<DVec3> {
        let x = self.read_f64()?;
        let y = self.read_f64()?;
        let z = self.read_f64()?;
        Ok(DVec3::new(x, y, z))
    }

    pub fn read_unit_vector(&mut self) -> Result<UnitVector3> {
        Ok(UnitVector3::from_dvec3(self.read_point()?))
    }

    pub fn read_color(&mut self) -> Result<Color> {
        let offset = self.pos();
        let r = self.read_f32()?;
        let g = self.read_f32()?;
        let b = self.read_f32()?;
        Color::try_new(r, g, b).ok_or_else(|| Error::InvalidData {
            offset,
            msg: format!("color ({r}, {g}, {b}) out of range"),
        })
    }

    /// Read a `[name]` tag and return the name.
    pub fn read_tag(&mut self) -> Result<String> {
        let offset = self.pos();
        self.read_delimited(b'[', b']', MAX_TAG_LEN)
            .map_err(|msg| Error::invalid_tag(offset, msg))
    }

    /// Read a `(text)` header field and return the text.
    pub fn read_header_field(&mut self) -> Result<String> {
        let offset = self.pos();
        self.read_delimited(b'(', b')', MAX_HEADER_LEN)
            .map_err(|msg| Error::InvalidHeader { offset, msg })
    }

    fn read_delimited(&mut self, open: u8, close: u8, max: usize) -> std::result::Result<String, String> {
        let start = self.pos;
        match self.data.get(start) {
            Some(&b) if b == open => {}
            Some(&b) => return Err(format!("expected '{}', found byte 0x{b:02x}", open as char)),
            None => return Err("unexpected end of file".into()),
        }
        let body = &self.data[start + 1..];
        let Some(len) = body.iter().take(max + 1).position(|&b| b == close) else {
            return Err(format!("missing '{}' within {max} bytes", close as char));
        };
        if len == 0 {
            return Err("empty name".into());
        }
        let text = std::str::from_utf8(&body[..len]).map_err(|e| e.to_string())?;
        self.pos = start + len + 2;
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_and_scalars() {
        let mut out = OStream::new(Vec::new());
        out.write_tag("COORD_1").unwrap();
        out.write_u64(2).unwrap();
        out.write_bool(true).unwrap();
        out.write_point(DVec3::new(1.0, -2.5, 3.0)).unwrap();
        assert_eq!(out.pos(), 9 + 8 + 1 + 24);
        let bytes = out.into_inner();
        assert_eq!(&bytes[..9], b"[COORD_1]");
        assert_eq!(&bytes[9..17], &2u64.to_le_bytes());

        let mut inp = IStream::new(&bytes);
        assert_eq!(inp.read_tag().unwrap(), "COORD_1");
        assert_eq!(inp.read_u64().unwrap(), 2);
        assert!(inp.read_bool().unwrap());
        assert_eq!(inp.read_point().unwrap(), DVec3::new(1.0, -2.5, 3.0));
        assert!(inp.is_at_end());
    }

    #[test]
    fn test_bad_tags() {
        let mut inp = IStream::new(b"COORD_1]");
        assert!(matches!(inp.read_tag(), Err(Error::InvalidTag { offset: 0, .. })));
        let mut inp = IStream::new(b"[COORD_1");
        assert!(matches!(inp.read_tag(), Err(Error::InvalidTag { .. })));
        let mut inp = IStream::new(b"[]");
        assert!(inp.read_tag().is_err());
        // failed reads do not advance
        assert_eq!(inp.pos(), 0);
    }

    #[test]
    fn test_header_field() {
        let mut inp = IStream::new(b"(VERSION:2)(INTERNAL:0.0.0.0)");
        assert_eq!(inp.read_header_field().unwrap(), "VERSION:2");
        assert_eq!(inp.read_header_field().unwrap(), "INTERNAL:0.0.0.0");
    }

    #[test]
    fn test_non_utf8_text() {
        let mut inp = IStream::new(b"[TX\xffFM_1]");
        assert!(matches!(inp.read_tag(), Err(Error::InvalidTag { offset: 0, .. })));
        assert_eq!(inp.pos(), 0);
        let mut inp = IStream::new(b"(VERSION:\xfe)");
        assert!(matches!(inp.read_header_field(), Err(Error::InvalidHeader { offset: 0, .. })));
    }

    #[test]
    fn test_truncated_and_counts() {
        let mut inp = IStream::new(&[1, 2, 3]);
        assert!(matches!(inp.read_u64(), Err(Error::UnexpectedEof(3))));

        let mut out = OStream::new(Vec::new());
        out.write_count(1_000_000).unwrap();
        out.write_f64(1.0).unwrap();
        let bytes = out.into_inner();
        let mut inp = IStream::new(&bytes);
        assert!(matches!(inp.read_count(24), Err(Error::InvalidData { offset: 0, .. })));
    }

    #[test]
    fn test_flag_and_color_validation() {
        let mut inp = IStream::new(&[2]);
        assert!(matches!(inp.read_bool(), Err(Error::InvalidData { .. })));

        let mut out = OStream::new(Vec::new());
        out.write_f32(0.5).unwrap();
        out.write_f32(1.5).unwrap();
        out.write_f32(0.0).unwrap();
        let bytes = out.into_inner();
        assert!(IStream::new(&bytes).read_color().is_err());
    }
}
