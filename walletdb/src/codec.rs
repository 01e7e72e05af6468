//! Deterministic binary codec for record keys and values.
//!
//! Integers are little-endian. Strings and byte sequences carry a
//! CompactSize length prefix: 1 byte for values below 0xfd, a 0xfd marker
//! followed by 2 bytes for values up to u16::MAX, a 0xfe marker followed by
//! 4 bytes up to u32::MAX, and a 0xff marker followed by 8 bytes otherwise.
//! This must stay byte-identical to the legacy format, since it reads files
//! written by earlier versions.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

/// A cursor-backed reader over record bytes, with the short-read-on-optional-
/// trailing-field rule built in via [`Reader::at_end`].
pub struct Reader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Reader { cursor: Cursor::new(bytes) }
    }

    /// True once every byte has been consumed. Callers decoding an optional
    /// trailing field check this first and treat the field as absent rather
    /// than erroring.
    pub fn at_end(&self) -> bool {
        self.cursor.position() as usize >= self.cursor.get_ref().len()
    }

    /// Number of bytes consumed so far. Used to recover an undecoded tail,
    /// e.g. an unknown record tag's sub-key bytes.
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    /// Remaining undecoded bytes, without consuming them.
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.cursor.get_ref()[self.position()..]
    }

    fn short_read<T>(err: std::io::Error) -> Result<T> {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Err(Error::Corrupt("short read".into()))
        } else {
            Err(Error::Io(err))
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().or_else(Self::short_read)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        self.cursor.read_u32::<LittleEndian>().or_else(Self::short_read)
    }

    pub fn read_i32_le(&mut self) -> Result<i32> {
        self.cursor.read_i32::<LittleEndian>().or_else(Self::short_read)
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        self.cursor.read_u64::<LittleEndian>().or_else(Self::short_read)
    }

    pub fn read_i64_le(&mut self) -> Result<i64> {
        self.cursor.read_i64::<LittleEndian>().or_else(Self::short_read)
    }

    pub fn read_fixed(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        std::io::Read::read_exact(&mut self.cursor, &mut buf).or_else(Self::short_read)?;
        Ok(buf)
    }

    pub fn read_fixed32(&mut self) -> Result<[u8; 32]> {
        let v = self.read_fixed(32)?;
        v.try_into().map_err(|_| Error::Corrupt("expected 32 bytes".into()))
    }

    pub fn read_fixed20(&mut self) -> Result<[u8; 20]> {
        let v = self.read_fixed(20)?;
        v.try_into().map_err(|_| Error::Corrupt("expected 20 bytes".into()))
    }

    /// Reads a CompactSize length prefix.
    pub fn read_compact_size(&mut self) -> Result<u64> {
        let first = self.read_u8()?;
        match first {
            0xff => self.cursor.read_u64::<LittleEndian>().or_else(Self::short_read),
            0xfe => self.cursor.read_u32::<LittleEndian>().map(u64::from).or_else(Self::short_read),
            0xfd => self.cursor.read_u16::<LittleEndian>().map(u64::from).or_else(Self::short_read),
            n => Ok(n as u64),
        }
    }

    /// Reads a CompactSize-prefixed byte sequence.
    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_compact_size()?;
        let len = usize::try_from(len).map_err(|_| Error::Corrupt("size prefix overflow".into()))?;
        self.read_fixed(len)
    }

    /// Reads a CompactSize-prefixed UTF-8 string. The legacy format stores
    /// strings as raw bytes; invalid UTF-8 is corruption, not an I/O error.
    pub fn read_var_string(&mut self) -> Result<String> {
        let bytes = self.read_var_bytes()?;
        String::from_utf8(bytes).map_err(|_| Error::Corrupt("invalid utf-8 in string field".into()))
    }
}

/// An in-memory writer building up record bytes.
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Writer { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn write_bool(&mut self, v: bool) -> &mut Self {
        self.write_u8(v as u8)
    }

    pub fn write_u32_le(&mut self, v: u32) -> &mut Self {
        self.buf.write_u32::<LittleEndian>(v).expect("writing to a Vec never fails");
        self
    }

    pub fn write_i32_le(&mut self, v: i32) -> &mut Self {
        self.buf.write_i32::<LittleEndian>(v).expect("writing to a Vec never fails");
        self
    }

    pub fn write_u64_le(&mut self, v: u64) -> &mut Self {
        self.buf.write_u64::<LittleEndian>(v).expect("writing to a Vec never fails");
        self
    }

    pub fn write_i64_le(&mut self, v: i64) -> &mut Self {
        self.buf.write_i64::<LittleEndian>(v).expect("writing to a Vec never fails");
        self
    }

    pub fn write_fixed(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn write_compact_size(&mut self, v: u64) -> &mut Self {
        if v < 0xfd {
            self.write_u8(v as u8);
        } else if v <= u16::MAX as u64 {
            self.write_u8(0xfd);
            self.buf.write_u16::<LittleEndian>(v as u16).unwrap();
        } else if v <= u32::MAX as u64 {
            self.write_u8(0xfe);
            self.buf.write_u32::<LittleEndian>(v as u32).unwrap();
        } else {
            self.write_u8(0xff);
            self.buf.write_u64::<LittleEndian>(v).unwrap();
        }
        self
    }

    pub fn write_var_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_compact_size(bytes.len() as u64);
        self.write_fixed(bytes);
        self
    }

    pub fn write_var_string(&mut self, s: &str) -> &mut Self {
        self.write_var_bytes(s.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_size_round_trips_each_width() -> Result<()> {
        for v in [0u64, 0xfc, 0xfd, 0xffff, 0x1_0000, 0xffff_ffff, 0x1_0000_0000, u64::MAX] {
            let mut w = Writer::new();
            w.write_compact_size(v);
            let bytes = w.into_bytes();
            let mut r = Reader::new(&bytes);
            assert_eq!(r.read_compact_size()?, v);
            assert!(r.at_end());
        }
        Ok(())
    }

    #[test]
    fn compact_size_widths_match_spec() {
        let widths = [(0u64, 1), (0xfc, 1), (0xfd, 3), (0xffff, 3), (0x1_0000, 5), (u32::MAX as u64, 5), (u32::MAX as u64 + 1, 9)];
        for (v, expect_len) in widths {
            let mut w = Writer::new();
            w.write_compact_size(v);
            assert_eq!(w.into_bytes().len(), expect_len, "value {v}");
        }
    }

    #[test]
    fn var_bytes_round_trip() -> Result<()> {
        let mut w = Writer::new();
        w.write_var_bytes(b"hello wallet");
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_var_bytes()?, b"hello wallet".to_vec());
        assert!(r.at_end());
        Ok(())
    }

    #[test]
    fn short_read_on_required_field_is_corrupt() {
        let bytes = [0x05u8]; // claims 5 bytes follow, but none do
        let mut r = Reader::new(&bytes);
        assert!(matches!(r.read_var_bytes(), Err(Error::Corrupt(_))));
    }

    #[test]
    fn optional_trailing_field_absent_is_not_an_error() -> Result<()> {
        let mut w = Writer::new();
        w.write_var_bytes(b"priv");
        let bytes = w.into_bytes();
        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_var_bytes()?, b"priv".to_vec());
        assert!(r.at_end());
        // Attempting to read a trailing integrity hash when none was written:
        // callers check `at_end()` before calling read_fixed32, matching the
        // `key` record's optional trailing hash rule.
        Ok(())
    }
}
