//! Bounds-checked primitive reads over a borrowed byte buffer
//!
//! All decoders address the buffer by absolute offset (the formats are
//! pointer based, not stream based), so this is a random-access reader
//! rather than a `Cursor`.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::Serialize;

use crate::error::{Error, Result};

/// Byte order used for multi-byte reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Endianness {
    Little,
    /// GameCube byte order.
    #[default]
    Big,
}

/// Random-access reader over a read-only byte buffer.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    endian: Endianness,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8], endian: Endianness) -> Self {
        Self { data, endian }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn endianness(&self) -> Endianness {
        self.endian
    }

    /// Borrow `len` bytes starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(Error::OutOfBounds {
                offset,
                len,
                buffer_len: self.data.len(),
            })
    }

    pub fn u8(&self, offset: usize) -> Result<u8> {
        Ok(self.slice(offset, 1)?[0])
    }

    pub fn u16(&self, offset: usize) -> Result<u16> {
        let bytes = self.slice(offset, 2)?;
        Ok(match self.endian {
            Endianness::Little => LittleEndian::read_u16(bytes),
            Endianness::Big => BigEndian::read_u16(bytes),
        })
    }

    pub fn i16(&self, offset: usize) -> Result<i16> {
        let bytes = self.slice(offset, 2)?;
        Ok(match self.endian {
            Endianness::Little => LittleEndian::read_i16(bytes),
            Endianness::Big => BigEndian::read_i16(bytes),
        })
    }

    pub fn u32(&self, offset: usize) -> Result<u32> {
        let bytes = self.slice(offset, 4)?;
        Ok(match self.endian {
            Endianness::Little => LittleEndian::read_u32(bytes),
            Endianness::Big => BigEndian::read_u32(bytes),
        })
    }

    pub fn i32(&self, offset: usize) -> Result<i32> {
        let bytes = self.slice(offset, 4)?;
        Ok(match self.endian {
            Endianness::Little => LittleEndian::read_i32(bytes),
            Endianness::Big => BigEndian::read_i32(bytes),
        })
    }

    pub fn f32(&self, offset: usize) -> Result<f32> {
        let bytes = self.slice(offset, 4)?;
        Ok(match self.endian {
            Endianness::Little => LittleEndian::read_f32(bytes),
            Endianness::Big => BigEndian::read_f32(bytes),
        })
    }

    /// Read `N` consecutive f32 values.
    pub fn f32_array<const N: usize>(&self, offset: usize) -> Result<[f32; N]> {
        let mut out = [0.0; N];
        for (i, value) in out.iter_mut().enumerate() {
            *value = self.f32(offset + i * 4)?;
        }
        Ok(out)
    }

    /// Read a fixed-width, zero-terminated string.
    ///
    /// The whole field must be in range even when the terminator comes early.
    pub fn fixed_string(&self, offset: usize, len: usize) -> Result<String> {
        let bytes = self.slice(offset, len)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(len);
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Read a zero-terminated string of at most `max_len` bytes, stopping at
    /// the end of the buffer.
    pub fn c_string(&self, offset: usize, max_len: usize) -> Result<String> {
        let available = self.data.len().saturating_sub(offset).min(max_len);
        if available == 0 {
            return Err(Error::OutOfBounds {
                offset,
                len: 1,
                buffer_len: self.data.len(),
            });
        }
        self.fixed_string(offset, available)
    }

    /// Read a 4-byte chunk magic as a zero-terminated string.
    pub fn magic(&self, offset: usize) -> Result<String> {
        self.fixed_string(offset, 4)
    }
}
