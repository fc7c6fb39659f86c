//! Chunk identification and the shallow auxiliary chunk unpackers
//!
//! Every chunk starts with a 4-byte magic followed by a `u32` size:
//!
//! | Magic  | Contents                         | Decoded as        |
//! |--------|----------------------------------|-------------------|
//! | `GRND` | ground/collision data            | [`GrndFile`]      |
//! | `NJCM` | Ninja chunk model (scene graph)  | `NjcmFile`        |
//! | `NJTL` | texture name list                | [`NjtlFile`]      |
//! | `NMDM` | motion data                      | [`NmdmFile`]      |

use serde::Serialize;

use crate::error::{Error, Result};
use crate::formats::common::ByteReader;

/// Size of an NJTL texture entry (name pointer, attributes, texture address).
const NJTL_ENTRY_SIZE: usize = 12;

/// Longest texture name accepted from an NJTL name table.
const NJTL_NAME_MAX: usize = 32;

/// Classification of a chunk magic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkMagic {
    Grnd,
    Njcm,
    Njtl,
    Nmdm,
    /// Zero-length magic (slot padding).
    Empty,
    Unknown(String),
}

impl ChunkMagic {
    pub fn from_magic(magic: &str) -> Self {
        match magic {
            "GRND" => Self::Grnd,
            "NJCM" => Self::Njcm,
            "NJTL" => Self::Njtl,
            "NMDM" => Self::Nmdm,
            "" => Self::Empty,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn kind(&self) -> Option<ChunkKind> {
        match self {
            Self::Grnd => Some(ChunkKind::Grnd),
            Self::Njcm => Some(ChunkKind::Njcm),
            Self::Njtl => Some(ChunkKind::Njtl),
            Self::Nmdm => Some(ChunkKind::Nmdm),
            Self::Empty | Self::Unknown(_) => None,
        }
    }
}

/// The four chunk kinds a container pools by offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ChunkKind {
    Grnd,
    Njcm,
    Njtl,
    Nmdm,
}

impl ChunkKind {
    pub fn magic(self) -> &'static str {
        match self {
            Self::Grnd => "GRND",
            Self::Njcm => "NJCM",
            Self::Njtl => "NJTL",
            Self::Nmdm => "NMDM",
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.magic())
    }
}

/// Read and classify the magic at `offset`.
pub fn identify_chunk(reader: &ByteReader<'_>, offset: usize) -> Result<ChunkMagic> {
    Ok(ChunkMagic::from_magic(&reader.magic(offset)?))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrndFile {
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NmdmFile {
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NjtlFile {
    pub size: u32,
    pub textures: Vec<String>,
}

/// Fail unless the chunk at `offset` carries the magic of `kind`.
pub fn expect_magic(reader: &ByteReader<'_>, offset: usize, kind: ChunkKind) -> Result<()> {
    let found = reader.magic(offset)?;
    if found != kind.magic() {
        return Err(Error::InvalidChunkMagic {
            offset,
            expected: kind.magic(),
            found,
        });
    }
    Ok(())
}

pub fn unpack_grnd(reader: &ByteReader<'_>, offset: usize) -> Result<GrndFile> {
    expect_magic(reader, offset, ChunkKind::Grnd)?;
    Ok(GrndFile {
        size: reader.u32(offset + 4)?,
    })
}

pub fn unpack_nmdm(reader: &ByteReader<'_>, offset: usize) -> Result<NmdmFile> {
    expect_magic(reader, offset, ChunkKind::Nmdm)?;
    Ok(NmdmFile {
        size: reader.u32(offset + 4)?,
    })
}

/// Unpack a texture name list.
///
/// Pointers inside the chunk are relative to the start of its body
/// (`offset + 8`).
pub fn unpack_njtl(reader: &ByteReader<'_>, offset: usize) -> Result<NjtlFile> {
    expect_magic(reader, offset, ChunkKind::Njtl)?;
    let size = reader.u32(offset + 4)?;
    let body = offset + 8;
    let list_pointer = reader.u32(body)? as usize;
    let count = reader.u32(body + 4)? as usize;

    let mut textures = Vec::new();
    if list_pointer != 0 {
        for i in 0..count {
            let entry = body + list_pointer + i * NJTL_ENTRY_SIZE;
            let name_pointer = reader.u32(entry)? as usize;
            textures.push(reader.c_string(body + name_pointer, NJTL_NAME_MAX)?);
        }
    }

    tracing::trace!("NJTL at 0x{:x}: {} texture names", offset, textures.len());
    Ok(NjtlFile { size, textures })
}
