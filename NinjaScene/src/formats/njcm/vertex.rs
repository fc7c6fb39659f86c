//! Vertex chunk decoding
//!
//! A vertex block is a sequence of sub-blocks, each with an 8-byte header:
//! ```text
//! 0x00  u16   t1 (unused)
//! 0x02  u16   t2: low byte = format tag, bits 8-10 = accumulate mode
//! 0x04  u16   vertex count
//! 0x06  u16   base position index
//! ```
//! followed by `count` vertex records whose size depends on the format.
//! A tag of `0xff` ends the block (4-byte header only).

use serde::Serialize;

use crate::error::Result;
use crate::formats::common::ByteReader;

const TAG_END: u8 = 0xff;

/// Per-vertex record layout, selected by the low byte of `t2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VertexFormat {
    /// `0x23`: `f32[3]` position.
    Position,
    /// `0x29`: position + 8 opaque bytes (presumed normal).
    PositionNormal,
    /// `0x2a`: position + 8 opaque bytes + 4 byte color (unused).
    PositionNormalColor,
    /// `0x2c`: position + `u16` scale (unused) + `u16` index shift.
    PositionWeight,
}

impl VertexFormat {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x23 => Some(Self::Position),
            0x29 => Some(Self::PositionNormal),
            0x2a => Some(Self::PositionNormalColor),
            0x2c => Some(Self::PositionWeight),
            _ => None,
        }
    }

    /// Bytes following the position in each record.
    pub fn trailer_size(self) -> usize {
        match self {
            Self::Position => 0,
            Self::PositionNormal => 8,
            Self::PositionNormalColor => 8 + 4,
            Self::PositionWeight => 4,
        }
    }

    pub fn stride(self) -> usize {
        12 + self.trailer_size()
    }
}

/// Shared index-addressed position storage for one NJCM file.
///
/// Slots are written sparsely; unwritten slots below the highest written
/// index read as the origin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionBuffer {
    values: Vec<f32>,
}

impl PositionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot at `index`, growing the buffer as needed.
    pub fn set(&mut self, index: usize, position: [f32; 3]) {
        let end = index * 3 + 3;
        if self.values.len() < end {
            self.values.resize(end, 0.0);
        }
        self.values[index * 3..end].copy_from_slice(&position);
    }

    pub fn get(&self, index: usize) -> Option<[f32; 3]> {
        let slot = self.values.get(index * 3..index * 3 + 3)?;
        Some([slot[0], slot[1], slot[2]])
    }

    /// Number of addressable slots.
    pub fn len(&self) -> usize {
        self.values.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Flat `x, y, z` view of every slot.
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Result of decoding one vertex block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexBlock {
    /// Every position read, in stream order, flattened.
    pub vertices: Vec<f32>,
    /// Set when the block stopped on an unrecognized tag.
    pub error: bool,
    /// Offset just past the last consumed byte.
    pub end: usize,
}

/// Decode the vertex block at `offset` into `positions`.
///
/// Out-of-range reads are errors; an unknown tag only stops this block.
pub fn decode_vertex_block(
    reader: &ByteReader<'_>,
    offset: usize,
    positions: &mut PositionBuffer,
) -> Result<VertexBlock> {
    let mut cursor = offset;
    let mut block = VertexBlock::default();

    loop {
        let _t1 = reader.u16(cursor)?;
        let t2 = reader.u16(cursor + 2)?;
        let tag = (t2 & 0xff) as u8;

        if tag == TAG_END {
            cursor += 4;
            break;
        }
        let Some(format) = VertexFormat::from_tag(tag) else {
            tracing::debug!("Unknown vertex tag 0x{:02x} at 0x{:x}", tag, cursor);
            block.error = true;
            break;
        };

        let count = reader.u16(cursor + 4)? as usize;
        let base_position = reader.u16(cursor + 6)? as usize;
        cursor += 8;

        let accumulate = (t2 >> 8) & 0x7;
        if accumulate != 0 {
            // TODO: add into the existing slot instead of overwriting once the
            // accumulate modes in bits 8-10 are identified.
            tracing::trace!("Vertex accumulate mode {} ignored at 0x{:x}", accumulate, cursor);
        }

        tracing::trace!(
            "Vertex sub-block {:?}: {} vertices from index {}",
            format,
            count,
            base_position
        );

        for i in 0..count {
            let position = reader.f32_array::<3>(cursor)?;
            let index = match format {
                VertexFormat::PositionWeight => {
                    let _scale = reader.u16(cursor + 12)?;
                    base_position + reader.u16(cursor + 14)? as usize
                }
                _ => base_position + i,
            };
            // Trailers of the normal/color formats are skipped unread.
            reader.slice(cursor, format.stride())?;
            cursor += format.stride();

            positions.set(index, position);
            block.vertices.extend_from_slice(&position);
        }
    }

    block.end = cursor;
    Ok(block)
}
