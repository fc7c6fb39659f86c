//! Mesh (material + strip) chunk decoding
//!
//! A mesh block is a sequence of records, each starting with a `u16` tag
//! whose low byte selects the record kind. Material state set by texture and
//! color records carries over to every following strip record of the block.

use serde::Serialize;

use super::vertex::PositionBuffer;
use crate::error::Result;
use crate::formats::common::ByteReader;

/// UV components are signed 8.8 fixed point.
const UV_SCALE: f32 = 256.0;

/// Record kinds of a mesh block, keyed by the low byte of the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshRecord {
    /// `0xff`: end of block (2 bytes).
    End,
    /// `0x08`: texture id. Tag bits 12-15 carry wrap flags, then
    /// `u8 quality` (unused) and `u8 texture index`.
    Texture,
    /// `0x13` / `0x17`: `u16 unknown2`, BGRA `u`, BGRA `c`.
    /// `0x17` is followed by 4 more bytes of unknown meaning.
    Color { extended: bool },
    /// `0x40` / `0x41` / `0x42`: `u16 unknown2`, `u16 meshCount`, then
    /// strips of `i16 indiceCount` entries. Entries are `i16 index`, plus
    /// `i16 u, i16 v` when `uv` is set.
    Strip { uv: bool },
    Unknown(u8),
}

impl MeshRecord {
    pub fn from_tag(tag: u16) -> Self {
        match (tag & 0xff) as u8 {
            0xff => Self::End,
            0x08 => Self::Texture,
            0x13 => Self::Color { extended: false },
            0x17 => Self::Color { extended: true },
            0x40 => Self::Strip { uv: false },
            0x41 | 0x42 => Self::Strip { uv: true },
            other => Self::Unknown(other),
        }
    }
}

/// Texture binding as declared by a `0x08` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextureRef {
    /// Index into the model's texture name list.
    pub index: u8,
    pub repeat_x: bool,
    pub repeat_y: bool,
    pub mirrored_x: bool,
    pub mirrored_y: bool,
}

impl TextureRef {
    fn from_tag(tag: u16, index: u8) -> Self {
        Self {
            index,
            repeat_y: tag & (1 << 12) == 0,
            repeat_x: tag & (1 << 13) == 0,
            mirrored_y: tag & (1 << 14) != 0,
            mirrored_x: tag & (1 << 15) != 0,
        }
    }
}

/// Material state at the time a strip record was decoded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Material {
    /// `0xRRGGBB`.
    pub color: u32,
    pub opacity: f32,
    pub texture: Option<TextureRef>,
    /// Strip winding is not applied yet, so every mesh is two-sided.
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: 0xFFFFFF,
            opacity: 1.0,
            texture: None,
            double_sided: true,
        }
    }
}

/// Triangles produced by one strip record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submesh {
    /// Position-buffer slot per triangle corner.
    pub indices: Vec<u32>,
    /// `u, v` per corner; empty for records without UVs.
    pub uvs: Vec<f32>,
    /// Resolved `x, y, z` per corner.
    pub positions: Vec<f32>,
    pub material: Material,
}

impl Submesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBlock {
    pub submeshes: Vec<Submesh>,
    /// Set when the block stopped on an unrecognized tag.
    pub error: bool,
    /// Offset just past the last consumed byte.
    pub end: usize,
}

/// Expand an indexed strip into a triangle list.
///
/// Every entry is pushed; interior entries additionally push a pair built
/// from what is already in the output: even `j` pushes
/// `(current, out[len - 2])`, odd `j > 1` pushes `(out[len - 3], current)`.
/// `[0, 1, 2, 3]` becomes `[0, 1, 2, 2, 1, 3]`.
pub fn expand_strip<T: Copy>(strip: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(strip.len().saturating_sub(2) * 3);
    let last = strip.len().saturating_sub(1);

    for (j, &current) in strip.iter().enumerate() {
        out.push(current);
        if j == 0 || j >= last {
            continue;
        }
        let len = out.len();
        if j % 2 == 0 {
            let second_to_last = out[len - 2];
            out.push(current);
            out.push(second_to_last);
        } else if j > 1 {
            let third_from_last = out[len - 3];
            out.push(third_from_last);
            out.push(current);
        }
    }

    out
}

/// Decode the mesh block at `offset`, resolving corners against `positions`.
pub fn decode_mesh_block(
    reader: &ByteReader<'_>,
    offset: usize,
    positions: &PositionBuffer,
) -> Result<MeshBlock> {
    let mut cursor = offset;
    let mut material = Material::default();
    let mut block = MeshBlock::default();

    loop {
        let tag = reader.u16(cursor)?;
        let body = cursor + 2;

        match MeshRecord::from_tag(tag) {
            MeshRecord::End => {
                cursor = body;
                break;
            }
            MeshRecord::Unknown(kind) => {
                tracing::debug!("Unknown mesh tag 0x{:02x} at 0x{:x}", kind, cursor);
                block.error = true;
                break;
            }
            MeshRecord::Texture => {
                let _quality = reader.u8(body)?;
                let index = reader.u8(body + 1)?;
                material.texture = Some(TextureRef::from_tag(tag, index));
                cursor = body + 2;
            }
            MeshRecord::Color { extended } => {
                let _unknown2 = reader.u16(body)?;
                let u = reader.slice(body + 2, 4)?;
                let c = reader.slice(body + 6, 4)?;
                material.opacity = f32::from(u[3]) / 255.0;
                material.color = bgra_to_rgb(c);
                cursor = body + 0xa;
                if extended {
                    // TODO: identify the trailing word of 0x17 color records.
                    reader.slice(cursor, 4)?;
                    cursor += 4;
                }
            }
            MeshRecord::Strip { uv } => {
                let (submesh, next) = read_strips(reader, body, uv, positions, material)?;
                cursor = next;
                if let Some(submesh) = submesh {
                    block.submeshes.push(submesh);
                }
                if cursor % 4 == 2 {
                    cursor += 2;
                }
            }
        }
    }

    block.end = cursor;
    Ok(block)
}

/// Read the strips of one strip record starting after its tag.
fn read_strips(
    reader: &ByteReader<'_>,
    offset: usize,
    uv: bool,
    positions: &PositionBuffer,
    material: Material,
) -> Result<(Option<Submesh>, usize)> {
    let _unknown2 = reader.u16(offset)?;
    let mesh_count = reader.u16(offset + 2)?;
    let mut cursor = offset + 4;

    let mut indices = Vec::new();
    let mut uvs = Vec::new();

    for _ in 0..mesh_count {
        // A negative count marks reversed winding; see `Material::double_sided`.
        let indice_count = reader.i16(cursor)?;
        cursor += 2;

        let count = indice_count.unsigned_abs() as usize;
        let mut strip = Vec::with_capacity(count);
        let mut strip_uvs = Vec::with_capacity(if uv { count } else { 0 });
        for _ in 0..count {
            let index = reader.i16(cursor)?;
            strip.push(u32::from(index as u16));
            cursor += 2;
            if uv {
                let u = f32::from(reader.i16(cursor)?) / UV_SCALE;
                let v = f32::from(reader.i16(cursor + 2)?) / UV_SCALE;
                strip_uvs.push([u, v]);
                cursor += 4;
            }
        }

        indices.extend(expand_strip(&strip));
        uvs.extend(expand_strip(&strip_uvs).into_iter().flatten());
    }

    if positions.is_empty() {
        return Ok((None, cursor));
    }

    let mut resolved = Vec::with_capacity(indices.len() * 3);
    for &index in &indices {
        let position = positions.get(index as usize).unwrap_or_else(|| {
            tracing::trace!("Strip index {} outside the position buffer", index);
            [0.0; 3]
        });
        resolved.extend_from_slice(&position);
    }

    Ok((
        Some(Submesh {
            indices,
            uvs,
            positions: resolved,
            material,
        }),
        cursor,
    ))
}

/// `(R << 16) | (G << 8) | B` from a BGRA quad.
fn bgra_to_rgb(quad: &[u8]) -> u32 {
    (u32::from(quad[2]) << 16) | (u32::from(quad[1]) << 8) | u32::from(quad[0])
}
