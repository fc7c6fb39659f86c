//! NJCM (Ninja chunk model) scene graphs
//!
//! An NJCM chunk holds a first-child/next-sibling tree of nodes. The tree is
//! flattened here into a pre-order list where nodes refer to each other by
//! index only.
//!
//! Node layout (52 bytes, pointers relative to the chunk body):
//! ```text
//! 0x00  u32      unknown1 (evaluation flags)
//! 0x04  u32      data pointer (0 = no geometry)
//! 0x08  f32[3]   position
//! 0x14  i32[3]   rotation (binary angle units)
//! 0x20  f32[3]   scale
//! 0x2C  u32      child pointer
//! 0x30  u32      next sibling pointer
//! ```
//!
//! Data block at the data pointer:
//! ```text
//! 0x00  u32      vertices pointer
//! 0x04  u32      meshs pointer
//! 0x08  u32[4]   unknown2..unknown5
//! ```

mod mesh;
mod vertex;

pub use mesh::{
    Material, MeshBlock, MeshRecord, Submesh, TextureRef, decode_mesh_block, expand_strip,
};
pub use vertex::{PositionBuffer, VertexBlock, VertexFormat, decode_vertex_block};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::formats::chunk::{ChunkKind, expect_magic};
use crate::formats::common::ByteReader;

/// Binary angle units per radian (approximately 65536 / 2π).
pub const BAMS_PER_RADIAN: f32 = 10430.0;

/// Convert a raw binary-angle rotation to radians.
pub fn bams_to_radians(raw: i32) -> f32 {
    raw as f32 / BAMS_PER_RADIAN
}

/// Local transform of a node (rotation in radians).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeTransform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

/// One node of a flattened NJCM tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NjcmObject {
    pub index: usize,
    /// Index of the parent node; 0 for the root and for its siblings.
    pub parent_index: usize,
    /// Absolute offset of the node record.
    pub offset: usize,
    pub transform: NodeTransform,
    pub vertices_offset: Option<usize>,
    pub meshs_offset: Option<usize>,
    // Field meanings are unknown; kept raw.
    pub unknown1: u32,
    pub unknown2: u32,
    pub unknown3: u32,
    pub unknown4: u32,
    pub unknown5: u32,
}

impl NjcmObject {
    pub fn has_geometry(&self) -> bool {
        self.vertices_offset.is_some() || self.meshs_offset.is_some()
    }
}

/// A decoded NJCM chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NjcmFile {
    pub size: u32,
    pub objects: Vec<NjcmObject>,
}

/// Unpack the NJCM chunk at `offset`.
pub fn unpack_njcm(reader: &ByteReader<'_>, offset: usize) -> Result<NjcmFile> {
    expect_magic(reader, offset, ChunkKind::Njcm)?;
    let size = reader.u32(offset + 4)?;
    let base = offset + 8;
    let objects = parse_nodes(reader, base, base)?;
    tracing::trace!("NJCM at 0x{:x}: {} objects", offset, objects.len());
    Ok(NjcmFile { size, objects })
}

/// Upper bound on decoded objects per NJCM chunk.
///
/// Shared subtrees are decoded once per link, so the object count is not
/// bounded by the chunk size.
pub const MAX_OBJECTS: usize = 0x10000;

/// Flatten the node tree rooted at `root` into pre-order.
///
/// Children are visited before the next sibling; siblings inherit the parent
/// index of the node that links to them. A node reached through several links
/// is decoded again for each of them; only a link back onto its own chain is
/// rejected.
pub fn parse_nodes(reader: &ByteReader<'_>, base: usize, root: usize) -> Result<Vec<NjcmObject>> {
    let mut objects: Vec<NjcmObject> = Vec::new();
    // Index of the object whose child or next pointer led to each object.
    let mut linked_from: Vec<Option<usize>> = Vec::new();
    let mut pending = vec![(root, 0usize, None)];

    while let Some((offset, parent_index, source)) = pending.pop() {
        if on_link_chain(&objects, &linked_from, source, offset) {
            return Err(Error::InvalidFormat(format!(
                "NJCM node at 0x{offset:x} closes a link loop"
            )));
        }
        if objects.len() >= MAX_OBJECTS {
            return Err(Error::TooManyEntries {
                what: "NJCM objects",
                count: objects.len() + 1,
            });
        }

        let (mut object, child, next) = parse_node(reader, base, offset, parent_index)?;
        let index = objects.len();
        object.index = index;

        if next != 0 {
            pending.push((base + next as usize, parent_index, Some(index)));
        }
        if child != 0 {
            pending.push((base + child as usize, index, Some(index)));
        }
        objects.push(object);
        linked_from.push(source);
    }

    Ok(objects)
}

/// Whether `offset` was already decoded on the chain of links ending at
/// `source`.
fn on_link_chain(
    objects: &[NjcmObject],
    linked_from: &[Option<usize>],
    mut source: Option<usize>,
    offset: usize,
) -> bool {
    while let Some(index) = source {
        if objects[index].offset == offset {
            return true;
        }
        source = linked_from[index];
    }
    false
}

/// Read one node record; returns the node plus its child and next pointers.
fn parse_node(
    reader: &ByteReader<'_>,
    base: usize,
    offset: usize,
    parent_index: usize,
) -> Result<(NjcmObject, u32, u32)> {
    let unknown1 = reader.u32(offset)?;
    let data_pointer = reader.u32(offset + 4)?;

    let position = reader.f32_array::<3>(offset + 0x08)?;
    let rotation = [
        bams_to_radians(reader.i32(offset + 0x14)?),
        bams_to_radians(reader.i32(offset + 0x18)?),
        bams_to_radians(reader.i32(offset + 0x1C)?),
    ];
    let scale = reader.f32_array::<3>(offset + 0x20)?;

    let child = reader.u32(offset + 0x2C)?;
    let next = reader.u32(offset + 0x30)?;

    let mut object = NjcmObject {
        index: 0,
        parent_index,
        offset,
        transform: NodeTransform {
            position,
            rotation,
            scale,
        },
        vertices_offset: None,
        meshs_offset: None,
        unknown1,
        unknown2: 0,
        unknown3: 0,
        unknown4: 0,
        unknown5: 0,
    };

    if data_pointer > 0 {
        let data = base + data_pointer as usize;
        let vertices_pointer = reader.u32(data)?;
        let meshs_pointer = reader.u32(data + 4)?;
        if vertices_pointer != 0 {
            object.vertices_offset = Some(base + vertices_pointer as usize);
        }
        if meshs_pointer != 0 {
            object.meshs_offset = Some(base + meshs_pointer as usize);
        }
        object.unknown2 = reader.u32(data + 0x08)?;
        object.unknown3 = reader.u32(data + 0x0C)?;
        object.unknown4 = reader.u32(data + 0x10)?;
        object.unknown5 = reader.u32(data + 0x14)?;
    }

    Ok((object, child, next))
}
