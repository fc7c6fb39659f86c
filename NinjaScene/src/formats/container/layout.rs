//! Container header, entity records and chunk-table discovery
//!
//! This is the part of container decoding that only reads tables; unpacking
//! the referenced chunks is left to the sequential or parallel driver.

use serde::Serialize;

use super::{ContainerKind, DecodeOptions, DecodedChunk, Entity};
use crate::error::{Error, Result};
use crate::formats::chunk::{
    ChunkKind, ChunkMagic, identify_chunk, unpack_grnd, unpack_njtl, unpack_nmdm,
};
use crate::formats::common::ByteReader;
use crate::formats::njcm::unpack_njcm;

/// Size of an entity record.
pub const ENTITY_RECORD_SIZE: usize = 68;

/// Number of chunk pointers in an object's chunk table.
const CHUNK_SLOTS: usize = 4;

/// Where one entity record lives and what its pointers are relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySlot {
    /// Position in the entity table (or SML slot list).
    pub slot: usize,
    /// Base for every pointer of this entity.
    pub base: usize,
    /// Absolute offset of the 68-byte record.
    pub record: usize,
}

/// Result of reading a container header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerLayout {
    pub kind: ContainerKind,
    pub entities: Vec<EntitySlot>,
    /// Absolute offsets of the trailing asset tables.
    pub asset_tables: Vec<usize>,
}

impl ContainerLayout {
    /// Read the NMLD or SML header.
    pub fn read(reader: &ByteReader<'_>, options: &DecodeOptions) -> Result<Self> {
        let magic = reader.magic(0)?;
        match magic.as_str() {
            "NMLD" => Self::read_nmld(reader, options),
            "SML" => Self::read_sml(reader, options),
            _ => Err(Error::InvalidContainerMagic(magic)),
        }
    }

    fn read_nmld(reader: &ByteReader<'_>, options: &DecodeOptions) -> Result<Self> {
        let total_size = reader.u32(0x04)? as usize;
        let entity_table = reader.u32(0x08)? as usize;
        let count = reader.u32(0x0C)? as usize;
        check_count("entities", count, options.max_entities)?;

        let entities = (0..count)
            .map(|slot| EntitySlot {
                slot,
                base: 0,
                record: entity_table + slot * ENTITY_RECORD_SIZE,
            })
            .collect();

        Ok(Self {
            kind: ContainerKind::Nmld,
            entities,
            asset_tables: vec![entity_table + total_size],
        })
    }

    fn read_sml(reader: &ByteReader<'_>, options: &DecodeOptions) -> Result<Self> {
        let count = reader.u32(0x04)? as usize;
        check_count("SML slots", count, options.max_entities)?;

        let mut entities = Vec::with_capacity(count);
        let mut asset_tables = Vec::with_capacity(count);
        for slot in 0..count {
            let descriptor = 0x08 + slot * 8;
            let base = reader.u32(descriptor)? as usize;
            let size = reader.u32(descriptor + 4)? as usize;
            entities.push(EntitySlot {
                slot,
                base,
                record: base,
            });
            asset_tables.push(base + size);
        }

        Ok(Self {
            kind: ContainerKind::Sml,
            entities,
            asset_tables,
        })
    }
}

fn check_count(what: &'static str, count: usize, max: usize) -> Result<()> {
    if count > max {
        return Err(Error::TooManyEntries { what, count });
    }
    Ok(())
}

/// A chunk referenced from an entity's chunk tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChunkRef {
    pub kind: ChunkKind,
    /// Absolute offset of the chunk magic.
    pub offset: usize,
}

/// Read the 68-byte entity record.
///
/// The returned entity has empty `linked_*` lists; the caller links the
/// references once their chunks are pooled.
pub(crate) fn read_entity(reader: &ByteReader<'_>, slot: &EntitySlot) -> Result<Entity> {
    let record = slot.record;
    reader.slice(record, ENTITY_RECORD_SIZE)?;

    Ok(Entity {
        index: reader.u32(record)?,
        unknown: reader.u32(record + 0x04)?,
        name: reader.fixed_string(record + 0x08, 16)?,
        transform: reader.f32_array::<9>(record + 0x18)?,
        base_offset: slot.base,
        linked_grnd_files: Vec::new(),
        linked_njcm_files: Vec::new(),
        linked_njtl_files: Vec::new(),
        linked_nmdm_files: Vec::new(),
    })
}

/// Walk an entity's object table and chunk tables.
///
/// Returns every known chunk referenced, in table order, duplicates
/// included.
pub(crate) fn discover_chunks(
    reader: &ByteReader<'_>,
    slot: &EntitySlot,
    entity: &Entity,
    options: &DecodeOptions,
) -> Result<Vec<ChunkRef>> {
    let object_table = slot.base + reader.u32(slot.record + 0x3C)? as usize;

    let object_count = reader.u32(object_table)? as usize;
    check_count("objects", object_count, options.max_objects)?;

    let mut chunks = Vec::new();
    for i in 0..object_count {
        let header_offset = reader.u32(object_table + 4 + i * 4)? as usize;
        if header_offset == 0 {
            continue;
        }
        let header = slot.base + header_offset;

        for k in 0..CHUNK_SLOTS {
            let pointer = reader.u32(header + k * 4)? as usize;
            if pointer == 0 {
                continue;
            }
            let offset = header + pointer;
            match identify_chunk(reader, offset)? {
                ChunkMagic::Empty => {}
                ChunkMagic::Unknown(magic) => {
                    tracing::warn!(
                        "Entity '{}': unknown chunk magic {:?} at 0x{:x}",
                        entity.name,
                        magic,
                        offset
                    );
                }
                known => {
                    if let Some(kind) = known.kind() {
                        chunks.push(ChunkRef { kind, offset });
                    }
                }
            }
        }
    }

    tracing::debug!(
        "Entity {} '{}': {} objects, {} chunk references",
        entity.index,
        entity.name,
        object_count,
        chunks.len()
    );
    Ok(chunks)
}

/// Unpack the chunk behind `chunk` with the matching unpacker.
pub(crate) fn unpack_chunk(reader: &ByteReader<'_>, chunk: ChunkRef) -> Result<DecodedChunk> {
    Ok(match chunk.kind {
        ChunkKind::Grnd => DecodedChunk::Grnd(unpack_grnd(reader, chunk.offset)?),
        ChunkKind::Njcm => DecodedChunk::Njcm(unpack_njcm(reader, chunk.offset)?),
        ChunkKind::Njtl => DecodedChunk::Njtl(unpack_njtl(reader, chunk.offset)?),
        ChunkKind::Nmdm => DecodedChunk::Nmdm(unpack_nmdm(reader, chunk.offset)?),
    })
}
