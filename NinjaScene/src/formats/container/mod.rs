//! NMLD / SML model containers
//!
//! A container lists named entities. Each entity points at an object table
//! whose entries lead to 4-slot chunk tables; the chunks they reference are
//! decoded once per absolute offset and pooled on the [`Model`]. A trailing
//! asset table carries the packed `GCIX` textures.
//!
//! NMLD header (pointers are file-absolute):
//! ```text
//! 0x00  "NMLD"
//! 0x04  u32   total size of the entity region
//! 0x08  u32   entity table offset
//! 0x0C  u32   entity count
//! ```
//!
//! SML header (each slot's pointers are relative to its base offset):
//! ```text
//! 0x00  "SML\0"
//! 0x04  u32   slot count
//! 0x08  { u32 base offset, u32 size } per slot
//! ```
//!
//! Entity record (68 bytes):
//! ```text
//! 0x00  u32      index
//! 0x04  u32      unknown
//! 0x08  char[16] name
//! 0x18  f32[9]   position, rotation, scale
//! 0x3C  u32      object table pointer
//! 0x40  u32      reserved
//! ```

mod assets;
mod decoder;
mod layout;
mod options;
mod parallel;

pub use assets::{ASSET_DESCRIPTOR_SIZE, TEXTURE_MAGIC, read_asset_table};
pub use layout::{ChunkRef, ContainerLayout, ENTITY_RECORD_SIZE, EntitySlot};
pub use options::DecodeOptions;

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::formats::chunk::{ChunkKind, GrndFile, NjtlFile, NmdmFile};
use crate::formats::common::{ByteReader, Endianness};
use crate::formats::njcm::NjcmFile;

/// Container magic convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContainerKind {
    Nmld,
    Sml,
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nmld => f.write_str("NMLD"),
            Self::Sml => f.write_str("SML"),
        }
    }
}

/// A named entity and the pooled chunks it references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub index: u32,
    pub unknown: u32,
    pub name: String,
    /// Position xyz, rotation xyz, scale xyz.
    pub transform: [f32; 9],
    /// Offset all of this entity's pointers are relative to.
    pub base_offset: usize,
    pub linked_grnd_files: Vec<usize>,
    pub linked_njcm_files: Vec<usize>,
    pub linked_njtl_files: Vec<usize>,
    pub linked_nmdm_files: Vec<usize>,
}

impl Entity {
    pub fn linked(&self, kind: ChunkKind) -> &[usize] {
        match kind {
            ChunkKind::Grnd => &self.linked_grnd_files,
            ChunkKind::Njcm => &self.linked_njcm_files,
            ChunkKind::Njtl => &self.linked_njtl_files,
            ChunkKind::Nmdm => &self.linked_nmdm_files,
        }
    }

    fn link(&mut self, chunk: ChunkRef) {
        let list = match chunk.kind {
            ChunkKind::Grnd => &mut self.linked_grnd_files,
            ChunkKind::Njcm => &mut self.linked_njcm_files,
            ChunkKind::Njtl => &mut self.linked_njtl_files,
            ChunkKind::Nmdm => &mut self.linked_nmdm_files,
        };
        list.push(chunk.offset);
    }
}

/// Where a recoverable decode problem happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IssueScope {
    /// Position in the entity table, plus the name if the record was readable.
    Entity { slot: usize, name: Option<String> },
    AssetTable { offset: usize },
}

/// A problem that dropped part of the container without failing the decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeIssue {
    pub scope: IssueScope,
    pub message: String,
}

/// Number of unpack calls made per chunk kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    pub grnd_unpacked: usize,
    pub njcm_unpacked: usize,
    pub njtl_unpacked: usize,
    pub nmdm_unpacked: usize,
}

impl DecodeStats {
    fn record(&mut self, kind: ChunkKind) {
        match kind {
            ChunkKind::Grnd => self.grnd_unpacked += 1,
            ChunkKind::Njcm => self.njcm_unpacked += 1,
            ChunkKind::Njtl => self.njtl_unpacked += 1,
            ChunkKind::Nmdm => self.nmdm_unpacked += 1,
        }
    }
}

/// A decoded container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    pub kind: ContainerKind,
    /// Byte order the container was decoded with.
    pub endianness: Endianness,
    pub entities: Vec<Entity>,
    pub grnd_files: BTreeMap<usize, GrndFile>,
    pub njcm_files: BTreeMap<usize, NjcmFile>,
    pub njtl_files: BTreeMap<usize, NjtlFile>,
    pub nmdm_files: BTreeMap<usize, NmdmFile>,
    /// Raw `GCIX` payloads by asset name, in table order.
    #[serde(serialize_with = "serialize_texture_sizes")]
    pub textures: IndexMap<String, Vec<u8>>,
    pub issues: Vec<DecodeIssue>,
    pub stats: DecodeStats,
}

impl Model {
    fn new(kind: ContainerKind, endianness: Endianness) -> Self {
        Self {
            kind,
            endianness,
            entities: Vec::new(),
            grnd_files: BTreeMap::new(),
            njcm_files: BTreeMap::new(),
            njtl_files: BTreeMap::new(),
            nmdm_files: BTreeMap::new(),
            textures: IndexMap::new(),
            issues: Vec::new(),
            stats: DecodeStats::default(),
        }
    }

    /// Whether a chunk of `kind` is pooled at `offset`.
    pub fn contains_chunk(&self, kind: ChunkKind, offset: usize) -> bool {
        match kind {
            ChunkKind::Grnd => self.grnd_files.contains_key(&offset),
            ChunkKind::Njcm => self.njcm_files.contains_key(&offset),
            ChunkKind::Njtl => self.njtl_files.contains_key(&offset),
            ChunkKind::Nmdm => self.nmdm_files.contains_key(&offset),
        }
    }

    fn insert_chunk(&mut self, offset: usize, chunk: DecodedChunk) {
        match chunk {
            DecodedChunk::Grnd(file) => {
                self.grnd_files.insert(offset, file);
            }
            DecodedChunk::Njcm(file) => {
                self.njcm_files.insert(offset, file);
            }
            DecodedChunk::Njtl(file) => {
                self.njtl_files.insert(offset, file);
            }
            DecodedChunk::Nmdm(file) => {
                self.nmdm_files.insert(offset, file);
            }
        }
    }

    pub fn texture(&self, name: &str) -> Option<&[u8]> {
        self.textures.get(name).map(Vec::as_slice)
    }

    /// Texture names from the entity's first linked NJTL chunk.
    pub fn texture_names(&self, entity: &Entity) -> &[String] {
        entity
            .linked_njtl_files
            .first()
            .and_then(|offset| self.njtl_files.get(offset))
            .map(|njtl| njtl.textures.as_slice())
            .unwrap_or(&[])
    }

    /// Resolve a mesh texture index to an asset name and payload.
    ///
    /// Names are matched exactly first, then by the part before the first
    /// `.` ignoring ASCII case.
    pub fn resolve_texture(&self, entity: &Entity, index: usize) -> Option<(&str, &[u8])> {
        let wanted = self.texture_names(entity).get(index)?;
        if let Some((name, bytes)) = self.textures.get_key_value(wanted.as_str()) {
            return Some((name.as_str(), bytes.as_slice()));
        }
        let stem = texture_stem(wanted);
        self.textures
            .iter()
            .find(|(name, _)| texture_stem(name).eq_ignore_ascii_case(stem))
            .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
    }

    /// Number of objects across all pooled NJCM files.
    pub fn njcm_object_count(&self) -> usize {
        self.njcm_files.values().map(|f| f.objects.len()).sum()
    }
}

fn texture_stem(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

fn serialize_texture_sizes<S: Serializer>(
    textures: &IndexMap<String, Vec<u8>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_map(textures.iter().map(|(name, bytes)| (name, bytes.len())))
}

/// Issue for an entity that could not be decoded completely.
fn entity_issue(slot: &EntitySlot, name: Option<String>, message: String) -> DecodeIssue {
    tracing::warn!(
        "Entity slot {} ({}) dropped: {}",
        slot.slot,
        name.as_deref().unwrap_or("unreadable"),
        message
    );
    DecodeIssue {
        scope: IssueScope::Entity {
            slot: slot.slot,
            name,
        },
        message,
    }
}

fn chunk_failure(chunk: ChunkRef, error: &crate::Error) -> String {
    format!("{} chunk at 0x{:x}: {}", chunk.kind, chunk.offset, error)
}

/// One unpacked chunk, before it is pooled.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DecodedChunk {
    Grnd(GrndFile),
    Njcm(NjcmFile),
    Njtl(NjtlFile),
    Nmdm(NmdmFile),
}

/// Decode a container with default options.
///
/// # Errors
///
/// Returns [`Error::InvalidContainerMagic`] for unknown containers and
/// [`Error::OutOfBounds`] if the container header itself is truncated.
/// Problems inside entities and asset tables are collected in
/// [`Model::issues`] instead.
///
/// [`Error::InvalidContainerMagic`]: crate::Error::InvalidContainerMagic
/// [`Error::OutOfBounds`]: crate::Error::OutOfBounds
pub fn decode_model(data: &[u8]) -> Result<Model> {
    decode_model_with(data, &DecodeOptions::default())
}

/// Decode a container with explicit options.
pub fn decode_model_with(data: &[u8], options: &DecodeOptions) -> Result<Model> {
    let reader = ByteReader::new(data, options.endianness);
    let layout = ContainerLayout::read(&reader, options)?;

    tracing::debug!(
        "{} container: {} entities, {} asset tables",
        layout.kind,
        layout.entities.len(),
        layout.asset_tables.len()
    );

    let mut model = if options.parallel {
        parallel::decode_entities(&reader, &layout, options)
    } else {
        decoder::ContainerDecoder::new(&reader, layout.kind, options).decode_entities(&layout)
    };

    for &table in &layout.asset_tables {
        if let Err(e) = read_asset_table(&reader, table, options.max_assets, &mut model.textures) {
            tracing::warn!("Asset table at 0x{:x} unreadable: {}", table, e);
            model.issues.push(DecodeIssue {
                scope: IssueScope::AssetTable { offset: table },
                message: e.to_string(),
            });
        }
    }

    Ok(model)
}
