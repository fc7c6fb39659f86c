//! Format handlers for Ninja chunk containers
//!
//! `container` is the entry point; `chunk` and `njcm` decode the chunks a
//! container references, and `common` holds the bounds-checked reader they
//! all share.

pub mod chunk;
pub mod common;
pub mod container;
pub mod njcm;

pub use common::{ByteReader, Endianness};

pub use chunk::{ChunkKind, ChunkMagic, GrndFile, NjtlFile, NmdmFile, identify_chunk};
pub use container::{
    ContainerKind, DecodeIssue, DecodeOptions, DecodeStats, Entity, IssueScope, Model,
    decode_model, decode_model_with,
};
pub use njcm::{NjcmFile, NjcmObject, NodeTransform, PositionBuffer, unpack_njcm};
