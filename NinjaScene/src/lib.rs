#![allow(non_snake_case)]
//! # NinjaScene
//!
//! A pure-Rust decoder for Ninja chunk model containers as found on GameCube
//! discs.
//!
//! ## Supported Formats
//!
//! - **NMLD / SML** - Entity containers with a trailing texture asset table
//! - **NJCM** - Node trees with vertex and strip-mesh geometry
//! - **NJTL** - Texture name lists
//! - **GRND / NMDM** - Ground and motion chunks (size only)
//! - **GCIX** - Texture payloads (extracted raw, not decoded)
//!
//! ## Quick Start
//!
//! ### Decoding a Container
//!
//! ```no_run
//! use ninjascene::formats::container::decode_model;
//!
//! let data = std::fs::read("stage.nj")?;
//! let model = decode_model(&data)?;
//! for entity in &model.entities {
//!     println!("{}: {} NJCM chunks", entity.name, entity.linked_njcm_files.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Feeding a Renderer
//!
//! ```no_run
//! use ninjascene::prelude::*;
//!
//! let data = std::fs::read("stage.nj")?;
//! let model = decode_model(&data)?;
//! let mut sink = CollectingSink::new();
//! let stats = build_scene(&model, &data, &SceneOptions::default(), &mut sink)?;
//! println!("{} meshes, {} triangles", stats.meshes, stats.triangles);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `ninjascene` command-line binary

pub mod error;
pub mod formats;
pub mod inspect;
pub mod scene;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::formats::common::{ByteReader, Endianness};
    pub use crate::formats::container::{
        ContainerKind, DecodeIssue, DecodeOptions, DecodeStats, Entity, Model, decode_model,
        decode_model_with,
    };
    pub use crate::formats::njcm::{NjcmFile, NjcmObject};
    pub use crate::inspect::{ModelInfo, inspect_bytes};
    pub use crate::scene::{
        CollectingSink, MeshSink, RenderMaterial, RenderMesh, SceneOptions, SceneStats,
        TextureBinding, build_scene,
    };
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
