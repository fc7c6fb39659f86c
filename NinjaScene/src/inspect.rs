//! Container inspection utilities
//!
//! Summaries of a decoded [`Model`] for display and JSON export.

use serde::Serialize;

use crate::error::Result;
use crate::formats::container::{
    ContainerKind, DecodeIssue, DecodeOptions, DecodeStats, Model, decode_model_with,
};
use crate::scene::{MeshSink, RenderMesh, SceneOptions, SceneStats, build_scene};

/// Per-entity summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityInfo {
    pub index: u32,
    pub name: String,
    pub transform: [f32; 9],
    pub base_offset: usize,
    pub linked_grnd_files: Vec<usize>,
    pub linked_njcm_files: Vec<usize>,
    pub linked_njtl_files: Vec<usize>,
    pub linked_nmdm_files: Vec<usize>,
    /// Names from the entity's first NJTL chunk.
    pub texture_names: Vec<String>,
    pub meshes: usize,
    pub triangles: usize,
}

/// Number of distinct chunks per pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolInfo {
    pub grnd: usize,
    pub njcm: usize,
    pub njtl: usize,
    pub nmdm: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextureInfo {
    pub name: String,
    pub size: usize,
}

/// Serializable summary of a decoded container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub kind: ContainerKind,
    pub entities: Vec<EntityInfo>,
    pub pools: PoolInfo,
    pub njcm_objects: usize,
    pub textures: Vec<TextureInfo>,
    pub issues: Vec<DecodeIssue>,
    pub stats: DecodeStats,
    /// Present when geometry was assembled.
    pub scene: Option<SceneStats>,
}

impl ModelInfo {
    /// Summarize `model` without decoding any geometry.
    pub fn from_model(model: &Model) -> Self {
        let entities = model
            .entities
            .iter()
            .map(|entity| EntityInfo {
                index: entity.index,
                name: entity.name.clone(),
                transform: entity.transform,
                base_offset: entity.base_offset,
                linked_grnd_files: entity.linked_grnd_files.clone(),
                linked_njcm_files: entity.linked_njcm_files.clone(),
                linked_njtl_files: entity.linked_njtl_files.clone(),
                linked_nmdm_files: entity.linked_nmdm_files.clone(),
                texture_names: model.texture_names(entity).to_vec(),
                meshes: 0,
                triangles: 0,
            })
            .collect();

        Self {
            kind: model.kind,
            entities,
            pools: PoolInfo {
                grnd: model.grnd_files.len(),
                njcm: model.njcm_files.len(),
                njtl: model.njtl_files.len(),
                nmdm: model.nmdm_files.len(),
            },
            njcm_objects: model.njcm_object_count(),
            textures: model
                .textures
                .iter()
                .map(|(name, bytes)| TextureInfo {
                    name: name.clone(),
                    size: bytes.len(),
                })
                .collect(),
            issues: model.issues.clone(),
            stats: model.stats,
            scene: None,
        }
    }

    pub fn mesh_count(&self) -> usize {
        self.entities.iter().map(|e| e.meshes).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.entities.iter().map(|e| e.triangles).sum()
    }
}

/// Counts meshes and triangles per entity.
struct CountingSink {
    per_entity: Vec<(usize, usize)>,
}

impl MeshSink for CountingSink {
    fn add_mesh(&mut self, mesh: RenderMesh<'_>) {
        if let Some((meshes, triangles)) = self.per_entity.get_mut(mesh.entity) {
            *meshes += 1;
            *triangles += mesh.triangle_count();
        }
    }
}

/// Decode `bytes` and summarize it, including mesh and triangle counts.
///
/// # Errors
/// Returns an error if the container header cannot be decoded.
pub fn inspect_bytes(bytes: &[u8], options: &DecodeOptions) -> Result<ModelInfo> {
    let model = decode_model_with(bytes, options)?;
    let mut info = ModelInfo::from_model(&model);

    let mut sink = CountingSink {
        per_entity: vec![(0, 0); model.entities.len()],
    };
    let stats = build_scene(&model, bytes, &SceneOptions::default(), &mut sink)?;

    for (entity, (meshes, triangles)) in info.entities.iter_mut().zip(sink.per_entity) {
        entity.meshes = meshes;
        entity.triangles = triangles;
    }
    info.scene = Some(stats);
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_nmld() -> Vec<u8> {
        let mut data = b"NMLD".to_vec();
        for word in [0u32, 0x10, 0, 0] {
            data.extend_from_slice(&word.to_be_bytes());
        }
        data
    }

    #[test]
    fn test_from_model_has_no_scene() {
        let model = crate::formats::container::decode_model(&empty_nmld()).unwrap();
        let info = ModelInfo::from_model(&model);
        assert_eq!(info.kind, ContainerKind::Nmld);
        assert!(info.entities.is_empty());
        assert_eq!(info.pools, PoolInfo::default());
        assert!(info.scene.is_none());
    }

    #[test]
    fn test_inspect_bytes_fills_scene() {
        let info = inspect_bytes(&empty_nmld(), &DecodeOptions::default()).unwrap();
        assert_eq!(info.scene, Some(SceneStats::default()));
        assert_eq!(info.mesh_count(), 0);
        assert_eq!(info.triangle_count(), 0);
    }
}
