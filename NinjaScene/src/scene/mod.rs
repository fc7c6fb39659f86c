//! Scene assembly: feeding decoded geometry to a renderer
//!
//! Containers only pool the NJCM node trees; vertex and mesh blocks are
//! decoded here, node by node, against one position buffer per NJCM file.
//! Every submesh is handed to a [`MeshSink`] together with its resolved
//! material and the node's world matrix.

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::formats::common::ByteReader;
use crate::formats::container::{Entity, Model};
use crate::formats::njcm::{
    Material, NjcmFile, NjcmObject, NodeTransform, PositionBuffer, decode_mesh_block,
    decode_vertex_block,
};

/// Texture payload bound to a mesh, with its wrap flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding<'a> {
    pub name: &'a str,
    /// Raw `GCIX` bytes; decoding them is up to the renderer.
    pub bytes: &'a [u8],
    pub repeat_x: bool,
    pub repeat_y: bool,
    pub mirrored_x: bool,
    pub mirrored_y: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderMaterial<'a> {
    /// `0xRRGGBB`.
    pub color: u32,
    pub opacity: f32,
    pub double_sided: bool,
    pub texture: Option<TextureBinding<'a>>,
}

/// One submesh as handed to a [`MeshSink`].
#[derive(Debug, Clone, Copy)]
pub struct RenderMesh<'a> {
    /// Index into [`Model::entities`].
    pub entity: usize,
    /// Index of the node within its NJCM file.
    pub object: usize,
    /// The NJCM file's position buffer, `x, y, z` per slot.
    pub positions: &'a [f32],
    /// Triangle list of position slots.
    pub indices: &'a [u32],
    /// `u, v` per triangle corner, or empty.
    pub uvs: &'a [f32],
    pub material: &'a RenderMaterial<'a>,
    /// Column-major world matrix of the node.
    pub world: [f32; 16],
}

impl RenderMesh<'_> {
    /// Position of every triangle corner; slots outside the buffer read as
    /// the origin.
    pub fn corners(&self) -> Vec<[f32; 3]> {
        self.indices
            .iter()
            .map(|&index| {
                let start = index as usize * 3;
                self.positions
                    .get(start..start + 3)
                    .map_or([0.0; 3], |p| [p[0], p[1], p[2]])
            })
            .collect()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Receiver of assembled meshes (a renderer, exporter or counter).
pub trait MeshSink {
    fn add_mesh(&mut self, mesh: RenderMesh<'_>);
}

/// Options for [`build_scene`].
#[derive(Debug, Clone)]
pub struct SceneOptions {
    /// Compose entity and node transforms into each mesh's world matrix.
    /// When false every mesh gets the identity matrix.
    /// Default: true
    pub apply_world_transforms: bool,

    /// Bind texture payloads from the model's asset table.
    /// Default: true
    pub resolve_textures: bool,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneOptions {
    #[must_use]
    pub fn new() -> Self {
        Self {
            apply_world_transforms: true,
            resolve_textures: true,
        }
    }

    #[must_use]
    pub fn with_world_transforms(mut self, apply: bool) -> Self {
        self.apply_world_transforms = apply;
        self
    }

    #[must_use]
    pub fn with_textures(mut self, resolve: bool) -> Self {
        self.resolve_textures = resolve;
        self
    }
}

/// Counters collected while assembling a scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SceneStats {
    pub objects: usize,
    pub meshes: usize,
    pub triangles: usize,
    pub textured_meshes: usize,
    /// Texture indices that named no asset.
    pub unresolved_textures: usize,
    /// Vertex blocks stopped by an unknown tag.
    pub vertex_block_errors: usize,
    /// Mesh blocks stopped by an unknown tag.
    pub mesh_block_errors: usize,
    /// Nodes whose blocks ran past the end of the buffer.
    pub skipped_nodes: usize,
}

/// Decode the geometry of every entity in `model` and feed it to `sink`.
///
/// `bytes` must be the buffer `model` was decoded from.
///
/// # Errors
///
/// Returns [`Error::InvalidFormat`] if an entity links an NJCM offset that
/// is not pooled on the model. Truncated vertex or mesh blocks only skip
/// their node.
pub fn build_scene<S: MeshSink + ?Sized>(
    model: &Model,
    bytes: &[u8],
    options: &SceneOptions,
    sink: &mut S,
) -> Result<SceneStats> {
    let mut builder = SceneBuilder {
        reader: ByteReader::new(bytes, model.endianness),
        model,
        options,
        sink,
        stats: SceneStats::default(),
    };

    for (entity_index, entity) in model.entities.iter().enumerate() {
        let root = if options.apply_world_transforms {
            entity_matrix(&entity.transform)
        } else {
            Mat4::IDENTITY
        };
        for &offset in &entity.linked_njcm_files {
            let njcm = model.njcm_files.get(&offset).ok_or_else(|| {
                Error::InvalidFormat(format!(
                    "entity '{}' links NJCM at 0x{offset:x}, which is not pooled",
                    entity.name
                ))
            })?;
            builder.emit_njcm(entity_index, entity, njcm, root);
        }
    }

    tracing::debug!(
        "Scene: {} meshes, {} triangles from {} objects",
        builder.stats.meshes,
        builder.stats.triangles,
        builder.stats.objects
    );
    Ok(builder.stats)
}

struct SceneBuilder<'s, 'm, S: ?Sized> {
    reader: ByteReader<'m>,
    model: &'m Model,
    options: &'s SceneOptions,
    sink: &'s mut S,
    stats: SceneStats,
}

impl<'m, S: MeshSink + ?Sized> SceneBuilder<'_, 'm, S> {
    fn emit_njcm(&mut self, entity_index: usize, entity: &Entity, njcm: &NjcmFile, root: Mat4) {
        let mut positions = PositionBuffer::new();
        let mut worlds: Vec<Mat4> = Vec::with_capacity(njcm.objects.len());

        for object in &njcm.objects {
            // Pre-order guarantees the parent's matrix is already known.
            let parent = if object.index == 0 {
                root
            } else {
                worlds.get(object.parent_index).copied().unwrap_or(root)
            };
            let world = if self.options.apply_world_transforms {
                parent * local_matrix(&object.transform)
            } else {
                Mat4::IDENTITY
            };
            worlds.push(world);
            self.stats.objects += 1;

            if let Err(e) = self.emit_object(entity_index, entity, object, world, &mut positions) {
                tracing::warn!(
                    "Entity '{}': node {} at 0x{:x} skipped: {}",
                    entity.name,
                    object.index,
                    object.offset,
                    e
                );
                self.stats.skipped_nodes += 1;
            }
        }
    }

    fn emit_object(
        &mut self,
        entity_index: usize,
        entity: &Entity,
        object: &NjcmObject,
        world: Mat4,
        positions: &mut PositionBuffer,
    ) -> Result<()> {
        if let Some(offset) = object.vertices_offset {
            let block = decode_vertex_block(&self.reader, offset, positions)?;
            if block.error {
                self.stats.vertex_block_errors += 1;
            }
        }

        let Some(offset) = object.meshs_offset else {
            return Ok(());
        };
        let block = decode_mesh_block(&self.reader, offset, positions)?;
        if block.error {
            self.stats.mesh_block_errors += 1;
        }

        let world = world.to_cols_array();
        for submesh in &block.submeshes {
            let material = self.render_material(entity, &submesh.material);
            self.stats.meshes += 1;
            self.stats.triangles += submesh.triangle_count();
            if material.texture.is_some() {
                self.stats.textured_meshes += 1;
            }

            self.sink.add_mesh(RenderMesh {
                entity: entity_index,
                object: object.index,
                positions: positions.as_slice(),
                indices: &submesh.indices,
                uvs: &submesh.uvs,
                material: &material,
                world,
            });
        }
        Ok(())
    }

    fn render_material(&mut self, entity: &Entity, material: &Material) -> RenderMaterial<'m> {
        let texture = match material.texture {
            Some(texture) if self.options.resolve_textures => {
                let model: &'m Model = self.model;
                let resolved = model.resolve_texture(entity, usize::from(texture.index));
                if resolved.is_none() {
                    tracing::trace!(
                        "Entity '{}': texture index {} has no asset",
                        entity.name,
                        texture.index
                    );
                    self.stats.unresolved_textures += 1;
                }
                resolved.map(|(name, bytes)| TextureBinding {
                    name,
                    bytes,
                    repeat_x: texture.repeat_x,
                    repeat_y: texture.repeat_y,
                    mirrored_x: texture.mirrored_x,
                    mirrored_y: texture.mirrored_y,
                })
            }
            _ => None,
        };

        RenderMaterial {
            color: material.color,
            opacity: material.opacity,
            double_sided: material.double_sided,
            texture,
        }
    }
}

/// `T * Rxyz * S` from a node transform (rotation already in radians).
pub fn local_matrix(transform: &NodeTransform) -> Mat4 {
    trs_matrix(transform.position, transform.rotation, transform.scale)
}

/// `T * Rxyz * S` from an entity's position, rotation and scale.
pub fn entity_matrix(transform: &[f32; 9]) -> Mat4 {
    trs_matrix(
        [transform[0], transform[1], transform[2]],
        [transform[3], transform[4], transform[5]],
        [transform[6], transform[7], transform[8]],
    )
}

fn trs_matrix(position: [f32; 3], rotation: [f32; 3], scale: [f32; 3]) -> Mat4 {
    let rotation = Quat::from_euler(EulerRot::XYZ, rotation[0], rotation[1], rotation[2]);
    Mat4::from_scale_rotation_translation(
        Vec3::from_array(scale),
        rotation,
        Vec3::from_array(position),
    )
}

/// Owned copy of a texture binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectedTexture {
    pub name: String,
    pub size: usize,
    pub repeat_x: bool,
    pub repeat_y: bool,
    pub mirrored_x: bool,
    pub mirrored_y: bool,
}

/// Owned copy of a [`RenderMesh`], with corners resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectedMesh {
    pub entity: usize,
    pub object: usize,
    pub indices: Vec<u32>,
    pub corners: Vec<[f32; 3]>,
    pub uvs: Vec<f32>,
    pub color: u32,
    pub opacity: f32,
    pub double_sided: bool,
    pub texture: Option<CollectedTexture>,
    pub world: [f32; 16],
}

/// Sink that keeps every mesh it receives.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    pub meshes: Vec<CollectedMesh>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.indices.len() / 3).sum()
    }
}

impl MeshSink for CollectingSink {
    fn add_mesh(&mut self, mesh: RenderMesh<'_>) {
        let texture = mesh.material.texture.map(|t| CollectedTexture {
            name: t.name.to_string(),
            size: t.bytes.len(),
            repeat_x: t.repeat_x,
            repeat_y: t.repeat_y,
            mirrored_x: t.mirrored_x,
            mirrored_y: t.mirrored_y,
        });
        self.meshes.push(CollectedMesh {
            entity: mesh.entity,
            object: mesh.object,
            indices: mesh.indices.to_vec(),
            corners: mesh.corners(),
            uvs: mesh.uvs.to_vec(),
            color: mesh.material.color,
            opacity: mesh.material.opacity,
            double_sided: mesh.material.double_sided,
            texture,
            world: mesh.world,
        });
    }
}
