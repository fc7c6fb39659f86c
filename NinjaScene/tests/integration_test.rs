mod common;

use common::{
    ContainerBuilder, IDENTITY, MeshBlockBuilder, NodeSpec, Slot, broken_njcm_chunk, njcm_chunk,
    njtl_chunk, sized_chunk, vertex_block,
};
use ninjascene::formats::container::IssueScope;
use ninjascene::prelude::*;
use ninjascene::scene::CollectedTexture;
use pretty_assertions::assert_eq;

const QUAD: [[f32; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [1.0, 1.0, 0.0],
];

/// One node drawing a textured, colored quad as a four-entry strip.
fn textured_quad() -> Vec<u8> {
    let meshes = MeshBlockBuilder::new()
        .texture(0, 0b0100)
        .color([0, 0, 0, 128], [0x33, 0x22, 0x11, 0xff])
        .strips(&[&[0, 1, 2, 3]])
        .build();
    njcm_chunk(&[NodeSpec::new().geometry(vertex_block(0, &QUAD), meshes)])
}

fn mixed_container() -> Vec<u8> {
    let mut builder = ContainerBuilder::new();
    let tree = builder.chunk(textured_quad());
    let names = builder.chunk(njtl_chunk(&["TEX_A.gvr", "tex_b"]));
    let ground = builder.chunk(sized_chunk("GRND", 0x40));
    let motion = builder.chunk(sized_chunk("NMDM", 0x80));
    let broken = builder.chunk(broken_njcm_chunk());
    let unknown = builder.chunk(sized_chunk("ABCD", 4));
    let empty = builder.chunk(vec![0; 8]);

    builder
        .entity(
            "stage",
            [10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            &[&[tree, names], &[ground, motion]],
        )
        .entity("prop", IDENTITY, &[&[tree, names, unknown, empty]])
        .entity("broken", IDENTITY, &[&[ground, broken]])
        .entity("also_broken", IDENTITY, &[&[broken]])
        .entity_slots("stray", IDENTITY, vec![vec![Slot::Raw(0x00FF_0000)]])
        .broken_entity("lost", 0x00FF_0000);
    builder
        .texture("tex_a", b"GCIXaaaaaaaa")
        .texture("bad", b"PVRT1234")
        .texture("tex_b", b"GCIXbbbb");
    builder.build_nmld()
}

fn entity_names(model: &Model) -> Vec<&str> {
    model.entities.iter().map(|e| e.name.as_str()).collect()
}

#[test]
fn test_shared_njcm_is_decoded_once() {
    let mut builder = ContainerBuilder::new();
    let tree = builder.chunk(njcm_chunk(&[NodeSpec::new()]));
    builder
        .entity("first", IDENTITY, &[&[tree]])
        .entity("second", IDENTITY, &[&[tree]]);
    let data = builder.build_nmld();

    let model = decode_model(&data).unwrap();

    assert_eq!(entity_names(&model), vec!["first", "second"]);
    assert_eq!(model.njcm_files.len(), 1);
    assert_eq!(model.stats.njcm_unpacked, 1);
    assert_eq!(
        model.entities[0].linked_njcm_files,
        model.entities[1].linked_njcm_files
    );
    let offset = model.entities[0].linked_njcm_files[0];
    assert_eq!(&data[offset..offset + 4], b"NJCM");
}

#[test]
fn test_mixed_container_pools_and_links() {
    let data = mixed_container();
    let model = decode_model(&data).unwrap();

    assert_eq!(model.kind, ContainerKind::Nmld);
    assert_eq!(entity_names(&model), vec!["stage", "prop"]);

    let stage = &model.entities[0];
    assert_eq!(stage.transform[0], 10.0);
    assert_eq!(stage.linked_njcm_files.len(), 1);
    assert_eq!(stage.linked_njtl_files.len(), 1);
    assert_eq!(stage.linked_grnd_files.len(), 1);
    assert_eq!(stage.linked_nmdm_files.len(), 1);

    // Unknown and empty magics are skipped without dropping the entity.
    let prop = &model.entities[1];
    assert_eq!(prop.linked_njcm_files, stage.linked_njcm_files);
    assert_eq!(prop.linked_njtl_files, stage.linked_njtl_files);

    let ground = model.grnd_files.values().next().unwrap();
    assert_eq!(ground.size, 0x40);
    let motion = model.nmdm_files.values().next().unwrap();
    assert_eq!(motion.size, 0x80);
    assert_eq!(model.texture_names(stage), ["TEX_A.gvr", "tex_b"]);

    for entity in &model.entities {
        for offset in &entity.linked_njcm_files {
            assert!(model.njcm_files.contains_key(offset));
        }
        for offset in &entity.linked_njtl_files {
            assert!(model.njtl_files.contains_key(offset));
        }
    }
}

#[test]
fn test_failed_entities_become_issues() {
    let data = mixed_container();
    let model = decode_model(&data).unwrap();

    let scopes: Vec<IssueScope> = model.issues.iter().map(|i| i.scope.clone()).collect();
    let entity = |slot: usize, name: &str| IssueScope::Entity {
        slot,
        name: Some(name.to_string()),
    };
    assert_eq!(
        scopes,
        vec![
            entity(2, "broken"),
            entity(3, "also_broken"),
            entity(4, "stray"),
            entity(5, "lost"),
        ]
    );

    // The broken NJCM is attempted once; the ground chunk it shared an
    // object with stays pooled.
    assert_eq!(model.stats.njcm_unpacked, 2);
    assert_eq!(model.stats.grnd_unpacked, 1);
    assert_eq!(model.stats.njtl_unpacked, 1);
    assert_eq!(model.stats.nmdm_unpacked, 1);
    assert_eq!(model.njcm_files.len(), 1);
    assert_eq!(model.grnd_files.len(), 1);
    assert_eq!(model.issues[0].message, model.issues[1].message);
}

#[test]
fn test_parallel_decode_matches_sequential() {
    for data in [mixed_container(), sml_container()] {
        let sequential = decode_model(&data).unwrap();
        let parallel =
            decode_model_with(&data, &DecodeOptions::new().with_parallel(true)).unwrap();
        assert_eq!(sequential, parallel);
    }
}

#[test]
fn test_asset_table_filters_and_keeps_order() {
    let model = decode_model(&mixed_container()).unwrap();

    let names: Vec<&str> = model.textures.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["tex_a", "tex_b"]);
    assert_eq!(model.texture("tex_b"), Some(&b"GCIXbbbb"[..]));
    assert!(model.texture("bad").is_none());
    assert!(
        !model
            .issues
            .iter()
            .any(|i| matches!(i.scope, IssueScope::AssetTable { .. }))
    );
}

#[test]
fn test_empty_asset_table() {
    let mut builder = ContainerBuilder::new();
    let tree = builder.chunk(njcm_chunk(&[NodeSpec::new()]));
    builder.entity("only", IDENTITY, &[&[tree]]);
    let model = decode_model(&builder.build_nmld()).unwrap();

    assert!(model.textures.is_empty());
    assert!(model.issues.is_empty());
}

fn sml_container() -> Vec<u8> {
    let mut builder = ContainerBuilder::new();
    let tree = builder.chunk(textured_quad());
    let names = builder.chunk(njtl_chunk(&["tex_a"]));
    builder
        .entity("slot_a", IDENTITY, &[&[tree, names]])
        .entity("slot_b", IDENTITY, &[&[tree]]);
    builder.texture("tex_a", b"GCIXaaaa");
    builder.build_sml()
}

#[test]
fn test_sml_pointers_resolve_against_slot_base() {
    let data = sml_container();
    let model = decode_model(&data).unwrap();

    assert_eq!(model.kind, ContainerKind::Sml);
    assert!(model.issues.is_empty());
    assert_eq!(entity_names(&model), vec!["slot_a", "slot_b"]);

    let (a, b) = (&model.entities[0], &model.entities[1]);
    assert!(b.base_offset > a.base_offset);
    assert_eq!(&data[a.base_offset + 8..a.base_offset + 14], b"slot_a");

    // Each slot carries its own copy of the node tree.
    assert_eq!(model.njcm_files.len(), 2);
    assert_eq!(model.stats.njcm_unpacked, 2);
    for entity in &model.entities {
        let offset = entity.linked_njcm_files[0];
        assert!(offset > entity.base_offset);
        assert_eq!(&data[offset..offset + 4], b"NJCM");
    }
    assert!(a.linked_njcm_files[0] < b.base_offset);

    assert_eq!(model.texture("tex_a"), Some(&b"GCIXaaaa"[..]));
}

#[test]
fn test_scene_resolves_geometry_material_and_texture() {
    let data = mixed_container();
    let model = decode_model(&data).unwrap();

    let mut sink = CollectingSink::new();
    let stats = build_scene(&model, &data, &SceneOptions::default(), &mut sink).unwrap();

    assert_eq!(stats.objects, 2);
    assert_eq!(stats.meshes, 2);
    assert_eq!(stats.triangles, 4);
    assert_eq!(stats.textured_meshes, 2);
    assert_eq!(stats.skipped_nodes, 0);

    let mesh = &sink.meshes[0];
    assert_eq!(mesh.entity, 0);
    assert_eq!(mesh.object, 0);
    assert_eq!(mesh.indices, vec![0, 1, 2, 2, 1, 3]);
    assert_eq!(
        mesh.corners,
        vec![QUAD[0], QUAD[1], QUAD[2], QUAD[2], QUAD[1], QUAD[3]]
    );
    assert!(mesh.uvs.is_empty());
    assert_eq!(mesh.color, 0x112233);
    assert!((mesh.opacity - 128.0 / 255.0).abs() < 1e-6);
    assert!(mesh.double_sided);

    // NJTL says "TEX_A.gvr"; the asset is "tex_a".
    assert_eq!(
        mesh.texture,
        Some(CollectedTexture {
            name: "tex_a".to_string(),
            size: 12,
            repeat_x: true,
            repeat_y: true,
            mirrored_x: false,
            mirrored_y: true,
        })
    );

    // Column-major: translation lives in elements 12..15.
    assert_eq!(&mesh.world[12..15], &[10.0, 0.0, 0.0]);
    assert_eq!(&sink.meshes[1].world[12..15], &[0.0, 0.0, 0.0]);
}

#[test]
fn test_scene_without_transforms_or_textures() {
    let data = mixed_container();
    let model = decode_model(&data).unwrap();

    let options = SceneOptions::new()
        .with_world_transforms(false)
        .with_textures(false);
    let mut sink = CollectingSink::new();
    let stats = build_scene(&model, &data, &options, &mut sink).unwrap();

    assert_eq!(stats.textured_meshes, 0);
    assert!(sink.meshes.iter().all(|m| m.texture.is_none()));
    assert_eq!(sink.meshes[0].world, glam::Mat4::IDENTITY.to_cols_array());
}

#[test]
fn test_child_nodes_share_positions_and_compose_transforms() {
    let meshes = MeshBlockBuilder::new().strips(&[&[3, 2, 1]]).build();
    let nodes = [
        NodeSpec {
            vertices: Some(vertex_block(0, &QUAD)),
            ..NodeSpec::new().at([0.0, 0.0, 5.0]).child(1)
        },
        NodeSpec {
            meshes: Some(meshes),
            ..NodeSpec::new().at([0.0, 2.0, 0.0])
        },
    ];

    let mut builder = ContainerBuilder::new();
    let tree = builder.chunk(njcm_chunk(&nodes));
    builder.entity(
        "rig",
        [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        &[&[tree]],
    );
    let data = builder.build_nmld();
    let model = decode_model(&data).unwrap();

    let njcm = model.njcm_files.values().next().unwrap();
    let parents: Vec<usize> = njcm.objects.iter().map(|o| o.parent_index).collect();
    assert_eq!(parents, vec![0, 0]);
    assert!(njcm.objects[0].meshs_offset.is_none());
    assert!(njcm.objects[1].vertices_offset.is_none());

    let mut sink = CollectingSink::new();
    build_scene(&model, &data, &SceneOptions::default(), &mut sink).unwrap();

    assert_eq!(sink.meshes.len(), 1);
    let mesh = &sink.meshes[0];
    assert_eq!(mesh.object, 1);
    assert_eq!(mesh.indices, vec![3, 2, 1]);
    assert_eq!(mesh.corners, vec![QUAD[3], QUAD[2], QUAD[1]]);
    assert_eq!(&mesh.world[12..15], &[1.0, 2.0, 5.0]);
}

#[test]
fn test_model_json_serializes_texture_sizes() {
    let model = decode_model(&mixed_container()).unwrap();
    let value = serde_json::to_value(&model).unwrap();

    assert_eq!(
        value["textures"],
        serde_json::json!({ "tex_a": 12, "tex_b": 8 })
    );
    assert_eq!(value["entities"][0]["name"], "stage");
    assert_eq!(value["stats"]["njcm_unpacked"], 2);
}

#[test]
fn test_inspect_bytes_counts_meshes() {
    let info = inspect_bytes(&mixed_container(), &DecodeOptions::default()).unwrap();

    assert_eq!(info.pools.njcm, 1);
    assert_eq!(info.njcm_objects, 1);
    assert_eq!(info.entities.len(), 2);
    assert_eq!(info.entities[0].meshes, 1);
    assert_eq!(info.entities[0].triangles, 2);
    assert_eq!(info.entities[0].texture_names, vec!["TEX_A.gvr", "tex_b"]);
    assert_eq!(info.mesh_count(), 2);
    assert_eq!(info.issues.len(), 4);

    let value = serde_json::to_value(&info).unwrap();
    assert_eq!(value["textures"][1]["size"], 8);
    assert_eq!(value["scene"]["triangles"], 4);
}

#[cfg(feature = "cli")]
#[test]
fn test_export_textures_writes_gvr_files() {
    use ninjascene::cli::commands::model::export_textures;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("stage.nml");
    std::fs::write(&input, mixed_container()).unwrap();
    let output = dir.path().join("textures");

    let written = export_textures(&input, &output, &DecodeOptions::default(), true).unwrap();

    assert_eq!(
        written,
        vec![output.join("tex_a.gvr"), output.join("tex_b.gvr")]
    );
    assert_eq!(std::fs::read(&written[0]).unwrap(), b"GCIXaaaaaaaa");
    assert_eq!(std::fs::read(&written[1]).unwrap(), b"GCIXbbbb");
}

#[cfg(feature = "cli")]
#[test]
fn test_export_textures_keeps_colliding_names_apart() {
    use ninjascene::cli::commands::model::export_textures;

    let mut builder = ContainerBuilder::new();
    builder.texture("a/b", b"GCIX1111").texture("a_b", b"GCIX2222");

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("assets.nml");
    std::fs::write(&input, builder.build_nmld()).unwrap();
    let output = dir.path().join("textures");

    let written = export_textures(&input, &output, &DecodeOptions::default(), true).unwrap();

    assert_eq!(
        written,
        vec![output.join("a_b.gvr"), output.join("a_b_1.gvr")]
    );
    assert_eq!(std::fs::read(&written[0]).unwrap(), b"GCIX1111");
    assert_eq!(std::fs::read(&written[1]).unwrap(), b"GCIX2222");
}
