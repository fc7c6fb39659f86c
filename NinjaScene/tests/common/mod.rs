//! Byte-level fixture builders for NMLD/SML containers (big endian).

#![allow(dead_code)]

pub const IDENTITY: [f32; 9] = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_f32(out: &mut Vec<u8>, value: f32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn set_u32(out: &mut [u8], offset: usize, value: usize) {
    let value = u32::try_from(value).unwrap();
    out[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

fn align4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

fn fixed_name(out: &mut Vec<u8>, name: &str, width: usize) {
    let mut field = vec![0u8; width];
    field[..name.len()].copy_from_slice(name.as_bytes());
    out.extend_from_slice(&field);
}

/// A chunk with a magic, a size word and an opaque body.
pub fn sized_chunk(magic: &str, size: u32) -> Vec<u8> {
    let mut out = magic.as_bytes().to_vec();
    push_u32(&mut out, size);
    out.extend_from_slice(&[0xAB; 8]);
    out
}

/// NJTL chunk listing `names`.
pub fn njtl_chunk(names: &[&str]) -> Vec<u8> {
    let mut body = Vec::new();
    push_u32(&mut body, 8);
    push_u32(&mut body, names.len() as u32);

    let names_start = 8 + names.len() * 12;
    let mut name_bytes = Vec::new();
    for name in names {
        push_u32(&mut body, (names_start + name_bytes.len()) as u32);
        push_u32(&mut body, 0);
        push_u32(&mut body, 0);
        name_bytes.extend_from_slice(name.as_bytes());
        name_bytes.push(0);
    }
    body.extend_from_slice(&name_bytes);
    align4(&mut body);

    let mut out = b"NJTL".to_vec();
    push_u32(&mut out, body.len() as u32);
    out.extend_from_slice(&body);
    out
}

/// Vertex block of format `0x23` writing `positions` from `base_index`.
pub fn vertex_block(base_index: u16, positions: &[[f32; 3]]) -> Vec<u8> {
    let mut out = Vec::new();
    push_u16(&mut out, 0);
    push_u16(&mut out, 0x23);
    push_u16(&mut out, positions.len() as u16);
    push_u16(&mut out, base_index);
    for p in positions {
        for &c in p {
            push_f32(&mut out, c);
        }
    }
    push_u16(&mut out, 0);
    push_u16(&mut out, 0x00ff);
    out
}

/// Builder for mesh blocks; assumes the block starts 4-byte aligned.
#[derive(Default)]
pub struct MeshBlockBuilder {
    out: Vec<u8>,
}

impl MeshBlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `flags` land in tag bits 12-15.
    pub fn texture(mut self, index: u8, flags: u16) -> Self {
        push_u16(&mut self.out, 0x0008 | (flags << 12));
        self.out.push(0);
        self.out.push(index);
        self
    }

    /// `u` and `c` are BGRA quads.
    pub fn color(mut self, u: [u8; 4], c: [u8; 4]) -> Self {
        push_u16(&mut self.out, 0x0013);
        push_u16(&mut self.out, 0);
        self.out.extend_from_slice(&u);
        self.out.extend_from_slice(&c);
        self
    }

    pub fn strips(mut self, strips: &[&[i16]]) -> Self {
        push_u16(&mut self.out, 0x0040);
        push_u16(&mut self.out, 0);
        push_u16(&mut self.out, strips.len() as u16);
        for strip in strips {
            self.out.extend_from_slice(&(strip.len() as i16).to_be_bytes());
            for &index in *strip {
                self.out.extend_from_slice(&index.to_be_bytes());
            }
        }
        if self.out.len() % 4 == 2 {
            push_u16(&mut self.out, 0);
        }
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        push_u16(&mut self.out, 0x00ff);
        self.out
    }
}

/// One node of an NJCM fixture.
#[derive(Clone, Default)]
pub struct NodeSpec {
    pub position: [f32; 3],
    pub rotation: [i32; 3],
    pub scale: [f32; 3],
    pub child: Option<usize>,
    pub next: Option<usize>,
    pub vertices: Option<Vec<u8>>,
    pub meshes: Option<Vec<u8>>,
}

impl NodeSpec {
    pub fn new() -> Self {
        Self {
            scale: [1.0; 3],
            ..Self::default()
        }
    }

    pub fn at(mut self, position: [f32; 3]) -> Self {
        self.position = position;
        self
    }

    pub fn child(mut self, index: usize) -> Self {
        self.child = Some(index);
        self
    }

    pub fn next(mut self, index: usize) -> Self {
        self.next = Some(index);
        self
    }

    pub fn geometry(mut self, vertices: Vec<u8>, meshes: Vec<u8>) -> Self {
        self.vertices = Some(vertices);
        self.meshes = Some(meshes);
        self
    }
}

/// NJCM chunk whose first node is `nodes[0]`.
pub fn njcm_chunk(nodes: &[NodeSpec]) -> Vec<u8> {
    let mut body = vec![0u8; nodes.len() * 52];

    for (i, node) in nodes.iter().enumerate() {
        let at = i * 52;
        let mut record = Vec::with_capacity(52);
        push_u32(&mut record, 0);
        push_u32(&mut record, 0);
        for c in node.position {
            push_f32(&mut record, c);
        }
        for r in node.rotation {
            record.extend_from_slice(&r.to_be_bytes());
        }
        for c in node.scale {
            push_f32(&mut record, c);
        }
        push_u32(&mut record, node.child.map_or(0, |c| (c * 52) as u32));
        push_u32(&mut record, node.next.map_or(0, |n| (n * 52) as u32));
        body[at..at + 52].copy_from_slice(&record);

        if node.vertices.is_none() && node.meshes.is_none() {
            continue;
        }
        align4(&mut body);
        let data = body.len();
        set_u32(&mut body, at + 4, data);
        body.extend_from_slice(&[0; 24]);

        if let Some(vertices) = &node.vertices {
            align4(&mut body);
            let offset = body.len();
            set_u32(&mut body, data, offset);
            body.extend_from_slice(vertices);
        }
        if let Some(meshes) = &node.meshes {
            align4(&mut body);
            let offset = body.len();
            set_u32(&mut body, data + 4, offset);
            body.extend_from_slice(meshes);
        }
    }
    align4(&mut body);

    let mut out = b"NJCM".to_vec();
    push_u32(&mut out, body.len() as u32);
    out.extend_from_slice(&body);
    out
}

/// NJCM chunk whose root links a child far past any buffer.
pub fn broken_njcm_chunk() -> Vec<u8> {
    let mut chunk = njcm_chunk(&[NodeSpec::new()]);
    set_u32(&mut chunk, 8 + 0x2C, 0x00FF_FF00);
    chunk
}

/// What one slot of an object's chunk table points at.
#[derive(Clone, Copy)]
pub enum Slot {
    /// Index into the builder's chunk list.
    Chunk(usize),
    /// Raw pointer relative to the object header.
    Raw(u32),
}

#[derive(Clone)]
pub struct EntitySpec {
    pub name: String,
    pub transform: [f32; 9],
    pub objects: Vec<Vec<Slot>>,
    /// Replaces the object table pointer.
    pub object_table_override: Option<u32>,
}

#[derive(Default)]
pub struct ContainerBuilder {
    chunks: Vec<Vec<u8>>,
    entities: Vec<EntitySpec>,
    textures: Vec<(String, Vec<u8>)>,
    padding: usize,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            padding: 12,
            ..Self::default()
        }
    }

    pub fn chunk(&mut self, bytes: Vec<u8>) -> usize {
        self.chunks.push(bytes);
        self.chunks.len() - 1
    }

    /// Entity with one object per inner list of chunk indices.
    pub fn entity(&mut self, name: &str, transform: [f32; 9], objects: &[&[usize]]) -> &mut Self {
        let objects = objects
            .iter()
            .map(|slots| slots.iter().map(|&c| Slot::Chunk(c)).collect())
            .collect();
        self.entity_slots(name, transform, objects)
    }

    pub fn entity_slots(
        &mut self,
        name: &str,
        transform: [f32; 9],
        objects: Vec<Vec<Slot>>,
    ) -> &mut Self {
        self.entities.push(EntitySpec {
            name: name.to_string(),
            transform,
            objects,
            object_table_override: None,
        });
        self
    }

    /// Entity whose object table pointer is `pointer`.
    pub fn broken_entity(&mut self, name: &str, pointer: u32) -> &mut Self {
        self.entities.push(EntitySpec {
            name: name.to_string(),
            transform: IDENTITY,
            objects: Vec::new(),
            object_table_override: Some(pointer),
        });
        self
    }

    pub fn texture(&mut self, name: &str, payload: &[u8]) -> &mut Self {
        self.textures.push((name.to_string(), payload.to_vec()));
        self
    }

    pub fn build_nmld(&self) -> Vec<u8> {
        let table = 0x10;
        let mut out = b"NMLD".to_vec();
        push_u32(&mut out, 0);
        push_u32(&mut out, table as u32);
        push_u32(&mut out, self.entities.len() as u32);
        out.resize(table + self.entities.len() * 68, 0);

        let mut placed = vec![None; self.chunks.len()];
        for (i, entity) in self.entities.iter().enumerate() {
            self.write_entity(&mut out, 0, table + i * 68, entity, &mut placed);
        }
        for (c, slot) in placed.iter_mut().enumerate() {
            self.place_chunk(&mut out, c, slot);
        }
        self.patch_chunk_pointers(&mut out, &placed);

        let assets = out.len();
        set_u32(&mut out, 4, assets - table);
        self.write_assets(&mut out, &self.textures);
        out
    }

    /// One slot per entity; every texture goes into slot 0's table.
    pub fn build_sml(&self) -> Vec<u8> {
        let count = self.entities.len();
        let mut out = b"SML\0".to_vec();
        push_u32(&mut out, count as u32);
        out.resize(8 + count * 8, 0);
        align4(&mut out);

        for (i, entity) in self.entities.iter().enumerate() {
            // Leave a gap so slot bases are never zero-relative by accident.
            out.extend_from_slice(&[0; 16]);
            let base = out.len();
            out.resize(base + 68, 0);

            let mut placed = vec![None; self.chunks.len()];
            self.write_entity(&mut out, base, base, entity, &mut placed);
            for (c, slot) in placed.iter_mut().enumerate() {
                self.place_chunk(&mut out, c, slot);
            }
            self.patch_chunk_pointers(&mut out, &placed);

            let size = out.len() - base;
            set_u32(&mut out, 8 + i * 8, base);
            set_u32(&mut out, 8 + i * 8 + 4, size);
            if i == 0 {
                self.write_assets(&mut out, &self.textures);
            } else {
                self.write_assets(&mut out, &[]);
            }
        }
        out
    }

    /// Writes the record at `record`, the object table and headers. Chunk
    /// slots are recorded as fixups in `placed`, indexed by chunk.
    fn write_entity(
        &self,
        out: &mut Vec<u8>,
        base: usize,
        record: usize,
        entity: &EntitySpec,
        placed: &mut [Option<ChunkPlacement>],
    ) {
        let mut head = Vec::with_capacity(68);
        push_u32(&mut head, 7);
        push_u32(&mut head, 0x11);
        fixed_name(&mut head, &entity.name, 16);
        for c in entity.transform {
            push_f32(&mut head, c);
        }
        head.extend_from_slice(&[0; 8]);
        out[record..record + 68].copy_from_slice(&head);

        if let Some(pointer) = entity.object_table_override {
            set_u32(out, record + 0x3C, pointer as usize);
            return;
        }

        align4(out);
        let object_table = out.len();
        set_u32(out, record + 0x3C, object_table - base);
        push_u32(out, entity.objects.len() as u32);
        out.resize(out.len() + entity.objects.len() * 4, 0);

        for (i, slots) in entity.objects.iter().enumerate() {
            let header = out.len();
            set_u32(out, object_table + 4 + i * 4, header - base);
            out.resize(header + 16, 0);
            for (k, slot) in slots.iter().enumerate() {
                match *slot {
                    Slot::Raw(pointer) => set_u32(out, header + k * 4, pointer as usize),
                    Slot::Chunk(c) => {
                        let placement = placed[c].get_or_insert_with(ChunkPlacement::default);
                        placement.fixups.push((header + k * 4, header));
                    }
                }
            }
        }
    }

    fn place_chunk(&self, out: &mut Vec<u8>, c: usize, slot: &mut Option<ChunkPlacement>) {
        if let Some(placement) = slot {
            align4(out);
            placement.offset = out.len();
            out.extend_from_slice(&self.chunks[c]);
        }
    }

    fn patch_chunk_pointers(&self, out: &mut [u8], placed: &[Option<ChunkPlacement>]) {
        for placement in placed.iter().flatten() {
            for &(fixup, header) in &placement.fixups {
                set_u32(out, fixup, placement.offset - header);
            }
        }
    }

    fn write_assets(&self, out: &mut Vec<u8>, textures: &[(String, Vec<u8>)]) {
        push_u32(out, textures.len() as u32);
        for (name, payload) in textures {
            fixed_name(out, name, 0x20);
            push_u32(out, payload.len() as u32);
            out.extend_from_slice(&[0; 8]);
        }
        if textures.is_empty() {
            return;
        }
        out.resize(out.len() + self.padding, 0);
        for (_, payload) in textures {
            out.extend_from_slice(payload);
        }
    }
}

#[derive(Clone, Default)]
struct ChunkPlacement {
    offset: usize,
    /// Slot positions to patch, paired with their object header.
    fixups: Vec<(usize, usize)>,
}
