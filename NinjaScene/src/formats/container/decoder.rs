//! Sequential container decoding with per-offset memoization

use std::collections::HashMap;

use super::layout::{discover_chunks, read_entity, unpack_chunk};
use super::{
    ChunkRef, ContainerKind, ContainerLayout, DecodeOptions, Entity, Model, chunk_failure,
    entity_issue,
};
use crate::formats::common::ByteReader;

/// Decoder context for one container.
///
/// Owns the model under construction; the chunk pools on it double as the
/// memoization cache so every absolute offset is unpacked at most once.
pub(super) struct ContainerDecoder<'r, 'a> {
    reader: &'r ByteReader<'a>,
    options: &'r DecodeOptions,
    model: Model,
    /// Offsets whose unpack failed, with the failure message.
    failed: HashMap<usize, String>,
}

impl<'r, 'a> ContainerDecoder<'r, 'a> {
    pub(super) fn new(
        reader: &'r ByteReader<'a>,
        kind: ContainerKind,
        options: &'r DecodeOptions,
    ) -> Self {
        Self {
            reader,
            options,
            model: Model::new(kind, reader.endianness()),
            failed: HashMap::new(),
        }
    }

    /// Decode every entity in table order.
    pub(super) fn decode_entities(mut self, layout: &ContainerLayout) -> Model {
        for slot in &layout.entities {
            let mut entity = match read_entity(self.reader, slot) {
                Ok(entity) => entity,
                Err(e) => {
                    let issue = entity_issue(slot, None, e.to_string());
                    self.model.issues.push(issue);
                    continue;
                }
            };

            let linked = discover_chunks(self.reader, slot, &entity, self.options)
                .map_err(|e| e.to_string())
                .and_then(|chunks| self.link_chunks(&mut entity, &chunks));
            match linked {
                Ok(()) => self.model.entities.push(entity),
                Err(message) => {
                    let issue = entity_issue(slot, Some(entity.name), message);
                    self.model.issues.push(issue);
                }
            }
        }
        self.model
    }

    /// Unpack (or reuse) every referenced chunk and link it to `entity`.
    ///
    /// All references are attempted even after a failure so that the pools do
    /// not depend on where in the entity the failure happened.
    fn link_chunks(&mut self, entity: &mut Entity, chunks: &[ChunkRef]) -> Result<(), String> {
        let mut first_error = None;
        for &chunk in chunks {
            match self.ensure_unpacked(chunk) {
                Ok(()) => entity.link(chunk),
                Err(message) => {
                    first_error.get_or_insert(message);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn ensure_unpacked(&mut self, chunk: ChunkRef) -> Result<(), String> {
        if self.model.contains_chunk(chunk.kind, chunk.offset) {
            tracing::trace!("{} at 0x{:x} already unpacked", chunk.kind, chunk.offset);
            return Ok(());
        }
        if let Some(message) = self.failed.get(&chunk.offset) {
            return Err(message.clone());
        }

        self.model.stats.record(chunk.kind);
        match unpack_chunk(self.reader, chunk) {
            Ok(decoded) => {
                self.model.insert_chunk(chunk.offset, decoded);
                Ok(())
            }
            Err(e) => {
                let message = chunk_failure(chunk, &e);
                self.failed.insert(chunk.offset, message.clone());
                Err(message)
            }
        }
    }
}
