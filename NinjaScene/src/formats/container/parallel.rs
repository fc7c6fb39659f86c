//! Parallel container decoding
//!
//! Entities are read on the rayon pool, their chunk references are merged
//! into one ordered set by a single writer, and each unique chunk is then
//! unpacked exactly once, again on the pool. The resulting model is equal to
//! the sequential decoder's.

use std::collections::{BTreeSet, HashMap};

use rayon::prelude::*;

use super::layout::{discover_chunks, read_entity, unpack_chunk};
use super::{
    ChunkRef, ContainerLayout, DecodeOptions, Entity, EntitySlot, Model, chunk_failure,
    entity_issue,
};
use crate::formats::common::ByteReader;

/// Outcome of reading one entity's record and tables.
enum Discovered {
    Ready(Entity, Vec<ChunkRef>),
    /// Record read, tables broken.
    Broken(Entity, String),
    Unreadable(String),
}

fn discover(reader: &ByteReader<'_>, slot: &EntitySlot, options: &DecodeOptions) -> Discovered {
    match read_entity(reader, slot) {
        Err(e) => Discovered::Unreadable(e.to_string()),
        Ok(entity) => match discover_chunks(reader, slot, &entity, options) {
            Ok(chunks) => Discovered::Ready(entity, chunks),
            Err(e) => Discovered::Broken(entity, e.to_string()),
        },
    }
}

pub(super) fn decode_entities(
    reader: &ByteReader<'_>,
    layout: &ContainerLayout,
    options: &DecodeOptions,
) -> Model {
    let mut model = Model::new(layout.kind, reader.endianness());

    let discovered: Vec<Discovered> = layout
        .entities
        .par_iter()
        .map(|slot| discover(reader, slot, options))
        .collect();

    let unique: Vec<ChunkRef> = discovered
        .iter()
        .filter_map(|found| match found {
            Discovered::Ready(_, chunks) => Some(chunks),
            Discovered::Broken(..) | Discovered::Unreadable(_) => None,
        })
        .flatten()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let unpacked: Vec<_> = unique
        .par_iter()
        .map(|&chunk| unpack_chunk(reader, chunk))
        .collect();

    let mut failed = HashMap::new();
    for (&chunk, result) in unique.iter().zip(unpacked) {
        model.stats.record(chunk.kind);
        match result {
            Ok(decoded) => model.insert_chunk(chunk.offset, decoded),
            Err(e) => {
                failed.insert(chunk.offset, chunk_failure(chunk, &e));
            }
        }
    }

    tracing::debug!(
        "Parallel decode: {} entities, {} unique chunks, {} failed",
        discovered.len(),
        unique.len(),
        failed.len()
    );

    for (slot, found) in layout.entities.iter().zip(discovered) {
        match found {
            Discovered::Ready(mut entity, chunks) => {
                let mut first_error: Option<&String> = None;
                for chunk in chunks {
                    match failed.get(&chunk.offset) {
                        Some(message) => {
                            first_error.get_or_insert(message);
                        }
                        None => entity.link(chunk),
                    }
                }
                match first_error {
                    None => model.entities.push(entity),
                    Some(message) => {
                        let issue = entity_issue(slot, Some(entity.name), message.clone());
                        model.issues.push(issue);
                    }
                }
            }
            Discovered::Broken(entity, message) => {
                model.issues.push(entity_issue(slot, Some(entity.name), message));
            }
            Discovered::Unreadable(message) => {
                model.issues.push(entity_issue(slot, None, message));
            }
        }
    }

    model
}
