//! Trailing asset table (packed `GCIX` textures)
//!
//! ```text
//! 0x00  u32   asset count
//! 0x04  descriptors, 0x2c bytes each:
//!         0x00  char[0x20] name
//!         0x20  u32        payload size
//!         0x24  u32[2]     unknown
//! ....  NUL padding of undeclared length
//! ....  payloads, tightly packed in descriptor order
//! ```

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::formats::common::ByteReader;

/// Size of one asset descriptor.
pub const ASSET_DESCRIPTOR_SIZE: usize = 0x2c;

/// Magic every texture payload must start with.
pub const TEXTURE_MAGIC: &str = "GCIX";

const ASSET_NAME_SIZE: usize = 0x20;

/// Read the asset table at `offset` into `textures`.
///
/// Returns the number of payloads stored. A name seen again replaces the
/// earlier payload but keeps its position; payloads with another magic are
/// skipped with a warning.
pub fn read_asset_table(
    reader: &ByteReader<'_>,
    offset: usize,
    max_assets: usize,
    textures: &mut IndexMap<String, Vec<u8>>,
) -> Result<usize> {
    let count = reader.u32(offset)? as usize;
    if count == 0 {
        return Ok(0);
    }
    if count > max_assets {
        return Err(Error::TooManyEntries {
            what: "assets",
            count,
        });
    }

    let mut descriptors = Vec::with_capacity(count);
    for i in 0..count {
        let descriptor = offset + 4 + i * ASSET_DESCRIPTOR_SIZE;
        let name = reader.fixed_string(descriptor, ASSET_NAME_SIZE)?;
        let size = reader.u32(descriptor + ASSET_NAME_SIZE)? as usize;
        descriptors.push((name, size));
    }

    // The padding before the first payload is not recorded anywhere.
    let mut cursor = offset + 4 + count * ASSET_DESCRIPTOR_SIZE;
    while reader.u8(cursor)? == 0 {
        cursor += 1;
    }

    let mut added = 0;
    for (name, size) in descriptors {
        let payload = reader.slice(cursor, size)?;
        cursor += size;

        if !payload.starts_with(TEXTURE_MAGIC.as_bytes()) {
            let magic = String::from_utf8_lossy(&payload[..payload.len().min(4)]);
            tracing::warn!("Asset '{}' has magic {:?}, expected {}", name, magic, TEXTURE_MAGIC);
            continue;
        }
        tracing::trace!("Texture '{}': {} bytes", name, size);
        if textures.insert(name.clone(), payload.to_vec()).is_some() {
            tracing::debug!("Asset '{}' replaces an earlier payload", name);
        }
        added += 1;
    }

    Ok(added)
}
