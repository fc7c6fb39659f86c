//! Decode options for containers

use crate::formats::common::Endianness;

/// Options controlling how a container is decoded.
///
/// # Example
///
/// ```
/// use ninjascene::formats::container::DecodeOptions;
/// use ninjascene::formats::common::Endianness;
///
/// let options = DecodeOptions::new()
///     .with_endianness(Endianness::Little)
///     .with_parallel(true);
/// assert!(options.parallel);
/// ```
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Byte order of every multi-byte field.
    /// Default: big endian
    pub endianness: Endianness,

    /// Decode entities and chunks on the rayon thread pool.
    /// Default: false
    pub parallel: bool,

    /// Upper bound on entity/slot counts read from a header.
    pub max_entities: usize,

    /// Upper bound on objects in one entity's object table.
    pub max_objects: usize,

    /// Upper bound on entries in one asset table.
    pub max_assets: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeOptions {
    #[must_use]
    pub fn new() -> Self {
        Self {
            endianness: Endianness::Big,
            parallel: false,
            max_entities: 4096,
            max_objects: 4096,
            max_assets: 4096,
        }
    }

    #[must_use]
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn with_max_entities(mut self, max: usize) -> Self {
        self.max_entities = max;
        self
    }

    #[must_use]
    pub fn with_max_objects(mut self, max: usize) -> Self {
        self.max_objects = max;
        self
    }

    #[must_use]
    pub fn with_max_assets(mut self, max: usize) -> Self {
        self.max_assets = max;
        self
    }
}
