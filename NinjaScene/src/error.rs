//! Error types for `NinjaScene`

use thiserror::Error;

/// The error type for `NinjaScene` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== Buffer Errors ====================
    /// A read ran past the end of the buffer.
    #[error("read of {len} bytes at 0x{offset:x} is out of range (buffer is {buffer_len} bytes)")]
    OutOfBounds {
        /// Absolute offset of the failed read.
        offset: usize,
        /// Number of bytes requested.
        len: usize,
        /// Length of the buffer being read.
        buffer_len: usize,
    },

    // ==================== Container Errors ====================
    /// The file is neither an NMLD nor an SML container.
    #[error("invalid container magic: expected NMLD or SML, found {0:?}")]
    InvalidContainerMagic(String),

    /// A chunk did not carry the magic its caller expected.
    #[error("invalid chunk magic at 0x{offset:x}: expected {expected}, found {found:?}")]
    InvalidChunkMagic {
        /// Absolute offset of the chunk.
        offset: usize,
        /// The magic that was expected.
        expected: &'static str,
        /// The magic that was found.
        found: String,
    },

    /// A table count exceeds the configured limit.
    #[error("too many {what}: {count}")]
    TooManyEntries {
        /// Which table overflowed (entities, assets, ...).
        what: &'static str,
        /// The count read from the file.
        count: usize,
    },

    // ==================== Parsing Errors ====================
    /// Invalid format error (use specific variants when possible).
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

/// Result type alias for `NinjaScene` operations.
pub type Result<T> = std::result::Result<T, Error>;
