//! Common types shared across all formats

mod reader;

pub use reader::{ByteReader, Endianness};
