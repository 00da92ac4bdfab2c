//! DEFLATE (RFC 1951) decompression into caller-provided buffers, with an optional zlib
//! (RFC 1950) wrapping layer that owns its output and checks the Adler-32 trailer.

pub mod adler32;
mod bit_cursor;
pub mod error;
mod huffman;
pub mod inflate;
pub mod zlib;

pub use error::InflateError;
pub use inflate::{decompress, decompress_raw, inflate, Format, Inflated};
