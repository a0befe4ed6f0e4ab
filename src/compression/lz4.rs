//! LZ4 decompression (requires the `compression` feature).
//!
//! Bundles store LZ4 and LZ4HC blocks as bare LZ4 block data with no size
//! prefix; the decompressed size comes from the block table. Both variants
//! share one decoder, LZ4HC only differs on the encoding side.

#![cfg(feature = "compression")]

use crate::{Error, Result};

const MAX_LITERAL_TAIL: usize = 64;

/// Decompress a bare LZ4 block of known decompressed size.
///
/// Returns [`Error::Lz4`] on any decompression failure.
pub fn decompress_lz4_block(data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    // one LZ4 byte expands to at most 255, so larger claims are corrupt
    if uncompressed_size > data.len().saturating_mul(255).saturating_add(MAX_LITERAL_TAIL) {
        return Err(Error::Lz4);
    }
    lz4_flex::block::decompress(data, uncompressed_size).map_err(|_| Error::Lz4)
}
