//! LZMA decompression (requires the `compression` feature).
//!
//! Two framings appear in bundles:
//!
//! * **`UnityFS` blocks** - five property bytes followed directly by the
//!   compressed stream. The 8-byte unpacked size of the classic `.lzma`
//!   header is omitted and taken from the block table instead; use
//!   [`decompress_lzma_raw`].
//! * **`UnityWeb` payloads** - a complete classic header (properties plus
//!   unpacked size); use [`decompress_lzma`].

#![cfg(feature = "compression")]

use std::io::Cursor;

use lzma_rs::decompress::{Options, UnpackedSize};

use crate::{Error, Result};

/// Decompress a properties-only LZMA stream of known decompressed size.
///
/// Returns [`Error::Lzma`] on any decompression failure.
pub fn decompress_lzma_raw(data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    let options = Options {
        unpacked_size: UnpackedSize::UseProvided(Some(uncompressed_size as u64)),
        ..Default::default()
    };
    let mut out = Vec::with_capacity(uncompressed_size.min(data.len().saturating_mul(8)));
    lzma_rs::lzma_decompress_with_options(&mut Cursor::new(data), &mut out, &options)
        .map_err(|_| Error::Lzma)?;
    Ok(out)
}

/// Decompress an LZMA stream carrying the full classic header.
pub fn decompress_lzma(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    lzma_rs::lzma_decompress(&mut Cursor::new(data), &mut out).map_err(|_| Error::Lzma)?;
    Ok(out)
}
