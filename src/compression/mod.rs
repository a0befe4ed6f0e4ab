//! Block decompression used by bundle containers.
//!
//! The LZ4 and LZMA back ends are gated behind the `compression` Cargo
//! feature (on by default). With it disabled every compressed block fails
//! with [`Error::UnsupportedCompression`], which still lets uncompressed
//! bundles and loose serialized files load.
//!
//! | Module | Algorithm | Where it shows up |
//! |--------|-----------|-------------------|
//! | [`lz4`]  | LZ4 / LZ4HC block | `UnityFS` storage blocks and block info |
//! | [`lzma`] | LZMA | `UnityFS` storage blocks, whole `UnityWeb` payloads |

#[cfg(feature = "compression")]
pub mod lz4;

#[cfg(feature = "compression")]
pub mod lzma;

use crate::{Error, Result};

/// Compression scheme of one bundle block, from the low six flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Lzma,
    Lz4,
    Lz4Hc,
    Lzham,
}

impl Compression {
    /// Decode the compression bits of a block or archive flags word.
    pub fn from_flags(flags: u32) -> Result<Self> {
        Ok(match flags & 0x3F {
            0 => Self::None,
            1 => Self::Lzma,
            2 => Self::Lz4,
            3 => Self::Lz4Hc,
            4 => Self::Lzham,
            other => return Err(Error::UnsupportedCompression(other)),
        })
    }

    fn code(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Lzma => 1,
            Self::Lz4 => 2,
            Self::Lz4Hc => 3,
            Self::Lzham => 4,
        }
    }
}

/// Decompress one block whose decompressed size is known.
///
/// The result is exactly `uncompressed_size` bytes long or an error.
pub fn decompress_block(
    compression: Compression,
    data: &[u8],
    uncompressed_size: usize,
) -> Result<Vec<u8>> {
    let out = match compression {
        Compression::None => data.to_vec(),
        #[cfg(feature = "compression")]
        Compression::Lz4 | Compression::Lz4Hc => lz4::decompress_lz4_block(data, uncompressed_size)?,
        #[cfg(feature = "compression")]
        Compression::Lzma => lzma::decompress_lzma_raw(data, uncompressed_size)?,
        other => return Err(Error::UnsupportedCompression(other.code())),
    };
    if out.len() != uncompressed_size {
        return Err(Error::Parse("decompressed block size mismatch"));
    }
    Ok(out)
}
