//! Library-wide error and result types.

use std::io;

use thiserror::Error;

/// Result alias used throughout assetkit.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// These are reserved for failures that stop a whole load call. A single
/// object that fails to construct is logged and replaced by a placeholder,
/// and a texture that cannot be decoded yields no pixels instead of an error.
#[derive(Debug, Error)]
pub enum Error {
    /// A magic/signature field did not match the expected value.
    #[error("bad magic value")]
    BadMagic,
    /// A serialized file format version outside the supported range.
    #[error("unsupported serialized file version: {0}")]
    UnsupportedVersion(u32),
    /// A length prefix was negative.
    #[error("negative length prefix: {0}")]
    NegativeLength(i32),
    /// An offset or size field would read outside the valid region.
    #[error("invalid offset or size")]
    InvalidRange,
    /// A structural constraint was violated (message describes which one).
    #[error("parse error: {0}")]
    Parse(&'static str),
    /// A raw struct/array copy was requested while the stream needs byte
    /// swapping.
    #[error("cannot swap endianness of raw {0}")]
    EndianArray(&'static str),
    /// The bundle signature names a container family this crate does not read.
    #[error("unsupported bundle format: {0}")]
    UnsupportedBundle(String),
    /// A block uses a compression scheme that is unknown or compiled out.
    #[error("unsupported compression type: {0}")]
    UnsupportedCompression(u32),
    /// LZ4 decompression failed.
    #[cfg(feature = "compression")]
    #[error("lz4 decompression failed")]
    Lz4,
    /// LZMA decompression failed.
    #[cfg(feature = "compression")]
    #[error("lzma decompression failed")]
    Lzma,
    /// A DDS pixel format four-character code that has no texture format.
    #[error("DDS FourCC 0x{0:08X} is not supported")]
    UnsupportedFourCc(u32),
    /// A file handler was asked to open a tag it does not serve.
    #[error("tag {0} cannot be opened by this handler")]
    UnsupportedTag(String),
    /// A streamed resource referenced by an object is not loaded.
    #[error("resource {0} is not loaded")]
    MissingResource(String),
    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Options could not be (de)serialized.
    #[error("options error: {0}")]
    Json(#[from] serde_json::Error),
}
