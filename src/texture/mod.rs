//! Texture payload decoding.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`format`] | [`TextureFormat`] tags, DXGI mapping, block sizes |
//! | [`decode`] | Software decoders and crunch algorithm selection |
//! | [`dds`]    | DDS container parsing and building |
//!
//! [`TextureDecoder`] is the entry point. It tries an optional
//! [`NativeTextureBackend`] first for formats a DDS container can carry,
//! then falls back to the software decoders. Either way the result is a
//! complete RGBA8 buffer or `None`.

pub mod dds;
pub mod decode;
pub mod format;

use log::{debug, trace};

pub use dds::{DdsImage, build_dds};
pub use decode::{CrunchAlgorithm, crunch_algorithm};
pub use format::TextureFormat;

use crate::version::UnityVersion;

/// Accelerated decoder supplied by the embedding application.
pub trait NativeTextureBackend: Send + Sync {
    /// Decode the first image of `dds` to `width * height` RGBA8 pixels.
    ///
    /// Returning `None` hands the texture to the software decoders.
    fn decode_dds(&self, dds: &[u8], width: u32, height: u32) -> Option<Vec<u8>>;
}

/// Everything needed to decode one texture payload.
#[derive(Debug, Clone, Copy)]
pub struct EncodedTexture<'a> {
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub mip_count: u32,
    pub image_count: u32,
    /// Engine version of the file the texture came from.
    pub version: UnityVersion,
    pub data: &'a [u8],
}

impl EncodedTexture<'_> {
    /// Wrap the payload in a DDS container, `None` if the format has no
    /// DDS representation.
    pub fn to_dds(&self) -> Option<Vec<u8>> {
        build_dds(
            self.format,
            self.mip_count,
            self.width,
            self.height,
            self.image_count,
            self.data,
        )
        .ok()
    }
}

/// Decode dispatcher.
#[derive(Default)]
pub struct TextureDecoder {
    native: Option<Box<dyn NativeTextureBackend>>,
}

impl TextureDecoder {
    /// Software decoding only.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_native(backend: Box<dyn NativeTextureBackend>) -> Self {
        Self {
            native: Some(backend),
        }
    }

    pub fn has_native(&self) -> bool {
        self.native.is_some()
    }

    /// Decode `texture` to exactly `width * height * 4` RGBA8 bytes.
    ///
    /// `None` means no usable pixel data.
    pub fn decode(&self, texture: &EncodedTexture<'_>) -> Option<Vec<u8>> {
        let expected = (texture.width as usize)
            .checked_mul(texture.height as usize)
            .filter(|&n| n <= decode::MAX_PIXELS)?
            * 4;

        if let Some(native) = &self.native {
            if let Some(dds) = texture.to_dds() {
                match native.decode_dds(&dds, texture.width, texture.height) {
                    Some(pixels) if pixels.len() == expected => return Some(pixels),
                    Some(pixels) => debug!(
                        "native backend returned {} bytes for {:?}, expected {expected}",
                        pixels.len(),
                        texture.format
                    ),
                    None => trace!("native backend declined {:?}", texture.format),
                }
            }
        }

        decode::decode(
            texture.format,
            texture.width as usize,
            texture.height as usize,
            texture.version,
            texture.data,
        )
        .filter(|pixels| pixels.len() == expected)
    }
}
