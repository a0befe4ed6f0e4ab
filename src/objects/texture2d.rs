//! 2D textures.
//!
//! Field presence depends heavily on the engine version; the gates below
//! follow the order fields appear in the payload.

use bytes::Bytes;

use super::ObjectReader;
use crate::collection::AssetCollection;
use crate::texture::{EncodedTexture, TextureFormat};
use crate::version::UnityVersion;
use crate::{Error, Result};

/// Location of image data kept outside the serialized file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamingInfo {
    pub offset: u64,
    pub size: u32,
    /// Resource path, e.g. `archive:/CAB-1234/CAB-1234.resS`.
    pub path: String,
}

impl StreamingInfo {
    fn read(r: &mut ObjectReader) -> Result<Self> {
        let offset = if r.version >= UnityVersion::V2020_1 {
            r.read_u64()?
        } else {
            u64::from(r.read_u32()?)
        };
        Ok(Self {
            offset,
            size: r.read_u32()?,
            path: r.read_aligned_string()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0 || self.path.is_empty()
    }
}

/// Sampler state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextureSettings {
    pub filter_mode: i32,
    pub aniso: i32,
    pub mip_bias: f32,
    pub wrap_u: i32,
    pub wrap_v: i32,
    pub wrap_w: i32,
}

impl TextureSettings {
    fn read(r: &mut ObjectReader) -> Result<Self> {
        let filter_mode = r.read_i32()?;
        let aniso = r.read_i32()?;
        let mip_bias = r.read_f32()?;
        let (wrap_u, wrap_v, wrap_w) = if r.version >= UnityVersion::V2017_1 {
            (r.read_i32()?, r.read_i32()?, r.read_i32()?)
        } else {
            let mode = r.read_i32()?;
            (mode, mode, mode)
        };
        Ok(Self {
            filter_mode,
            aniso,
            mip_bias,
            wrap_u,
            wrap_v,
            wrap_w,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture2D {
    pub name: String,
    pub forced_fallback_format: i32,
    pub downscale_fallback: bool,
    pub is_alpha_channel_optional: bool,
    pub width: u32,
    pub height: u32,
    pub complete_image_size: u32,
    pub mips_stripped: i32,
    pub format: TextureFormat,
    pub mip_count: u32,
    pub is_readable: bool,
    pub is_preprocessed: bool,
    pub ignore_master_texture_limit: bool,
    pub read_allowed: bool,
    pub streaming_mipmaps: bool,
    pub streaming_mipmaps_priority: i32,
    /// Faces or slices; 1 for plain textures.
    pub image_count: u32,
    pub dimension: i32,
    pub settings: TextureSettings,
    pub lightmap_format: i32,
    pub color_space: i32,
    pub platform_blob: Bytes,
    /// Inline image bytes, empty when streamed.
    pub image_data: Bytes,
    pub stream_data: Option<StreamingInfo>,
}

fn non_negative(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

impl Texture2D {
    pub(crate) fn read(r: &mut ObjectReader) -> Result<Self> {
        let v = r.version;
        let name = r.read_aligned_string()?;

        let mut forced_fallback_format = 0;
        let mut downscale_fallback = false;
        let mut is_alpha_channel_optional = false;
        if v >= UnityVersion::V2017_3 {
            forced_fallback_format = r.read_i32()?;
            downscale_fallback = r.read_bool();
            if v >= UnityVersion::V2020_2 {
                is_alpha_channel_optional = r.read_bool();
            }
            r.align(4)?;
        }

        let width = non_negative(r.read_i32()?);
        let height = non_negative(r.read_i32()?);
        let complete_image_size = non_negative(r.read_i32()?);
        let mips_stripped = if v >= UnityVersion::new(2020, 0, 0) {
            r.read_i32()?
        } else {
            0
        };
        let format = TextureFormat::from(r.read_i32()?);

        let mip_count = if v < UnityVersion::V5_2 {
            if r.read_bool() {
                u32::BITS - width.max(height).max(1).leading_zeros()
            } else {
                1
            }
        } else {
            non_negative(r.read_i32()?)
        };

        let is_readable = v >= UnityVersion::V2_6 && r.read_bool();
        let is_preprocessed = v >= UnityVersion::new(2020, 0, 0) && r.read_bool();
        let ignore_master_texture_limit = v >= UnityVersion::V2019_3 && r.read_bool();
        let read_allowed =
            v >= UnityVersion::V3_0 && v < UnityVersion::V5_5 && r.read_bool();
        let streaming_mipmaps = v >= UnityVersion::V2018_2 && r.read_bool();
        r.align(4)?;
        let streaming_mipmaps_priority = if v >= UnityVersion::V2018_2 {
            r.read_i32()?
        } else {
            0
        };

        let image_count = non_negative(r.read_i32()?);
        let dimension = r.read_i32()?;
        let settings = TextureSettings::read(r)?;
        let lightmap_format = if v >= UnityVersion::V3_0 { r.read_i32()? } else { 0 };
        let color_space = if v >= UnityVersion::V3_5 { r.read_i32()? } else { 0 };
        let platform_blob = if v >= UnityVersion::V2020_2 {
            let blob = r.read_byte_array()?;
            r.align(4)?;
            blob
        } else {
            Bytes::new()
        };

        let image_size = r.read_i32()?;
        let (image_data, stream_data) = if image_size == 0 && v >= UnityVersion::V5_3 {
            (Bytes::new(), Some(StreamingInfo::read(r)?))
        } else {
            let len =
                usize::try_from(image_size).map_err(|_| Error::NegativeLength(image_size))?;
            (r.read_shared(len)?, None)
        };

        Ok(Self {
            name,
            forced_fallback_format,
            downscale_fallback,
            is_alpha_channel_optional,
            width,
            height,
            complete_image_size,
            mips_stripped,
            format,
            mip_count,
            is_readable,
            is_preprocessed,
            ignore_master_texture_limit,
            read_allowed,
            streaming_mipmaps,
            streaming_mipmaps_priority,
            image_count,
            dimension,
            settings,
            lightmap_format,
            color_space,
            platform_blob,
            image_data,
            stream_data,
        })
    }

    /// Whether the image bytes live in a separate resource.
    pub fn is_streamed(&self) -> bool {
        self.stream_data.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// Image bytes, fetched from the owning collection's streamed
    /// resources when the texture is streamed.
    pub fn image_data(&self, collection: &AssetCollection) -> Result<Bytes> {
        match &self.stream_data {
            Some(stream) if !stream.is_empty() => collection
                .read_resource(&stream.path, stream.offset, stream.size)
                .map(Bytes::from),
            _ => Ok(self.image_data.clone()),
        }
    }

    /// Describe `data` (from [`Self::image_data`]) for decoding.
    pub fn encoded<'a>(&self, data: &'a [u8], version: UnityVersion) -> EncodedTexture<'a> {
        EncodedTexture {
            format: self.format,
            width: self.width,
            height: self.height,
            mip_count: self.mip_count,
            image_count: self.image_count,
            version,
            data,
        }
    }
}
