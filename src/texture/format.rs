//! Texture format tags.

use serde::{Deserialize, Serialize};

macro_rules! texture_formats {
    ($($name:ident = $value:literal),* $(,)?) => {
        /// Pixel layout of a texture payload, as stored in the asset.
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "i32", into = "i32")]
        pub enum TextureFormat {
            $($name,)*
            Unknown(i32),
        }

        impl From<i32> for TextureFormat {
            fn from(value: i32) -> Self {
                match value {
                    $($value => Self::$name,)*
                    other => Self::Unknown(other),
                }
            }
        }

        impl From<TextureFormat> for i32 {
            fn from(value: TextureFormat) -> Self {
                match value {
                    $(TextureFormat::$name => $value,)*
                    TextureFormat::Unknown(other) => other,
                }
            }
        }
    };
}

texture_formats! {
    Alpha8 = 1,
    ARGB4444 = 2,
    RGB24 = 3,
    RGBA32 = 4,
    ARGB32 = 5,
    ARGBFloat = 6,
    RGB565 = 7,
    BGR24 = 8,
    R16 = 9,
    DXT1 = 10,
    DXT3 = 11,
    DXT5 = 12,
    RGBA4444 = 13,
    BGRA32 = 14,
    RHalf = 15,
    RGHalf = 16,
    RGBAHalf = 17,
    RFloat = 18,
    RGFloat = 19,
    RGBAFloat = 20,
    YUY2 = 21,
    RGB9e5Float = 22,
    RGBFloat = 23,
    BC6H = 24,
    BC7 = 25,
    BC4 = 26,
    BC5 = 27,
    DXT1Crunched = 28,
    DXT5Crunched = 29,
    PVRTC_RGB2 = 30,
    PVRTC_RGBA2 = 31,
    PVRTC_RGB4 = 32,
    PVRTC_RGBA4 = 33,
    ETC_RGB4 = 34,
    ATC_RGB4 = 35,
    ATC_RGBA8 = 36,
    EAC_R = 41,
    EAC_R_SIGNED = 42,
    EAC_RG = 43,
    EAC_RG_SIGNED = 44,
    ETC2_RGB = 45,
    ETC2_RGBA1 = 46,
    ETC2_RGBA8 = 47,
    ASTC_4x4 = 48,
    ASTC_5x5 = 49,
    ASTC_6x6 = 50,
    ASTC_8x8 = 51,
    ASTC_10x10 = 52,
    ASTC_12x12 = 53,
    ASTC_ALPHA_4x4 = 54,
    ASTC_ALPHA_5x5 = 55,
    ASTC_ALPHA_6x6 = 56,
    ASTC_ALPHA_8x8 = 57,
    ASTC_ALPHA_10x10 = 58,
    ASTC_ALPHA_12x12 = 59,
    ETC_RGB4_3DS = 60,
    ETC_RGBA8_3DS = 61,
    RG16 = 62,
    R8 = 63,
    ETC_RGB4Crunched = 64,
    ETC2_RGBA8Crunched = 65,
    ASTC_HDR_4x4 = 66,
    ASTC_HDR_5x5 = 67,
    ASTC_HDR_6x6 = 68,
    ASTC_HDR_8x8 = 69,
    ASTC_HDR_10x10 = 70,
    ASTC_HDR_12x12 = 71,
    RG32 = 72,
    RGB48 = 73,
    RGBA64 = 74,
}

// DXGI_FORMAT values used for DDS interchange.
pub(crate) mod dxgi {
    pub const R32G32B32A32_FLOAT: u32 = 2;
    pub const R16G16B16A16_FLOAT: u32 = 10;
    pub const R16G16B16A16_UNORM: u32 = 11;
    pub const R32G32_FLOAT: u32 = 16;
    pub const R8G8B8A8_UNORM: u32 = 28;
    pub const R16G16_FLOAT: u32 = 34;
    pub const R16G16_UNORM: u32 = 35;
    pub const R32_FLOAT: u32 = 41;
    pub const R8G8_UNORM: u32 = 49;
    pub const R16_FLOAT: u32 = 54;
    pub const R16_UNORM: u32 = 56;
    pub const R8_UNORM: u32 = 61;
    pub const A8_UNORM: u32 = 65;
    pub const R9G9B9E5_SHAREDEXP: u32 = 67;
    pub const BC1_UNORM: u32 = 71;
    pub const BC2_UNORM: u32 = 74;
    pub const BC3_UNORM: u32 = 77;
    pub const BC4_UNORM: u32 = 80;
    pub const BC5_UNORM: u32 = 83;
    pub const B5G6R5_UNORM: u32 = 85;
    pub const B8G8R8A8_UNORM: u32 = 87;
    pub const BC6H_UF16: u32 = 95;
    pub const BC7_UNORM: u32 = 98;
}

impl TextureFormat {
    /// Matching `DXGI_FORMAT`, for formats a DDS container can carry as is.
    pub fn dxgi_format(self) -> Option<u32> {
        use dxgi::*;
        Some(match self {
            Self::Alpha8 => A8_UNORM,
            Self::RGBA32 => R8G8B8A8_UNORM,
            Self::RGB565 => B5G6R5_UNORM,
            Self::R16 => R16_UNORM,
            Self::DXT1 => BC1_UNORM,
            Self::DXT3 => BC2_UNORM,
            Self::DXT5 => BC3_UNORM,
            Self::BGRA32 => B8G8R8A8_UNORM,
            Self::RHalf => R16_FLOAT,
            Self::RGHalf => R16G16_FLOAT,
            Self::RGBAHalf => R16G16B16A16_FLOAT,
            Self::RFloat => R32_FLOAT,
            Self::RGFloat => R32G32_FLOAT,
            Self::RGBAFloat => R32G32B32A32_FLOAT,
            Self::RGB9e5Float => R9G9B9E5_SHAREDEXP,
            Self::BC6H => BC6H_UF16,
            Self::BC7 => BC7_UNORM,
            Self::BC4 => BC4_UNORM,
            Self::BC5 => BC5_UNORM,
            Self::RG16 => R8G8_UNORM,
            Self::R8 => R8_UNORM,
            Self::RG32 => R16G16_UNORM,
            Self::RGBA64 => R16G16B16A16_UNORM,
            _ => return None,
        })
    }

    /// Inverse of [`Self::dxgi_format`].
    pub fn from_dxgi(format: u32) -> Option<Self> {
        use dxgi::*;
        Some(match format {
            A8_UNORM => Self::Alpha8,
            R8G8B8A8_UNORM => Self::RGBA32,
            B5G6R5_UNORM => Self::RGB565,
            R16_UNORM => Self::R16,
            BC1_UNORM => Self::DXT1,
            BC2_UNORM => Self::DXT3,
            BC3_UNORM => Self::DXT5,
            B8G8R8A8_UNORM => Self::BGRA32,
            R16_FLOAT => Self::RHalf,
            R16G16_FLOAT => Self::RGHalf,
            R16G16B16A16_FLOAT => Self::RGBAHalf,
            R32_FLOAT => Self::RFloat,
            R32G32_FLOAT => Self::RGFloat,
            R32G32B32A32_FLOAT => Self::RGBAFloat,
            R9G9B9E5_SHAREDEXP => Self::RGB9e5Float,
            BC6H_UF16 => Self::BC6H,
            BC7_UNORM => Self::BC7,
            BC4_UNORM => Self::BC4,
            BC5_UNORM => Self::BC5,
            R8G8_UNORM => Self::RG16,
            R8_UNORM => Self::R8,
            R16G16_UNORM => Self::RG32,
            R16G16B16A16_UNORM => Self::RGBA64,
            _ => return None,
        })
    }

    /// Whether the payload can be wrapped in a DDS container unchanged.
    pub fn supports_dds(self) -> bool {
        self.dxgi_format().is_some()
    }

    /// Whether the payload is wrapped in a crunch stream.
    pub fn is_crunched(self) -> bool {
        matches!(
            self,
            Self::DXT1Crunched
                | Self::DXT5Crunched
                | Self::ETC_RGB4Crunched
                | Self::ETC2_RGBA8Crunched
        )
    }

    /// Block-compressed formats with 4x4 blocks and their block byte size.
    pub fn block_size(self) -> Option<usize> {
        match self {
            Self::DXT1 | Self::BC4 | Self::ETC_RGB4 | Self::ETC_RGB4_3DS | Self::ETC2_RGB
            | Self::ETC2_RGBA1 | Self::EAC_R | Self::EAC_R_SIGNED | Self::ATC_RGB4 => Some(8),
            Self::DXT3 | Self::DXT5 | Self::BC5 | Self::BC6H | Self::BC7 | Self::ETC2_RGBA8
            | Self::ETC_RGBA8_3DS | Self::EAC_RG | Self::EAC_RG_SIGNED | Self::ATC_RGBA8 => {
                Some(16)
            }
            _ => None,
        }
    }

    /// Bytes per pixel of uncompressed 8/16-bit formats.
    pub fn pixel_size(self) -> Option<usize> {
        match self {
            Self::Alpha8 | Self::R8 => Some(1),
            Self::ARGB4444 | Self::RGBA4444 | Self::RGB565 | Self::R16 | Self::RG16 => Some(2),
            Self::RGB24 | Self::BGR24 => Some(3),
            Self::RGBA32 | Self::ARGB32 | Self::BGRA32 => Some(4),
            _ => None,
        }
    }

    /// Expected payload length of the top mip level, where computable.
    pub fn image_size(self, width: usize, height: usize) -> Option<usize> {
        if let Some(block) = self.block_size() {
            return width
                .div_ceil(4)
                .checked_mul(height.div_ceil(4))?
                .checked_mul(block);
        }
        width.checked_mul(height)?.checked_mul(self.pixel_size()?)
    }
}
