//! DDS interchange.
//!
//! ## Layout
//! ```text
//! [0x00] Magic "DDS "
//! [0x04] DDS_HEADER            (124 bytes, LE)
//!        pixel format FourCC at header offset 0x50
//! [0x80] DDS_HEADER_DXT10      (20 bytes) only when FourCC == "DX10"
//! [...]  Payload
//! ```
//! Headers are copied as raw little-endian structs.

use std::io::{Cursor, Read, Seek};

use bytemuck::{Pod, Zeroable};

use super::TextureFormat;
use crate::io::{EndianReader, EndianWriter};
use crate::{Error, Result};

pub const FOURCC_DX10: u32 = 0x3031_5844;
pub const FOURCC_DXT1: u32 = 0x3154_5844;
pub const FOURCC_DXT4: u32 = 0x3454_5844;
pub const FOURCC_DXT5: u32 = 0x3554_5844;
pub const FOURCC_ATI1: u32 = 0x3149_5441;
pub const FOURCC_ATI2: u32 = 0x3249_5441;

const DDSD_CAPS: u32 = 0x1;
const DDSD_HEIGHT: u32 = 0x2;
const DDSD_WIDTH: u32 = 0x4;
const DDSD_PIXELFORMAT: u32 = 0x1000;
const DDSD_MIPMAPCOUNT: u32 = 0x2_0000;
const DDSD_LINEARSIZE: u32 = 0x8_0000;
const DDPF_FOURCC: u32 = 0x4;
const DDSCAPS_COMPLEX: u32 = 0x8;
const DDSCAPS_TEXTURE: u32 = 0x1000;
const DDSCAPS_MIPMAP: u32 = 0x40_0000;
const D3D10_RESOURCE_DIMENSION_TEXTURE2D: u32 = 3;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DdsPixelFormat {
    pub size: u32,
    pub flags: u32,
    pub four_cc: u32,
    pub rgb_bit_count: u32,
    pub r_mask: u32,
    pub g_mask: u32,
    pub b_mask: u32,
    pub a_mask: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DdsHeader {
    pub size: u32,
    pub flags: u32,
    pub height: u32,
    pub width: u32,
    pub pitch_or_linear_size: u32,
    pub depth: u32,
    pub mip_map_count: u32,
    pub reserved1: [u32; 11],
    pub pixel_format: DdsPixelFormat,
    pub caps: u32,
    pub caps2: u32,
    pub caps3: u32,
    pub caps4: u32,
    pub reserved2: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Dx10Header {
    pub dxgi_format: u32,
    pub resource_dimension: u32,
    pub misc_flag: u32,
    pub array_size: u32,
    pub misc_flags2: u32,
}

/// A DDS file reduced to the fields a texture needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdsImage {
    pub width: u32,
    pub height: u32,
    pub mip_count: u32,
    pub format: TextureFormat,
    /// Array size from the extended header, 1 otherwise.
    pub image_count: u32,
    pub data: Vec<u8>,
}

impl DdsImage {
    /// Parse a DDS file. Unknown FourCC codes fail with
    /// [`Error::UnsupportedFourCc`].
    pub fn parse<R: Read + Seek>(r: &mut R) -> Result<Self> {
        let mut r = EndianReader::new(r, false);
        r.read_magic(b"DDS ")?;
        let header: DdsHeader = r.read_struct()?;

        let (format, image_count) = match header.pixel_format.four_cc {
            FOURCC_DX10 => {
                let dx10: Dx10Header = r.read_struct()?;
                let format = TextureFormat::from_dxgi(dx10.dxgi_format)
                    .ok_or(Error::Parse("DXGI format has no texture equivalent"))?;
                (format, dx10.array_size.max(1))
            }
            FOURCC_DXT1 => (TextureFormat::DXT1, 1),
            FOURCC_DXT4 | FOURCC_DXT5 => (TextureFormat::DXT5, 1),
            FOURCC_ATI1 => (TextureFormat::BC4, 1),
            FOURCC_ATI2 => (TextureFormat::BC5, 1),
            other => return Err(Error::UnsupportedFourCc(other)),
        };

        let remaining = r.unconsumed()? as usize;
        let data = r.read_bytes(remaining)?;
        Ok(Self {
            width: header.width,
            height: header.height,
            mip_count: header.mip_map_count.max(1),
            format,
            image_count,
            data,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::parse(&mut Cursor::new(bytes))
    }
}

/// Wrap a texture payload in a DDS container with an extended header.
///
/// Fails for formats without a DXGI equivalent.
pub fn build_dds(
    format: TextureFormat,
    mip_count: u32,
    width: u32,
    height: u32,
    image_count: u32,
    data: &[u8],
) -> Result<Vec<u8>> {
    let dxgi_format = format
        .dxgi_format()
        .ok_or(Error::Parse("texture format cannot be stored in DDS"))?;
    let mip_count = mip_count.max(1);

    let mut caps = DDSCAPS_TEXTURE;
    if mip_count > 1 {
        caps |= DDSCAPS_COMPLEX | DDSCAPS_MIPMAP;
    }
    let linear_size = format
        .image_size(width as usize, height as usize)
        .unwrap_or(0) as u32;

    let header = DdsHeader {
        size: size_of::<DdsHeader>() as u32,
        flags: DDSD_CAPS
            | DDSD_HEIGHT
            | DDSD_WIDTH
            | DDSD_PIXELFORMAT
            | DDSD_MIPMAPCOUNT
            | DDSD_LINEARSIZE,
        height,
        width,
        pitch_or_linear_size: linear_size,
        depth: 1,
        mip_map_count: mip_count,
        pixel_format: DdsPixelFormat {
            size: size_of::<DdsPixelFormat>() as u32,
            flags: DDPF_FOURCC,
            four_cc: FOURCC_DX10,
            ..Default::default()
        },
        caps,
        ..Default::default()
    };
    let dx10 = Dx10Header {
        dxgi_format,
        resource_dimension: D3D10_RESOURCE_DIMENSION_TEXTURE2D,
        misc_flag: 0,
        array_size: image_count.max(1),
        misc_flags2: 0,
    };

    let mut w = EndianWriter::new(Cursor::new(Vec::with_capacity(148 + data.len())), false);
    w.write_bytes(b"DDS ")?;
    w.write_struct(&header)?;
    w.write_struct(&dx10)?;
    w.write_bytes(data)?;
    Ok(w.into_inner().into_inner())
}
