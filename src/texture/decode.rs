//! Software decoders, one per texture format family.
//!
//! Every function here returns either a complete `width * height * 4` RGBA8
//! buffer or `None`. A codec that rejects its input never produces a
//! partially filled buffer.

use std::panic::{self, AssertUnwindSafe};

use log::{trace, warn};
use texture2ddecoder as codec;

use super::TextureFormat;
use crate::version::UnityVersion;

/// Which crunch stream layout a payload uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrunchAlgorithm {
    /// The original crunch format.
    Legacy,
    /// The engine's revised crunch format.
    Unity,
}

/// Pick the crunch unpacker for a payload.
///
/// The ETC crunched formats only ever existed in the revised layout; the
/// DXT ones switched at 2017.3.
pub fn crunch_algorithm(version: UnityVersion, format: TextureFormat) -> CrunchAlgorithm {
    if version >= UnityVersion::V2017_3
        || matches!(
            format,
            TextureFormat::ETC_RGB4Crunched | TextureFormat::ETC2_RGBA8Crunched
        )
    {
        CrunchAlgorithm::Unity
    } else {
        CrunchAlgorithm::Legacy
    }
}

// Both crunch layouts open with the `Hx` file signature.
const CRUNCH_SIGNATURE: [u8; 2] = [0x48, 0x78];

// Fixed part of a crunch header plus the first level offset.
const CRUNCH_HEADER_SIZE: usize = 74;

/// Largest texture the engine can author, 16384 on a side.
pub const MAX_PIXELS: usize = 16384 * 16384;

// Densest block format is ASTC 12x12: 144 pixels in 16 bytes.
const MAX_PIXELS_PER_BYTE: usize = 9;

/// Decode the top image of a texture payload to RGBA8.
pub fn decode(
    format: TextureFormat,
    width: usize,
    height: usize,
    version: UnityVersion,
    data: &[u8],
) -> Option<Vec<u8>> {
    use TextureFormat::*;

    let pixels = width.checked_mul(height).filter(|&n| n > 0 && n <= MAX_PIXELS)?;
    let crunched = matches!(
        format,
        DXT1Crunched | DXT5Crunched | ETC_RGB4Crunched | ETC2_RGBA8Crunched
    );
    if !crunched && pixels / MAX_PIXELS_PER_BYTE > data.len() {
        trace!("{format:?} payload of {} bytes cannot cover {width}x{height}", data.len());
        return None;
    }
    if let Some(expected) = format.image_size(width, height) {
        if data.len() < expected {
            trace!("{format:?} payload too short: {} < {expected}", data.len());
            return None;
        }
    }

    let (w, h) = (width, height);
    match format {
        Alpha8 | ARGB4444 | RGB24 | RGBA32 | ARGB32 | RGB565 | R16 | RGBA4444 | BGRA32
        | RG16 | R8 => convert(format, w, h, data),
        DXT1 => run(w, h, |img| codec::decode_bc1(data, w, h, img)),
        DXT5 => run(w, h, |img| codec::decode_bc3(data, w, h, img)),
        BC4 => run(w, h, |img| codec::decode_bc4(data, w, h, img)),
        BC5 => run(w, h, |img| codec::decode_bc5(data, w, h, img)),
        BC7 => run(w, h, |img| codec::decode_bc7(data, w, h, img)),
        PVRTC_RGB2 | PVRTC_RGBA2 => run(w, h, |img| codec::decode_pvrtc(data, w, h, img, true)),
        PVRTC_RGB4 | PVRTC_RGBA4 => run(w, h, |img| codec::decode_pvrtc(data, w, h, img, false)),
        ETC_RGB4 | ETC_RGB4_3DS => run(w, h, |img| codec::decode_etc1(data, w, h, img)),
        ETC2_RGB => run(w, h, |img| codec::decode_etc2_rgb(data, w, h, img)),
        ETC2_RGBA1 => run(w, h, |img| codec::decode_etc2_rgba1(data, w, h, img)),
        ETC2_RGBA8 | ETC_RGBA8_3DS => run(w, h, |img| codec::decode_etc2_rgba8(data, w, h, img)),
        EAC_R => run(w, h, |img| codec::decode_eacr(data, w, h, img)),
        EAC_R_SIGNED => run(w, h, |img| codec::decode_eacr_signed(data, w, h, img)),
        EAC_RG => run(w, h, |img| codec::decode_eacrg(data, w, h, img)),
        EAC_RG_SIGNED => run(w, h, |img| codec::decode_eacrg_signed(data, w, h, img)),
        ATC_RGB4 => run(w, h, |img| codec::decode_atc_rgb4(data, w, h, img)),
        ATC_RGBA8 => run(w, h, |img| codec::decode_atc_rgba8(data, w, h, img)),
        DXT1Crunched | DXT5Crunched | ETC_RGB4Crunched | ETC2_RGBA8Crunched => {
            decode_crunched(format, w, h, version, data)
        }
        _ => {
            let block = astc_block_size(format)?;
            let expected = w.div_ceil(block) * h.div_ceil(block) * 16;
            if data.len() < expected {
                return None;
            }
            run(w, h, |img| codec::decode_astc(data, w, h, block, block, img))
        }
    }
}

/// Square block edge of an ASTC format.
pub fn astc_block_size(format: TextureFormat) -> Option<usize> {
    use TextureFormat::*;
    Some(match format {
        ASTC_4x4 | ASTC_ALPHA_4x4 | ASTC_HDR_4x4 => 4,
        ASTC_5x5 | ASTC_ALPHA_5x5 | ASTC_HDR_5x5 => 5,
        ASTC_6x6 | ASTC_ALPHA_6x6 | ASTC_HDR_6x6 => 6,
        ASTC_8x8 | ASTC_ALPHA_8x8 | ASTC_HDR_8x8 => 8,
        ASTC_10x10 | ASTC_ALPHA_10x10 | ASTC_HDR_10x10 => 10,
        ASTC_12x12 | ASTC_ALPHA_12x12 | ASTC_HDR_12x12 => 12,
        _ => return None,
    })
}

/// Unpack a crunch stream straight to pixels.
///
/// The crunch unpackers also run the base block decoder, so an unpack
/// failure and a base decode failure both come back as `None`. The header is
/// checked first and the unpacker runs under `catch_unwind`, since it
/// indexes its input without bounds checks.
fn decode_crunched(
    format: TextureFormat,
    w: usize,
    h: usize,
    version: UnityVersion,
    data: &[u8],
) -> Option<Vec<u8>> {
    if !valid_crunch_header(data, w, h) {
        trace!("{format:?} payload is not a usable crunch stream");
        return None;
    }
    let algorithm = crunch_algorithm(version, format);
    let unpacked = panic::catch_unwind(AssertUnwindSafe(|| match algorithm {
        CrunchAlgorithm::Unity => run(w, h, |img| codec::decode_unity_crunch(data, w, h, img)),
        CrunchAlgorithm::Legacy => run(w, h, |img| codec::decode_crunch(data, w, h, img)),
    }));
    unpacked.unwrap_or_else(|_| {
        warn!("{format:?} crunch unpacker aborted on a malformed stream");
        None
    })
}

/// Big-endian header fields: sizes must fit the payload, the stream must
/// cover the requested image, and the first level must start inside it.
fn valid_crunch_header(data: &[u8], w: usize, h: usize) -> bool {
    if data.len() < CRUNCH_HEADER_SIZE || !data.starts_with(&CRUNCH_SIGNATURE) {
        return false;
    }
    let be16 = |at: usize| usize::from(u16::from_be_bytes([data[at], data[at + 1]]));
    let header_size = be16(2);
    let data_size = u32::from_be_bytes([data[6], data[7], data[8], data[9]]) as usize;
    let (width, height, levels) = (be16(12), be16(14), data[16]);
    let level0 = u32::from_be_bytes([data[70], data[71], data[72], data[73]]) as usize;

    header_size >= CRUNCH_HEADER_SIZE
        && header_size <= data_size
        && data_size <= data.len()
        && levels > 0
        && w <= width
        && h <= height
        && level0 >= header_size
        && level0 < data_size
}

/// Run a codec into a scratch `u32` image and reorder it to RGBA bytes.
fn run<E: std::fmt::Debug>(
    w: usize,
    h: usize,
    decode: impl FnOnce(&mut [u32]) -> Result<(), E>,
) -> Option<Vec<u8>> {
    let pixels = w.checked_mul(h).filter(|&n| n <= MAX_PIXELS)?;
    let mut image = vec![0u32; pixels];
    if let Err(err) = decode(&mut image) {
        trace!("texture codec rejected payload: {err:?}");
        return None;
    }
    let mut out = Vec::with_capacity(pixels.checked_mul(4)?);
    for px in image {
        // codec pixels are packed BGRA in little-endian order
        let [b, g, r, a] = px.to_le_bytes();
        out.extend_from_slice(&[r, g, b, a]);
    }
    Some(out)
}

#[inline]
fn expand4(v: u16) -> u8 {
    (v & 0xF) as u8 * 17
}

fn convert(format: TextureFormat, w: usize, h: usize, data: &[u8]) -> Option<Vec<u8>> {
    use TextureFormat::*;

    let bpp = format.pixel_size()?;
    let pixels = w.checked_mul(h)?;
    let src = data.get(..pixels.checked_mul(bpp)?)?;
    let mut out = Vec::with_capacity(pixels.checked_mul(4)?);
    for px in src.chunks_exact(bpp) {
        let rgba = match format {
            Alpha8 => [0xFF, 0xFF, 0xFF, px[0]],
            R8 => [px[0], 0, 0, 0xFF],
            RG16 => [px[0], px[1], 0, 0xFF],
            R16 => {
                let v = u16::from_le_bytes([px[0], px[1]]);
                [(v >> 8) as u8, 0, 0, 0xFF]
            }
            RGB565 => {
                let v = u16::from_le_bytes([px[0], px[1]]);
                let r = (v >> 11) as u8 & 0x1F;
                let g = (v >> 5) as u8 & 0x3F;
                let b = v as u8 & 0x1F;
                [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2), 0xFF]
            }
            ARGB4444 => {
                let v = u16::from_le_bytes([px[0], px[1]]);
                [expand4(v >> 8), expand4(v >> 4), expand4(v), expand4(v >> 12)]
            }
            RGBA4444 => {
                let v = u16::from_le_bytes([px[0], px[1]]);
                [expand4(v >> 12), expand4(v >> 8), expand4(v >> 4), expand4(v)]
            }
            RGB24 => [px[0], px[1], px[2], 0xFF],
            RGBA32 => [px[0], px[1], px[2], px[3]],
            ARGB32 => [px[1], px[2], px[3], px[0]],
            BGRA32 => [px[2], px[1], px[0], px[3]],
            _ => return None,
        };
        out.extend_from_slice(&rgba);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> UnityVersion {
        UnityVersion::parse_safe(s).unwrap()
    }

    // color0 = color1 = pure red in RGB565, every index 0
    const RED_DXT1_BLOCK: [u8; 8] = [0x00, 0xF8, 0x00, 0xF8, 0, 0, 0, 0];

    #[test]
    fn test_dxt1_solid_block() {
        let out = decode(TextureFormat::DXT1, 4, 4, UnityVersion::MIN, &RED_DXT1_BLOCK).unwrap();
        assert_eq!(out.len(), 64);
        assert!(out.chunks_exact(4).all(|px| px == [255, 0, 0, 255]));
    }

    #[test]
    fn test_decode_is_deterministic() {
        let data: Vec<u8> = (0..64u8).map(|i| i.wrapping_mul(37)).collect();
        let a = decode(TextureFormat::DXT5, 8, 8, UnityVersion::MIN, &data);
        let b = decode(TextureFormat::DXT5, 8, 8, UnityVersion::MIN, &data);
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn test_short_payload_is_empty() {
        assert_eq!(
            decode(TextureFormat::DXT1, 8, 8, UnityVersion::MIN, &RED_DXT1_BLOCK),
            None
        );
        assert_eq!(decode(TextureFormat::RGBA32, 2, 2, UnityVersion::MIN, &[0; 15]), None);
        assert_eq!(decode(TextureFormat::ASTC_8x8, 16, 16, UnityVersion::MIN, &[0; 32]), None);
    }

    fn crunch_header(len: usize, width: u16, height: u16) -> Vec<u8> {
        let mut data = vec![0xA5u8; len];
        data[..2].copy_from_slice(b"Hx");
        data[2..4].copy_from_slice(&(CRUNCH_HEADER_SIZE as u16).to_be_bytes());
        data[6..10].copy_from_slice(&(len as u32).to_be_bytes());
        data[12..14].copy_from_slice(&width.to_be_bytes());
        data[14..16].copy_from_slice(&height.to_be_bytes());
        data[16] = 1;
        data[70..74].copy_from_slice(&(CRUNCH_HEADER_SIZE as u32).to_be_bytes());
        data
    }

    const CRUNCHED: [TextureFormat; 4] = [
        TextureFormat::DXT1Crunched,
        TextureFormat::DXT5Crunched,
        TextureFormat::ETC_RGB4Crunched,
        TextureFormat::ETC2_RGBA8Crunched,
    ];

    #[test]
    fn test_corrupt_crunch_is_empty() {
        let mut signed = b"Hx".to_vec();
        signed.extend_from_slice(&[0xA5; 200]);
        for format in CRUNCHED {
            assert_eq!(decode(format, 4, 4, v("2019.4.0f1"), &[0xA5; 256]), None);
            assert_eq!(decode(format, 4, 4, UnityVersion::V2017_3, &signed), None);
            assert_eq!(decode(format, 4, 4, v("5.6.7f1"), &b"Hx"[..]), None);
        }
    }

    #[test]
    fn test_crunch_header_bounds() {
        let ok = crunch_header(128, 4, 4);
        assert!(valid_crunch_header(&ok, 4, 4));
        // requested image larger than the stream describes
        assert!(!valid_crunch_header(&ok, 8, 4));

        let mut oversized = ok.clone();
        oversized[6..10].copy_from_slice(&4096u32.to_be_bytes());
        assert!(!valid_crunch_header(&oversized, 4, 4));

        let mut level_outside = ok.clone();
        level_outside[70..74].copy_from_slice(&128u32.to_be_bytes());
        assert!(!valid_crunch_header(&level_outside, 4, 4));

        let mut no_levels = ok;
        no_levels[16] = 0;
        assert!(!valid_crunch_header(&no_levels, 4, 4));
    }

    #[test]
    fn test_crunch_body_garbage_is_empty() {
        let data = crunch_header(160, 4, 4);
        for format in CRUNCHED {
            for version in [v("5.6.7f1"), UnityVersion::V2017_3] {
                assert_eq!(decode(format, 4, 4, version, &data), None);
            }
        }
    }

    #[test]
    fn test_huge_dimensions_are_empty() {
        let side = i32::MAX as usize;
        for format in [
            TextureFormat::PVRTC_RGB4,
            TextureFormat::ASTC_4x4,
            TextureFormat::DXT1,
            TextureFormat::RGBA32,
            TextureFormat::DXT1Crunched,
        ] {
            assert_eq!(decode(format, side, side, UnityVersion::MIN, &[0; 32]), None);
        }
        assert_eq!(decode(TextureFormat::RGBA32, usize::MAX, 2, UnityVersion::MIN, &[0; 32]), None);
        // plausible dimensions, far too little data
        assert_eq!(decode(TextureFormat::PVRTC_RGB2, 4096, 4096, UnityVersion::MIN, &[0; 64]), None);
    }

    #[test]
    fn test_zero_sized_is_empty() {
        assert_eq!(decode(TextureFormat::RGBA32, 0, 4, UnityVersion::MIN, &[]), None);
    }

    #[test]
    fn test_unsupported_format_is_empty() {
        assert_eq!(
            decode(TextureFormat::YUY2, 2, 2, UnityVersion::MIN, &[0; 64]),
            None
        );
    }

    #[test]
    fn test_crunch_threshold() {
        assert_eq!(
            crunch_algorithm(v("2017.2.5f1"), TextureFormat::DXT1Crunched),
            CrunchAlgorithm::Legacy
        );
        assert_eq!(
            crunch_algorithm(UnityVersion::V2017_3, TextureFormat::DXT1Crunched),
            CrunchAlgorithm::Unity
        );
        assert_eq!(
            crunch_algorithm(v("2017.3.0f1"), TextureFormat::DXT5Crunched),
            CrunchAlgorithm::Unity
        );
        assert_eq!(
            crunch_algorithm(v("5.6.7f1"), TextureFormat::DXT5Crunched),
            CrunchAlgorithm::Legacy
        );
    }

    #[test]
    fn test_etc_crunch_ignores_version() {
        for format in [TextureFormat::ETC_RGB4Crunched, TextureFormat::ETC2_RGBA8Crunched] {
            assert_eq!(crunch_algorithm(v("5.0.0f1"), format), CrunchAlgorithm::Unity);
            assert_eq!(crunch_algorithm(UnityVersion::MIN, format), CrunchAlgorithm::Unity);
        }
    }

    #[test]
    fn test_uncompressed_conversions() {
        let rgb565 = 0xF800u16.to_le_bytes();
        assert_eq!(
            decode(TextureFormat::RGB565, 1, 1, UnityVersion::MIN, &rgb565).unwrap(),
            vec![255, 0, 0, 255]
        );
        assert_eq!(
            decode(TextureFormat::ARGB32, 1, 1, UnityVersion::MIN, &[1, 2, 3, 4]).unwrap(),
            vec![2, 3, 4, 1]
        );
        assert_eq!(
            decode(TextureFormat::BGRA32, 1, 1, UnityVersion::MIN, &[1, 2, 3, 4]).unwrap(),
            vec![3, 2, 1, 4]
        );
        assert_eq!(
            decode(TextureFormat::Alpha8, 1, 1, UnityVersion::MIN, &[9]).unwrap(),
            vec![255, 255, 255, 9]
        );
        let argb4444 = 0xF0A5u16.to_le_bytes();
        assert_eq!(
            decode(TextureFormat::ARGB4444, 1, 1, UnityVersion::MIN, &argb4444).unwrap(),
            vec![0, 0xAA, 0x55, 0xFF]
        );
        let rgba4444 = 0xF0A5u16.to_le_bytes();
        assert_eq!(
            decode(TextureFormat::RGBA4444, 1, 1, UnityVersion::MIN, &rgba4444).unwrap(),
            vec![0xFF, 0, 0xAA, 0x55]
        );
    }
}
