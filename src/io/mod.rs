//! Endian-aware binary I/O primitives shared by all parsers.
//!
//! [`EndianReader`] and [`EndianWriter`] carry a big-endian flag that is
//! consulted on every multi-byte access, so a stream can change byte order
//! once its own endianness marker has been read (serialized file headers are
//! big-endian, their metadata usually is not).
//!
//! Raw struct and array copies ([`EndianReader::read_array`],
//! [`EndianReader::read_struct`]) are never byte-swapped. They fail with
//! [`crate::Error::EndianArray`] whenever the current flag disagrees with
//! the host byte order.

mod reader;
mod writer;

pub use reader::EndianReader;
pub use writer::EndianWriter;

/// A 128-bit decimal stored as four 32-bit words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Decimal {
    pub lo: i32,
    pub mid: i32,
    pub hi: i32,
    pub flags: i32,
}

/// True when host order and the requested order differ.
#[inline]
pub(crate) fn needs_swap(big_endian: bool) -> bool {
    cfg!(target_endian = "little") == big_endian
}

pub(crate) fn f16_to_f32(bits: u16) -> f32 {
    let sign = u32::from(bits >> 15) << 31;
    let exp = u32::from((bits >> 10) & 0x1F);
    let mant = u32::from(bits & 0x3FF);
    let out = match exp {
        0 if mant == 0 => sign,
        0 => {
            // subnormal: renormalise into an f32 exponent
            let mut e = 127 - 15 + 1;
            let mut m = mant;
            while m & 0x400 == 0 {
                m <<= 1;
                e -= 1;
            }
            sign | (e << 23) | ((m & 0x3FF) << 13)
        }
        0x1F => sign | 0x7F80_0000 | (mant << 13),
        _ => sign | ((exp + 127 - 15) << 23) | (mant << 13),
    };
    f32::from_bits(out)
}

/// Truncating conversion; values below the half range flush to zero.
pub(crate) fn f32_to_f16(value: f32) -> u16 {
    let x = value.to_bits();
    let sign = ((x >> 16) & 0x8000) as u16;
    let exp = ((x >> 23) & 0xFF) as i32;
    let mant = x & 0x7F_FFFF;
    if exp == 0xFF {
        return sign | 0x7C00 | if mant != 0 { 0x200 } else { 0 };
    }
    let e = exp - 127 + 15;
    if e >= 0x1F {
        sign | 0x7C00
    } else if e <= 0 {
        sign
    } else {
        sign | ((e as u16) << 10) | ((mant >> 13) as u16)
    }
}
