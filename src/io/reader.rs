//! Endian-aware reader over any seekable byte source.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use bytemuck::Pod;

use super::{Decimal, f16_to_f32, needs_swap};
use crate::{Error, Result};

/// Generates one reader method per multi-byte primitive. The byte order is
/// looked up on every call so a stream may switch order part-way through.
macro_rules! read_endian {
    ($($name:ident -> $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("Read a `", stringify!($ty), "` in the current byte order.")]
            #[inline]
            pub fn $name(&mut self) -> Result<$ty> {
                Ok(if self.big_endian {
                    self.inner.$name::<BigEndian>()?
                } else {
                    self.inner.$name::<LittleEndian>()?
                })
            }
        )*
    };
}

/// Byte cursor with a mutable big-endian flag.
#[derive(Debug)]
pub struct EndianReader<R> {
    inner: R,
    big_endian: bool,
}

impl<R: Read + Seek> EndianReader<R> {
    /// Wrap `inner`, starting in the given byte order.
    pub fn new(inner: R, big_endian: bool) -> Self {
        Self { inner, big_endian }
    }

    /// Whether multi-byte values are currently read big-endian.
    pub fn is_big_endian(&self) -> bool {
        self.big_endian
    }

    /// Switch byte order for every following read.
    pub fn set_big_endian(&mut self, big_endian: bool) {
        self.big_endian = big_endian;
    }

    /// Whether values read now are byte-swapped relative to host order.
    pub fn needs_swap(&self) -> bool {
        needs_swap(self.big_endian)
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the cursor, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Current absolute position.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Seek the underlying source.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.inner.seek(pos)?)
    }

    /// Total length of the underlying source. The position is preserved.
    pub fn stream_len(&mut self) -> Result<u64> {
        let pos = self.inner.stream_position()?;
        let len = self.inner.seek(SeekFrom::End(0))?;
        if pos != len {
            self.inner.seek(SeekFrom::Start(pos))?;
        }
        Ok(len)
    }

    /// Bytes left between the position and the end of the source.
    pub fn unconsumed(&mut self) -> Result<u64> {
        let pos = self.position()?;
        Ok(self.stream_len()?.saturating_sub(pos))
    }

    /// Move the position by `delta` bytes.
    pub fn skip(&mut self, delta: i64) -> Result<()> {
        self.inner.seek(SeekFrom::Current(delta))?;
        Ok(())
    }

    /// Advance to the next multiple of `alignment`.
    ///
    /// Does nothing when that boundary lies past the end of the source.
    pub fn align(&mut self, alignment: u64) -> Result<()> {
        if alignment <= 1 {
            return Ok(());
        }
        let pos = self.position()?;
        let rem = pos % alignment;
        if rem == 0 {
            return Ok(());
        }
        let delta = alignment - rem;
        if pos + delta > self.stream_len()? {
            return Ok(());
        }
        self.inner.seek(SeekFrom::Current(delta as i64))?;
        Ok(())
    }

    /// Read one byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.inner.read_u8()?)
    }

    /// Read one signed byte.
    #[inline]
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.inner.read_i8()?)
    }

    read_endian! {
        read_u16 -> u16,
        read_i16 -> i16,
        read_u32 -> u32,
        read_i32 -> i32,
        read_u64 -> u64,
        read_i64 -> i64,
        read_f32 -> f32,
        read_f64 -> f64,
    }

    /// Read an IEEE half-precision float, widened to `f32`.
    pub fn read_f16(&mut self) -> Result<f32> {
        Ok(f16_to_f32(self.read_u16()?))
    }

    /// Read a 128-bit decimal as four endian-corrected 32-bit words.
    pub fn read_decimal(&mut self) -> Result<Decimal> {
        Ok(Decimal {
            lo: self.read_i32()?,
            mid: self.read_i32()?,
            hi: self.read_i32()?,
            flags: self.read_i32()?,
        })
    }

    /// Read a boolean byte. Only `1` is true.
    ///
    /// A failed read (including end of stream) yields `false`.
    pub fn read_bool(&mut self) -> bool {
        matches!(self.inner.read_u8(), Ok(1))
    }

    /// Read exactly `N` bytes into a fixed-size array.
    #[inline]
    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut b = [0u8; N];
        self.inner.read_exact(&mut b)?;
        Ok(b)
    }

    /// Verify that the next bytes in the stream match `expected`.
    pub fn read_magic(&mut self, expected: &[u8]) -> Result<()> {
        let got = self.read_bytes(expected.len())?;
        if got != expected {
            return Err(Error::BadMagic);
        }
        Ok(())
    }

    /// Read `count` raw bytes. Byte order never applies to these.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        if count as u64 > self.unconsumed()? {
            return Err(Error::InvalidRange);
        }
        let mut b = vec![0u8; count];
        self.inner.read_exact(&mut b)?;
        Ok(b)
    }

    /// Read an `i32` length prefix followed by that many UTF-8 bytes, then
    /// align to `align` when it is greater than one.
    pub fn read_string32(&mut self, align: u64) -> Result<String> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(Error::NegativeLength(len));
        }
        let bytes = self.read_bytes(len as usize)?;
        if align > 1 {
            self.align(align)?;
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Length-prefixed string followed by 4-byte alignment.
    #[inline]
    pub fn read_aligned_string(&mut self) -> Result<String> {
        self.read_string32(4)
    }

    /// Read a null-terminated string.
    ///
    /// With a non-zero `max_len`, reading also stops once that many bytes
    /// have been collected.
    pub fn read_null_string(&mut self, max_len: usize) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            let b = self.read_u8()?;
            if b == 0 {
                break;
            }
            bytes.push(b);
            if max_len > 0 && bytes.len() >= max_len {
                break;
            }
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read `count` `i32`s, each in the current byte order.
    pub fn read_i32_array(&mut self, count: usize) -> Result<Vec<i32>> {
        if count as u64 * 4 > self.unconsumed()? {
            return Err(Error::InvalidRange);
        }
        (0..count).map(|_| self.read_i32()).collect()
    }

    /// Raw memory copy of `count` values.
    ///
    /// Fails with [`Error::EndianArray`] when the stream needs swapping:
    /// arrays in this format family are always stored in host order.
    pub fn read_array<T: Pod>(&mut self, count: usize) -> Result<Vec<T>> {
        if self.needs_swap() {
            return Err(Error::EndianArray("arrays"));
        }
        let size = count
            .checked_mul(size_of::<T>())
            .ok_or(Error::InvalidRange)?;
        if size as u64 > self.unconsumed()? {
            return Err(Error::InvalidRange);
        }
        let mut out = vec![T::zeroed(); count];
        self.inner.read_exact(bytemuck::cast_slice_mut(&mut out))?;
        Ok(out)
    }

    /// Raw memory copy of one `T`. Same restriction as [`Self::read_array`].
    pub fn read_struct<T: Pod>(&mut self) -> Result<T> {
        if self.needs_swap() {
            return Err(Error::EndianArray("structs"));
        }
        let mut value = T::zeroed();
        self.inner
            .read_exact(bytemuck::bytes_of_mut(&mut value))?;
        Ok(value)
    }
}
