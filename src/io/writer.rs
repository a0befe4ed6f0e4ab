//! Endian-aware writer, the mirror of [`super::EndianReader`].

use std::io::{Seek, Write};

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use bytemuck::Pod;

use super::{Decimal, f32_to_f16, needs_swap};
use crate::{Error, Result};

macro_rules! write_endian {
    ($($name:ident($ty:ty)),* $(,)?) => {
        $(
            #[doc = concat!("Write a `", stringify!($ty), "` in the current byte order.")]
            #[inline]
            pub fn $name(&mut self, value: $ty) -> Result<()> {
                if self.big_endian {
                    self.inner.$name::<BigEndian>(value)?;
                } else {
                    self.inner.$name::<LittleEndian>(value)?;
                }
                Ok(())
            }
        )*
    };
}

/// Byte sink with a mutable big-endian flag.
#[derive(Debug)]
pub struct EndianWriter<W> {
    inner: W,
    big_endian: bool,
}

impl<W: Write + Seek> EndianWriter<W> {
    pub fn new(inner: W, big_endian: bool) -> Self {
        Self { inner, big_endian }
    }

    pub fn is_big_endian(&self) -> bool {
        self.big_endian
    }

    pub fn set_big_endian(&mut self, big_endian: bool) {
        self.big_endian = big_endian;
    }

    /// Whether values written now are byte-swapped relative to host order.
    pub fn needs_swap(&self) -> bool {
        needs_swap(self.big_endian)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Pad with zero bytes up to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: u64) -> Result<()> {
        if alignment <= 1 {
            return Ok(());
        }
        let rem = self.position()? % alignment;
        if rem != 0 {
            self.write_bytes(&vec![0u8; (alignment - rem) as usize])?;
        }
        Ok(())
    }

    #[inline]
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        Ok(self.inner.write_u8(value)?)
    }

    #[inline]
    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        Ok(self.inner.write_i8(value)?)
    }

    write_endian! {
        write_u16(u16),
        write_i16(i16),
        write_u32(u32),
        write_i32(i32),
        write_u64(u64),
        write_i64(i64),
        write_f32(f32),
        write_f64(f64),
    }

    /// Write an `f32` narrowed to half precision.
    pub fn write_f16(&mut self, value: f32) -> Result<()> {
        self.write_u16(f32_to_f16(value))
    }

    pub fn write_decimal(&mut self, value: Decimal) -> Result<()> {
        self.write_i32(value.lo)?;
        self.write_i32(value.mid)?;
        self.write_i32(value.hi)?;
        self.write_i32(value.flags)
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(u8::from(value))
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        Ok(self.inner.write_all(bytes)?)
    }

    /// Write an `i32` length prefix and the string bytes, then align.
    pub fn write_string32(&mut self, value: &str, align: u64) -> Result<()> {
        let len = i32::try_from(value.len()).map_err(|_| Error::InvalidRange)?;
        self.write_i32(len)?;
        self.write_bytes(value.as_bytes())?;
        if align > 1 {
            self.align(align)?;
        }
        Ok(())
    }

    #[inline]
    pub fn write_aligned_string(&mut self, value: &str) -> Result<()> {
        self.write_string32(value, 4)
    }

    pub fn write_null_string(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())?;
        self.write_u8(0)
    }

    pub fn write_i32_array(&mut self, values: &[i32]) -> Result<()> {
        values.iter().try_for_each(|&v| self.write_i32(v))
    }

    /// Raw memory copy of `values`; fails when the sink needs swapping.
    pub fn write_array<T: Pod>(&mut self, values: &[T]) -> Result<()> {
        if self.needs_swap() {
            return Err(Error::EndianArray("arrays"));
        }
        self.write_bytes(bytemuck::cast_slice(values))
    }

    /// Raw memory copy of one `T`; fails when the sink needs swapping.
    pub fn write_struct<T: Pod>(&mut self, value: &T) -> Result<()> {
        if self.needs_swap() {
            return Err(Error::EndianArray("structs"));
        }
        self.write_bytes(bytemuck::bytes_of(value))
    }
}
