use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{Read, Write};

use crate::AnyResult;

/// A value that can be read from or written to a flat little-endian byte
/// stream with no length prefix or delimiter of its own — the building
/// block every fixed-layout chunk in this workspace is assembled from.
pub trait PackedData: Sized {
    fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self>;
    fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult;
}

macro_rules! impl_packed_int {
    ($t:ty, $read:ident, $write:ident) => {
        impl PackedData for $t {
            fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self> {
                Ok(r.$read::<LE>()?)
            }
            fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult {
                w.$write::<LE>(*self)?;
                Ok(())
            }
        }
    };
}

impl_packed_int!(u16, read_u16, write_u16);
impl_packed_int!(i16, read_i16, write_i16);
impl_packed_int!(u32, read_u32, write_u32);
impl_packed_int!(i32, read_i32, write_i32);
impl_packed_int!(u64, read_u64, write_u64);
impl_packed_int!(i64, read_i64, write_i64);
impl_packed_int!(f32, read_f32, write_f32);

impl PackedData for u8 {
    fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self> {
        Ok(r.read_u8()?)
    }
    fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult {
        w.write_u8(*self)?;
        Ok(())
    }
}

impl PackedData for i8 {
    fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self> {
        Ok(r.read_i8()?)
    }
    fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult {
        w.write_i8(*self)?;
        Ok(())
    }
}

impl PackedData for bool {
    fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self> {
        Ok(r.read_u8()? != 0)
    }
    fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult {
        w.write_u8(*self as u8)?;
        Ok(())
    }
}

impl<const N: usize> PackedData for [f32; N] {
    fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self> {
        let mut out = [0.0f32; N];
        for slot in out.iter_mut() {
            *slot = f32::read_packed(r)?;
        }
        Ok(out)
    }
    fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult {
        for v in self.iter() {
            v.write_packed(w)?;
        }
        Ok(())
    }
}

/// Convenience extension mirroring `ReadBytesExt`, but for whole [`PackedData`]
/// values instead of primitive integers.
pub trait PackedReadExt: Read {
    fn read_packed<T: PackedData>(&mut self) -> AnyResult<T>;
}

impl<R: Read + ?Sized> PackedReadExt for R {
    fn read_packed<T: PackedData>(&mut self) -> AnyResult<T> {
        T::read_packed(self)
    }
}

/// Convenience extension mirroring `WriteBytesExt`, but for whole
/// [`PackedData`] values.
pub trait PackedWriteExt: Write {
    fn write_packed<T: PackedData>(&mut self, value: &T) -> AnyResult;
}

impl<W: Write + ?Sized> PackedWriteExt for W {
    fn write_packed<T: PackedData>(&mut self, value: &T) -> AnyResult {
        value.write_packed(self)
    }
}
