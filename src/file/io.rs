//! Endian-aware primitive conversions and the ECMA-335 compressed integer codec.
//!
//! Everything in the metadata format is little-endian, except the compressed unsigned integer
//! (ECMA-335 II.23.2) which is stored big-endian with the length encoded in its leading bits.
//! This module holds the slice-level helpers both [`crate::file::ByteCursor`] and
//! [`crate::file::ByteSink`] build upon.
//!
//! # Compressed integers
//!
//! | value range | encoding |
//! |---|---|
//! | `0x00..=0x7F` | 1 byte, top bit `0` |
//! | `0x80..=0x3FFF` | 2 bytes, top bits `10` |
//! | `0x4000..=0x1FFF_FFFF` | 4 bytes, top bits `110` |
//! | `0xFFFF_FFFF` | the single byte `0xFF` |
//!
//! ```rust
//! use dotcodec::file::io::{encode_compressed_uint, decode_compressed_uint};
//!
//! let mut buffer = Vec::new();
//! encode_compressed_uint(300, &mut buffer)?;
//! assert_eq!(buffer, [0x81, 0x2C]);
//! assert_eq!(decode_compressed_uint(&buffer)?, (300, 2));
//! # Ok::<(), dotcodec::Error>(())
//! ```

use crate::Result;

/// Sentinel value carried by the single byte `0xFF` in the compressed form
pub const COMPRESSED_NULL: u32 = 0xFFFF_FFFF;

/// Largest value the compressed form can represent besides [`COMPRESSED_NULL`]
pub const COMPRESSED_MAX: u32 = 0x1FFF_FFFF;

/// Trait for primitives that can be decoded from and encoded into raw bytes.
///
/// Implemented for all fixed-width integers and IEEE floats the metadata format uses.
pub trait CilIO: Sized + Copy {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Read T from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
    /// Write T to a byte buffer in big-endian
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cil_io {
    ($($ty:ty => $size:literal),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; $size];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_cil_io! {
    u8 => 1, i8 => 1,
    u16 => 2, i16 => 2,
    u32 => 4, i32 => 4,
    u64 => 8, i64 => 8,
    f32 => 4, f64 => 8,
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`, advancing it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    let Ok(read) = T::Bytes::try_from(&data[*offset..end]) else {
        return Err(out_of_bounds_error!());
    };

    *offset = end;
    Ok(T::from_le_bytes(read))
}

/// Reads a 2 or 4 byte little-endian index, widening it to `u32`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    if is_large {
        read_le_at::<u32>(data, offset)
    } else {
        Ok(u32::from(read_le_at::<u16>(data, offset)?))
    }
}

/// Writes `value` in little-endian byte order at `offset`, advancing it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the buffer is too small.
pub fn write_le_at<T: CilIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let bytes = value.to_le_bytes();
    let bytes = bytes.as_ref();
    let Some(end) = offset.checked_add(bytes.len()) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    data[*offset..end].copy_from_slice(bytes);
    *offset = end;
    Ok(())
}

/// Number of bytes the compressed form of `value` occupies.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for values in `0x2000_0000..=0xFFFF_FFFE`.
pub fn compressed_uint_size(value: u32) -> Result<usize> {
    match value {
        COMPRESSED_NULL => Ok(1),
        0..=0x7F => Ok(1),
        0x80..=0x3FFF => Ok(2),
        0x4000..=COMPRESSED_MAX => Ok(4),
        _ => Err(malformed_error!(
            "Value 0x{:X} can not be stored as a compressed integer",
            value
        )),
    }
}

/// Appends the compressed form of `value` to `out`.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for values in `0x2000_0000..=0xFFFF_FFFE`.
#[allow(clippy::cast_possible_truncation)]
pub fn encode_compressed_uint(value: u32, out: &mut Vec<u8>) -> Result<()> {
    match compressed_uint_size(value)? {
        1 if value == COMPRESSED_NULL => out.push(0xFF),
        1 => out.push(value as u8),
        2 => out.extend_from_slice(&((value as u16) | 0x8000).to_be_bytes()),
        _ => out.extend_from_slice(&(value | 0xC000_0000).to_be_bytes()),
    }
    Ok(())
}

/// Decodes a compressed integer from the start of `data`, returning the value and its length.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] on truncated input and [`crate::Error::Malformed`]
/// for a leading byte of the form `111xxxxx` other than `0xFF`.
pub fn decode_compressed_uint(data: &[u8]) -> Result<(u32, usize)> {
    let Some(&first) = data.first() else {
        return Err(out_of_bounds_error!());
    };
    let length = compressed_uint_length(first)?;
    if data.len() < length {
        return Err(out_of_bounds_error!());
    }

    let value = match length {
        1 if first == 0xFF => COMPRESSED_NULL,
        1 => u32::from(first),
        2 => u32::from(u16::from_be_bytes([first, data[1]]) & 0x3FFF),
        _ => u32::from_be_bytes([first, data[1], data[2], data[3]]) & COMPRESSED_MAX,
    };
    Ok((value, length))
}

/// Length of a compressed integer, derived from its leading byte.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for the reserved `111xxxxx` prefixes.
pub fn compressed_uint_length(first: u8) -> Result<usize> {
    if first == 0xFF || first & 0x80 == 0 {
        Ok(1)
    } else if first & 0xC0 == 0x80 {
        Ok(2)
    } else if first & 0xE0 == 0xC0 {
        Ok(4)
    } else {
        Err(malformed_error!(
            "Invalid compressed integer prefix 0x{:02X}",
            first
        ))
    }
}

/// Encodes a signed compressed integer (ECMA-335 II.23.2, rotated sign bit) into `out`.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if `value` is outside `-2^28..2^28`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn encode_compressed_int(value: i32, out: &mut Vec<u8>) -> Result<()> {
    let (payload, width) = if (-0x40..0x40).contains(&value) {
        (((value << 1) as u32 & 0x7F) | u32::from(value < 0), 1)
    } else if (-0x2000..0x2000).contains(&value) {
        (((value << 1) as u32 & 0x3FFF) | u32::from(value < 0), 2)
    } else if (-0x1000_0000..0x1000_0000).contains(&value) {
        (((value << 1) as u32 & COMPRESSED_MAX) | u32::from(value < 0), 4)
    } else {
        return Err(malformed_error!(
            "Value {} can not be stored as a compressed signed integer",
            value
        ));
    };

    match width {
        1 => out.push(payload as u8),
        2 => out.extend_from_slice(&((payload as u16) | 0x8000).to_be_bytes()),
        _ => out.extend_from_slice(&(payload | 0xC000_0000).to_be_bytes()),
    }
    Ok(())
}

/// Decodes a signed compressed integer from the start of `data`.
///
/// # Errors
/// Same conditions as [`decode_compressed_uint`].
#[allow(clippy::cast_possible_wrap)]
pub fn decode_compressed_int(data: &[u8]) -> Result<(i32, usize)> {
    let (raw, length) = decode_compressed_uint(data)?;
    if raw == COMPRESSED_NULL {
        return Err(malformed_error!("0xFF is not a valid compressed signed integer"));
    }

    let negative = raw & 1 != 0;
    let magnitude = raw >> 1;
    let sign_extension = match length {
        1 => 0xFFFF_FFC0_u32,
        2 => 0xFFFF_E000,
        _ => 0xF000_0000,
    };

    let value = if negative {
        (magnitude | sign_extension) as i32
    } else {
        magnitude as i32
    };
    Ok((value, length))
}
