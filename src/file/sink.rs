//! Growable binary writer with an optional hard limit and late fix-ups.
//!
//! [`ByteSink`] is the write-side mirror of [`crate::file::ByteCursor`]. Its backing buffer
//! doubles its capacity on overflow and refuses to grow past the configured write limit.
//! Fields whose value is only known after the payload was written (sizes, offsets) are
//! reserved with [`ByteSink::reserve_fixup`] and patched with [`ByteSink::apply_fixup`].
//!
//! ```rust
//! use dotcodec::file::ByteSink;
//!
//! let mut sink = ByteSink::new();
//! let size = sink.reserve_fixup()?;
//! sink.write_bytes(b"payload")?;
//! sink.apply_fixup(size, 7)?;
//! assert_eq!(&sink.as_slice()[..4], &[7, 0, 0, 0]);
//! # Ok::<(), dotcodec::Error>(())
//! ```

use widestring::U16Str;

use crate::{
    file::io::{encode_compressed_int, encode_compressed_uint, CilIO},
    metadata::token::Token,
    Result,
};

const INITIAL_CAPACITY: usize = 256;

/// A 4-byte field reserved for later patching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixup {
    offset: usize,
}

impl Fixup {
    /// Offset of the reserved field inside the sink
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// A growable little-endian writer.
#[derive(Debug, Default, Clone)]
pub struct ByteSink {
    data: Vec<u8>,
    position: usize,
    limit: Option<usize>,
}

impl ByteSink {
    /// Create an unbounded sink.
    #[must_use]
    pub fn new() -> Self {
        ByteSink::default()
    }

    /// Create a sink that refuses to grow beyond `limit` bytes.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        ByteSink {
            data: Vec::new(),
            position: 0,
            limit: Some(limit),
        }
    }

    /// Create a sink with an optional limit, as carried by [`crate::CodecConfig`].
    #[must_use]
    pub fn with_optional_limit(limit: Option<usize>) -> Self {
        ByteSink {
            data: Vec::new(),
            position: 0,
            limit,
        }
    }

    /// Number of bytes written so far (the high-water mark).
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current write position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Current capacity of the backing buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Move the write position; seeking is limited to the written range.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` is past the written data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }
        self.position = pos;
        Ok(())
    }

    /// The written bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consume the sink, returning the written bytes.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Write a little-endian value.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the write limit would be exceeded.
    pub fn write_le<T: CilIO>(&mut self, value: T) -> Result<()> {
        self.write_bytes(value.to_le_bytes().as_ref())
    }

    /// Write a big-endian value.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the write limit would be exceeded.
    pub fn write_be<T: CilIO>(&mut self, value: T) -> Result<()> {
        self.write_bytes(value.to_be_bytes().as_ref())
    }

    /// Write the low three bytes of `value`, little-endian.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `value` needs more than 24 bits.
    pub fn write_u24(&mut self, value: u32) -> Result<()> {
        if value > 0x00FF_FFFF {
            return Err(malformed_error!("Value 0x{:X} does not fit 24 bits", value));
        }
        self.write_bytes(&value.to_le_bytes()[..3])
    }

    /// Write a 2 or 4 byte index.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `value` does not fit a small index.
    pub fn write_index(&mut self, value: u32, is_large: bool) -> Result<()> {
        if is_large {
            return self.write_le::<u32>(value);
        }
        match u16::try_from(value) {
            Ok(small) => self.write_le::<u16>(small),
            Err(_) => Err(malformed_error!(
                "Index 0x{:X} does not fit a 2-byte column",
                value
            )),
        }
    }

    /// Write raw bytes at the current position, overwriting or extending.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the write limit would be exceeded.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let Some(end) = self.position.checked_add(bytes.len()) else {
            return Err(out_of_bounds_error!());
        };
        self.ensure_len(end)?;
        self.data[self.position..end].copy_from_slice(bytes);
        self.position = end;
        Ok(())
    }

    /// Write `count` zero bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the write limit would be exceeded.
    pub fn write_zeros(&mut self, count: usize) -> Result<()> {
        let Some(end) = self.position.checked_add(count) else {
            return Err(out_of_bounds_error!());
        };
        self.ensure_len(end)?;
        self.data[self.position..end].fill(0);
        self.position = end;
        Ok(())
    }

    /// Pad with zeros up to the next multiple of `alignment`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the write limit would be exceeded.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        if alignment <= 1 {
            return Ok(());
        }
        let padding = (alignment - self.position % alignment) % alignment;
        self.write_zeros(padding)
    }

    /// Write a compressed unsigned integer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for values the compressed form cannot hold.
    pub fn write_compressed_uint(&mut self, value: u32) -> Result<()> {
        let mut encoded = Vec::with_capacity(4);
        encode_compressed_uint(value, &mut encoded)?;
        self.write_bytes(&encoded)
    }

    /// Write a compressed signed integer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for values the compressed form cannot hold.
    pub fn write_compressed_int(&mut self, value: i32) -> Result<()> {
        let mut encoded = Vec::with_capacity(4);
        encode_compressed_int(value, &mut encoded)?;
        self.write_bytes(&encoded)
    }

    /// Write a `TypeDefOrRefOrSpecEncoded` token (II.23.2.8).
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidToken`] for tokens outside TypeDef, TypeRef and TypeSpec.
    pub fn write_compressed_token(&mut self, token: Token) -> Result<()> {
        let tag = match token.table() {
            0x02 => 0,
            0x01 => 1,
            0x1B => 2,
            _ => return Err(crate::Error::InvalidToken(token)),
        };
        self.write_compressed_uint((token.row() << 2) | tag)
    }

    /// Write a zero-terminated UTF-8 string.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the string contains an interior NUL.
    pub fn write_cstring(&mut self, value: &str) -> Result<()> {
        if value.as_bytes().contains(&0) {
            return Err(malformed_error!("String '{}' contains a NUL byte", value));
        }
        self.write_bytes(value.as_bytes())?;
        self.write_le::<u8>(0)
    }

    /// Write `value` into a fixed field of `len` bytes, zero padded.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the string does not fit.
    pub fn write_fixed_string(&mut self, value: &str, len: usize) -> Result<()> {
        if value.len() > len {
            return Err(malformed_error!(
                "String '{}' does not fit a {} byte field",
                value,
                len
            ));
        }
        self.write_bytes(value.as_bytes())?;
        self.write_zeros(len - value.len())
    }

    /// Write a compressed-length-prefixed UTF-8 string; `None` writes the null marker `0xFF`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the length cannot be compressed.
    pub fn write_prefixed_string(&mut self, value: Option<&str>) -> Result<()> {
        match value {
            None => self.write_le::<u8>(0xFF),
            Some(value) => {
                let length = u32::try_from(value.len())
                    .map_err(|_| malformed_error!("String too long - {}", value.len()))?;
                self.write_compressed_uint(length)?;
                self.write_bytes(value.as_bytes())
            }
        }
    }

    /// Write a compressed-length-prefixed UTF-16LE string followed by the `hint` byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the length cannot be compressed.
    pub fn write_prefixed_utf16(&mut self, value: &U16Str, hint: u8) -> Result<()> {
        let length = value
            .len()
            .checked_mul(2)
            .and_then(|bytes| bytes.checked_add(1))
            .and_then(|bytes| u32::try_from(bytes).ok())
            .ok_or_else(|| malformed_error!("User string too long - {}", value.len()))?;

        self.write_compressed_uint(length)?;
        for unit in value.as_slice() {
            self.write_le::<u16>(*unit)?;
        }
        self.write_le::<u8>(hint)
    }

    /// Reserve a 4-byte field at the current position for later patching.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the write limit would be exceeded.
    pub fn reserve_fixup(&mut self) -> Result<Fixup> {
        let offset = self.position;
        self.write_zeros(4)?;
        Ok(Fixup { offset })
    }

    /// Overwrite a reserved field; the write position is left untouched.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the fix-up does not lie inside the written data.
    pub fn apply_fixup(&mut self, fixup: Fixup, value: u32) -> Result<()> {
        self.patch_le_at(fixup.offset, value)
    }

    /// Overwrite an already written value at `offset`; the write position is left untouched.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range was never written.
    pub fn patch_le_at<T: CilIO>(&mut self, offset: usize, value: T) -> Result<()> {
        let bytes = value.to_le_bytes();
        let bytes = bytes.as_ref();
        match offset.checked_add(bytes.len()) {
            Some(end) if end <= self.data.len() => {
                self.data[offset..end].copy_from_slice(bytes);
                Ok(())
            }
            _ => Err(out_of_bounds_error!()),
        }
    }

    /// Grow the written range to `end`, doubling capacity and honouring the limit.
    fn ensure_len(&mut self, end: usize) -> Result<()> {
        if let Some(limit) = self.limit {
            if end > limit {
                return Err(out_of_bounds_error!());
            }
        }
        if end <= self.data.len() {
            return Ok(());
        }

        if end > self.data.capacity() {
            let mut target = self.data.capacity().max(INITIAL_CAPACITY);
            while target < end {
                target = target.saturating_mul(2);
            }
            if let Some(limit) = self.limit {
                target = target.min(limit);
            }
            self.data.reserve_exact(target - self.data.len());
        }

        self.data.resize(end, 0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{file::ByteCursor, Error};
    use proptest::prelude::*;
    use widestring::U16String;

    #[test]
    fn write_primitives() {
        let mut sink = ByteSink::new();
        sink.write_le::<u8>(0x01).unwrap();
        sink.write_le::<u16>(0x0302).unwrap();
        sink.write_u24(0x06_0504).unwrap();
        sink.write_be::<u16>(0x0708).unwrap();
        sink.write_le::<f32>(1.0).unwrap();
        assert_eq!(
            sink.as_slice(),
            &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x00, 0x00, 0x80, 0x3F]
        );
        assert!(sink.write_u24(0x0100_0000).is_err());
    }

    #[test]
    fn write_index_widths() {
        let mut sink = ByteSink::new();
        sink.write_index(0x1234, false).unwrap();
        sink.write_index(0x1_0000, true).unwrap();
        assert_eq!(sink.as_slice(), &[0x34, 0x12, 0x00, 0x00, 0x01, 0x00]);
        assert!(matches!(
            sink.write_index(0x1_0000, false),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn capacity_doubles() {
        let mut sink = ByteSink::new();
        sink.write_zeros(INITIAL_CAPACITY).unwrap();
        let before = sink.capacity();
        sink.write_zeros(before - sink.len()).unwrap();
        sink.write_le::<u8>(1).unwrap();
        assert!(sink.capacity() >= before * 2);
    }

    #[test]
    fn hard_limit() {
        let mut sink = ByteSink::with_limit(6);
        sink.write_le::<u32>(1).unwrap();
        sink.write_le::<u16>(2).unwrap();
        assert!(matches!(
            sink.write_le::<u8>(3),
            Err(Error::OutOfBounds { .. })
        ));
        assert_eq!(sink.len(), 6);
        assert!(sink.capacity() >= 6);
    }

    #[test]
    fn fixups_patch_in_place() {
        let mut sink = ByteSink::new();
        sink.write_le::<u8>(0xAA).unwrap();
        let fixup = sink.reserve_fixup().unwrap();
        sink.write_bytes(&[1, 2, 3]).unwrap();
        sink.apply_fixup(fixup, 0xDEAD_BEEF).unwrap();
        assert_eq!(fixup.offset(), 1);
        assert_eq!(sink.pos(), 8);
        assert_eq!(sink.as_slice(), &[0xAA, 0xEF, 0xBE, 0xAD, 0xDE, 1, 2, 3]);
        assert!(sink.patch_le_at(6, 0_u32).is_err());
    }

    #[test]
    fn seek_and_overwrite() {
        let mut sink = ByteSink::new();
        sink.write_bytes(&[1, 2, 3, 4]).unwrap();
        sink.seek(1).unwrap();
        sink.write_le::<u8>(9).unwrap();
        assert_eq!(sink.as_slice(), &[1, 9, 3, 4]);
        assert!(sink.seek(5).is_err());
    }

    #[test]
    fn align_pads_with_zeros() {
        let mut sink = ByteSink::new();
        sink.write_le::<u8>(0xFF).unwrap();
        sink.align(4).unwrap();
        sink.align(4).unwrap();
        assert_eq!(sink.as_slice(), &[0xFF, 0, 0, 0]);
    }

    #[test]
    fn strings() {
        let mut sink = ByteSink::new();
        sink.write_cstring("abc").unwrap();
        sink.write_fixed_string("#~", 4).unwrap();
        sink.write_prefixed_string(Some("hi")).unwrap();
        sink.write_prefixed_string(None).unwrap();
        assert_eq!(
            sink.as_slice(),
            &[b'a', b'b', b'c', 0, b'#', b'~', 0, 0, 2, b'h', b'i', 0xFF]
        );
        assert!(sink.write_cstring("a\0b").is_err());
        assert!(sink.write_fixed_string("toolong", 4).is_err());
    }

    #[test]
    fn utf16_roundtrip() {
        let mut sink = ByteSink::new();
        let value = U16String::from_str("hi");
        sink.write_prefixed_utf16(&value, 0).unwrap();
        assert_eq!(sink.as_slice(), &[0x05, b'h', 0, b'i', 0, 0]);

        let mut cursor = ByteCursor::new(sink.as_slice());
        let (decoded, hint) = cursor.read_prefixed_utf16().unwrap();
        assert_eq!(decoded, value);
        assert_eq!(hint, Some(0));
    }

    #[test]
    fn compressed_token() {
        let mut sink = ByteSink::new();
        sink.write_compressed_token(Token::new(0x0100_0012)).unwrap();
        sink.write_compressed_token(Token::new(0x1B00_0001)).unwrap();
        assert_eq!(sink.as_slice(), &[0x49, 0x06]);
        assert!(sink.write_compressed_token(Token::new(0x0600_0001)).is_err());
    }

    proptest! {
        #[test]
        fn sink_cursor_inverse(a in any::<u32>(), b in any::<i16>(), c in any::<u64>(), d in 0u32..=0x1FFF_FFFF) {
            let mut sink = ByteSink::new();
            sink.write_le(a).unwrap();
            sink.write_le(b).unwrap();
            sink.write_le(c).unwrap();
            sink.write_compressed_uint(d).unwrap();

            let mut cursor = ByteCursor::new(sink.as_slice());
            prop_assert_eq!(cursor.read_le::<u32>().unwrap(), a);
            prop_assert_eq!(cursor.read_le::<i16>().unwrap(), b);
            prop_assert_eq!(cursor.read_le::<u64>().unwrap(), c);
            prop_assert_eq!(cursor.read_compressed_uint().unwrap(), d);
            prop_assert!(!cursor.has_more_data());
        }
    }
}
