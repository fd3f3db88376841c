//! Bounded, offset-relative binary reader with zero-extension.
//!
//! A [`ByteCursor`] reads from a shared byte buffer through three absolute offsets:
//!
//! - `base` - the origin; every position the cursor reports is relative to it
//! - `data_limit` - the first byte that is not backed by real storage
//! - `read_limit` - the first byte that is out of bounds entirely
//!
//! Bytes in `[data_limit, read_limit)` read as zero without touching the buffer. This models a
//! section whose virtual size exceeds its raw size. Reads that reach past `read_limit` fail with
//! [`crate::Error::OutOfBounds`].
//!
//! Views ([`ByteCursor::view`]) share the buffer and narrow the limits, so one heap inside a
//! metadata blob or one signature inside the blob heap can be parsed without copying.
//!
//! # Examples
//!
//! ```rust
//! use dotcodec::file::ByteCursor;
//!
//! let data = [0x01, 0x02, 0x03, 0x04];
//! // Two backed bytes, four readable bytes
//! let mut cursor = ByteCursor::with_limits(&data, 0, 2, 4)?;
//! assert_eq!(cursor.read_le::<u16>()?, 0x0201);
//! assert_eq!(cursor.read_le::<u16>()?, 0);
//! assert!(cursor.read_le::<u8>().is_err());
//! # Ok::<(), dotcodec::Error>(())
//! ```

use std::borrow::Cow;

use widestring::U16String;

use crate::{
    file::io::{compressed_uint_length, decode_compressed_int, decode_compressed_uint, CilIO},
    metadata::token::Token,
    Result,
};

/// A bounded reader over a shared byte buffer.
#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    base: usize,
    data_limit: usize,
    read_limit: usize,
    position: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor over the whole buffer; every byte is backed.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor {
            data,
            base: 0,
            data_limit: data.len(),
            read_limit: data.len(),
            position: 0,
        }
    }

    /// Create a cursor with explicit absolute limits.
    ///
    /// `data_limit` may not exceed the buffer, and both `base` and `data_limit` must lie at or
    /// below `read_limit`. A `data_limit` below `base` yields a cursor that is zero throughout.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the limits are inconsistent.
    pub fn with_limits(
        data: &'a [u8],
        base: usize,
        data_limit: usize,
        read_limit: usize,
    ) -> Result<Self> {
        if base > read_limit || data_limit > read_limit || data_limit > data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(ByteCursor {
            data,
            base,
            data_limit,
            read_limit,
            position: base,
        })
    }

    /// Create a view of `len` bytes starting at `offset` (relative to this cursor's origin).
    ///
    /// The view shares the buffer, starts at position 0 and inherits the zero-extended tail of
    /// its parent where the two overlap.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the region runs past this cursor's read limit.
    pub fn view(&self, offset: usize, len: usize) -> Result<ByteCursor<'a>> {
        let start = self.absolute(offset)?;
        let Some(end) = start.checked_add(len) else {
            return Err(out_of_bounds_error!());
        };
        if end > self.read_limit {
            return Err(out_of_bounds_error!());
        }

        Ok(ByteCursor {
            data: self.data,
            base: start,
            data_limit: self.data_limit.min(end),
            read_limit: end,
            position: start,
        })
    }

    /// Create a view from `offset` to the end of this cursor.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `offset` is past the read limit.
    pub fn view_from(&self, offset: usize) -> Result<ByteCursor<'a>> {
        let start = self.absolute(offset)?;
        self.view(offset, self.read_limit - start)
    }

    /// Readable length of this cursor, zero-extended tail included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_limit - self.base
    }

    /// Returns `true` if nothing can be read from this cursor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_limit == self.base
    }

    /// Length of the part of this cursor that is backed by the buffer.
    #[must_use]
    pub fn backed_len(&self) -> usize {
        self.data_limit.saturating_sub(self.base)
    }

    /// Current position, relative to the origin.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position - self.base
    }

    /// Absolute position inside the shared buffer.
    #[must_use]
    pub fn absolute_pos(&self) -> usize {
        self.position
    }

    /// Bytes left before the read limit.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.read_limit - self.position
    }

    /// Returns `true` if at least one more byte can be read.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.read_limit
    }

    /// Move to `pos` (relative). Seeking exactly to the end is allowed.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` is past the read limit.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        self.position = self.absolute(pos)?;
        Ok(())
    }

    /// Skip `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the skip runs past the read limit.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        let end = self.claim(step)?;
        self.position = end;
        Ok(())
    }

    /// Skip to the next multiple of `alignment` (relative to the origin), requiring the skipped
    /// padding to be zero.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] on a non-zero padding byte and
    /// [`crate::Error::OutOfBounds`] if the padding runs past the read limit.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let padding = self.padding_to(alignment);
        let at = self.pos();
        let bytes = self.read_bytes(padding)?;
        if let Some(index) = bytes.iter().position(|&b| b != 0) {
            return Err(malformed_error!(
                "Non-zero alignment padding at offset {}",
                at + index
            ));
        }
        Ok(())
    }

    /// Skip to the next multiple of `alignment` without inspecting the padding.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the padding runs past the read limit.
    pub fn align_unchecked(&mut self, alignment: usize) -> Result<()> {
        self.advance_by(self.padding_to(alignment))
    }

    /// Peek at the next byte without consuming it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the cursor.
    pub fn peek_byte(&self) -> Result<u8> {
        self.peek_le::<u8>()
    }

    /// Peek at the next value without consuming it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if not enough bytes remain.
    pub fn peek_le<T: CilIO>(&self) -> Result<T> {
        let mut buffer = [0_u8; 8];
        let size = std::mem::size_of::<T>();
        self.fill(self.position, &mut buffer[..size])?;
        let Ok(bytes) = T::Bytes::try_from(&buffer[..size]) else {
            return Err(out_of_bounds_error!());
        };
        Ok(T::from_le_bytes(bytes))
    }

    /// Read a little-endian value.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the read reaches past the read limit.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        let value = self.peek_le::<T>()?;
        self.position += std::mem::size_of::<T>();
        Ok(value)
    }

    /// Read a big-endian value.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the read reaches past the read limit.
    pub fn read_be<T: CilIO>(&mut self) -> Result<T> {
        let mut buffer = [0_u8; 8];
        let size = std::mem::size_of::<T>();
        self.fill(self.position, &mut buffer[..size])?;
        let Ok(bytes) = T::Bytes::try_from(&buffer[..size]) else {
            return Err(out_of_bounds_error!());
        };
        self.position += size;
        Ok(T::from_be_bytes(bytes))
    }

    /// Read a 3-byte little-endian integer.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the read reaches past the read limit.
    pub fn read_u24(&mut self) -> Result<u32> {
        let mut buffer = [0_u8; 4];
        self.fill(self.position, &mut buffer[..3])?;
        self.position += 3;
        Ok(u32::from_le_bytes(buffer))
    }

    /// Read a 2 or 4 byte index, depending on `is_large`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the read reaches past the read limit.
    pub fn read_index(&mut self, is_large: bool) -> Result<u32> {
        if is_large {
            self.read_le::<u32>()
        } else {
            Ok(u32::from(self.read_le::<u16>()?))
        }
    }

    /// Read `len` raw bytes.
    ///
    /// Borrowed when the range is fully backed, owned (zero-filled tail) when it reaches into
    /// the zero-extended region.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the read reaches past the read limit.
    pub fn read_bytes(&mut self, len: usize) -> Result<Cow<'a, [u8]>> {
        let start = self.position;
        let end = self.claim(len)?;
        self.position = end;

        if end <= self.data_limit {
            return Ok(Cow::Borrowed(&self.data[start..end]));
        }

        let mut owned = vec![0_u8; len];
        self.fill(start, &mut owned)?;
        Ok(Cow::Owned(owned))
    }

    /// Read a compressed unsigned integer (ECMA-335 II.23.2).
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a reserved prefix and
    /// [`crate::Error::OutOfBounds`] for truncated input.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let length = compressed_uint_length(self.peek_byte()?)?;
        let bytes = self.read_bytes(length)?;
        Ok(decode_compressed_uint(&bytes)?.0)
    }

    /// Read a compressed signed integer (ECMA-335 II.23.2).
    ///
    /// # Errors
    /// Same as [`ByteCursor::read_compressed_uint`].
    pub fn read_compressed_int(&mut self) -> Result<i32> {
        let length = compressed_uint_length(self.peek_byte()?)?;
        let bytes = self.read_bytes(length)?;
        Ok(decode_compressed_int(&bytes)?.0)
    }

    /// Read a `TypeDefOrRefOrSpecEncoded` token as used in signatures (II.23.2.8).
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for the unused tag 3.
    pub fn read_compressed_token(&mut self) -> Result<Token> {
        let compressed = self.read_compressed_uint()?;

        let table: u32 = match compressed & 0x3 {
            0x0 => 0x0200_0000, // TypeDef
            0x1 => 0x0100_0000, // TypeRef
            0x2 => 0x1B00_0000, // TypeSpec
            _ => {
                return Err(malformed_error!(
                    "Invalid compressed token - {}",
                    compressed
                ))
            }
        };

        Ok(Token::new(table | (compressed >> 2)))
    }

    /// Read a zero-terminated UTF-8 string; the terminator is consumed.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for invalid UTF-8 and [`crate::Error::OutOfBounds`]
    /// if no terminator is found before the read limit.
    pub fn read_cstring(&mut self) -> Result<String> {
        let start = self.pos();
        let mut bytes = Vec::new();
        loop {
            let byte = self.read_le::<u8>()?;
            if byte == 0 {
                break;
            }
            bytes.push(byte);
        }

        String::from_utf8(bytes).map_err(|e| {
            malformed_error!(
                "Invalid UTF-8 string at offset {}: {}",
                start,
                e.utf8_error()
            )
        })
    }

    /// Read a fixed-size, zero-padded ASCII field of `len` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for invalid UTF-8 and [`crate::Error::OutOfBounds`]
    /// if the field runs past the read limit.
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String> {
        let bytes = self.read_bytes(len)?;
        let used = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        String::from_utf8(bytes[..used].to_vec())
            .map_err(|e| malformed_error!("Invalid UTF-8 in fixed string: {}", e.utf8_error()))
    }

    /// Read a compressed-length-prefixed UTF-8 string (`SerString`).
    ///
    /// The single byte `0xFF` encodes the null string and yields `None`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for invalid UTF-8 and [`crate::Error::OutOfBounds`]
    /// if the string runs past the read limit.
    pub fn read_prefixed_string(&mut self) -> Result<Option<String>> {
        if self.peek_byte()? == 0xFF {
            self.position += 1;
            return Ok(None);
        }

        let length = self.read_compressed_uint()? as usize;
        let bytes = self.read_bytes(length)?;
        String::from_utf8(bytes.into_owned())
            .map(Some)
            .map_err(|e| malformed_error!("Invalid UTF-8 in prefixed string: {}", e.utf8_error()))
    }

    /// Read a compressed-length-prefixed UTF-16LE string with its trailing hint byte.
    ///
    /// The prefix counts bytes: an odd length carries `(length - 1) / 2` code units and a one
    /// byte hint, which is returned alongside the string.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the string runs past the read limit.
    pub fn read_prefixed_utf16(&mut self) -> Result<(U16String, Option<u8>)> {
        let length = self.read_compressed_uint()? as usize;
        let bytes = self.read_bytes(length)?;

        let units = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect::<Vec<u16>>();
        let hint = if length % 2 == 1 {
            Some(bytes[length - 1])
        } else {
            None
        };

        Ok((U16String::from_vec(units), hint))
    }

    /// Translate a relative position into an absolute one, bounded by the read limit.
    fn absolute(&self, offset: usize) -> Result<usize> {
        match self.base.checked_add(offset) {
            Some(abs) if abs <= self.read_limit => Ok(abs),
            _ => Err(out_of_bounds_error!()),
        }
    }

    /// Validate that `len` bytes can be read at the current position; returns the end.
    fn claim(&self, len: usize) -> Result<usize> {
        match self.position.checked_add(len) {
            Some(end) if end <= self.read_limit => Ok(end),
            _ => Err(out_of_bounds_error!()),
        }
    }

    fn padding_to(&self, alignment: usize) -> usize {
        if alignment <= 1 {
            return 0;
        }
        let pos = self.pos();
        (alignment - pos % alignment) % alignment
    }

    /// Copy `out.len()` bytes starting at absolute `start`, zero-filling past the data limit.
    fn fill(&self, start: usize, out: &mut [u8]) -> Result<()> {
        let Some(end) = start.checked_add(out.len()) else {
            return Err(out_of_bounds_error!());
        };
        if end > self.read_limit {
            return Err(out_of_bounds_error!());
        }

        let backed = end.min(self.data_limit).saturating_sub(start);
        if backed > 0 {
            out[..backed].copy_from_slice(&self.data[start..start + backed]);
        }
        out[backed..].fill(0);
        Ok(())
    }
}
