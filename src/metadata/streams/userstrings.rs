//! User String Heap (`#US`) for .NET Metadata
//!
//! String literals loaded by `ldstr` live here as length-prefixed UTF-16LE with one trailing
//! hint byte. The hint is 1 when the string holds characters that need more than ordinal
//! comparison; it is recomputed on encode and ignored on decode.
//!
//! # Reference
//! - [ECMA-335 II.24.2.4](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use std::collections::HashMap;

use widestring::{U16Str, U16String};

use crate::{
    file::{ByteCursor, ByteSink},
    Result,
};

/// The `#US` heap with its decode and encode caches.
///
/// # Examples
///
/// ```rust
/// use dotcodec::metadata::streams::UserStringHeap;
/// use widestring::U16String;
///
/// let mut heap = UserStringHeap::from(&[0, 0x03, b'A', 0, 0])?;
/// assert_eq!(heap.get(1)?.to_string_lossy(), "A");
/// assert_eq!(heap.intern(&U16String::from_str("A"), 0)?, 1);
/// # Ok::<(), dotcodec::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct UserStringHeap {
    data: Vec<u8>,
    decoded: HashMap<u32, U16String>,
    offsets: HashMap<U16String, u32>,
}

impl UserStringHeap {
    /// An empty heap holding only the leading empty entry.
    #[must_use]
    pub fn new() -> Self {
        UserStringHeap {
            data: vec![0],
            decoded: HashMap::new(),
            offsets: HashMap::new(),
        }
    }

    /// Create a heap from the bytes of a `#US` stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the data does not start with the empty entry.
    pub fn from(data: &[u8]) -> Result<UserStringHeap> {
        if data.first() != Some(&0) {
            return Err(malformed_error!("Provided #US heap is empty"));
        }

        Ok(UserStringHeap {
            data: data.to_vec(),
            decoded: HashMap::new(),
            offsets: HashMap::new(),
        })
    }

    /// The string at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the entry runs past the heap and
    /// [`crate::Error::Malformed`] if its byte length is even and non-zero.
    pub fn get(&mut self, offset: u32) -> Result<U16String> {
        if let Some(value) = self.decoded.get(&offset) {
            return Ok(value.clone());
        }

        let value = self.read_at(offset)?;
        if offset != 0 {
            self.offsets.entry(value.clone()).or_insert(offset);
        }
        self.decoded.insert(offset, value.clone());
        Ok(value)
    }

    /// Find or add `value` and return its offset, with the same reuse rules as
    /// [`crate::metadata::streams::StringHeap::intern`].
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the entry cannot be encoded or the heap would
    /// outgrow the 24-bit offsets `ldstr` tokens can carry.
    pub fn intern(&mut self, value: &U16Str, hint: u32) -> Result<u32> {
        if hint != 0 && self.read_at(hint).is_ok_and(|current| current.as_ustr() == value) {
            return Ok(hint);
        }
        if let Some(offset) = self.offsets.get(value) {
            return Ok(*offset);
        }

        let offset = u32::try_from(self.data.len())
            .ok()
            .filter(|offset| *offset <= 0x00FF_FFFF)
            .ok_or_else(|| malformed_error!("#US heap exceeds the token range"))?;

        let mut sink = ByteSink::new();
        sink.write_prefixed_utf16(value, Self::hint_byte(value))?;
        self.data.extend_from_slice(sink.as_slice());
        self.offsets.insert(value.to_owned(), offset);
        self.decoded.insert(offset, value.to_owned());
        Ok(offset)
    }

    /// The trailing byte of an entry: 1 if any code unit has a non-zero high byte, or a low
    /// byte in `0x01..=0x08`, `0x0E..=0x1F`, `0x27`, `0x2D` or `0x7F`.
    #[must_use]
    pub fn hint_byte(value: &U16Str) -> u8 {
        let special = value.as_slice().iter().any(|unit| {
            let [low, high] = unit.to_le_bytes();
            high != 0 || matches!(low, 0x01..=0x08 | 0x0E..=0x1F | 0x27 | 0x2D | 0x7F)
        });
        u8::from(special)
    }

    /// The raw heap bytes, without trailing padding.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Size of the heap once emitted (padded to 4 bytes).
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len().next_multiple_of(4)
    }

    /// The heap bytes padded with zeros to a multiple of 4.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.data.clone();
        bytes.resize(self.size(), 0);
        bytes
    }

    fn read_at(&self, offset: u32) -> Result<U16String> {
        let mut cursor = ByteCursor::new(&self.data);
        cursor.seek(offset as usize)?;
        let (value, hint) = cursor.read_prefixed_utf16()?;
        if hint.is_none() && !value.is_empty() {
            return Err(malformed_error!(
                "User string at offset {} has an even byte length",
                offset
            ));
        }
        Ok(value)
    }
}

impl Default for UserStringHeap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use widestring::u16str;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data: [u8; 13] = [
            0x00,
            0x0b, 0x48, 0x00, 0x65, 0x00, 0x6c, 0x00, 0x6c, 0x00, 0x6f, 0x00, 0x00,
        ];

        let mut heap = UserStringHeap::from(&data).unwrap();
        assert_eq!(heap.get(1).unwrap().to_string_lossy(), "Hello");
        assert!(heap.get(0).unwrap().is_empty());
        assert!(heap.get(2).is_err());
    }

    #[test]
    fn even_length_is_malformed() {
        let mut heap = UserStringHeap::from(&[0, 0x02, b'A', 0]).unwrap();
        assert!(heap.get(1).is_err());
        assert!(UserStringHeap::from(&[1]).is_err());
    }

    #[test]
    fn hint_byte() {
        assert_eq!(UserStringHeap::hint_byte(u16str!("plain text")), 0);
        assert_eq!(UserStringHeap::hint_byte(u16str!("it's")), 1);
        assert_eq!(UserStringHeap::hint_byte(u16str!("a-b")), 1);
        assert_eq!(UserStringHeap::hint_byte(u16str!("\u{7F}")), 1);
        assert_eq!(UserStringHeap::hint_byte(u16str!("tab\t")), 0);
        assert_eq!(UserStringHeap::hint_byte(u16str!("\u{1}")), 1);
        assert_eq!(UserStringHeap::hint_byte(u16str!("\u{0100}")), 1);
    }

    #[test]
    fn intern_appends_with_hint() {
        let mut heap = UserStringHeap::new();
        let offset = heap.intern(u16str!("a-"), 0).unwrap();
        assert_eq!(offset, 1);
        assert_eq!(heap.data(), &[0, 0x05, b'a', 0, b'-', 0, 0x01]);
        assert_eq!(heap.intern(u16str!("a-"), 0).unwrap(), 1);
        assert_eq!(heap.intern(u16str!("a-"), 7).unwrap(), 1);
        assert_eq!(heap.get(1).unwrap().to_string_lossy(), "a-");
        assert_eq!(heap.to_bytes().len(), 8);

        // The empty literal is a real entry, distinct from the null entry at 0
        assert_eq!(heap.intern(u16str!(""), 0).unwrap(), 7);
        assert_eq!(&heap.data()[7..], &[0x01, 0x00]);
    }
}
