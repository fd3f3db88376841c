//! String Heap (`#Strings`) for .NET Metadata
//!
//! Identifier strings (type, member and parameter names) are stored zero-terminated in UTF-8.
//! Offset 0 always holds the empty string, and any offset may point into the middle of a
//! longer entry, so a single tail can serve several names.
//!
//! # Reference
//! - [ECMA-335 II.24.2.3](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use std::collections::HashMap;

use crate::{file::ByteCursor, Result};

/// The `#Strings` heap, with a decode cache (offset to string) and an encode cache (string to
/// first offset).
///
/// # Examples
///
/// ```rust
/// use dotcodec::metadata::streams::StringHeap;
///
/// let mut strings = StringHeap::from(&[0, b'M', b'a', b'i', b'n', 0])?;
/// assert_eq!(strings.get(1)?, "Main");
/// assert_eq!(strings.get(2)?, "ain");
/// assert_eq!(strings.intern("Main", 0)?, 1);
/// assert_eq!(strings.intern("Other", 0)?, 6);
/// # Ok::<(), dotcodec::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct StringHeap {
    data: Vec<u8>,
    decoded: HashMap<u32, String>,
    offsets: HashMap<String, u32>,
}

impl StringHeap {
    /// An empty heap holding only the leading empty string.
    #[must_use]
    pub fn new() -> Self {
        StringHeap {
            data: vec![0],
            decoded: HashMap::new(),
            offsets: HashMap::new(),
        }
    }

    /// Create a heap from the bytes of a `#Strings` stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the data is empty or does not start with the
    /// empty string.
    pub fn from(data: &[u8]) -> Result<StringHeap> {
        if data.first() != Some(&0) {
            return Err(malformed_error!("Provided #Strings heap is empty"));
        }

        Ok(StringHeap {
            data: data.to_vec(),
            decoded: HashMap::new(),
            offsets: HashMap::new(),
        })
    }

    /// The string at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the offset or its terminator lies past the
    /// heap and [`crate::Error::Malformed`] for invalid UTF-8.
    pub fn get(&mut self, offset: u32) -> Result<String> {
        if let Some(value) = self.decoded.get(&offset) {
            return Ok(value.clone());
        }

        let value = self.read_at(offset)?;
        self.offsets.entry(value.clone()).or_insert(offset);
        self.decoded.insert(offset, value.clone());
        Ok(value)
    }

    /// Find or add `value` and return its offset.
    ///
    /// `hint` is kept if it still names `value`; otherwise the first offset `value` was seen at
    /// is reused, and only a string never seen before is appended.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `value` contains a NUL character or the heap
    /// would outgrow 32-bit offsets.
    pub fn intern(&mut self, value: &str, hint: u32) -> Result<u32> {
        if value.is_empty() {
            return Ok(0);
        }
        if value.as_bytes().contains(&0) {
            return Err(malformed_error!("String '{}' contains a NUL character", value));
        }
        if hint != 0 && self.read_at(hint).is_ok_and(|current| current == value) {
            return Ok(hint);
        }
        if let Some(offset) = self.offsets.get(value) {
            return Ok(*offset);
        }

        let offset = u32::try_from(self.data.len())
            .map_err(|_| malformed_error!("#Strings heap exceeds 4GB"))?;
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
        self.offsets.insert(value.to_string(), offset);
        self.decoded.insert(offset, value.to_string());
        Ok(offset)
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

    fn read_at(&self, offset: u32) -> Result<String> {
        let mut cursor = ByteCursor::new(&self.data);
        cursor.seek(offset as usize)?;
        cursor.read_cstring()
    }
}

impl Default for StringHeap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data: [u8; 32] = [
            0x00,
            0x3c, 0x4d, 0x61, 0x69, 0x6e, 0x3e, 0x24, 0x00,
            0x43, 0x5f, 0x53, 0x68, 0x61, 0x72, 0x70, 0x5f, 0x50, 0x4f, 0x43, 0x5f, 0x31, 0x00,
            0x3c, 0x4d, 0x6f, 0x64, 0x75, 0x6c, 0x65, 0x3e, 0x00,
        ];

        let mut strings = StringHeap::from(&data).unwrap();
        assert_eq!(strings.get(0).unwrap(), "");
        assert_eq!(strings.get(1).unwrap(), "<Main>$");
        assert_eq!(strings.get(9).unwrap(), "C_Sharp_POC_1");
        assert_eq!(strings.get(23).unwrap(), "<Module>");
        assert_eq!(strings.get(24).unwrap(), "Module>");
    }

    #[test]
    fn invalid() {
        assert!(StringHeap::from(&[]).is_err());
        assert!(StringHeap::from(&[b'A', 0]).is_err());

        let mut strings = StringHeap::from(&[0, b'A']).unwrap();
        assert!(matches!(strings.get(1), Err(Error::OutOfBounds { .. })));
        assert!(matches!(strings.get(5), Err(Error::OutOfBounds { .. })));

        let mut strings = StringHeap::from(&[0, 0xC3, 0x28, 0]).unwrap();
        assert!(matches!(strings.get(1), Err(Error::Malformed { .. })));
    }

    #[test]
    fn intern_reuses_offsets() {
        let mut strings = StringHeap::from(&[0, b'a', b'b', 0, b'a', b'b', 0]).unwrap();

        // Hint still names the value
        assert_eq!(strings.intern("ab", 4).unwrap(), 4);
        // Tail of an existing entry
        assert_eq!(strings.intern("b", 2).unwrap(), 2);
        // Decoded offsets seed the encode cache
        assert_eq!(strings.get(1).unwrap(), "ab");
        assert_eq!(strings.intern("ab", 0).unwrap(), 1);

        assert_eq!(strings.intern("cd", 0).unwrap(), 7);
        assert_eq!(strings.intern("cd", 2).unwrap(), 7);
        assert_eq!(strings.intern("", 5).unwrap(), 0);
        assert_eq!(strings.data(), &[0, b'a', b'b', 0, b'a', b'b', 0, b'c', b'd', 0]);
        assert_eq!(strings.size(), 12);
        assert_eq!(strings.to_bytes().len(), 12);

        assert!(strings.intern("a\0b", 0).is_err());
    }
}
