//! Blob Heap (`#Blob`) for .NET Metadata
//!
//! Signatures, constant values, custom attribute arguments, marshalling descriptors and
//! public keys are stored here. Each entry starts with its length as a compressed integer.
//!
//! # Reference
//! - [ECMA-335 II.24.2.4](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use std::collections::HashMap;

use crate::{
    file::{
        io::{compressed_uint_length, encode_compressed_uint},
        ByteCursor,
    },
    Result,
};

/// The `#Blob` heap with its decode and encode caches.
///
/// # Examples
///
/// ```rust
/// use dotcodec::metadata::streams::BlobHeap;
///
/// let mut blobs = BlobHeap::from(&[0, 0x03, 0x41, 0x42, 0x43])?;
/// assert_eq!(blobs.get(1)?, vec![0x41, 0x42, 0x43]);
/// assert_eq!(blobs.intern(&[0x44], 0)?, 5);
/// # Ok::<(), dotcodec::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct BlobHeap {
    data: Vec<u8>,
    decoded: HashMap<u32, Vec<u8>>,
    offsets: HashMap<Vec<u8>, u32>,
}

impl BlobHeap {
    /// An empty heap holding only the leading empty blob.
    #[must_use]
    pub fn new() -> Self {
        BlobHeap {
            data: vec![0],
            decoded: HashMap::new(),
            offsets: HashMap::new(),
        }
    }

    /// Create a heap from the bytes of a `#Blob` stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the data does not start with the empty blob.
    pub fn from(data: &[u8]) -> Result<BlobHeap> {
        if data.first() != Some(&0) {
            return Err(malformed_error!("Invalid memory for #Blob heap"));
        }

        Ok(BlobHeap {
            data: data.to_vec(),
            decoded: HashMap::new(),
            offsets: HashMap::new(),
        })
    }

    /// A cursor over the content of the blob at `offset`, without copying it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob runs past the heap.
    pub fn view(&self, offset: u32) -> Result<ByteCursor<'_>> {
        let mut cursor = ByteCursor::new(&self.data);
        cursor.seek(offset as usize)?;
        let len = cursor.read_compressed_uint()? as usize;
        cursor.view(cursor.pos(), len)
    }

    /// The blob at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob runs past the heap.
    pub fn get(&mut self, offset: u32) -> Result<Vec<u8>> {
        if let Some(value) = self.decoded.get(&offset) {
            return Ok(value.clone());
        }

        let value = self.read_at(offset)?;
        self.offsets.entry(value.clone()).or_insert(offset);
        self.decoded.insert(offset, value.clone());
        Ok(value)
    }

    /// Find or add `value` and return its offset, with the same reuse rules as
    /// [`crate::metadata::streams::StringHeap::intern`].
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the blob is too long for a compressed length or
    /// the heap would outgrow 32-bit offsets.
    pub fn intern(&mut self, value: &[u8], hint: u32) -> Result<u32> {
        if value.is_empty() {
            return Ok(0);
        }
        if hint != 0 && self.read_at(hint).is_ok_and(|current| current == value) {
            return Ok(hint);
        }
        if let Some(offset) = self.offsets.get(value) {
            return Ok(*offset);
        }

        let offset = u32::try_from(self.data.len())
            .map_err(|_| malformed_error!("#Blob heap exceeds 4GB"))?;
        let len = u32::try_from(value.len())
            .map_err(|_| malformed_error!("Blob of {} bytes is too long", value.len()))?;
        encode_compressed_uint(len, &mut self.data)?;
        self.data.extend_from_slice(value);
        self.offsets.insert(value.to_vec(), offset);
        self.decoded.insert(offset, value.to_vec());
        Ok(offset)
    }

    /// Iterate over all blobs in heap order, as `(offset, content)` pairs.
    ///
    /// Trailing zero padding shows up as empty blobs.
    #[must_use]
    pub fn iter(&self) -> BlobIterator<'_> {
        BlobIterator {
            heap: self,
            position: 1,
        }
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

    fn read_at(&self, offset: u32) -> Result<Vec<u8>> {
        let mut cursor = self.view(offset)?;
        let len = cursor.len();
        Ok(cursor.read_bytes(len)?.into_owned())
    }
}

impl Default for BlobHeap {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the entries of a [`BlobHeap`]; stops at the first entry that cannot be read.
pub struct BlobIterator<'a> {
    heap: &'a BlobHeap,
    position: usize,
}

impl<'a> Iterator for BlobIterator<'a> {
    type Item = Result<(u32, ByteCursor<'a>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.heap.data.len() {
            return None;
        }

        let offset = u32::try_from(self.position).ok()?;
        let entry = self.heap.view(offset).and_then(|view| {
            let header = compressed_uint_length(self.heap.data[self.position])?;
            Ok((header, view))
        });
        match entry {
            Ok((header, view)) => {
                self.position += header + view.len();
                Some(Ok((offset, view)))
            }
            Err(error) => {
                self.position = self.heap.data.len();
                Some(Err(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn crafted() {
        let data = [0x00, 0x03, 0x41, 0x42, 0x43, 0x00, 0x81, 0x00];
        let mut blobs = BlobHeap::from(&data).unwrap();

        assert_eq!(blobs.get(1).unwrap(), vec![0x41, 0x42, 0x43]);
        assert!(blobs.get(0).unwrap().is_empty());
        assert!(blobs.get(5).unwrap().is_empty());
        assert!(matches!(blobs.get(6), Err(Error::OutOfBounds { .. })));
        assert!(matches!(blobs.get(20), Err(Error::OutOfBounds { .. })));

        let mut view = blobs.view(1).unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(view.read_le::<u8>().unwrap(), 0x41);
    }

    #[test]
    fn iterate() {
        let data = [0x00, 0x02, 0x41, 0x42, 0x01, 0x43];
        let blobs = BlobHeap::from(&data).unwrap();
        let entries: Vec<(u32, usize)> = blobs
            .iter()
            .map(|entry| {
                let (offset, view) = entry.unwrap();
                (offset, view.len())
            })
            .collect();
        assert_eq!(entries, vec![(1, 2), (4, 1)]);
    }

    #[test]
    fn intern_deduplicates() {
        let mut blobs = BlobHeap::from(&[0x00, 0x01, 0x07, 0x01, 0x07]).unwrap();
        assert_eq!(blobs.intern(&[0x07], 3).unwrap(), 3);
        assert_eq!(blobs.get(1).unwrap(), vec![0x07]);
        assert_eq!(blobs.intern(&[0x07], 0).unwrap(), 1);
        assert_eq!(blobs.intern(&[], 1).unwrap(), 0);

        let large = vec![0xAA_u8; 0x90];
        let offset = blobs.intern(&large, 0).unwrap();
        assert_eq!(offset, 5);
        assert_eq!(&blobs.data()[5..7], &[0x80, 0x90]);
        assert_eq!(blobs.get(offset).unwrap(), large);
        assert_eq!(blobs.size(), (5 + 2 + 0x90_usize).next_multiple_of(4));
    }
}
