//! GUID Heap (`#GUID`) for .NET Metadata
//!
//! A plain array of 16-byte GUIDs addressed by 1-based index; index 0 means "no GUID".
//!
//! # Reference
//! - [ECMA-335 II.24.2.5](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use std::collections::HashMap;

use uguid::Guid;

use crate::Result;

/// Size of one heap entry
const GUID_SIZE: usize = 16;

/// The `#GUID` heap with its encode cache.
///
/// # Examples
///
/// ```rust
/// use dotcodec::metadata::streams::GuidHeap;
/// use uguid::guid;
///
/// let mut heap = GuidHeap::new();
/// let mvid = guid!("d437908e-65e6-487c-9735-7bdff699bea5");
/// assert_eq!(heap.intern(mvid, 0)?, 1);
/// assert_eq!(heap.get(1)?, mvid);
/// # Ok::<(), dotcodec::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct GuidHeap {
    data: Vec<u8>,
    indexes: HashMap<Guid, u32>,
}

impl GuidHeap {
    /// An empty heap.
    #[must_use]
    pub fn new() -> Self {
        GuidHeap::default()
    }

    /// Create a heap from the bytes of a `#GUID` stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the size is not a multiple of 16 bytes.
    pub fn from(data: &[u8]) -> Result<GuidHeap> {
        if data.len() % GUID_SIZE != 0 {
            return Err(malformed_error!(
                "Size of #GUID heap ({}) is not a multiple of 16",
                data.len()
            ));
        }

        let mut heap = GuidHeap {
            data: data.to_vec(),
            indexes: HashMap::new(),
        };
        for index in (1..=heap.count()).rev() {
            let guid = heap.get(index)?;
            heap.indexes.insert(guid, index);
        }
        Ok(heap)
    }

    /// Number of GUIDs in the heap.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn count(&self) -> u32 {
        (self.data.len() / GUID_SIZE) as u32
    }

    /// The GUID at 1-based `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for index 0 or an index past the last GUID.
    pub fn get(&self, index: u32) -> Result<Guid> {
        if index == 0 || index > self.count() {
            return Err(out_of_bounds_error!());
        }

        let start = (index as usize - 1) * GUID_SIZE;
        let mut buffer = [0_u8; GUID_SIZE];
        buffer.copy_from_slice(&self.data[start..start + GUID_SIZE]);
        Ok(Guid::from_bytes(buffer))
    }

    /// Find or add `value` and return its 1-based index.
    ///
    /// `hint` is kept if it still names `value`; otherwise the first index holding `value` is
    /// reused, and only a GUID never seen before is appended.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap would outgrow 32-bit indexes.
    pub fn intern(&mut self, value: Guid, hint: u32) -> Result<u32> {
        if self.get(hint).is_ok_and(|current| current == value) {
            return Ok(hint);
        }
        if let Some(index) = self.indexes.get(&value) {
            return Ok(*index);
        }

        let index = self
            .count()
            .checked_add(1)
            .ok_or_else(|| malformed_error!("#GUID heap is full"))?;
        self.data.extend_from_slice(&value.to_bytes());
        self.indexes.insert(value, index);
        Ok(index)
    }

    /// The raw heap bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Size of the heap once emitted.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// The heap bytes; GUID entries keep the heap 4-byte aligned.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uguid::guid;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data: [u8; 32] = [
            0x8e, 0x90, 0x37, 0xd4, 0xe6, 0x65, 0x7c, 0x48, 0x97, 0x35, 0x7b, 0xdf, 0xf6, 0x99, 0xbe, 0xa5,
            0x8e, 0x90, 0x37, 0xd4, 0xe6, 0x65, 0x7c, 0x48, 0x97, 0x35, 0x7b, 0xdf, 0xf6, 0x99, 0xbe, 0xa5,
        ];

        let mut heap = GuidHeap::from(&data).unwrap();
        assert_eq!(heap.count(), 2);
        assert_eq!(
            heap.get(1).unwrap(),
            guid!("d437908e-65e6-487c-9735-7bdff699bea5")
        );
        assert!(heap.get(0).is_err());
        assert!(heap.get(3).is_err());

        // Duplicates keep their slot, fresh lookups go to the first one
        let value = heap.get(2).unwrap();
        assert_eq!(heap.intern(value, 2).unwrap(), 2);
        assert_eq!(heap.intern(value, 0).unwrap(), 1);
    }

    #[test]
    fn bad_size() {
        assert!(GuidHeap::from(&[0_u8; 17]).is_err());
        assert_eq!(GuidHeap::from(&[]).unwrap().count(), 0);
    }

    #[test]
    fn append() {
        let mut heap = GuidHeap::new();
        let first = guid!("01234567-89ab-cdef-0123-456789abcdef");
        let second = guid!("fedcba98-7654-3210-fedc-ba9876543210");
        assert_eq!(heap.intern(first, 0).unwrap(), 1);
        assert_eq!(heap.intern(second, 0).unwrap(), 2);
        assert_eq!(heap.intern(first, 2).unwrap(), 1);
        assert_eq!(heap.size(), 32);
    }
}
