//! Metadata streams and the heaps the table rows point into.
//!
//! The metadata root lists a directory of named streams. Five of them carry data this crate
//! decodes and re-encodes:
//!
//! - **`#Strings`** - zero-terminated UTF-8 identifiers ([`StringHeap`])
//! - **`#US`** - length-prefixed UTF-16 literals used by `ldstr` ([`UserStringHeap`])
//! - **`#Blob`** - length-prefixed byte sequences, mostly signatures ([`BlobHeap`])
//! - **`#GUID`** - an array of 16-byte GUIDs, 1-based ([`GuidHeap`])
//! - **`#~`** - the compressed tables, whose header is [`TablesHeader`]
//!
//! Every heap owns a copy of its bytes, a decode cache (offset to value) and an encode cache
//! (value to the first offset it was seen at). Re-encoding a value reuses its original offset
//! when that offset still decodes to the same value, so an untouched heap is written back
//! byte for byte.
//!
//! [`Heaps`] groups the four heaps and adds the signature caches used by table columns that
//! store typed signatures.
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 24.2.2 - Stream Headers
//! - ECMA-335 6th Edition, Partition II, Section 24.2.3 - 24.2.6 - Heaps

mod blob;
mod guid;
mod streamheader;
mod strings;
mod tablesheader;
mod userstrings;

pub use blob::{BlobHeap, BlobIterator};
pub use guid::GuidHeap;
pub use streamheader::StreamHeader;
pub use strings::StringHeap;
pub use tablesheader::TablesHeader;
pub use userstrings::UserStringHeap;

use std::{collections::HashMap, sync::Arc};

use log::trace;

use crate::{
    metadata::signatures::{Signature, SignatureKind, SignatureParser, MAX_RECURSION_DEPTH},
    Result,
};

/// The four heaps of a metadata image plus the typed signature caches.
#[derive(Debug, Clone)]
pub struct Heaps {
    /// `#Strings`
    pub strings: StringHeap,
    /// `#US`
    pub user_strings: UserStringHeap,
    /// `#Blob`
    pub blobs: BlobHeap,
    /// `#GUID`
    pub guids: GuidHeap,
    signatures: HashMap<(u32, SignatureKind), Arc<Signature>>,
    signature_offsets: HashMap<Arc<Signature>, u32>,
    max_signature_depth: usize,
}

impl Heaps {
    /// Empty heaps, as used when building a table set from scratch.
    #[must_use]
    pub fn new() -> Self {
        Heaps {
            strings: StringHeap::new(),
            user_strings: UserStringHeap::new(),
            blobs: BlobHeap::new(),
            guids: GuidHeap::default(),
            signatures: HashMap::new(),
            signature_offsets: HashMap::new(),
            max_signature_depth: MAX_RECURSION_DEPTH,
        }
    }

    /// Heaps over the bytes of the four heap streams.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if any of the streams is not a valid heap.
    pub fn from_streams(strings: &[u8], user_strings: &[u8], blobs: &[u8], guids: &[u8]) -> Result<Self> {
        Ok(Heaps {
            strings: StringHeap::from(strings)?,
            user_strings: UserStringHeap::from(user_strings)?,
            blobs: BlobHeap::from(blobs)?,
            guids: GuidHeap::from(guids)?,
            signatures: HashMap::new(),
            signature_offsets: HashMap::new(),
            max_signature_depth: MAX_RECURSION_DEPTH,
        })
    }

    /// Limit the nesting depth accepted when decoding signatures.
    #[must_use]
    pub fn with_max_signature_depth(mut self, depth: usize) -> Self {
        self.max_signature_depth = depth;
        self
    }

    /// Decode the signature blob at `offset` as `kind`, caching the result.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for an offset outside the blob heap,
    /// [`crate::Error::Malformed`] for an invalid signature and
    /// [`crate::Error::RecursionLimit`] for nesting deeper than the configured limit.
    pub fn signature(&mut self, offset: u32, kind: SignatureKind) -> Result<Arc<Signature>> {
        if let Some(signature) = self.signatures.get(&(offset, kind)) {
            return Ok(signature.clone());
        }

        let cursor = self.blobs.view(offset)?;
        let parsed = SignatureParser::from_cursor(cursor)
            .with_max_depth(self.max_signature_depth)
            .parse(kind)?;

        let signature = Arc::new(parsed);
        self.signatures.insert((offset, kind), signature.clone());
        self.signature_offsets
            .entry(signature.clone())
            .or_insert(offset);
        Ok(signature)
    }

    /// Encode `signature` into the blob heap and return its offset.
    ///
    /// `hint` is kept when it still decodes to an equal signature; otherwise the first offset
    /// seen for an equal signature is reused, and only then is a new blob appended.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the signature cannot be encoded.
    pub fn intern_signature(&mut self, signature: &Signature, hint: u32) -> Result<u32> {
        if hint != 0 {
            if let Ok(existing) = self.signature(hint, signature.kind()) {
                if existing.as_ref() == signature {
                    return Ok(hint);
                }
            }
        }

        if let Some(&offset) = self.signature_offsets.get(signature) {
            return Ok(offset);
        }

        let encoded = signature.encode()?;
        let offset = self.blobs.intern(&encoded, 0)?;
        trace!("Interned signature {:?} at blob offset 0x{:X}", signature.kind(), offset);

        let signature = Arc::new(signature.clone());
        self.signatures
            .insert((offset, signature.kind()), signature.clone());
        self.signature_offsets.insert(signature, offset);
        Ok(offset)
    }
}

impl Default for Heaps {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::signatures::{SignatureField, TypeSignature};
    use crate::Error;

    fn field(base: TypeSignature) -> Signature {
        Signature::Field(SignatureField {
            modifiers: Vec::new(),
            base,
        })
    }

    #[test]
    fn signature_is_cached() {
        let mut heaps =
            Heaps::from_streams(&[0], &[0], &[0x00, 0x02, 0x06, 0x08], &[]).unwrap();

        let first = heaps.signature(1, SignatureKind::Field).unwrap();
        let second = heaps.signature(1, SignatureKind::Field).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, field(TypeSignature::I4));
    }

    #[test]
    fn intern_keeps_hint_and_reuses_values() {
        let mut heaps = Heaps::from_streams(
            &[0],
            &[0],
            &[0x00, 0x02, 0x06, 0x08, 0x02, 0x06, 0x08],
            &[],
        )
        .unwrap();

        // Both offsets decode to the same value: the hint is kept as is
        assert_eq!(heaps.intern_signature(&field(TypeSignature::I4), 4).unwrap(), 4);
        assert_eq!(heaps.intern_signature(&field(TypeSignature::I4), 1).unwrap(), 1);

        // A stale hint falls back to the first offset seen for the value
        assert_eq!(heaps.intern_signature(&field(TypeSignature::I4), 0).unwrap(), 4);

        // A new value is appended
        let appended = heaps.intern_signature(&field(TypeSignature::String), 0).unwrap();
        assert_eq!(appended, 7);
        assert_eq!(heaps.blobs.get(appended).unwrap(), vec![0x06, 0x0E]);
    }

    #[test]
    fn depth_limit() {
        // FIELD, then SZARRAY nested four times around I4
        let blob = [0x00, 0x06, 0x06, 0x1D, 0x1D, 0x1D, 0x1D, 0x08];
        let mut heaps = Heaps::from_streams(&[0], &[0], &blob, &[])
            .unwrap()
            .with_max_signature_depth(3);
        assert!(matches!(
            heaps.signature(1, SignatureKind::Field),
            Err(Error::RecursionLimit(3))
        ));
    }
}
