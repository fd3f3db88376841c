//! Memory-mapped file backend.
//!
//! The only I/O this crate performs. Failures to open or map the file surface as
//! [`crate::Error::Unavailable`], never as a format error.

use memmap2::Mmap;
use std::{fs, path::Path};

use super::Backend;
use crate::Result;

/// A backend that maps an image file read-only into the address space.
#[derive(Debug)]
pub struct Physical {
    data: Mmap,
}

impl Physical {
    /// Map the file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Unavailable`] if the file cannot be opened or mapped.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path)?;

        // The mapping is read-only and the file handle is owned by the map
        let mmap = unsafe { Mmap::map(&file) }?;

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn maps_file_contents() {
        let path = std::env::temp_dir().join("dotcodec_physical_maps.bin");
        std::fs::write(&path, [0xAA, 0xBB, 0xCC]).unwrap();

        let physical = Physical::new(&path).unwrap();
        assert_eq!(physical.len(), 3);
        assert_eq!(physical.data(), &[0xAA, 0xBB, 0xCC]);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_is_unavailable() {
        let result = Physical::new("/nonexistent/path/to/image.dll");
        match result {
            Err(Error::Unavailable(io)) => assert_eq!(io.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected Unavailable, got {:?}", other.map(|_| ())),
        }
    }
}
