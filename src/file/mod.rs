//! Image bytes, binary cursors and address translation.
//!
//! This module holds everything that touches raw bytes before metadata semantics come into
//! play:
//!
//! - [`ByteCursor`] / [`ByteSink`] - bounded readers and growable writers
//! - [`io`] - primitive conversions and the compressed integer codec
//! - [`SectionDirectory`] - relative virtual address to file offset translation
//! - [`Image`] - a byte buffer plus its section directory, as supplied by an image loader
//!
//! Parsing the container header that describes the sections is left to the caller; an
//! [`Image`] only needs the buffer and the section list.
//!
//! # Examples
//!
//! ```rust
//! use dotcodec::file::{Image, Section, SectionDirectory};
//!
//! let mut data = vec![0_u8; 0x400];
//! data[0x210] = 0x2A;
//! let sections = SectionDirectory::new(vec![Section::new(".text", 0x2000, 0x200, 0x200, 0x200)]);
//! let image = Image::from_mem(data, sections);
//!
//! let mut cursor = image.cursor_at(0x2010)?.expect("mapped");
//! assert_eq!(cursor.read_le::<u8>()?, 0x2A);
//! # Ok::<(), dotcodec::Error>(())
//! ```

mod cursor;
pub mod io;
mod memory;
mod physical;
mod section;
mod sink;

pub use cursor::ByteCursor;
pub use memory::Memory;
pub use physical::Physical;
pub use section::{Section, SectionDirectory};
pub use sink::{ByteSink, Fixup};

use std::path::Path;

use crate::Result;

/// Source of image bytes.
///
/// The codec only ever borrows the bytes; implementations decide how they are held (owned
/// buffer, memory map).
pub trait Backend: Send + Sync {
    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` if the buffer is empty.
    fn is_empty(&self) -> bool {
        self.data().is_empty()
    }
}

/// A loaded image: the raw bytes and the section directory describing them.
pub struct Image {
    backend: Box<dyn Backend>,
    sections: SectionDirectory,
}

impl Image {
    /// Map an image file from disk.
    ///
    /// # Errors
    /// Returns [`crate::Error::Unavailable`] if the file cannot be opened or mapped.
    pub fn from_file(path: impl AsRef<Path>, sections: SectionDirectory) -> Result<Image> {
        Ok(Image {
            backend: Box::new(Physical::new(path)?),
            sections,
        })
    }

    /// Wrap an in-memory image.
    #[must_use]
    pub fn from_mem(data: Vec<u8>, sections: SectionDirectory) -> Image {
        Image {
            backend: Box::new(Memory::new(data)),
            sections,
        }
    }

    /// The raw image bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.backend.data()
    }

    /// Size of the image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    /// Returns `true` if the image holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }

    /// The section directory of this image.
    #[must_use]
    pub fn sections(&self) -> &SectionDirectory {
        &self.sections
    }

    /// Cursor at `rva`, readable to the end of its section. `None` for address 0.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section maps `rva`.
    pub fn cursor_at(&self, rva: u32) -> Result<Option<ByteCursor<'_>>> {
        self.sections.cursor_at(self.data(), rva)
    }

    /// Cursor of exactly `size` bytes at `rva`. `None` for address 0.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section maps `rva` and
    /// [`crate::Error::OutOfBounds`] if `size` runs past the section.
    pub fn cursor_sized(&self, rva: u32, size: u32) -> Result<Option<ByteCursor<'_>>> {
        self.sections.cursor_sized(self.data(), rva, size)
    }

    /// Cursor over `size` bytes at a raw file offset (stream directory entries use these).
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range runs past the image.
    pub fn cursor_at_offset(&self, offset: usize, size: usize) -> Result<ByteCursor<'_>> {
        ByteCursor::new(self.data()).view(offset, size)
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("len", &self.len())
            .field("sections", &self.sections)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_from_mem() {
        let mut data = vec![0_u8; 0x100];
        data[0x84] = 0x42;
        let image = Image::from_mem(
            data,
            SectionDirectory::new(vec![Section::new(".text", 0x1000, 0x80, 0x80, 0x80)]),
        );

        assert_eq!(image.len(), 0x100);
        assert!(!image.is_empty());
        assert!(image.cursor_at(0).unwrap().is_none());
        let mut cursor = image.cursor_sized(0x1004, 1).unwrap().unwrap();
        assert_eq!(cursor.read_le::<u8>().unwrap(), 0x42);

        let mut raw = image.cursor_at_offset(0x84, 2).unwrap();
        assert_eq!(raw.read_le::<u8>().unwrap(), 0x42);
        assert!(image.cursor_at_offset(0xFF, 2).is_err());
    }

    #[test]
    fn image_from_missing_file() {
        let result = Image::from_file("/nonexistent/image.dll", SectionDirectory::default());
        assert!(matches!(result, Err(crate::Error::Unavailable(_))));
    }
}
