//! Virtual address to file offset translation.
//!
//! The image loader hands over one [`Section`] per section header. [`SectionDirectory`] turns a
//! relative virtual address into a [`ByteCursor`] whose backed region ends with the section's
//! raw data and whose readable region ends with the section's virtual extent, so the
//! zero-filled tail of a section reads the way the loader would map it.

use log::warn;

use crate::{file::ByteCursor, Result};

/// One section descriptor, as supplied by the image loader.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Section {
    /// Section tag (usually the 8 byte name, e.g. `.text`)
    pub name: String,
    /// Relative virtual address of the first byte
    pub virtual_address: u32,
    /// Size of the section once mapped
    pub virtual_size: u32,
    /// File offset of the raw data (`PointerToRawData`)
    pub file_offset: u32,
    /// Size of the raw data stored in the file
    pub raw_size: u32,
}

impl Section {
    /// Create a section descriptor.
    #[must_use]
    pub fn new(
        name: &str,
        virtual_address: u32,
        virtual_size: u32,
        file_offset: u32,
        raw_size: u32,
    ) -> Self {
        Section {
            name: name.to_string(),
            virtual_address,
            virtual_size,
            file_offset,
            raw_size,
        }
    }

    /// Addressable extent of the section: `max(virtual_size, raw_size)`
    #[must_use]
    pub fn extent(&self) -> u32 {
        self.virtual_size.max(self.raw_size)
    }

    /// Returns `true` if `rva` lies inside `[virtual_address, virtual_address + extent)`.
    #[must_use]
    pub fn contains(&self, rva: u32) -> bool {
        rva >= self.virtual_address
            && u64::from(rva) < u64::from(self.virtual_address) + u64::from(self.extent())
    }
}

/// The ordered section table of an image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionDirectory {
    sections: Vec<Section>,
}

impl SectionDirectory {
    /// Create a directory from the loader's section list.
    #[must_use]
    pub fn new(sections: Vec<Section>) -> Self {
        SectionDirectory { sections }
    }

    /// Iterate over all sections.
    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    /// Linear scan for the section that contains `rva`.
    #[must_use]
    pub fn find(&self, rva: u32) -> Option<&Section> {
        self.sections.iter().find(|section| section.contains(rva))
    }

    /// Translate `rva` into a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section contains `rva`.
    pub fn rva_to_offset(&self, rva: u32) -> Result<usize> {
        let section = self
            .find(rva)
            .ok_or_else(|| malformed_error!("RVA 0x{:X} is not mapped by any section", rva))?;
        Ok(section.file_offset as usize + (rva - section.virtual_address) as usize)
    }

    /// Create a cursor positioned at `rva`, ending with the containing section.
    ///
    /// Returns `Ok(None)` for the absent address 0.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section contains `rva`.
    pub fn cursor_at<'a>(&self, data: &'a [u8], rva: u32) -> Result<Option<ByteCursor<'a>>> {
        if rva == 0 {
            return Ok(None);
        }

        let (section, base) = self.locate(rva)?;
        let (data_limit, read_limit) = Self::limits(data, section);
        ByteCursor::with_limits(data, base, data_limit, read_limit.max(base)).map(Some)
    }

    /// Create a cursor of exactly `size` readable bytes at `rva`.
    ///
    /// Returns `Ok(None)` for the absent address 0.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section contains `rva`, and
    /// [`crate::Error::OutOfBounds`] if `size` runs past the section's virtual size.
    pub fn cursor_sized<'a>(
        &self,
        data: &'a [u8],
        rva: u32,
        size: u32,
    ) -> Result<Option<ByteCursor<'a>>> {
        if rva == 0 {
            return Ok(None);
        }

        let (section, base) = self.locate(rva)?;
        let in_section = u64::from(rva - section.virtual_address);
        if in_section + u64::from(size) > u64::from(section.virtual_size) {
            return Err(out_of_bounds_error!());
        }

        let (data_limit, read_limit) = Self::limits(data, section);
        let end = base + size as usize;
        ByteCursor::with_limits(data, base, data_limit.min(end), read_limit.min(end)).map(Some)
    }

    fn locate(&self, rva: u32) -> Result<(&Section, usize)> {
        let section = self
            .find(rva)
            .ok_or_else(|| malformed_error!("RVA 0x{:X} is not mapped by any section", rva))?;
        let base = section.file_offset as usize + (rva - section.virtual_address) as usize;
        Ok((section, base))
    }

    /// Absolute `(data_limit, read_limit)` for a section, clipped to the buffer.
    fn limits(data: &[u8], section: &Section) -> (usize, usize) {
        let start = section.file_offset as usize;
        let raw_end = start + section.raw_size as usize;
        let data_limit = if raw_end > data.len() {
            warn!(
                "Section '{}' raw data ends at 0x{:X}, past the end of the image (0x{:X})",
                section.name,
                raw_end,
                data.len()
            );
            data.len()
        } else {
            raw_end
        };

        let read_limit = (start + section.extent() as usize).max(data_limit);
        (data_limit, read_limit)
    }
}
