//! Metadata root header and stream directory.
//!
//! The metadata root (`BSJB`) is the entry point of the metadata blob. It carries a version
//! string and the directory of named streams; [`Root::stream_entries`] turns that directory
//! into the `{name, file offset, size}` list the table codec consumes.
//!
//! [`Root::assemble`] goes the other way: given the encoded streams it lays out a root, the
//! directory, and the 4-byte aligned stream bodies as one metadata blob.
//!
//! # Example
//!
//! ```rust
//! use dotcodec::file::ByteCursor;
//! use dotcodec::metadata::root::Root;
//!
//! let blob = Root::assemble("v4.0.30319", &[("#Strings", &[0, 0, 0, 0][..])])?;
//! let root = Root::read(&mut ByteCursor::new(&blob), true)?;
//! assert_eq!(root.version, "v4.0.30319");
//!
//! let entries = root.stream_entries(0);
//! assert_eq!(entries[0].name, "#Strings");
//! assert_eq!(entries[0].size, 4);
//! # Ok::<(), dotcodec::Error>(())
//! ```
//!
//! # References
//!
//! - [ECMA-335 II.24.2.1: Metadata root](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use log::debug;

use crate::{
    file::{ByteCursor, ByteSink},
    metadata::streams::StreamHeader,
    Result,
};

/// The MAGIC value indicating the CIL header
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// Longest version string allowed in the root, including its terminator
const MAX_VERSION_LEN: u32 = 255;

/// The header of the present Metadata, providing necessary information for parsing.
///
/// ## Reference
/// - [ECMA-335 II.24.2.1: Metadata root](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    /// Magic signature for physical metadata: 0x424A5342
    pub signature: u32,
    /// `MajorVersion`, 1
    pub major_version: u16,
    /// `MinorVersion`, 1
    pub minor_version: u16,
    /// Reserved, always 0
    pub reserved: u32,
    /// Number of bytes allocated to hold the version string, a multiple of 4
    pub length: u32,
    /// 'VersionString', without its zero padding
    pub version: String,
    /// Reserved, always 0
    pub flags: u16,
    /// Streams
    pub stream_headers: Vec<StreamHeader>,
}

/// One located stream: its name plus the absolute range it occupies in the image buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    /// Stream name, e.g. `#Blob`
    pub name: String,
    /// Absolute file offset of the stream's first byte
    pub file_offset: usize,
    /// Size of the stream in bytes
    pub size: usize,
}

impl StreamEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(name: &str, file_offset: usize, size: usize) -> Self {
        StreamEntry {
            name: name.to_string(),
            file_offset,
            size,
        }
    }
}

impl Root {
    /// Read a [`Root`] from a cursor positioned at the `BSJB` signature.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a wrong signature, an oversized or misaligned
    /// version length, an empty or duplicate stream directory, or a stream that extends past
    /// the cursor; [`crate::Error::OutOfBounds`] if the header itself is truncated.
    pub fn read(cursor: &mut ByteCursor<'_>, verify_padding: bool) -> Result<Root> {
        let start = cursor.pos();

        let signature = cursor.read_le::<u32>()?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - {}",
                signature
            ));
        }

        let major_version = cursor.read_le::<u16>()?;
        let minor_version = cursor.read_le::<u16>()?;
        let reserved = cursor.read_le::<u32>()?;

        let length = cursor.read_le::<u32>()?;
        if length > MAX_VERSION_LEN + 1 || length % 4 != 0 {
            return Err(malformed_error!("Invalid version string length - {}", length));
        }
        let version = cursor.read_fixed_string(length as usize)?;

        let flags = cursor.read_le::<u16>()?;
        let stream_count = cursor.read_le::<u16>()?;
        if stream_count == 0 {
            return Err(malformed_error!("No valid streams have been found"));
        }

        let mut stream_headers: Vec<StreamHeader> = Vec::with_capacity(stream_count as usize);
        for _ in 0..stream_count {
            let header = StreamHeader::read(cursor, verify_padding)?;

            let end = start as u64 + u64::from(header.offset) + u64::from(header.size);
            if end > cursor.len() as u64 {
                return Err(malformed_error!(
                    "Stream '{}' ({} bytes at {}) runs past the metadata",
                    header.name,
                    header.size,
                    header.offset
                ));
            }
            if stream_headers.iter().any(|known| known.name == header.name) {
                return Err(malformed_error!("Duplicate stream '{}'", header.name));
            }

            stream_headers.push(header);
        }

        debug!(
            "Metadata root '{}' with {} streams",
            version,
            stream_headers.len()
        );

        Ok(Root {
            signature,
            major_version,
            minor_version,
            reserved,
            length,
            version,
            flags,
            stream_headers,
        })
    }

    /// Write the root header and its stream directory.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the version string does not fit `length` or a
    /// stream name is invalid.
    pub fn write(&self, sink: &mut ByteSink) -> Result<()> {
        if self.version.len() >= self.length as usize {
            return Err(malformed_error!(
                "Version string '{}' does not fit {} bytes",
                self.version,
                self.length
            ));
        }
        let stream_count = u16::try_from(self.stream_headers.len())
            .map_err(|_| malformed_error!("Too many streams - {}", self.stream_headers.len()))?;

        sink.write_le::<u32>(self.signature)?;
        sink.write_le::<u16>(self.major_version)?;
        sink.write_le::<u16>(self.minor_version)?;
        sink.write_le::<u32>(self.reserved)?;
        sink.write_le::<u32>(self.length)?;
        sink.write_fixed_string(&self.version, self.length as usize)?;
        sink.write_le::<u16>(self.flags)?;
        sink.write_le::<u16>(stream_count)?;
        for header in &self.stream_headers {
            header.write(sink)?;
        }
        Ok(())
    }

    /// Size of the root header and directory once written.
    #[must_use]
    pub fn size_on_disk(&self) -> usize {
        20 + self.length as usize
            + self
                .stream_headers
                .iter()
                .map(StreamHeader::size_on_disk)
                .sum::<usize>()
    }

    /// Resolve the directory against the file offset of the root itself.
    #[must_use]
    pub fn stream_entries(&self, root_offset: usize) -> Vec<StreamEntry> {
        self.stream_headers
            .iter()
            .map(|header| StreamEntry {
                name: header.name.clone(),
                file_offset: root_offset + header.offset as usize,
                size: header.size as usize,
            })
            .collect()
    }

    /// Find a stream header by name.
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|header| header.name == name)
    }

    /// Lay out a complete metadata blob: root, directory, then every stream padded to 4 bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an empty stream list, a version string longer
    /// than 254 bytes or an invalid stream name.
    pub fn assemble(version: &str, streams: &[(&str, &[u8])]) -> Result<Vec<u8>> {
        if streams.is_empty() {
            return Err(malformed_error!("No valid streams have been found"));
        }
        let length = u32::try_from((version.len() + 1).next_multiple_of(4))
            .ok()
            .filter(|&length| length <= MAX_VERSION_LEN + 1)
            .ok_or_else(|| malformed_error!("Version string '{}' is too long", version))?;

        let mut root = Root {
            signature: CIL_HEADER_MAGIC,
            major_version: 1,
            minor_version: 1,
            reserved: 0,
            length,
            version: version.to_string(),
            flags: 0,
            stream_headers: streams
                .iter()
                .map(|(name, _)| StreamHeader {
                    offset: 0,
                    size: 0,
                    name: (*name).to_string(),
                })
                .collect(),
        };

        let mut offset = root.size_on_disk();
        for (header, (_, data)) in root.stream_headers.iter_mut().zip(streams) {
            let size = data.len().next_multiple_of(4);
            header.offset = u32::try_from(offset)
                .map_err(|_| malformed_error!("Metadata exceeds 4GB"))?;
            header.size =
                u32::try_from(size).map_err(|_| malformed_error!("Stream exceeds 4GB"))?;
            offset += size;
        }

        let mut sink = ByteSink::new();
        root.write(&mut sink)?;
        for (_, data) in streams {
            sink.write_bytes(data)?;
            sink.align(4)?;
        }

        debug!(
            "Assembled metadata root '{}' with {} streams, {} bytes",
            version,
            streams.len(),
            sink.len()
        );
        Ok(sink.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x42, 0x53, 0x4A, 0x42,
            0x01, 0x00,
            0x01, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x08, 0x00, 0x00, 0x00,
            b'H', b'E', b'L', b'L', b'O', 0x00, 0x00, 0x00,
            0x00, 0x00,
            0x01, 0x00,

            0x28, 0x00, 0x00, 0x00, // StreamHeader
            0x04, 0x00, 0x00, 0x00,
            0x23, 0x7E, 0x00, 0x00,

            0x00, 0x00, 0x00, 0x00,
        ];

        let parsed_header = Root::read(&mut ByteCursor::new(&header_bytes), true).unwrap();

        assert_eq!(parsed_header.signature, CIL_HEADER_MAGIC);
        assert_eq!(parsed_header.major_version, 1);
        assert_eq!(parsed_header.minor_version, 1);
        assert_eq!(parsed_header.length, 8);
        assert_eq!(parsed_header.version, "HELLO");
        assert_eq!(parsed_header.stream_headers.len(), 1);
        assert_eq!(parsed_header.stream_headers[0].offset, 0x28);
        assert_eq!(parsed_header.stream_headers[0].size, 0x4);
        assert_eq!(parsed_header.stream_headers[0].name, "#~");
        assert_eq!(parsed_header.size_on_disk(), 0x28);

        let entries = parsed_header.stream_entries(0x1000);
        assert_eq!(entries, vec![StreamEntry::new("#~", 0x1028, 4)]);

        let mut sink = ByteSink::new();
        parsed_header.write(&mut sink).unwrap();
        assert_eq!(sink.as_slice(), &header_bytes[..0x28]);
    }

    #[test]
    fn crafted_invalid() {
        let bad_magic = [0_u8; 40];
        assert!(matches!(
            Root::read(&mut ByteCursor::new(&bad_magic), true),
            Err(Error::Malformed { .. })
        ));

        // Stream extends past the end of the metadata
        let mut blob = Root::assemble("v4", &[("#~", &[1, 2, 3, 4][..])]).unwrap();
        blob.truncate(blob.len() - 1);
        assert!(matches!(
            Root::read(&mut ByteCursor::new(&blob), true),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn assemble_layout() {
        let blob = Root::assemble(
            "v4.0.30319",
            &[("#~", &[1, 2, 3][..]), ("#Strings", &[0][..])],
        )
        .unwrap();

        let root = Root::read(&mut ByteCursor::new(&blob), true).unwrap();
        assert_eq!(root.length, 12);
        let tables = root.stream("#~").unwrap();
        let strings = root.stream("#Strings").unwrap();
        assert_eq!(tables.offset as usize, root.size_on_disk());
        assert_eq!(tables.size, 4);
        assert_eq!(strings.offset, tables.offset + 4);
        assert_eq!(
            &blob[tables.offset as usize..tables.offset as usize + 4],
            &[1, 2, 3, 0]
        );
        assert_eq!(blob.len(), strings.offset as usize + 4);
        assert!(root.stream("#GUID").is_none());
    }

    #[test]
    fn duplicate_streams() {
        let blob = Root::assemble("v4", &[("#~", &[0; 4][..]), ("#~", &[0; 4][..])]).unwrap();
        assert!(Root::read(&mut ByteCursor::new(&blob), true).is_err());
    }
}
