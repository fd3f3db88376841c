//! Stream Header for .NET Metadata Streams
//!
//! Each entry of the metadata root's stream directory names one stream and gives its offset
//! (relative to the metadata root) and size.
//!
//! # Reference
//! - [ECMA-335 II.24.2.2](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{
    file::{ByteCursor, ByteSink},
    Result,
};

/// Longest stream name, including its terminator
const MAX_NAME_LEN: usize = 32;

/// One stream directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream, relative to the metadata root
    pub offset: u32,
    /// Size of this stream in bytes, shall be a multiple of 4
    pub size: u32,
    /// Name of the stream, e.g. `#Strings`
    pub name: String,
}

impl StreamHeader {
    /// Read one entry; the name is zero-terminated and padded to 4 bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a name without terminator within 32 bytes or
    /// dirty name padding, and [`crate::Error::OutOfBounds`] for truncated input.
    pub fn read(cursor: &mut ByteCursor<'_>, verify_padding: bool) -> Result<StreamHeader> {
        let offset = cursor.read_le::<u32>()?;
        let size = cursor.read_le::<u32>()?;

        let start = cursor.pos();
        let mut bytes = Vec::with_capacity(MAX_NAME_LEN);
        loop {
            let byte = cursor.read_le::<u8>()?;
            if byte == 0 {
                break;
            }
            bytes.push(byte);
            if bytes.len() >= MAX_NAME_LEN {
                return Err(malformed_error!("Stream name at offset {} is too long", start));
            }
        }
        let name = String::from_utf8(bytes)
            .map_err(|_| malformed_error!("Stream name at offset {} is not ASCII", start))?;

        if verify_padding {
            cursor.align(4)?;
        } else {
            cursor.align_unchecked(4)?;
        }

        Ok(StreamHeader { offset, size, name })
    }

    /// Write one entry with its padded name.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a name of 32 bytes or more.
    pub fn write(&self, sink: &mut ByteSink) -> Result<()> {
        if self.name.len() >= MAX_NAME_LEN || self.name.as_bytes().contains(&0) {
            return Err(malformed_error!("Invalid stream name - {}", self.name));
        }

        sink.write_le::<u32>(self.offset)?;
        sink.write_le::<u32>(self.size)?;
        sink.write_cstring(&self.name)?;
        sink.align(4)
    }

    /// Size of the entry once written.
    #[must_use]
    pub fn size_on_disk(&self) -> usize {
        8 + (self.name.len() + 1).next_multiple_of(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x23, 0x7E, 0x00, 0x00,
        ];

        let mut cursor = ByteCursor::new(&header_bytes);
        let parsed_header = StreamHeader::read(&mut cursor, true).unwrap();

        assert_eq!(parsed_header.offset, 0x6C);
        assert_eq!(parsed_header.size, 0x45A4);
        assert_eq!(parsed_header.name, "#~");
        assert_eq!(cursor.pos(), 12);
        assert_eq!(parsed_header.size_on_disk(), 12);

        let mut sink = ByteSink::new();
        parsed_header.write(&mut sink).unwrap();
        assert_eq!(sink.as_slice(), &header_bytes);
    }

    #[test]
    fn crafted_invalid() {
        #[rustfmt::skip]
        let dirty_padding = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x23, 0x7E, 0x00, 0x01,
        ];
        assert!(StreamHeader::read(&mut ByteCursor::new(&dirty_padding), true).is_err());
        assert!(StreamHeader::read(&mut ByteCursor::new(&dirty_padding), false).is_ok());

        let mut long_name = vec![0_u8; 8];
        long_name.extend_from_slice(&[b'A'; 40]);
        assert!(StreamHeader::read(&mut ByteCursor::new(&long_name), true).is_err());
    }
}
