//! Header of the compressed table stream (`#~`).
//!
//! ```text
//! u32  reserved, always 0
//! u8   major version (2)
//! u8   minor version (0)
//! u8   heap size flags
//! u8   reserved, value preserved
//! u64  valid bitset
//! u64  sorted bitset
//! u32  row count, one per valid bit in ascending tag order
//! u32  extra data, only when heap flag 0x40 is set
//! ```
//!
//! # Reference
//! - [ECMA-335 II.24.2.6](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use strum::IntoEnumIterator;

use crate::{
    file::{ByteCursor, ByteSink},
    metadata::tables::{HeapSizeFlags, TableId, TABLE_SLOTS},
    Error::NotSupported,
    Result,
};

/// Tags of the pointer and edit-and-continue tables, which only appear in uncompressed streams
const UNSUPPORTED_TABLES: [u8; 7] = [0x03, 0x05, 0x07, 0x13, 0x16, 0x1E, 0x1F];

/// The fixed part of the `#~` stream: versions, heap flags, bitsets and row counts.
///
/// # Examples
///
/// ```rust
/// use dotcodec::{file::ByteCursor, metadata::{streams::TablesHeader, tables::TableId}};
///
/// #[rustfmt::skip]
/// let data = [
///     0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x01,
///     0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
///     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
///     0x01, 0x00, 0x00, 0x00,
/// ];
/// let header = TablesHeader::read(&mut ByteCursor::new(&data))?;
/// assert!(header.has_table(TableId::Module));
/// assert_eq!(header.row_count(TableId::Module), 1);
/// # Ok::<(), dotcodec::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablesHeader {
    /// Major version of the table schema, always 2
    pub major_version: u8,
    /// Minor version of the table schema, always 0
    pub minor_version: u8,
    /// Index widths of the heaps, plus any unknown bits as read
    pub heap_flags: HeapSizeFlags,
    /// The reserved byte after the heap flags
    pub reserved: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sorted tables
    pub sorted: u64,
    /// Row count per table slot
    pub rows: [u32; TABLE_SLOTS],
    /// The extra u32 announced by [`HeapSizeFlags::EXTRA_DATA`]
    pub extra_data: Option<u32>,
}

impl Default for TablesHeader {
    fn default() -> Self {
        TablesHeader {
            major_version: 2,
            minor_version: 0,
            heap_flags: HeapSizeFlags::empty(),
            reserved: 1,
            valid: 0,
            sorted: 0,
            rows: [0; TABLE_SLOTS],
            extra_data: None,
        }
    }
}

impl TablesHeader {
    /// Read the header and leave the cursor at the first row.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a non-zero reserved field, a version other than
    /// 2.0 or a row count above `0xFFFFFF`, and [`crate::Error::NotSupported`] for pointer or
    /// edit-and-continue tables and unknown tags.
    pub fn read(cursor: &mut ByteCursor<'_>) -> Result<TablesHeader> {
        let reserved = cursor.read_le::<u32>()?;
        if reserved != 0 {
            return Err(malformed_error!(
                "Reserved field of the table stream header is 0x{:X}",
                reserved
            ));
        }

        let major_version = cursor.read_le::<u8>()?;
        let minor_version = cursor.read_le::<u8>()?;
        if (major_version, minor_version) != (2, 0) {
            return Err(malformed_error!(
                "Unsupported table schema version {}.{}",
                major_version,
                minor_version
            ));
        }

        let heap_flags = HeapSizeFlags::from_bits_retain(cursor.read_le::<u8>()?);
        let reserved = cursor.read_le::<u8>()?;
        let valid = cursor.read_le::<u64>()?;
        let sorted = cursor.read_le::<u64>()?;

        for tag in 0..64_u8 {
            if valid & (1_u64 << tag) == 0 {
                continue;
            }
            if UNSUPPORTED_TABLES.contains(&tag) {
                return Err(NotSupported(format!(
                    "Table 0x{:02X} only exists in uncompressed table streams",
                    tag
                )));
            }
            if TableId::from_tag(tag).is_none() {
                return Err(NotSupported(format!("Unknown table 0x{:02X}", tag)));
            }
        }

        let mut rows = [0_u32; TABLE_SLOTS];
        for table in TableId::iter() {
            if valid & table.bit() == 0 {
                continue;
            }

            let count = cursor.read_le::<u32>()?;
            if count > 0x00FF_FFFF {
                return Err(malformed_error!("Table {} declares {} rows", table, count));
            }
            rows[table as usize] = count;
        }

        let extra_data = if heap_flags.contains(HeapSizeFlags::EXTRA_DATA) {
            Some(cursor.read_le::<u32>()?)
        } else {
            None
        };

        Ok(TablesHeader {
            major_version,
            minor_version,
            heap_flags,
            reserved,
            valid,
            sorted,
            rows,
            extra_data,
        })
    }

    /// Write the header; row bodies follow directly.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the sink's write limit is exceeded.
    pub fn write(&self, sink: &mut ByteSink) -> Result<()> {
        sink.write_le::<u32>(0)?;
        sink.write_le::<u8>(self.major_version)?;
        sink.write_le::<u8>(self.minor_version)?;
        sink.write_le::<u8>(self.heap_flags.bits())?;
        sink.write_le::<u8>(self.reserved)?;
        sink.write_le::<u64>(self.valid)?;
        sink.write_le::<u64>(self.sorted)?;
        for table in self.present_tables() {
            sink.write_le::<u32>(self.rows[table as usize])?;
        }
        if let Some(extra) = self.extra_data {
            sink.write_le::<u32>(extra)?;
        }
        Ok(())
    }

    /// Size of the header in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        24 + self.table_count() as usize * 4 + if self.extra_data.is_some() { 4 } else { 0 }
    }

    /// Number of present tables.
    #[must_use]
    pub fn table_count(&self) -> u32 {
        self.valid.count_ones()
    }

    /// Check if a table is present.
    #[must_use]
    pub fn has_table(&self, table_id: TableId) -> bool {
        self.valid & table_id.bit() != 0
    }

    /// Iterate over the present tables in ascending tag order.
    pub fn present_tables(&self) -> impl Iterator<Item = TableId> + '_ {
        TableId::iter().filter(|table| self.has_table(*table))
    }

    /// Row count of a table, 0 when absent.
    #[must_use]
    pub fn row_count(&self, table_id: TableId) -> u32 {
        self.rows[table_id as usize]
    }
}
