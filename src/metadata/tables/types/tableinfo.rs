use bitflags::bitflags;
use strum::{EnumCount, IntoEnumIterator};

use crate::metadata::tables::{CodedIndexType, TableId, TABLE_SLOTS};

bitflags! {
    /// The `HeapSizes` byte of the table stream header.
    ///
    /// Bits this crate does not interpret are kept as read and written back unchanged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HeapSizeFlags: u8 {
        /// Offsets into `#Strings` are 4 bytes wide
        const STRINGS = 0x01;
        /// Indexes into `#GUID` are 4 bytes wide
        const GUID = 0x02;
        /// Offsets into `#Blob` are 4 bytes wide
        const BLOB = 0x04;
        /// One extra u32 follows the row counts
        const EXTRA_DATA = 0x40;
    }
}

/// `TableInfo` holds the row count of every table and the resulting width of every index
/// field: simple table indexes, coded indexes and heap offsets.
///
/// The widths are fixed when the `TableInfo` is built and never change afterwards; a table
/// set builds a new one whenever row counts or heap sizes change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableInfo {
    rows: [u32; TABLE_SLOTS],
    coded_indexes: [bool; CodedIndexType::COUNT],
    heap_flags: HeapSizeFlags,
}

impl Default for TableInfo {
    fn default() -> Self {
        TableInfo::new([0; TABLE_SLOTS], HeapSizeFlags::empty())
    }
}

impl TableInfo {
    /// Build a new `TableInfo` from the row counts (indexed by table tag) and heap flags.
    #[must_use]
    pub fn new(rows: [u32; TABLE_SLOTS], heap_flags: HeapSizeFlags) -> Self {
        let mut table_info = TableInfo {
            rows,
            coded_indexes: [false; CodedIndexType::COUNT],
            heap_flags,
        };

        table_info.calculate_coded_index_sizes();
        table_info
    }

    #[cfg(test)]
    /// Special constructor for unit-tests
    ///
    /// ## Arguments
    /// * 'valid_tables'    - A slice of touples, which provides (table_id, row_count) of the valid tables
    /// * 'large_str'       - Specify if the #String heap indexes are 4 or 2 bytes
    /// * 'large_blob'      - Specify if the #Blob heap indexes are 4 or 2 bytes
    /// * 'large_guid'      - Specify if the #GUID heap indexes are 4 or 2 bytes
    pub fn new_test(
        valid_tables: &[(TableId, u32)],
        large_str: bool,
        large_blob: bool,
        large_guid: bool,
    ) -> Self {
        let mut rows = [0; TABLE_SLOTS];
        for (table, count) in valid_tables {
            rows[*table as usize] = *count;
        }

        let mut heap_flags = HeapSizeFlags::empty();
        heap_flags.set(HeapSizeFlags::STRINGS, large_str);
        heap_flags.set(HeapSizeFlags::BLOB, large_blob);
        heap_flags.set(HeapSizeFlags::GUID, large_guid);

        TableInfo::new(rows, heap_flags)
    }

    /// The width rule shared by every index kind: an index is 4 bytes wide if
    /// `rows << shift` reaches `0x10000`.
    ///
    /// The shift is the number of tag bits (0 for simple indexes). The comparison is done in
    /// 64 bits so large row counts cannot wrap.
    ///
    /// ```rust
    /// use dotcodec::metadata::tables::TableInfo;
    ///
    /// assert!(TableInfo::is_big(2, 0x4000));
    /// assert!(!TableInfo::is_big(2, 0x3FFF));
    /// ```
    #[must_use]
    pub fn is_big(shift: u8, rows: u32) -> bool {
        (u64::from(rows) << shift) >= 0x10000
    }

    /// Number of rows of `table`.
    #[must_use]
    pub fn rows(&self, table: TableId) -> u32 {
        self.rows[table as usize]
    }

    /// All row counts, indexed by table tag.
    #[must_use]
    pub fn row_counts(&self) -> &[u32; TABLE_SLOTS] {
        &self.rows
    }

    /// The heap size flags these widths were computed from.
    #[must_use]
    pub fn heap_flags(&self) -> HeapSizeFlags {
        self.heap_flags
    }

    /// Returns true, if an index into `table` requires 4 bytes instead of 2
    #[must_use]
    pub fn is_large(&self, table: TableId) -> bool {
        Self::is_big(0, self.rows(table))
    }

    /// Returns true, if the coded index kind requires 4 bytes instead of 2
    #[must_use]
    pub fn is_large_coded(&self, coded_index_type: CodedIndexType) -> bool {
        self.coded_indexes[coded_index_type as usize]
    }

    /// Indicates the size of indexes referring into the '#String' heap. True means 4 bytes, False is 2 bytes
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.heap_flags.contains(HeapSizeFlags::STRINGS)
    }

    /// Indicates the size of indexes referring into the '#Guid' heap. True means 4 bytes, False is 2 bytes
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.heap_flags.contains(HeapSizeFlags::GUID)
    }

    /// Indicates the size of indexes referring into the '#Blob' heap. True means 4 bytes, False is 2 bytes
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.heap_flags.contains(HeapSizeFlags::BLOB)
    }

    /// Returns the size of '#String' heap offsets in bytes
    #[must_use]
    pub fn str_bytes(&self) -> u32 {
        width(self.is_large_str())
    }

    /// Returns the size of '#Guid' heap indexes in bytes
    #[must_use]
    pub fn guid_bytes(&self) -> u32 {
        width(self.is_large_guid())
    }

    /// Returns the size of '#Blob' heap offsets in bytes
    #[must_use]
    pub fn blob_bytes(&self) -> u32 {
        width(self.is_large_blob())
    }

    /// Returns the number of bytes required to represent an index into a specific table.
    #[must_use]
    pub fn table_index_bytes(&self, table: TableId) -> u32 {
        width(self.is_large(table))
    }

    /// Returns the number of bytes required to represent a coded index of the given kind.
    #[must_use]
    pub fn coded_index_bytes(&self, coded_index_type: CodedIndexType) -> u32 {
        width(self.is_large_coded(coded_index_type))
    }

    fn calculate_coded_index_sizes(&mut self) {
        for coded_index in CodedIndexType::iter() {
            let max_rows = coded_index
                .tables()
                .iter()
                .flatten()
                .map(|table| self.rows(*table))
                .max()
                .unwrap_or(0);

            self.coded_indexes[coded_index as usize] =
                Self::is_big(coded_index.tag_bits(), max_rows);
        }
    }
}

fn width(is_large: bool) -> u32 {
    if is_large {
        4
    } else {
        2
    }
}
