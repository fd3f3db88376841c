//! Typed row columns.
//!
//! Every field of a row is one [`Column`]. A column knows its width under a given
//! [`TableInfo`], reads and writes its raw form, and - for heap and row references - turns the
//! raw form into a live value during resolve and back during persist.
//!
//! | Column | Raw form | Live form |
//! |---|---|---|
//! | `u8` / `u16` / `u32` | constant | same |
//! | [`StringIndex`] | `#Strings` offset | `String` |
//! | [`BlobIndex`] | `#Blob` offset | bytes |
//! | [`GuidIndex`] | 1-based `#GUID` index | `Option<Guid>` |
//! | [`TableIndex`] | row index into one table | row index |
//! | [`CodedIndex`] | tagged row index | `Option<RowRef>` |
//! | [`RangeList`] | first row of a run | `Option<RowRange>` |

use std::{fmt, marker::PhantomData};

use uguid::Guid;

use crate::{
    file::{ByteCursor, ByteSink},
    metadata::tables::{CodedKind, RowContext, RowRef, TableId, TableInfo, TableRow},
    Result,
};

/// One field of a metadata row.
pub trait Column: Sized {
    /// Width of the column in bytes under `info`.
    fn size(info: &TableInfo) -> u32;

    /// Read the raw form of the column.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the cursor runs out of data.
    fn read(cursor: &mut ByteCursor<'_>, info: &TableInfo) -> Result<Self>;

    /// Turn the raw form into the live value.
    ///
    /// # Errors
    /// Returns an error if the raw form points outside its heap or table.
    fn resolve(&mut self, _ctx: &mut RowContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Turn the live value back into a raw form, assigning heap offsets as needed.
    ///
    /// # Errors
    /// Returns an error if the value cannot be represented.
    fn persist(&mut self, _ctx: &mut RowContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Write the raw form of the column.
    ///
    /// # Errors
    /// Returns an error if the raw value does not fit the width chosen by `info`.
    fn write(&self, sink: &mut ByteSink, info: &TableInfo) -> Result<()>;

    /// Hands range-list columns to `f`; other columns ignore the call.
    ///
    /// # Errors
    /// Propagates the errors of `f`.
    fn visit_range(
        &mut self,
        _f: &mut dyn FnMut(&mut dyn RangeColumn) -> Result<()>,
    ) -> Result<()> {
        Ok(())
    }
}

macro_rules! scalar_column {
    ($($ty:ty => $size:literal),* $(,)?) => {
        $(
            impl Column for $ty {
                fn size(_info: &TableInfo) -> u32 {
                    $size
                }

                fn read(cursor: &mut ByteCursor<'_>, _info: &TableInfo) -> Result<Self> {
                    cursor.read_le::<$ty>()
                }

                fn write(&self, sink: &mut ByteSink, _info: &TableInfo) -> Result<()> {
                    sink.write_le::<$ty>(*self)
                }
            }
        )*
    };
}

scalar_column!(u8 => 1, u16 => 2, u32 => 4);

/// Offset into the `#Strings` heap and the string found there.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct StringIndex {
    offset: u32,
    value: String,
}

impl StringIndex {
    /// A new, not yet persisted string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        StringIndex {
            offset: 0,
            value: value.into(),
        }
    }

    /// The heap offset (as read, or as assigned by the last persist).
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// The string value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the string value.
    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }
}

impl Column for StringIndex {
    fn size(info: &TableInfo) -> u32 {
        info.str_bytes()
    }

    fn read(cursor: &mut ByteCursor<'_>, info: &TableInfo) -> Result<Self> {
        Ok(StringIndex {
            offset: cursor.read_index(info.is_large_str())?,
            value: String::new(),
        })
    }

    fn resolve(&mut self, ctx: &mut RowContext<'_>) -> Result<()> {
        self.value = ctx.heaps.strings.get(self.offset)?;
        Ok(())
    }

    fn persist(&mut self, ctx: &mut RowContext<'_>) -> Result<()> {
        self.offset = ctx.heaps.strings.intern(&self.value, self.offset)?;
        Ok(())
    }

    fn write(&self, sink: &mut ByteSink, info: &TableInfo) -> Result<()> {
        sink.write_index(self.offset, info.is_large_str())
    }
}

/// Offset into the `#Blob` heap and the blob found there.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BlobIndex {
    offset: u32,
    value: Vec<u8>,
}

impl BlobIndex {
    /// A new, not yet persisted blob.
    #[must_use]
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        BlobIndex {
            offset: 0,
            value: value.into(),
        }
    }

    /// The heap offset (as read, or as assigned by the last persist).
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// The blob content, without its length prefix.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Replace the blob content.
    pub fn set(&mut self, value: impl Into<Vec<u8>>) {
        self.value = value.into();
    }
}

impl Column for BlobIndex {
    fn size(info: &TableInfo) -> u32 {
        info.blob_bytes()
    }

    fn read(cursor: &mut ByteCursor<'_>, info: &TableInfo) -> Result<Self> {
        Ok(BlobIndex {
            offset: cursor.read_index(info.is_large_blob())?,
            value: Vec::new(),
        })
    }

    fn resolve(&mut self, ctx: &mut RowContext<'_>) -> Result<()> {
        self.value = ctx.heaps.blobs.get(self.offset)?;
        Ok(())
    }

    fn persist(&mut self, ctx: &mut RowContext<'_>) -> Result<()> {
        self.offset = ctx.heaps.blobs.intern(&self.value, self.offset)?;
        Ok(())
    }

    fn write(&self, sink: &mut ByteSink, info: &TableInfo) -> Result<()> {
        sink.write_index(self.offset, info.is_large_blob())
    }
}

/// 1-based index into the `#GUID` heap and the GUID found there. Index 0 is no GUID.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct GuidIndex {
    index: u32,
    value: Option<Guid>,
}

impl GuidIndex {
    /// A new, not yet persisted GUID reference.
    #[must_use]
    pub fn new(value: Option<Guid>) -> Self {
        GuidIndex { index: 0, value }
    }

    /// The heap index (as read, or as assigned by the last persist).
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The GUID, if any.
    #[must_use]
    pub fn value(&self) -> Option<Guid> {
        self.value
    }

    /// Replace the GUID.
    pub fn set(&mut self, value: Option<Guid>) {
        self.value = value;
    }
}

impl Column for GuidIndex {
    fn size(info: &TableInfo) -> u32 {
        info.guid_bytes()
    }

    fn read(cursor: &mut ByteCursor<'_>, info: &TableInfo) -> Result<Self> {
        Ok(GuidIndex {
            index: cursor.read_index(info.is_large_guid())?,
            value: None,
        })
    }

    fn resolve(&mut self, ctx: &mut RowContext<'_>) -> Result<()> {
        self.value = if self.index == 0 {
            None
        } else {
            Some(ctx.heaps.guids.get(self.index)?)
        };
        Ok(())
    }

    fn persist(&mut self, ctx: &mut RowContext<'_>) -> Result<()> {
        self.index = match self.value {
            Some(guid) => ctx.heaps.guids.intern(guid, self.index)?,
            None => 0,
        };
        Ok(())
    }

    fn write(&self, sink: &mut ByteSink, info: &TableInfo) -> Result<()> {
        sink.write_index(self.index, info.is_large_guid())
    }
}

/// A simple index: a row of table `T`, or 0.
pub struct TableIndex<T> {
    rid: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T: TableRow> TableIndex<T> {
    /// Reference row `rid` of `T` (0 for none).
    #[must_use]
    pub fn new(rid: u32) -> Self {
        TableIndex {
            rid,
            _marker: PhantomData,
        }
    }

    /// The raw 1-based row index.
    #[must_use]
    pub fn rid(&self) -> u32 {
        self.rid
    }

    /// The referenced row, `None` for index 0.
    #[must_use]
    pub fn row(&self) -> Option<RowRef> {
        (self.rid != 0).then(|| RowRef::new(T::TABLE_ID, self.rid))
    }

    /// Point at another row of `T`.
    pub fn set(&mut self, rid: u32) {
        self.rid = rid;
    }
}

impl<T: TableRow> Column for TableIndex<T> {
    fn size(info: &TableInfo) -> u32 {
        info.table_index_bytes(T::TABLE_ID)
    }

    fn read(cursor: &mut ByteCursor<'_>, info: &TableInfo) -> Result<Self> {
        Ok(TableIndex::new(cursor.read_index(info.is_large(T::TABLE_ID))?))
    }

    fn resolve(&mut self, ctx: &mut RowContext<'_>) -> Result<()> {
        check_row(ctx.info, T::TABLE_ID, self.rid)
    }

    fn persist(&mut self, ctx: &mut RowContext<'_>) -> Result<()> {
        check_row(ctx.info, T::TABLE_ID, self.rid)
    }

    fn write(&self, sink: &mut ByteSink, info: &TableInfo) -> Result<()> {
        sink.write_index(self.rid, info.is_large(T::TABLE_ID))
    }
}

impl<T> Clone for TableIndex<T> {
    fn clone(&self) -> Self {
        TableIndex {
            rid: self.rid,
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TableIndex<T> {
    fn default() -> Self {
        TableIndex {
            rid: 0,
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for TableIndex<T> {
    fn eq(&self, other: &Self) -> bool {
        self.rid == other.rid
    }
}

impl<T: TableRow> fmt::Debug for TableIndex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", T::TABLE_ID, self.rid)
    }
}

/// A coded index of kind `K`: the raw value and the row it decodes to.
///
/// Persisting keeps the raw value whenever it still decodes to the current target, so a
/// non-canonical null (row 0 with a non-zero tag) survives a round trip.
pub struct CodedIndex<K> {
    raw: u32,
    target: Option<RowRef>,
    _marker: PhantomData<fn() -> K>,
}

impl<K: CodedKind> CodedIndex<K> {
    /// A new, not yet persisted reference.
    #[must_use]
    pub fn new(target: Option<RowRef>) -> Self {
        CodedIndex {
            raw: 0,
            target,
            _marker: PhantomData,
        }
    }

    /// The encoded value (as read, or as assigned by the last persist).
    #[must_use]
    pub fn raw(&self) -> u32 {
        self.raw
    }

    /// The referenced row, `None` for the null reference.
    #[must_use]
    pub fn target(&self) -> Option<RowRef> {
        self.target
    }

    /// Point at another row.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the table is not a candidate of `K`.
    pub fn set(&mut self, target: Option<RowRef>) -> Result<()> {
        if let Some(row) = target {
            if !K::KIND.accepts(row.table) {
                return Err(malformed_error!(
                    "{:?} cannot reference table {}",
                    K::KIND,
                    row.table
                ));
            }
        }
        self.target = target;
        Ok(())
    }
}

impl<K: CodedKind> Column for CodedIndex<K> {
    fn size(info: &TableInfo) -> u32 {
        info.coded_index_bytes(K::KIND)
    }

    fn read(cursor: &mut ByteCursor<'_>, info: &TableInfo) -> Result<Self> {
        Ok(CodedIndex {
            raw: cursor.read_index(info.is_large_coded(K::KIND))?,
            target: None,
            _marker: PhantomData,
        })
    }

    fn resolve(&mut self, ctx: &mut RowContext<'_>) -> Result<()> {
        self.target = K::KIND.decode(self.raw)?;
        match self.target {
            Some(row) => check_row(ctx.info, row.table, row.rid),
            None => Ok(()),
        }
    }

    fn persist(&mut self, ctx: &mut RowContext<'_>) -> Result<()> {
        if let Some(row) = self.target {
            check_row(ctx.info, row.table, row.rid)?;
        }
        let unchanged = matches!(K::KIND.decode(self.raw), Ok(current) if current == self.target);
        if !unchanged {
            self.raw = K::KIND.encode(self.target)?;
        }
        Ok(())
    }

    fn write(&self, sink: &mut ByteSink, info: &TableInfo) -> Result<()> {
        sink.write_index(self.raw, info.is_large_coded(K::KIND))
    }
}

impl<K> Clone for CodedIndex<K> {
    fn clone(&self) -> Self {
        CodedIndex {
            raw: self.raw,
            target: self.target,
            _marker: PhantomData,
        }
    }
}

impl<K> Default for CodedIndex<K> {
    fn default() -> Self {
        CodedIndex {
            raw: 0,
            target: None,
            _marker: PhantomData,
        }
    }
}

impl<K> PartialEq for CodedIndex<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.target == other.target
    }
}

impl<K: CodedKind> fmt::Debug for CodedIndex<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:X} -> {:?})", K::KIND, self.raw, self.target)
    }
}

/// A contiguous run of rows `[start, end)` of one table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RowRange {
    /// First row of the run
    pub start: u32,
    /// One past the last row of the run
    pub end: u32,
}

impl RowRange {
    /// Creates a run from its bounds.
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        RowRange { start, end }
    }

    /// Number of rows in the run.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the run holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `rid` is part of the run.
    #[must_use]
    pub fn contains(&self, rid: u32) -> bool {
        rid >= self.start && rid < self.end
    }

    /// The row indexes of the run.
    pub fn iter(&self) -> impl Iterator<Item = u32> {
        self.start..self.end
    }
}

/// Type-erased access to a range-list column, used by the table-level range passes.
pub trait RangeColumn {
    /// The table the run lives in.
    fn target(&self) -> TableId;
    /// The stored first row.
    fn raw(&self) -> u32;
    /// Overwrite the stored first row.
    fn set_raw(&mut self, raw: u32);
    /// The resolved run, `None` for a null list.
    fn list(&self) -> Option<RowRange>;
    /// Overwrite the resolved run.
    fn set_list(&mut self, list: Option<RowRange>);
}

/// A range-list column: the first row of a run in table `T`.
///
/// The end of the run is not stored; it is the start of the next non-null list of the same
/// column, or one past the last row of `T`. Raw 0 is a null list, distinct from an empty one.
pub struct RangeList<T> {
    raw: u32,
    list: Option<RowRange>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: TableRow> RangeList<T> {
    /// A list holding the given run.
    #[must_use]
    pub fn new(range: RowRange) -> Self {
        RangeList {
            raw: 0,
            list: Some(range),
            _marker: PhantomData,
        }
    }

    /// A non-null list holding no rows.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(RowRange::default())
    }

    /// The stored first row (as read, or as assigned by the last persist).
    #[must_use]
    pub fn raw(&self) -> u32 {
        self.raw
    }

    /// The resolved run, `None` for a null list.
    #[must_use]
    pub fn range(&self) -> Option<RowRange> {
        self.list
    }

    /// Returns `true` for a null list.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.list.is_none()
    }

    /// References to the rows of the run.
    pub fn rows(&self) -> impl Iterator<Item = RowRef> {
        self.list
            .unwrap_or_default()
            .iter()
            .map(|rid| RowRef::new(T::TABLE_ID, rid))
    }

    /// Replace the run.
    pub fn set(&mut self, list: Option<RowRange>) {
        self.list = list;
    }
}

impl<T: TableRow> RangeColumn for RangeList<T> {
    fn target(&self) -> TableId {
        T::TABLE_ID
    }

    fn raw(&self) -> u32 {
        self.raw
    }

    fn set_raw(&mut self, raw: u32) {
        self.raw = raw;
    }

    fn list(&self) -> Option<RowRange> {
        self.list
    }

    fn set_list(&mut self, list: Option<RowRange>) {
        self.list = list;
    }
}

impl<T: TableRow> Column for RangeList<T> {
    fn size(info: &TableInfo) -> u32 {
        info.table_index_bytes(T::TABLE_ID)
    }

    fn read(cursor: &mut ByteCursor<'_>, info: &TableInfo) -> Result<Self> {
        Ok(RangeList {
            raw: cursor.read_index(info.is_large(T::TABLE_ID))?,
            list: None,
            _marker: PhantomData,
        })
    }

    fn write(&self, sink: &mut ByteSink, info: &TableInfo) -> Result<()> {
        sink.write_index(self.raw, info.is_large(T::TABLE_ID))
    }

    fn visit_range(
        &mut self,
        f: &mut dyn FnMut(&mut dyn RangeColumn) -> Result<()>,
    ) -> Result<()> {
        f(self)
    }
}

impl<T> Clone for RangeList<T> {
    fn clone(&self) -> Self {
        RangeList {
            raw: self.raw,
            list: self.list,
            _marker: PhantomData,
        }
    }
}

impl<T> Default for RangeList<T> {
    fn default() -> Self {
        RangeList {
            raw: 0,
            list: None,
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for RangeList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.list == other.list
    }
}

impl<T: TableRow> fmt::Debug for RangeList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.list {
            Some(list) => write!(f, "{}[{}..{}]", T::TABLE_ID, list.start, list.end),
            None => write!(f, "{}[null]", T::TABLE_ID),
        }
    }
}

fn check_row(info: &TableInfo, table: TableId, rid: u32) -> Result<()> {
    if rid > info.rows(table) {
        return Err(malformed_error!(
            "Reference to {} row {} past the end of the table ({} rows)",
            table,
            rid,
            info.rows(table)
        ));
    }
    Ok(())
}
