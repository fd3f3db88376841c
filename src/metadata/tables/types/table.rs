use std::fmt::Debug;

use log::trace;

use crate::{
    file::{ByteCursor, ByteSink},
    metadata::{
        streams::Heaps,
        tables::{RangeColumn, RowRange, TableId, TableInfo},
    },
    Result,
};

/// What row operations need besides the row itself: the current widths and the heaps.
pub struct RowContext<'c> {
    /// Row counts and index widths in effect
    pub info: &'c TableInfo,
    /// The heaps string, blob and GUID columns resolve against
    pub heaps: &'c mut Heaps,
}

/// Trait defining the interface for reading, resolving and writing metadata table rows.
///
/// Implemented for each of the 38 row kinds by the `define_row!` macro; every method is a
/// fold over the row's columns in declaration order.
pub trait TableRow: Sized + Clone + Debug + Default + PartialEq + 'static {
    /// The table this row kind lives in
    const TABLE_ID: TableId;

    /// Calculates the size in bytes of a single row for this table type.
    fn row_size(info: &TableInfo) -> u32;

    /// Reads the raw form of one row and advances the cursor past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the cursor runs out of data.
    fn read_row(cursor: &mut ByteCursor<'_>, info: &TableInfo) -> Result<Self>;

    /// Resolves every heap and row reference of this row.
    ///
    /// # Errors
    /// Returns an error if any reference points outside its heap or table.
    fn resolve(&mut self, ctx: &mut RowContext<'_>) -> Result<()>;

    /// Assigns heap offsets and coded values for every reference of this row.
    ///
    /// # Errors
    /// Returns an error if a value cannot be represented.
    fn persist(&mut self, ctx: &mut RowContext<'_>) -> Result<()>;

    /// Writes the raw form of this row.
    ///
    /// # Errors
    /// Returns an error if a raw value does not fit the width chosen by `info`.
    fn write_row(&self, sink: &mut ByteSink, info: &TableInfo) -> Result<()>;

    /// Hands each range-list column of this row to `f`, in declaration order.
    ///
    /// # Errors
    /// Propagates the errors of `f`.
    fn for_each_range(
        &mut self,
        f: &mut dyn FnMut(&mut dyn RangeColumn) -> Result<()>,
    ) -> Result<()>;
}

/// A dense, 1-based sequence of rows of one kind.
#[derive(Clone, Debug, PartialEq)]
pub struct Table<T> {
    rows: Vec<T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Table { rows: Vec::new() }
    }
}

impl<T: TableRow> Table<T> {
    /// Number of rows.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn len(&self) -> u32 {
        // push() keeps the count below 2^24
        self.rows.len() as u32
    }

    /// Returns `true` if the table holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row `rid` (1-based).
    #[must_use]
    pub fn get(&self, rid: u32) -> Option<&T> {
        let index = (rid as usize).checked_sub(1)?;
        self.rows.get(index)
    }

    /// Mutable row `rid` (1-based).
    pub fn get_mut(&mut self, rid: u32) -> Option<&mut T> {
        let index = (rid as usize).checked_sub(1)?;
        self.rows.get_mut(index)
    }

    /// Append a row and return its 1-based index.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the table already holds the maximum of `0xFFFFFF`
    /// rows a token can address.
    pub fn push(&mut self, row: T) -> Result<u32> {
        if self.rows.len() >= 0x00FF_FFFF {
            return Err(malformed_error!("Table {} is full", T::TABLE_ID));
        }
        self.rows.push(row);
        Ok(self.len())
    }

    /// Replace row `rid`, returning the old row.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the row does not exist.
    pub fn replace(&mut self, rid: u32, row: T) -> Result<T> {
        let slot = self.get_mut(rid).ok_or(out_of_bounds_error!())?;
        Ok(std::mem::replace(slot, row))
    }

    /// Iterate over `(rid, row)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        (1..).zip(self.rows.iter())
    }

    /// Iterate mutably over the rows in order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.rows.iter_mut()
    }
}

/// Object-safe view of a [`Table`], used to drive the pipelines over all 38 kinds.
pub trait AnyTable {
    /// The table tag.
    fn id(&self) -> TableId;

    /// Number of rows.
    fn row_count(&self) -> u32;

    /// Row size under `info`.
    fn row_size(&self, info: &TableInfo) -> u32;

    /// Replace the content with `count` rows read from `cursor`.
    ///
    /// # Errors
    /// Returns an error if the rows cannot be read.
    fn read_rows(&mut self, cursor: &mut ByteCursor<'_>, info: &TableInfo, count: u32)
        -> Result<()>;

    /// Resolve every row, including range lists.
    ///
    /// # Errors
    /// Returns an error if a reference is out of range.
    fn resolve_rows(&mut self, ctx: &mut RowContext<'_>) -> Result<()>;

    /// Persist every row, including range lists.
    ///
    /// # Errors
    /// Returns an error if a value cannot be represented.
    fn persist_rows(&mut self, ctx: &mut RowContext<'_>) -> Result<()>;

    /// Write every row.
    ///
    /// # Errors
    /// Returns an error if a value does not fit its width.
    fn write_rows(&self, sink: &mut ByteSink, info: &TableInfo) -> Result<()>;
}

impl<T: TableRow> AnyTable for Table<T> {
    fn id(&self) -> TableId {
        T::TABLE_ID
    }

    fn row_count(&self) -> u32 {
        self.len()
    }

    fn row_size(&self, info: &TableInfo) -> u32 {
        T::row_size(info)
    }

    fn read_rows(
        &mut self,
        cursor: &mut ByteCursor<'_>,
        info: &TableInfo,
        count: u32,
    ) -> Result<()> {
        trace!(
            "Reading {} rows of {} ({} bytes each)",
            count,
            T::TABLE_ID,
            T::row_size(info)
        );

        let mut rows = Vec::with_capacity((count as usize).min(cursor.remaining()));
        for _ in 0..count {
            rows.push(T::read_row(cursor, info)?);
        }
        self.rows = rows;
        Ok(())
    }

    fn resolve_rows(&mut self, ctx: &mut RowContext<'_>) -> Result<()> {
        for row in &mut self.rows {
            row.resolve(ctx)?;
        }
        resolve_ranges(&mut self.rows, ctx.info)
    }

    fn persist_rows(&mut self, ctx: &mut RowContext<'_>) -> Result<()> {
        persist_ranges(&mut self.rows, ctx.info)?;
        for row in &mut self.rows {
            row.persist(ctx)?;
        }
        Ok(())
    }

    fn write_rows(&self, sink: &mut ByteSink, info: &TableInfo) -> Result<()> {
        for row in &self.rows {
            row.write_row(sink, info)?;
        }
        Ok(())
    }
}

/// Most range-list columns a single row kind carries (`TypeDef`: fields and methods)
const MAX_RANGE_COLUMNS: usize = 2;

/// Turn the stored starts of every range-list column into runs.
///
/// Walks the rows backwards so each list ends where the next non-null list of the same column
/// begins, or one past the target table's last row.
fn resolve_ranges<T: TableRow>(rows: &mut [T], info: &TableInfo) -> Result<()> {
    let mut next_start: [Option<u32>; MAX_RANGE_COLUMNS] = [None; MAX_RANGE_COLUMNS];

    for row in rows.iter_mut().rev() {
        let mut column = 0;
        row.for_each_range(&mut |range: &mut dyn RangeColumn| {
            let limit = info.rows(range.target()) + 1;
            let next = next_start
                .get_mut(column)
                .ok_or_else(|| malformed_error!("Too many range-list columns"))?;
            column += 1;

            let raw = range.raw();
            if raw == 0 {
                range.set_list(None);
                return Ok(());
            }

            let end = next.unwrap_or(limit);
            if raw > limit || raw > end {
                return Err(malformed_error!(
                    "{} list of {} starts at {}, past its end {}",
                    range.target(),
                    T::TABLE_ID,
                    raw,
                    end
                ));
            }

            range.set_list(Some(RowRange::new(raw, end)));
            *next = Some(raw);
            Ok(())
        })?;
    }

    Ok(())
}

/// Compute the stored start of every range-list column from its run.
///
/// Null lists store 0; empty lists store the start of the next populated list of the same
/// column, or one past the target table's last row, and are moved to that position.
fn persist_ranges<T: TableRow>(rows: &mut [T], info: &TableInfo) -> Result<()> {
    let mut next_populated: [Option<u32>; MAX_RANGE_COLUMNS] = [None; MAX_RANGE_COLUMNS];

    for row in rows.iter_mut().rev() {
        let mut column = 0;
        row.for_each_range(&mut |range: &mut dyn RangeColumn| {
            let next = next_populated
                .get_mut(column)
                .ok_or_else(|| malformed_error!("Too many range-list columns"))?;
            column += 1;

            let limit = info.rows(range.target()) + 1;
            match range.list() {
                None => range.set_raw(0),
                Some(list) if !list.is_empty() => {
                    let end = next.unwrap_or(limit);
                    if list.start == 0 || list.end != end {
                        return Err(malformed_error!(
                            "{} list {}..{} of {} must end at {}, where the next list starts",
                            range.target(),
                            list.start,
                            list.end,
                            T::TABLE_ID,
                            end
                        ));
                    }
                    range.set_raw(list.start);
                    *next = Some(list.start);
                }
                Some(_) => {
                    let start = next.unwrap_or(limit);
                    range.set_raw(start);
                    range.set_list(Some(RowRange::new(start, start)));
                }
            }
            Ok(())
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::tables::{FieldRow, MethodDefRow, RangeList, TypeDefRow},
        Error,
    };

    fn type_def(field_list: u32) -> TypeDefRow {
        let mut row = TypeDefRow::default();
        row.field_list.set_raw(field_list);
        row.method_list.set_raw(1);
        row
    }

    fn info(fields: u32) -> TableInfo {
        TableInfo::new_test(
            &[(TableId::Field, fields), (TableId::MethodDef, 0)],
            false,
            false,
            false,
        )
    }

    #[test]
    fn range_end_skips_null_lists() {
        let mut rows = vec![type_def(5), type_def(0), type_def(9)];
        resolve_ranges(&mut rows, &info(12)).unwrap();

        assert_eq!(rows[0].field_list.range(), Some(RowRange::new(5, 9)));
        assert_eq!(
            rows[0].field_list.rows().map(|row| row.rid).collect::<Vec<_>>(),
            vec![5, 6, 7, 8]
        );
        assert!(rows[1].field_list.is_null());
        assert_eq!(rows[2].field_list.range(), Some(RowRange::new(9, 13)));
        assert_eq!(rows[2].method_list.range(), Some(RowRange::new(1, 1)));
    }

    #[test]
    fn range_bounds_are_checked() {
        let mut rows = vec![type_def(14)];
        assert!(resolve_ranges(&mut rows, &info(12)).is_err());

        let mut rows = vec![type_def(13)];
        resolve_ranges(&mut rows, &info(12)).unwrap();
        assert!(rows[0].field_list.range().unwrap().is_empty());

        let mut rows = vec![type_def(6), type_def(4)];
        assert!(resolve_ranges(&mut rows, &info(12)).is_err());
    }

    #[test]
    fn persist_restores_stored_starts() {
        let original = [1, 1, 0, 3, 5, 5];
        let mut rows: Vec<TypeDefRow> = original.iter().map(|start| type_def(*start)).collect();
        resolve_ranges(&mut rows, &info(5)).unwrap();

        for row in &mut rows {
            row.field_list.set_raw(0xDEAD);
        }
        persist_ranges(&mut rows, &info(5)).unwrap();

        let persisted: Vec<u32> = rows.iter().map(|row| row.field_list.raw()).collect();
        assert_eq!(persisted, original);
    }

    #[test]
    fn persist_fresh_lists() {
        let mut rows = vec![TypeDefRow::default(), TypeDefRow::default()];
        rows[0].field_list = RangeList::<FieldRow>::empty();
        rows[1].field_list = RangeList::<FieldRow>::new(RowRange::new(1, 3));
        rows[0].method_list = RangeList::<MethodDefRow>::empty();
        rows[1].method_list = RangeList::<MethodDefRow>::empty();

        persist_ranges(&mut rows, &info(2)).unwrap();
        assert_eq!(rows[0].field_list.raw(), 1);
        assert_eq!(rows[0].field_list.range(), Some(RowRange::new(1, 1)));
        assert_eq!(rows[1].field_list.raw(), 1);
        assert_eq!(rows[0].method_list.raw(), 1);
        assert_eq!(rows[1].method_list.raw(), 1);
    }

    #[test]
    fn persist_rejects_gaps_and_overlaps() {
        let lists = |ranges: &[(u32, u32)]| -> Vec<TypeDefRow> {
            ranges
                .iter()
                .map(|&(start, end)| TypeDefRow {
                    field_list: RangeList::new(RowRange::new(start, end)),
                    method_list: RangeList::empty(),
                    ..TypeDefRow::default()
                })
                .collect()
        };

        // Field 2 belongs to no type
        let mut gap = lists(&[(1, 2), (3, 5)]);
        assert!(matches!(
            persist_ranges(&mut gap, &info(4)),
            Err(Error::Malformed { .. })
        ));

        // Field 2 belongs to both types
        let mut overlap = lists(&[(1, 3), (2, 5)]);
        assert!(persist_ranges(&mut overlap, &info(4)).is_err());

        // The last list must run to the end of the field table
        let mut short = lists(&[(1, 3), (3, 4)]);
        assert!(persist_ranges(&mut short, &info(4)).is_err());

        let mut contiguous = lists(&[(1, 3), (3, 5)]);
        persist_ranges(&mut contiguous, &info(4)).unwrap();
        assert_eq!(contiguous[1].field_list.raw(), 3);
    }

    #[test]
    fn table_is_one_based() {
        let mut table = Table::<FieldRow>::default();
        assert!(table.get(0).is_none());
        assert_eq!(table.push(FieldRow::default()).unwrap(), 1);
        assert_eq!(table.push(FieldRow::default()).unwrap(), 2);
        assert!(table.get(1).is_some());
        assert!(table.get(3).is_none());
        assert!(table.replace(3, FieldRow::default()).is_err());
        assert_eq!(table.iter().map(|(rid, _)| rid).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(table.id(), TableId::Field);
    }
}
