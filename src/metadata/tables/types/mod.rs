//! # Metadata Table Types Module
//!
//! The building blocks shared by all 38 row kinds of a compressed table stream.
//!
//! ## Key Components
//!
//! - [`TableId`]: the table tags of the compressed stream
//! - [`CodedIndexType`] and [`RowRef`]: compact cross-table references
//! - [`TableInfo`]: row counts and the index widths derived from them
//! - [`Column`]: one typed field of a row, with its raw and live forms
//! - [`TableRow`] and [`Table`]: a row kind and its 1-based row sequence
//! - [`AnyTable`]: the object-safe view the pipelines iterate over
//!
//! ## References
//!
//! - [ECMA-335 Standard](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf) - Partition II, Sections 22 and 24.2.6

mod codedindex;
mod column;
mod table;
mod tableid;
mod tableinfo;

pub use codedindex::{kind, CodedIndexType, CodedKind, RowRef};
pub use column::{
    BlobIndex, CodedIndex, Column, GuidIndex, RangeColumn, RangeList, RowRange, StringIndex,
    TableIndex,
};
pub use table::{AnyTable, RowContext, Table, TableRow};
pub use tableid::{TableId, TABLE_SLOTS};
pub use tableinfo::{HeapSizeFlags, TableInfo};
