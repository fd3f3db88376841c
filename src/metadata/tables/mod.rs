//! Metadata tables of the compressed `#~` stream.
//!
//! # Layout
//!
//! - [`TableId`] - the 38 table kinds and their tags
//! - [`CodedIndexType`] / [`RowRef`] - multi-table references and their tag encoding
//! - [`TableInfo`] - row counts and the resulting 2 or 4 byte width of every index
//! - [`Column`] types - strings, blobs, GUIDs, simple and coded indexes, range lists
//! - row definitions, one struct per table in ECMA-335 II.22 column order
//! - [`Table`] / [`Tables`] - dense 1-based row storage and the container of all tables
//! - [`TableSet`] - the read and write pipelines over tables and heaps
//!
//! # Range lists
//!
//! `TypeDef.FieldList`, `TypeDef.MethodList`, `MethodDef.ParamList`, `EventMap.EventList`
//! and `PropertyMap.PropertyList` store only where a run starts. The run ends where the next
//! non-null list of the same column starts, or one past the last row of the target table:
//!
//! ```rust
//! use dotcodec::metadata::tables::{RangeList, RowRange, FieldRow};
//!
//! let list = RangeList::<FieldRow>::new(RowRange::new(5, 9));
//! assert_eq!(list.rows().map(|row| row.rid).collect::<Vec<_>>(), vec![5, 6, 7, 8]);
//! ```
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 22 - Metadata Logical Format: Tables
//! - ECMA-335 6th Edition, Partition II, Section 24.2.6 - `#~` stream

mod access;
mod attributes;
mod rows;
mod tableset;
mod types;

pub use access::{RowData, TableAccess, Tables};
pub use attributes::*;
pub use rows::*;
pub use tableset::{EncodedStreams, TableSet};
pub use types::*;
