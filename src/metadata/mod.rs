//! ECMA-335 metadata: root, heaps, tables, signatures and method bodies.
//!
//! # Key Components
//!
//! - [`root`] - the `BSJB` metadata root and its stream directory
//! - [`streams`] - the `#Strings`, `#US`, `#Blob` and `#GUID` heaps and the table stream header
//! - [`tables`] - the 38 row kinds, coded indexes, range lists and the [`tables::TableSet`]
//!   read and write pipelines
//! - [`signatures`] - typed signatures parsed from and encoded into the blob heap
//! - [`method`] - method body headers, instruction streams and exception clauses
//! - [`token`] - the 32-bit metadata token and the [`token::TokenCodec`] seam
//!
//! # Examples
//!
//! ```rust
//! use dotcodec::{
//!     metadata::tables::{GuidIndex, ModuleRow, StringIndex, TableSet},
//!     CodecConfig,
//! };
//!
//! let mut set = TableSet::new();
//! set.tables_mut().module.push(ModuleRow {
//!     name: StringIndex::new("Demo.dll"),
//!     mvid: GuidIndex::new(Some(uguid::guid!("01234567-89ab-cdef-0123-456789abcdef"))),
//!     ..ModuleRow::default()
//! })?;
//!
//! let streams = set.write()?;
//! let metadata = streams.assemble("v4.0.30319")?;
//!
//! let decoded = TableSet::from_metadata(&metadata, 0, CodecConfig::default())?;
//! assert_eq!(decoded.tables().module.len(), 1);
//! # Ok::<(), dotcodec::Error>(())
//! ```

pub mod method;
pub mod root;
pub mod signatures;
pub mod streams;
pub mod tables;
pub mod token;
