// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # dotcodec
//!
//! A bidirectional codec for ECMA-335 (.NET / CLI) metadata. `dotcodec` decodes the
//! compressed table stream, its four heaps and CIL method bodies into typed values, lets you
//! edit them, and re-encodes everything with index widths, heap offsets and branch encodings
//! recomputed from the edited content.
//!
//! ## Features
//!
//! - **Complete table coverage** - all 38 row kinds of the compressed (`#~`) table stream
//! - **Width-correct indexes** - heap, simple and coded index widths follow the row counts
//!   and heap sizes, both when reading and when writing
//! - **Stable heap offsets** - unchanged strings, blobs and GUIDs keep their original offsets
//! - **Range lists** - type and method member runs stay consistent across row insertions
//! - **CIL method bodies** - tiny and fat headers, exception sections and instruction streams
//!   with branch remapping and automatic short-branch widening
//! - **Typed signatures** - method, field, property, local and type-spec signatures
//!
//! ## Quick Start
//!
//! ```rust
//! use dotcodec::{metadata::tables::{ModuleRow, StringIndex, TableSet}, CodecConfig};
//!
//! let mut set = TableSet::new();
//! set.tables_mut().module.push(ModuleRow {
//!     name: StringIndex::new("Demo.dll"),
//!     ..ModuleRow::default()
//! })?;
//!
//! let metadata = set.write()?.assemble("v4.0.30319")?;
//! let decoded = TableSet::from_metadata(&metadata, 0, CodecConfig::default())?;
//! assert_eq!(decoded.tables().module.get(1).map(|m| m.name.value()), Some("Demo.dll"));
//! # Ok::<(), dotcodec::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`file`] - byte cursors and sinks, compressed integers, section address translation and
//!   image backends (owned buffer or memory map)
//! - [`metadata`] - the metadata root, heaps, tables, signatures, tokens and method bodies
//! - [`assembly`] - the CIL opcode table and instruction stream codec
//! - [`CodecConfig`] - strictness and write options
//! - [`Error`] and [`Result`] - fail-fast error handling
//!
//! Reading a table stream runs strictly in order: header scan, width computation, row read,
//! resolve. Writing mirrors it: persist, width recomputation, header write, row write.
//!
//! ## Logging
//!
//! The codec reports through the [`log`] facade: stream layout at `debug`, per-table row
//! counts at `trace`, and recoverable oddities (such as a stale `sorted` bit) at `warn`.
//! Install any `log` implementation to see them.

#[macro_use]
pub(crate) mod error;

/// Codec options
pub mod config;

/// Raw byte access: cursors, sinks, compressed integers and image sections.
pub mod file;

/// ECMA-335 metadata: root, heaps, tables, signatures, tokens and method bodies.
pub mod metadata;

/// CIL instructions: opcode table, decoder and encoder.
pub mod assembly;

/// `dotcodec` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`].
///
/// # Examples
///
/// ```rust
/// use dotcodec::{file::io::compressed_uint_size, Result};
///
/// fn encoded_len(value: u32) -> Result<usize> {
///     compressed_uint_size(value)
/// }
/// assert_eq!(encoded_len(300)?, 2);
/// # Ok::<(), dotcodec::Error>(())
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `dotcodec` Error type
///
/// Every structural problem is reported through one of its variants, grouped by category
/// in the enum documentation.
///
/// # Example
///
/// ```rust
/// use dotcodec::{metadata::tables::TableSet, CodecConfig, Error};
///
/// match TableSet::from_metadata(&[0_u8; 16], 0, CodecConfig::default()) {
///     Err(Error::Malformed { .. }) | Err(Error::OutOfBounds { .. }) => {}
///     other => panic!("unexpected result: {:?}", other.map(|_| ())),
/// }
/// ```
pub use error::Error;

/// Decode and encode options, see [`config::CodecConfig`].
pub use config::CodecConfig;

/// The entry points most callers need.
///
/// - [`TableSet`] - all tables of one metadata image with their heaps
/// - [`Image`] - image bytes plus the section list used to resolve RVAs
/// - [`MethodBody`] - a decoded CIL method body
pub use file::Image;
pub use metadata::{method::MethodBody, tables::TableSet};
