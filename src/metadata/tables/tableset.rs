//! The table set: every table of a compressed table stream plus the heaps it points into.
//!
//! # Reading
//!
//! [`TableSet::read`] runs the read pipeline strictly in order:
//!
//! 1. **Header scan** - the [`TablesHeader`] gives the `valid` / `sorted` bitsets and one row
//!    count per present table
//! 2. **Width computation** - a [`TableInfo`] fixes every index width from the row counts and
//!    heap flags; row layouts depend on it
//! 3. **Row read** - the raw form of every row, table by table in ascending tag order
//! 4. **Resolve** - heap offsets become values, coded indexes become [`RowRef`]s, range lists
//!    become runs
//!
//! # Writing
//!
//! [`TableSet::write`] mirrors this: persist assigns heap offsets (reusing the offsets that
//! were read wherever the value is unchanged), then heap flags and widths are recomputed from
//! the final heap sizes, and only then are the header and rows written.
//!
//! # Example
//!
//! ```rust
//! use dotcodec::metadata::tables::{ModuleRow, StringIndex, TableSet};
//! use dotcodec::CodecConfig;
//!
//! let mut set = TableSet::new();
//! set.tables_mut().module.push(ModuleRow {
//!     name: StringIndex::new("demo.dll"),
//!     ..ModuleRow::default()
//! })?;
//!
//! let metadata = set.write()?.assemble("v4.0.30319")?;
//! let decoded = TableSet::from_metadata(&metadata, 0, CodecConfig::default())?;
//! assert_eq!(decoded.tables().module.get(1).unwrap().name.value(), "demo.dll");
//! # Ok::<(), dotcodec::Error>(())
//! ```

use std::sync::Arc;

use log::{debug, trace, warn};
use strum::IntoEnumIterator;

use crate::{
    config::CodecConfig,
    file::{ByteCursor, ByteSink, Image},
    metadata::{
        method::MethodBody,
        root::{Root, StreamEntry},
        signatures::{Signature, SignatureKind, SignatureParser},
        streams::{Heaps, TablesHeader},
        tables::{
            BlobIndex, HeapSizeFlags, MethodImplAttributes, RowContext, RowData, RowRef, Table,
            TableAccess, TableId, TableInfo, TableRow, Tables, TABLE_SLOTS,
        },
        token::{Token, TokenCodec, TokenTarget, USER_STRING_TABLE},
    },
    Error, Result,
};

/// Heaps of this size or more need 4-byte offsets
const BIG_HEAP: usize = 0x10000;

/// The encoded streams produced by [`TableSet::write`], each padded to 4 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedStreams {
    /// `#~`
    pub tables: Vec<u8>,
    /// `#Strings`
    pub strings: Vec<u8>,
    /// `#US`
    pub user_strings: Vec<u8>,
    /// `#Blob`
    pub blobs: Vec<u8>,
    /// `#GUID`
    pub guids: Vec<u8>,
}

impl EncodedStreams {
    /// Lay the streams out behind a metadata root.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the version string is too long.
    pub fn assemble(&self, version: &str) -> Result<Vec<u8>> {
        Root::assemble(
            version,
            &[
                ("#~", self.tables.as_slice()),
                ("#Strings", self.strings.as_slice()),
                ("#US", self.user_strings.as_slice()),
                ("#GUID", self.guids.as_slice()),
                ("#Blob", self.blobs.as_slice()),
            ],
        )
    }
}

/// All tables of one metadata image, their heaps, and the widths in effect.
#[derive(Debug, Clone)]
pub struct TableSet {
    header: TablesHeader,
    tables: Tables,
    heaps: Heaps,
    info: TableInfo,
    config: CodecConfig,
    fresh: bool,
}

impl TableSet {
    /// An empty table set with empty heaps.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CodecConfig::default())
    }

    /// An empty table set using `config` for its write pipeline.
    #[must_use]
    pub fn with_config(config: CodecConfig) -> Self {
        TableSet {
            header: TablesHeader::default(),
            tables: Tables::default(),
            heaps: Heaps::new().with_max_signature_depth(config.max_signature_depth),
            info: TableInfo::default(),
            config,
            fresh: true,
        }
    }

    /// Decode a metadata blob that starts with its `BSJB` root at `root_offset` of `data`.
    ///
    /// # Errors
    /// Returns the errors of [`Root::read`] and [`TableSet::read`].
    pub fn from_metadata(data: &[u8], root_offset: usize, config: CodecConfig) -> Result<Self> {
        let mut cursor = ByteCursor::new(data).view_from(root_offset)?;
        let root = Root::read(&mut cursor, config.verify_padding)?;
        Self::read(data, &root.stream_entries(root_offset), config)
    }

    /// Decode the table stream and the four heaps located by `streams` in `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] for an uncompressed `#-` stream,
    /// [`crate::Error::Malformed`] if a mandatory stream is missing, the header is invalid, a
    /// heap flag is too small for its heap, or a reference points outside its target, and
    /// [`crate::Error::OutOfBounds`] for truncated data.
    pub fn read(data: &[u8], streams: &[StreamEntry], config: CodecConfig) -> Result<Self> {
        if streams.iter().any(|stream| stream.name == "#-") {
            return Err(Error::NotSupported(
                "Uncompressed table streams (#-) are not supported".to_string(),
            ));
        }

        let tables_stream = stream_bytes(data, streams, "#~")?;
        let strings = stream_bytes(data, streams, "#Strings")?;
        let user_strings = stream_bytes(data, streams, "#US")?;
        let blobs = stream_bytes(data, streams, "#Blob")?;
        let guids = stream_bytes(data, streams, "#GUID")?;

        let mut heaps = Heaps::from_streams(strings, user_strings, blobs, guids)?
            .with_max_signature_depth(config.max_signature_depth);

        let mut cursor = ByteCursor::new(tables_stream);
        let header = TablesHeader::read(&mut cursor)?;
        debug!(
            "Table stream header: {} tables, heap flags {:?}, {} header bytes",
            header.table_count(),
            header.heap_flags,
            header.size()
        );

        if config.verify_heap_flags {
            for (flag, name, size) in [
                (HeapSizeFlags::STRINGS, "#Strings", strings.len()),
                (HeapSizeFlags::GUID, "#GUID", guids.len()),
                (HeapSizeFlags::BLOB, "#Blob", blobs.len()),
            ] {
                if size >= BIG_HEAP && !header.heap_flags.contains(flag) {
                    return Err(malformed_error!(
                        "{} heap of {} bytes is declared with 2-byte offsets",
                        name,
                        size
                    ));
                }
            }
        }

        let info = TableInfo::new(header.rows, header.heap_flags);
        debug!("Index widths computed from {} row counts", header.table_count());

        let mut tables = Tables::default();
        for table in header.present_tables() {
            tables
                .get_mut(table)
                .read_rows(&mut cursor, &info, header.row_count(table))?;
        }
        debug!(
            "Read {} rows from {} of {} table stream bytes",
            header.rows.iter().map(|&rows| u64::from(rows)).sum::<u64>(),
            cursor.pos(),
            cursor.len()
        );

        let mut ctx = RowContext {
            info: &info,
            heaps: &mut heaps,
        };
        for table in TableId::iter() {
            tables.get_mut(table).resolve_rows(&mut ctx)?;
        }
        debug!("Resolved all heap, index and range-list columns");

        Ok(TableSet {
            header,
            tables,
            heaps,
            info,
            config,
            fresh: false,
        })
    }

    /// Persist every row and encode the table stream and the heaps.
    ///
    /// Rows, heaps and the header reflect the encoded state afterwards, so a second call
    /// produces the same bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a value cannot be represented (a string with a
    /// NUL, a coded index naming a table its kind does not accept) and
    /// [`crate::Error::OutOfBounds`] if an output exceeds the configured write limit.
    pub fn write(&mut self) -> Result<EncodedStreams> {
        let mut rows = [0_u32; TABLE_SLOTS];
        for table in TableId::iter() {
            rows[table as usize] = self.tables.get(table).row_count();
        }

        debug!("Persisting rows of {} tables", rows.iter().filter(|&&count| count > 0).count());
        let persist_info = TableInfo::new(rows, self.header.heap_flags);
        let mut ctx = RowContext {
            info: &persist_info,
            heaps: &mut self.heaps,
        };
        for table in TableId::iter() {
            self.tables.get_mut(table).persist_rows(&mut ctx)?;
        }

        let heap_flags = self.heap_flags();
        // Tables announced with zero rows stay announced
        let valid = TableId::iter()
            .filter(|table| rows[*table as usize] > 0)
            .fold(self.header.valid, |bits, table| bits | table.bit());
        let sorted = if self.config.preserve_sorted && !self.fresh {
            self.header.sorted
        } else {
            valid
        };
        self.header.heap_flags = heap_flags;
        self.header.valid = valid;
        self.header.sorted = sorted;
        self.header.rows = rows;
        self.info = TableInfo::new(rows, heap_flags);
        debug!(
            "Index widths recomputed with heap flags {:?} (strings {}, blobs {}, guids {} bytes)",
            heap_flags,
            self.heaps.strings.size(),
            self.heaps.blobs.size(),
            self.heaps.guids.size()
        );

        let mut sink = ByteSink::with_optional_limit(self.config.write_limit);
        self.header.write(&mut sink)?;
        for table in self.header.present_tables() {
            let table = self.tables.get(table);
            trace!(
                "Writing {} rows of {} ({} bytes each)",
                table.row_count(),
                table.id(),
                table.row_size(&self.info)
            );
            table.write_rows(&mut sink, &self.info)?;
        }
        sink.align(4)?;
        debug!("Emitted table stream of {} bytes", sink.len());

        let limit = self.config.write_limit;
        Ok(EncodedStreams {
            tables: sink.into_inner(),
            strings: limited(self.heaps.strings.to_bytes(), limit)?,
            user_strings: limited(self.heaps.user_strings.to_bytes(), limit)?,
            blobs: limited(self.heaps.blobs.to_bytes(), limit)?,
            guids: limited(self.heaps.guids.to_bytes(), limit)?,
        })
    }

    /// The heap flags for the current heap sizes; flags that were big stay big.
    fn heap_flags(&self) -> HeapSizeFlags {
        let mut flags = self.header.heap_flags;
        for (flag, name, size) in [
            (HeapSizeFlags::STRINGS, "#Strings", self.heaps.strings.size()),
            (HeapSizeFlags::GUID, "#GUID", self.heaps.guids.size()),
            (HeapSizeFlags::BLOB, "#Blob", self.heaps.blobs.size()),
        ] {
            if size >= BIG_HEAP {
                flags.insert(flag);
            } else if flags.contains(flag) {
                warn!(
                    "{} heap is only {} bytes but keeps 4-byte offsets",
                    name, size
                );
            }
        }
        flags
    }

    /// The table stream header, as read or as last written.
    #[must_use]
    pub fn header(&self) -> &TablesHeader {
        &self.header
    }

    /// Row counts and index widths, as read or as last written.
    #[must_use]
    pub fn info(&self) -> &TableInfo {
        &self.info
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// All tables.
    #[must_use]
    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// All tables, mutable; changes take effect on the next [`TableSet::write`].
    pub fn tables_mut(&mut self) -> &mut Tables {
        &mut self.tables
    }

    /// The table of `T` rows.
    #[must_use]
    pub fn table<T: TableRow>(&self) -> &Table<T>
    where
        Tables: TableAccess<T>,
    {
        <Tables as TableAccess<T>>::table(&self.tables)
    }

    /// The table of `T` rows, mutable.
    pub fn table_mut<T: TableRow>(&mut self) -> &mut Table<T>
    where
        Tables: TableAccess<T>,
    {
        <Tables as TableAccess<T>>::table_mut(&mut self.tables)
    }

    /// The heaps.
    #[must_use]
    pub fn heaps(&self) -> &Heaps {
        &self.heaps
    }

    /// The heaps, mutable.
    pub fn heaps_mut(&mut self) -> &mut Heaps {
        &mut self.heaps
    }

    /// The row `target` points at.
    #[must_use]
    pub fn row(&self, target: RowRef) -> Option<RowData<'_>> {
        self.tables.row(target)
    }

    /// The typed signature stored in the signature column of `target`.
    ///
    /// Signatures are cached by heap offset; a blob changed since the last write is parsed
    /// from its new content.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidToken`] for a missing row, [`crate::Error::Malformed`]
    /// for a table without a signature column or an invalid signature.
    pub fn signature(&mut self, target: RowRef) -> Result<Arc<Signature>> {
        let (blob, kind) = signature_blob(&mut self.tables, target)?;
        let offset = blob.offset();

        let unchanged = offset != 0
            && self
                .heaps
                .blobs
                .get(offset)
                .is_ok_and(|stored| stored == blob.value());
        if unchanged {
            return self.heaps.signature(offset, kind);
        }

        let parsed = SignatureParser::new(blob.value())
            .with_max_depth(self.config.max_signature_depth)
            .parse(kind)?;
        Ok(Arc::new(parsed))
    }

    /// Store `signature` in the signature column of `target`.
    ///
    /// The blob is added to the heap right away (deduplicated by value); the row picks up its
    /// offset on the next write.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeMismatch`] if the table does not hold signatures of that
    /// kind, and [`crate::Error::InvalidToken`] for a missing row.
    pub fn set_signature(&mut self, target: RowRef, signature: &Signature) -> Result<()> {
        let accepted = match target.table {
            TableId::MethodDef => signature.kind() == SignatureKind::Method,
            TableId::Field => signature.kind() == SignatureKind::Field,
            TableId::Property => signature.kind() == SignatureKind::Property,
            TableId::MemberRef => {
                matches!(signature.kind(), SignatureKind::Method | SignatureKind::Field)
            }
            TableId::StandAloneSig => matches!(
                signature.kind(),
                SignatureKind::Method | SignatureKind::LocalVariables
            ),
            TableId::TypeSpec => signature.kind() == SignatureKind::TypeSpec,
            TableId::MethodSpec => signature.kind() == SignatureKind::MethodSpec,
            _ => false,
        };
        if !accepted {
            return Err(Error::TypeMismatch {
                expected: format!("a signature of table {}", target.table),
                actual: format!("{:?}", signature.kind()),
            });
        }

        let (blob, _) = signature_blob(&mut self.tables, target)?;
        let offset = self.heaps.intern_signature(signature, blob.offset())?;
        blob.set(self.heaps.blobs.get(offset)?);
        Ok(())
    }

    /// Decode the IL body of method `rid`, resolving operand tokens against this set.
    ///
    /// Returns `Ok(None)` for methods without a body (RVA 0).
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidToken`] if the method does not exist,
    /// [`crate::Error::NotSupported`] for native or runtime-provided code, and the errors of
    /// [`MethodBody::read`].
    pub fn method_body(&mut self, image: &Image, rid: u32) -> Result<Option<MethodBody>> {
        let row = self
            .tables
            .method_def
            .get(rid)
            .ok_or(Error::InvalidToken(TableId::MethodDef.token(rid)))?;
        if row.rva == 0 {
            return Ok(None);
        }

        let code_type = row.impl_attributes() & MethodImplAttributes::CODE_TYPE_MASK;
        if !code_type.is_empty() {
            return Err(Error::NotSupported(format!(
                "Method {} has no IL body (code type {:?})",
                rid, code_type
            )));
        }

        let rva = row.rva;
        let Some(mut cursor) = image.cursor_at(rva)? else {
            return Ok(None);
        };
        trace!("Decoding body of method {} at RVA 0x{:X}", rid, rva);

        let verify_padding = self.config.verify_padding;
        MethodBody::read(&mut cursor, self, verify_padding).map(Some)
    }

    /// Encode a method body, emitting its tokens against this set.
    ///
    /// # Errors
    /// Returns the errors of [`MethodBody::encode`].
    pub fn encode_method_body(&mut self, body: &MethodBody) -> Result<Vec<u8>> {
        body.encode(self)
    }
}

impl Default for TableSet {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCodec for TableSet {
    fn resolve_token(&mut self, token: Token) -> Result<TokenTarget> {
        if token.is_user_string() {
            if token.row() == 0 {
                return Err(Error::InvalidToken(token));
            }
            let value = self
                .heaps
                .user_strings
                .get(token.row())
                .map_err(|error| match error {
                    Error::OutOfBounds { .. } => Error::InvalidToken(token),
                    other => other,
                })?;
            return Ok(TokenTarget::UserString {
                offset: token.row(),
                value,
            });
        }

        let target = RowRef::try_from(token)?;
        if target.rid > self.tables.get(target.table).row_count() {
            return Err(Error::InvalidToken(token));
        }
        Ok(TokenTarget::Row(target))
    }

    fn emit_token(&mut self, target: &TokenTarget) -> Result<Token> {
        match target {
            TokenTarget::Row(row) => {
                if row.rid == 0 || row.rid > self.tables.get(row.table).row_count() {
                    return Err(Error::InvalidToken(row.token()));
                }
                Ok(row.token())
            }
            TokenTarget::UserString { offset, value } => {
                let offset = self.heaps.user_strings.intern(value, *offset)?;
                Ok(Token::from_parts(USER_STRING_TABLE, offset))
            }
        }
    }
}

/// The bytes of stream `name`.
fn stream_bytes<'a>(data: &'a [u8], streams: &[StreamEntry], name: &str) -> Result<&'a [u8]> {
    let entry = streams
        .iter()
        .find(|stream| stream.name == name)
        .ok_or_else(|| malformed_error!("Missing mandatory stream '{}'", name))?;

    entry
        .file_offset
        .checked_add(entry.size)
        .and_then(|end| data.get(entry.file_offset..end))
        .ok_or(out_of_bounds_error!())
}

/// Apply the write limit to an encoded heap.
fn limited(bytes: Vec<u8>, limit: Option<usize>) -> Result<Vec<u8>> {
    if let Some(limit) = limit {
        if bytes.len() > limit {
            return Err(out_of_bounds_error!());
        }
    }
    Ok(bytes)
}

/// The signature column of `target` and the signature kind it holds.
fn signature_blob(tables: &mut Tables, target: RowRef) -> Result<(&mut BlobIndex, SignatureKind)> {
    let missing = || Error::InvalidToken(target.token());

    match target.table {
        TableId::MethodDef => {
            let row = tables.method_def.get_mut(target.rid).ok_or_else(missing)?;
            Ok((&mut row.signature, SignatureKind::Method))
        }
        TableId::Field => {
            let row = tables.field.get_mut(target.rid).ok_or_else(missing)?;
            Ok((&mut row.signature, SignatureKind::Field))
        }
        TableId::Property => {
            let row = tables.property.get_mut(target.rid).ok_or_else(missing)?;
            Ok((&mut row.signature, SignatureKind::Property))
        }
        TableId::MemberRef => {
            let row = tables.member_ref.get_mut(target.rid).ok_or_else(missing)?;
            let kind = SignatureKind::for_member_ref(row.signature.value());
            Ok((&mut row.signature, kind))
        }
        TableId::StandAloneSig => {
            let row = tables.stand_alone_sig.get_mut(target.rid).ok_or_else(missing)?;
            let kind = SignatureKind::for_standalone(row.signature.value());
            Ok((&mut row.signature, kind))
        }
        TableId::TypeSpec => {
            let row = tables.type_spec.get_mut(target.rid).ok_or_else(missing)?;
            Ok((&mut row.signature, SignatureKind::TypeSpec))
        }
        TableId::MethodSpec => {
            let row = tables.method_spec.get_mut(target.rid).ok_or_else(missing)?;
            Ok((&mut row.instantiation, SignatureKind::MethodSpec))
        }
        other => Err(malformed_error!("Table {} has no signature column", other)),
    }
}

#[cfg(test)]
mod tests {
    use uguid::guid;
    use widestring::{u16str, U16String};

    use super::*;
    use crate::metadata::{
        signatures::{SignatureMethod, TypeSignature},
        tables::{
            CodedIndex, FieldRow, GuidIndex, MethodDefRow, ModuleRow, RangeList, RowRange,
            StringIndex, TypeDefRow, TypeRefRow,
        },
    };

    fn sample() -> TableSet {
        let mut set = TableSet::new();
        let tables = set.tables_mut();
        tables
            .module
            .push(ModuleRow {
                name: StringIndex::new("sample.dll"),
                mvid: GuidIndex::new(Some(guid!("01234567-89ab-cdef-0123-456789abcdef"))),
                ..ModuleRow::default()
            })
            .unwrap();
        tables
            .type_ref
            .push(TypeRefRow {
                resolution_scope: CodedIndex::new(None),
                type_name: StringIndex::new("Object"),
                type_namespace: StringIndex::new("System"),
            })
            .unwrap();
        tables
            .type_def
            .push(TypeDefRow {
                type_name: StringIndex::new("<Module>"),
                field_list: RangeList::empty(),
                method_list: RangeList::empty(),
                ..TypeDefRow::default()
            })
            .unwrap();
        tables
            .type_def
            .push(TypeDefRow {
                flags: 0x0010_0001,
                type_name: StringIndex::new("Program"),
                type_namespace: StringIndex::new("Sample"),
                extends: CodedIndex::new(Some(RowRef::new(TableId::TypeRef, 1))),
                field_list: RangeList::new(RowRange::new(1, 3)),
                method_list: RangeList::new(RowRange::new(1, 2)),
            })
            .unwrap();
        for name in ["a", "b"] {
            tables
                .field
                .push(FieldRow {
                    flags: 0x0001,
                    name: StringIndex::new(name),
                    signature: BlobIndex::new(vec![0x06, 0x08]),
                })
                .unwrap();
        }
        tables
            .method_def
            .push(MethodDefRow {
                flags: 0x0096,
                name: StringIndex::new("Main"),
                param_list: RangeList::empty(),
                ..MethodDefRow::default()
            })
            .unwrap();

        let main = Signature::Method(SignatureMethod::default());
        set.set_signature(RowRef::new(TableId::MethodDef, 1), &main)
            .unwrap();
        set
    }

    fn read(streams: &EncodedStreams, config: CodecConfig) -> Result<TableSet> {
        TableSet::from_metadata(&streams.assemble("v4.0.30319")?, 0, config)
    }

    #[test]
    fn fresh_set_round_trip() {
        let mut set = sample();
        let streams = set.write().unwrap();

        let mut decoded = read(&streams, CodecConfig::default()).unwrap();
        assert_eq!(decoded.tables(), set.tables());
        assert_eq!(decoded.header().valid, set.header().valid);
        assert_eq!(decoded.header().sorted, decoded.header().valid);
        assert_eq!(decoded.header().row_count(TableId::TypeDef), 2);

        let program = decoded.table::<TypeDefRow>().get(2).unwrap();
        assert_eq!(program.type_name.value(), "Program");
        assert_eq!(program.field_list.rows().count(), 2);
        assert_eq!(
            program.extends.target(),
            Some(RowRef::new(TableId::TypeRef, 1))
        );

        // Writing the decoded set again changes nothing
        assert_eq!(decoded.write().unwrap(), streams);
    }

    #[test]
    fn signatures() {
        let mut set = sample();
        let streams = set.write().unwrap();
        let mut decoded = read(&streams, CodecConfig::default()).unwrap();

        let main = decoded
            .signature(RowRef::new(TableId::MethodDef, 1))
            .unwrap();
        assert_eq!(main.kind(), SignatureKind::Method);

        let field = decoded.signature(RowRef::new(TableId::Field, 2)).unwrap();
        let again = decoded.signature(RowRef::new(TableId::Field, 1)).unwrap();
        assert_eq!(field, again);

        let string_field = Signature::Field(crate::metadata::signatures::SignatureField {
            modifiers: Vec::new(),
            base: TypeSignature::String,
        });
        decoded
            .set_signature(RowRef::new(TableId::Field, 2), &string_field)
            .unwrap();
        assert_eq!(
            *decoded.signature(RowRef::new(TableId::Field, 2)).unwrap(),
            string_field
        );

        assert!(matches!(
            decoded.set_signature(RowRef::new(TableId::MethodDef, 1), &string_field),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            decoded.signature(RowRef::new(TableId::Field, 9)),
            Err(Error::InvalidToken(_))
        ));
        assert!(decoded.signature(RowRef::new(TableId::TypeDef, 1)).is_err());

        let rewritten = decoded.write().unwrap();
        let mut reread = read(&rewritten, CodecConfig::default()).unwrap();
        assert_eq!(
            *reread.signature(RowRef::new(TableId::Field, 2)).unwrap(),
            string_field
        );
        // Field 1 keeps its original blob
        assert_eq!(
            reread.tables().field.get(1).unwrap().signature.offset(),
            set.tables().field.get(1).unwrap().signature.offset()
        );
    }

    #[test]
    fn tokens() {
        let mut set = sample();
        set.write().unwrap();

        let target = set.resolve_token(Token::new(0x0100_0001)).unwrap();
        assert_eq!(target, TokenTarget::Row(RowRef::new(TableId::TypeRef, 1)));
        assert_eq!(set.emit_token(&target).unwrap(), Token::new(0x0100_0001));

        for invalid in [0x0100_0002, 0x0100_0000, 0x2000_0001, 0x0300_0001] {
            assert!(matches!(
                set.resolve_token(Token::new(invalid)),
                Err(Error::InvalidToken(_))
            ));
        }
        assert!(set
            .emit_token(&TokenTarget::Row(RowRef::new(TableId::Param, 1)))
            .is_err());

        let literal = TokenTarget::UserString {
            offset: 0,
            value: U16String::from_str("hi"),
        };
        let token = set.emit_token(&literal).unwrap();
        assert_eq!(token, Token::new(0x7000_0001));
        match set.resolve_token(token).unwrap() {
            TokenTarget::UserString { offset, value } => {
                assert_eq!(offset, 1);
                assert_eq!(value.as_ustr(), u16str!("hi"));
            }
            other => panic!("unexpected target {:?}", other),
        }
        assert!(matches!(
            set.resolve_token(Token::new(0x7000_0100)),
            Err(Error::InvalidToken(_))
        ));
    }

    #[test]
    fn missing_and_unsupported_streams() {
        let mut set = sample();
        let streams = set.write().unwrap();

        let without_us = Root::assemble(
            "v4.0.30319",
            &[
                ("#~", streams.tables.as_slice()),
                ("#Strings", streams.strings.as_slice()),
                ("#GUID", streams.guids.as_slice()),
                ("#Blob", streams.blobs.as_slice()),
            ],
        )
        .unwrap();
        assert!(matches!(
            TableSet::from_metadata(&without_us, 0, CodecConfig::default()),
            Err(Error::Malformed { .. })
        ));

        let uncompressed = Root::assemble(
            "v4.0.30319",
            &[
                ("#-", streams.tables.as_slice()),
                ("#Strings", streams.strings.as_slice()),
                ("#US", streams.user_strings.as_slice()),
                ("#GUID", streams.guids.as_slice()),
                ("#Blob", streams.blobs.as_slice()),
            ],
        )
        .unwrap();
        assert!(matches!(
            TableSet::from_metadata(&uncompressed, 0, CodecConfig::default()),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn small_flag_on_big_heap() {
        let mut set = sample();
        let mut streams = set.write().unwrap();
        assert!(!set.header().heap_flags.contains(HeapSizeFlags::BLOB));

        streams.blobs.resize(BIG_HEAP, 0);
        assert!(matches!(
            read(&streams, CodecConfig::default()),
            Err(Error::Malformed { .. })
        ));

        let mut lenient = read(&streams, CodecConfig::lenient()).unwrap();
        let rewritten = lenient.write().unwrap();
        assert!(lenient.header().heap_flags.contains(HeapSizeFlags::BLOB));
        assert!(rewritten.tables.len() > streams.tables.len());
    }

    #[test]
    fn big_flags_never_shrink() {
        let mut set = sample();
        set.header.heap_flags = HeapSizeFlags::STRINGS;
        let streams = set.write().unwrap();
        assert!(set.header().heap_flags.contains(HeapSizeFlags::STRINGS));
        assert!(set.info().is_large_str());

        let decoded = read(&streams, CodecConfig::default()).unwrap();
        assert_eq!(decoded.tables(), set.tables());
    }

    #[test]
    fn sorted_bitset() {
        let mut set = sample();
        let mut streams = set.write().unwrap();
        let valid = set.header().valid;
        let custom = valid & !TableId::TypeDef.bit();
        streams.tables[16..24].copy_from_slice(&custom.to_le_bytes());

        let mut preserved = read(&streams, CodecConfig::default()).unwrap();
        assert_eq!(preserved.header().sorted, custom);
        preserved.write().unwrap();
        assert_eq!(preserved.header().sorted, custom);

        let mut normalised = read(&streams, CodecConfig::strict()).unwrap();
        normalised.write().unwrap();
        assert_eq!(normalised.header().sorted, valid);
    }

    #[test]
    fn write_limit() {
        let mut set = TableSet::with_config(CodecConfig {
            write_limit: Some(16),
            ..CodecConfig::default()
        });
        set.tables_mut().module.push(ModuleRow::default()).unwrap();
        assert!(matches!(set.write(), Err(Error::OutOfBounds { .. })));
    }
}
