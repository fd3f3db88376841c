//! # Coded Index Types Module
//!
//! Coded indices combine a table identifier and a row index into a single value: the low
//! `tag_bits` select one of the candidate tables of the coded index kind, the remaining bits
//! hold the 1-based row. Index 0 means "null" whatever the tag.
//!
//! ## Key Components
//!
//! - [`CodedIndexType`]: the 13 coded index kinds of ECMA-335 and their candidate tables
//! - [`RowRef`]: a `(table, row)` pair, the decoded form of any row reference
//! - [`kind`]: zero-sized markers that bind a row column to its coded index kind
//!
//! ## References
//!
//! - [ECMA-335 Standard](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf) - Section II.24.2.6

use std::fmt;

use strum::{EnumCount, EnumIter};

use crate::{
    metadata::{tables::TableId, token::Token},
    Result,
};

/// Represents all possible coded index types defined in the CLI metadata specification.
///
/// A coded index type defines which combination of metadata tables can be referenced
/// by a particular coded index field. The position of a table in [`CodedIndexType::tables`]
/// is the tag that selects it.
///
/// ## Examples
///
/// - `TypeDefOrRef` can reference `TypeDef`, `TypeRef`, or `TypeSpec` tables
/// - `HasConstant` can reference `Field`, `Param`, or `Property` tables
/// - `HasCustomAttribute` can reference any of 22 different table types
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
#[repr(usize)]
pub enum CodedIndexType {
    /// References `TypeDef`, `TypeRef`, or `TypeSpec` tables.
    TypeDefOrRef,

    /// References `Field`, `Param`, or `Property` tables.
    ///
    /// Used to identify entities that can have constant values assigned to them.
    HasConstant,

    /// References any entity that can have custom attributes attached.
    ///
    /// This is the widest coded index type, with 22 candidates and 5 tag bits.
    HasCustomAttribute,

    /// References `Field` or `Param` tables.
    HasFieldMarshal,

    /// References `TypeDef`, `MethodDef`, or `Assembly` tables.
    HasDeclSecurity,

    /// References `TypeDef`, `TypeRef`, `ModuleRef`, `MethodDef`, or `TypeSpec` tables.
    ///
    /// Used as the parent reference for member references.
    MemberRefParent,

    /// References `Event` or `Property` tables.
    HasSemantics,

    /// References `MethodDef` or `MemberRef` tables.
    MethodDefOrRef,

    /// References `Field` or `MethodDef` tables.
    MemberForwarded,

    /// References `File`, `AssemblyRef`, or `ExportedType` tables.
    Implementation,

    /// References `MethodDef` or `MemberRef` tables through tags 2 and 3.
    ///
    /// Tags 0, 1 and 4 are reserved; a value carrying one of them is malformed.
    CustomAttributeType,

    /// References `Module`, `ModuleRef`, `AssemblyRef`, or `TypeRef` tables.
    ResolutionScope,

    /// References `TypeDef` or `MethodDef` tables.
    TypeOrMethodDef,
}

impl CodedIndexType {
    /// Returns the candidate tables of this coded index type, indexed by tag.
    ///
    /// `None` marks a reserved tag.
    #[must_use]
    pub fn tables(&self) -> &'static [Option<TableId>] {
        match self {
            CodedIndexType::TypeDefOrRef => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasConstant => &[
                Some(TableId::Field),
                Some(TableId::Param),
                Some(TableId::Property),
            ],
            CodedIndexType::HasCustomAttribute => &[
                Some(TableId::MethodDef),
                Some(TableId::Field),
                Some(TableId::TypeRef),
                Some(TableId::TypeDef),
                Some(TableId::Param),
                Some(TableId::InterfaceImpl),
                Some(TableId::MemberRef),
                Some(TableId::Module),
                Some(TableId::DeclSecurity), // labeled 'Permission' in the standard
                Some(TableId::Property),
                Some(TableId::Event),
                Some(TableId::StandAloneSig),
                Some(TableId::ModuleRef),
                Some(TableId::TypeSpec),
                Some(TableId::Assembly),
                Some(TableId::AssemblyRef),
                Some(TableId::File),
                Some(TableId::ExportedType),
                Some(TableId::ManifestResource),
                Some(TableId::GenericParam),
                Some(TableId::GenericParamConstraint),
                Some(TableId::MethodSpec),
            ],
            CodedIndexType::HasFieldMarshal => &[Some(TableId::Field), Some(TableId::Param)],
            CodedIndexType::HasDeclSecurity => &[
                Some(TableId::TypeDef),
                Some(TableId::MethodDef),
                Some(TableId::Assembly),
            ],
            CodedIndexType::MemberRefParent => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::ModuleRef),
                Some(TableId::MethodDef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasSemantics => &[Some(TableId::Event), Some(TableId::Property)],
            CodedIndexType::MethodDefOrRef => {
                &[Some(TableId::MethodDef), Some(TableId::MemberRef)]
            }
            CodedIndexType::MemberForwarded => &[Some(TableId::Field), Some(TableId::MethodDef)],
            CodedIndexType::Implementation => &[
                Some(TableId::File),
                Some(TableId::AssemblyRef),
                Some(TableId::ExportedType),
            ],
            CodedIndexType::CustomAttributeType => &[
                None,
                None,
                Some(TableId::MethodDef),
                Some(TableId::MemberRef),
                None,
            ],
            CodedIndexType::ResolutionScope => &[
                Some(TableId::Module),
                Some(TableId::ModuleRef),
                Some(TableId::AssemblyRef),
                Some(TableId::TypeRef),
            ],
            CodedIndexType::TypeOrMethodDef => &[Some(TableId::TypeDef), Some(TableId::MethodDef)],
        }
    }

    /// Number of low bits that carry the tag: `ceil(log2(candidates))`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn tag_bits(&self) -> u8 {
        let candidates = self.tables().len();
        // candidates >= 2, so candidates - 1 >= 1
        (usize::BITS - (candidates - 1).leading_zeros()) as u8
    }

    /// Returns `true` if `table` is one of the candidates of this kind.
    #[must_use]
    pub fn accepts(&self, table: TableId) -> bool {
        self.tables().iter().any(|candidate| *candidate == Some(table))
    }

    /// Splits an encoded value into its target row.
    ///
    /// Returns `Ok(None)` for the null reference (row 0, any tag).
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the tag is reserved or out of range.
    pub fn decode(&self, value: u32) -> Result<Option<RowRef>> {
        let tag_bits = self.tag_bits();
        let rid = value >> tag_bits;
        if rid == 0 {
            return Ok(None);
        }

        let tag = (value & ((1 << tag_bits) - 1)) as usize;
        match self.tables().get(tag) {
            Some(Some(table)) => Ok(Some(RowRef::new(*table, rid))),
            _ => Err(malformed_error!(
                "Invalid tag {} in {:?} coded index 0x{:X}",
                tag,
                self,
                value
            )),
        }
    }

    /// Packs a target row into `(rid << tag_bits) | tag`. `None` encodes as 0.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the target table is not a candidate of this kind
    /// or the row does not fit next to the tag bits.
    pub fn encode(&self, target: Option<RowRef>) -> Result<u32> {
        let Some(target) = target else {
            return Ok(0);
        };

        let tag = self
            .tables()
            .iter()
            .position(|candidate| *candidate == Some(target.table))
            .ok_or_else(|| {
                malformed_error!("{:?} cannot reference table {}", self, target.table)
            })?;

        let tag_bits = self.tag_bits();
        if target.rid >> (32 - u32::from(tag_bits)) != 0 {
            return Err(malformed_error!(
                "Row {} does not fit a {:?} coded index",
                target.rid,
                self
            ));
        }

        #[allow(clippy::cast_possible_truncation)]
        Ok((target.rid << tag_bits) | tag as u32)
    }
}

/// A reference to one row: the table and the 1-based row index.
///
/// Rows are never renumbered once read, so a `RowRef` stays valid for the lifetime of the
/// table set it was taken from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowRef {
    /// The table holding the row
    pub table: TableId,
    /// The 1-based row index
    pub rid: u32,
}

impl RowRef {
    /// Creates a new row reference.
    #[must_use]
    pub fn new(table: TableId, rid: u32) -> Self {
        RowRef { table, rid }
    }

    /// The metadata token of the referenced row.
    #[must_use]
    pub fn token(&self) -> Token {
        self.table.token(self.rid)
    }
}

impl fmt::Debug for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.table, self.rid)
    }
}

impl TryFrom<Token> for RowRef {
    type Error = crate::Error;

    fn try_from(token: Token) -> Result<Self> {
        if token.row() == 0 {
            return Err(crate::Error::InvalidToken(token));
        }
        Ok(RowRef::new(TableId::from_token(token)?, token.row()))
    }
}

/// Binds a coded index column to its kind at the type level.
pub trait CodedKind {
    /// The coded index kind of the column
    const KIND: CodedIndexType;
}

/// Zero-sized markers, one per [`CodedIndexType`], used as the parameter of
/// [`crate::metadata::tables::CodedIndex`].
pub mod kind {
    use super::{CodedIndexType, CodedKind};

    macro_rules! coded_kinds {
        ($($name:ident),* $(,)?) => {
            $(
                #[doc = concat!("Marker for [`CodedIndexType::", stringify!($name), "`]")]
                pub struct $name;

                impl CodedKind for $name {
                    const KIND: CodedIndexType = CodedIndexType::$name;
                }
            )*
        };
    }

    coded_kinds!(
        TypeDefOrRef,
        HasConstant,
        HasCustomAttribute,
        HasFieldMarshal,
        HasDeclSecurity,
        MemberRefParent,
        HasSemantics,
        MethodDefOrRef,
        MemberForwarded,
        Implementation,
        CustomAttributeType,
        ResolutionScope,
        TypeOrMethodDef,
    );
}
