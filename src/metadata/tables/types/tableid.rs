use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

use crate::{metadata::token::Token, Result};

/// Identifiers for the 38 metadata tables of a compressed (`#~`) table stream.
///
/// The numeric values are the table tags of ECMA-335 II.22; they double as the bit position in
/// the `valid` / `sorted` header bitsets and as the high byte of a [`Token`]. The pointer and
/// edit-and-continue tables (`0x03`, `0x05`, `0x07`, `0x13`, `0x16`, `0x1E`, `0x1F`) only occur
/// in uncompressed streams and are not part of this set.
///
/// ## Table Categories
///
/// ### Core Type System
/// - **`Module`**, **`TypeRef`**, **`TypeDef`**, **`Field`**, **`MethodDef`**, **`Param`**
///
/// ### Type Relationships
/// - **`InterfaceImpl`**, **`NestedClass`**, **`ClassLayout`**, **`FieldLayout`**
///
/// ### Member References
/// - **`MemberRef`**, **`MethodImpl`**, **`MethodSemantics`**
///
/// ### Metadata and Attributes
/// - **`CustomAttribute`**, **`Constant`**, **`FieldMarshal`**, **`DeclSecurity`**
///
/// ### Signatures and Specifications
/// - **`StandAloneSig`**, **`TypeSpec`**, **`MethodSpec`**, **`GenericParam`**,
///   **`GenericParamConstraint`**
///
/// ### Events and Properties
/// - **`Event`**, **`EventMap`**, **`Property`**, **`PropertyMap`**
///
/// ### Assembly Information
/// - **`Assembly`**, **`AssemblyRef`**, **`AssemblyProcessor`**, **`AssemblyOS`**,
///   **`AssemblyRefProcessor`**, **`AssemblyRefOS`**
///
/// ### Files, Resources and Interop
/// - **`File`**, **`ExportedType`**, **`ManifestResource`**, **`ImplMap`**, **`FieldRVA`**,
///   **`ModuleRef`**
///
/// ## Reference
/// * [ECMA-335 Partition II, Section 22](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf) - Metadata Tables
#[derive(Clone, Copy, PartialEq, Debug, EnumIter, EnumCount, Display, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TableId {
    /// `Module` table (0x00) - the one row describing this module
    Module = 0x00,
    /// `TypeRef` table (0x01) - references to types defined elsewhere
    TypeRef = 0x01,
    /// `TypeDef` table (0x02) - types defined in this module
    TypeDef = 0x02,
    /// `Field` table (0x04) - field definitions, owned by `TypeDef` ranges
    Field = 0x04,
    /// `MethodDef` table (0x06) - method definitions, owned by `TypeDef` ranges
    MethodDef = 0x06,
    /// `Param` table (0x08) - parameters, owned by `MethodDef` ranges
    Param = 0x08,
    /// `InterfaceImpl` table (0x09) - interfaces implemented by types
    InterfaceImpl = 0x09,
    /// `MemberRef` table (0x0A) - references to fields and methods
    MemberRef = 0x0A,
    /// `Constant` table (0x0B) - compile-time constants
    Constant = 0x0B,
    /// `CustomAttribute` table (0x0C) - attribute applications
    CustomAttribute = 0x0C,
    /// `FieldMarshal` table (0x0D) - marshalling descriptors
    FieldMarshal = 0x0D,
    /// `DeclSecurity` table (0x0E) - declarative security
    DeclSecurity = 0x0E,
    /// `ClassLayout` table (0x0F) - packing and size of types
    ClassLayout = 0x0F,
    /// `FieldLayout` table (0x10) - explicit field offsets
    FieldLayout = 0x10,
    /// `StandAloneSig` table (0x11) - signatures not attached to members
    StandAloneSig = 0x11,
    /// `EventMap` table (0x12) - type to event ranges
    EventMap = 0x12,
    /// `Event` table (0x14) - event definitions
    Event = 0x14,
    /// `PropertyMap` table (0x15) - type to property ranges
    PropertyMap = 0x15,
    /// `Property` table (0x17) - property definitions
    Property = 0x17,
    /// `MethodSemantics` table (0x18) - accessor associations
    MethodSemantics = 0x18,
    /// `MethodImpl` table (0x19) - explicit overrides
    MethodImpl = 0x19,
    /// `ModuleRef` table (0x1A) - referenced modules
    ModuleRef = 0x1A,
    /// `TypeSpec` table (0x1B) - type specifications
    TypeSpec = 0x1B,
    /// `ImplMap` table (0x1C) - P/Invoke mappings
    ImplMap = 0x1C,
    /// `FieldRVA` table (0x1D) - initial data of fields
    FieldRVA = 0x1D,
    /// `Assembly` table (0x20) - the assembly manifest
    Assembly = 0x20,
    /// `AssemblyProcessor` table (0x21) - unused by modern tools
    AssemblyProcessor = 0x21,
    /// `AssemblyOS` table (0x22) - unused by modern tools
    AssemblyOS = 0x22,
    /// `AssemblyRef` table (0x23) - referenced assemblies
    AssemblyRef = 0x23,
    /// `AssemblyRefProcessor` table (0x24) - unused by modern tools
    AssemblyRefProcessor = 0x24,
    /// `AssemblyRefOS` table (0x25) - unused by modern tools
    AssemblyRefOS = 0x25,
    /// `File` table (0x26) - files of a multi-module assembly
    File = 0x26,
    /// `ExportedType` table (0x27) - types forwarded or exported
    ExportedType = 0x27,
    /// `ManifestResource` table (0x28) - resources
    ManifestResource = 0x28,
    /// `NestedClass` table (0x29) - nesting relationships
    NestedClass = 0x29,
    /// `GenericParam` table (0x2A) - generic parameters
    GenericParam = 0x2A,
    /// `MethodSpec` table (0x2B) - generic method instantiations
    MethodSpec = 0x2B,
    /// `GenericParamConstraint` table (0x2C) - constraints on generic parameters
    GenericParamConstraint = 0x2C,
}

/// Number of tag slots spanned by [`TableId`] (`0x00..=0x2C`)
pub const TABLE_SLOTS: usize = TableId::GenericParamConstraint as usize + 1;

impl TableId {
    /// Look up a table by its tag.
    ///
    /// Returns `None` for the pointer / edit-and-continue tags and anything above `0x2C`.
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<TableId> {
        TableId::iter().find(|id| *id as u8 == tag)
    }

    /// Look up the table a token points into.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidToken`] if the table byte names no supported table.
    pub fn from_token(token: Token) -> Result<TableId> {
        TableId::from_tag(token.table()).ok_or(crate::Error::InvalidToken(token))
    }

    /// The table tag.
    #[must_use]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// The bit of this table in the `valid` / `sorted` bitsets.
    #[must_use]
    pub fn bit(self) -> u64 {
        1_u64 << (self as u8)
    }

    /// Token for `row` in this table.
    #[must_use]
    pub fn token(self, row: u32) -> Token {
        Token::from_parts(self as u8, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirty_eight_tables() {
        assert_eq!(TableId::COUNT, 38);
        assert_eq!(TABLE_SLOTS, 0x2D);

        let tags: Vec<u8> = TableId::iter().map(TableId::tag).collect();
        assert!(tags.windows(2).all(|pair| pair[0] < pair[1]));
        for skipped in [0x03, 0x05, 0x07, 0x13, 0x16, 0x1E, 0x1F, 0x2D, 0x30] {
            assert!(TableId::from_tag(skipped).is_none());
        }
    }

    #[test]
    fn tokens_and_bits() {
        assert_eq!(TableId::MethodDef.token(3).value(), 0x0600_0003);
        assert_eq!(TableId::TypeDef.bit(), 0b100);
        assert_eq!(
            TableId::from_token(Token::new(0x2300_0001)).unwrap(),
            TableId::AssemblyRef
        );
        assert!(TableId::from_token(Token::new(0x0300_0001)).is_err());
    }
}
