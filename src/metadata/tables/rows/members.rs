//! Rows attaching references, constants, attributes, events and properties to members.

use crate::{
    metadata::{
        signatures::ConstantValue,
        tables::{
            kind, BlobIndex, CodedIndex, EventAttributes, MethodSemanticsAttributes,
            PInvokeAttributes, PropertyAttributes, RangeList, StringIndex, TableIndex,
        },
    },
    Result,
};

use super::{MethodDefRow, TypeDefRow};

define_row! {
    /// The `MemberRef` table (0x0A) references fields and methods of other types.
    MemberRefRow(MemberRef) {
        /// The type or module declaring the member
        class: CodedIndex<kind::MemberRefParent>,
        /// The member name
        name: StringIndex,
        /// The member signature
        signature: BlobIndex,
    }
}

define_row! {
    /// The `Constant` table (0x0B) holds compile-time constants of fields, params and
    /// properties.
    ConstantRow(Constant) {
        /// Element type of the constant
        base: u8,
        /// Padding byte, kept as read
        padding: u8,
        /// The owner of the constant
        parent: CodedIndex<kind::HasConstant>,
        /// The encoded value
        value: BlobIndex,
    }
}

impl ConstantRow {
    /// Decode the constant under its element type.
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeMismatch`] or [`crate::Error::Malformed`] if the blob does
    /// not hold a value of the declared element type.
    pub fn constant(&self) -> Result<ConstantValue> {
        ConstantValue::decode(self.base, self.value.value())
    }

    /// Replace type and value with an encoded constant.
    pub fn set_constant(&mut self, value: &ConstantValue) {
        self.base = value.element_type();
        self.value.set(value.encode());
    }
}

define_row! {
    /// The `CustomAttribute` table (0x0C) applies attributes to metadata entities.
    CustomAttributeRow(CustomAttribute) {
        /// The entity carrying the attribute
        parent: CodedIndex<kind::HasCustomAttribute>,
        /// The attribute constructor
        constructor: CodedIndex<kind::CustomAttributeType>,
        /// The encoded constructor arguments
        value: BlobIndex,
    }
}

define_row! {
    /// The `FieldMarshal` table (0x0D) holds marshalling descriptors for interop.
    FieldMarshalRow(FieldMarshal) {
        /// The marshalled field or parameter
        parent: CodedIndex<kind::HasFieldMarshal>,
        /// The native type descriptor
        native_type: BlobIndex,
    }
}

define_row! {
    /// The `DeclSecurity` table (0x0E) holds declarative security permission sets.
    DeclSecurityRow(DeclSecurity) {
        /// The security action
        action: u16,
        /// The protected type, method or assembly
        parent: CodedIndex<kind::HasDeclSecurity>,
        /// The serialized permission set
        permission_set: BlobIndex,
    }
}

define_row! {
    /// The `EventMap` table (0x12) assigns runs of `Event` rows to types.
    EventMapRow(EventMap) {
        /// The owning type
        parent: TableIndex<TypeDefRow>,
        /// The events owned by the type
        event_list: RangeList<EventRow>,
    }
}

define_row! {
    /// The `Event` table (0x14) defines events.
    EventRow(Event) {
        /// A 2-byte bitmask of type [`EventAttributes`]
        flags: u16,
        /// The event name
        name: StringIndex,
        /// The delegate type of the event
        event_type: CodedIndex<kind::TypeDefOrRef>,
    }
}

impl EventRow {
    /// The event attributes
    #[must_use]
    pub fn attributes(&self) -> EventAttributes {
        EventAttributes::from_bits_retain(self.flags)
    }
}

define_row! {
    /// The `PropertyMap` table (0x15) assigns runs of `Property` rows to types.
    PropertyMapRow(PropertyMap) {
        /// The owning type
        parent: TableIndex<TypeDefRow>,
        /// The properties owned by the type
        property_list: RangeList<PropertyRow>,
    }
}

define_row! {
    /// The `Property` table (0x17) defines properties.
    PropertyRow(Property) {
        /// A 2-byte bitmask of type [`PropertyAttributes`]
        flags: u16,
        /// The property name
        name: StringIndex,
        /// The property signature
        signature: BlobIndex,
    }
}

impl PropertyRow {
    /// The property attributes
    #[must_use]
    pub fn attributes(&self) -> PropertyAttributes {
        PropertyAttributes::from_bits_retain(self.flags)
    }
}

define_row! {
    /// The `MethodSemantics` table (0x18) ties accessor methods to events and properties.
    MethodSemanticsRow(MethodSemantics) {
        /// A 2-byte bitmask of type [`MethodSemanticsAttributes`]
        semantics: u16,
        /// The accessor method
        method: TableIndex<MethodDefRow>,
        /// The event or property
        association: CodedIndex<kind::HasSemantics>,
    }
}

impl MethodSemanticsRow {
    /// The semantics of the accessor
    #[must_use]
    pub fn attributes(&self) -> MethodSemanticsAttributes {
        MethodSemanticsAttributes::from_bits_retain(self.semantics)
    }
}

define_row! {
    /// The `MethodImpl` table (0x19) records explicit interface implementations and overrides.
    MethodImplRow(MethodImpl) {
        /// The type holding the override
        class: TableIndex<TypeDefRow>,
        /// The implementing method
        method_body: CodedIndex<kind::MethodDefOrRef>,
        /// The overridden declaration
        method_declaration: CodedIndex<kind::MethodDefOrRef>,
    }
}

define_row! {
    /// The `ModuleRef` table (0x1A) references other modules.
    ModuleRefRow(ModuleRef) {
        /// The module name
        name: StringIndex,
    }
}

define_row! {
    /// The `ImplMap` table (0x1C) maps P/Invoke members to native entry points.
    ImplMapRow(ImplMap) {
        /// A 2-byte bitmask of type [`PInvokeAttributes`]
        mapping_flags: u16,
        /// The forwarded field or method
        member_forwarded: CodedIndex<kind::MemberForwarded>,
        /// The native entry point name
        import_name: StringIndex,
        /// The native module
        import_scope: TableIndex<ModuleRefRow>,
    }
}

impl ImplMapRow {
    /// The P/Invoke attributes
    #[must_use]
    pub fn attributes(&self) -> PInvokeAttributes {
        PInvokeAttributes::from_bits_retain(self.mapping_flags)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        file::{ByteCursor, ByteSink},
        metadata::tables::{RowRef, TableId, TableInfo, TableRow},
    };

    use super::*;

    #[test]
    fn constant_keeps_padding() {
        let data = [
            0x08, 0x7F, // base, padding
            0x06, 0x00, // parent
            0x10, 0x00, // value
        ];
        let info = TableInfo::new_test(&[(TableId::Field, 2)], false, false, false);
        let row = ConstantRow::read_row(&mut ByteCursor::new(&data), &info).unwrap();
        assert_eq!(row.base, 0x08);
        assert_eq!(row.padding, 0x7F);
        assert_eq!(row.parent.raw(), 6);

        let mut sink = ByteSink::new();
        row.write_row(&mut sink, &info).unwrap();
        assert_eq!(sink.as_slice(), &data);
    }

    #[test]
    fn custom_attribute_layout() {
        let info = TableInfo::new_test(&[(TableId::MemberRef, 0x2000)], false, true, false);
        // HasCustomAttribute (5 bits) is big, CustomAttributeType (3 bits) is big, blob is big
        assert_eq!(CustomAttributeRow::row_size(&info), 12);

        let info = TableInfo::new_test(&[(TableId::MemberRef, 0x7FF)], false, false, false);
        assert_eq!(CustomAttributeRow::row_size(&info), 6);
    }

    #[test]
    fn constant_accessors() {
        let mut row = ConstantRow::default();
        row.set_constant(&ConstantValue::I4(-2));
        assert_eq!(row.base, 0x08);
        assert_eq!(row.value.value(), &[0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(row.constant().unwrap(), ConstantValue::I4(-2));
    }

    #[test]
    fn semantics_association() {
        let mut row = MethodSemanticsRow::default();
        row.semantics = 0x0002;
        row.association
            .set(Some(RowRef::new(TableId::Property, 1)))
            .unwrap();
        assert!(row
            .attributes()
            .contains(MethodSemanticsAttributes::GETTER));
    }
}
