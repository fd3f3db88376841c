//! Rows describing the module, its types and their members.

use crate::metadata::tables::{
    kind, BlobIndex, CodedIndex, FieldAttributes, GuidIndex, MethodAttributes,
    MethodImplAttributes, ParamAttributes, RangeList, StringIndex, TableIndex, TypeAttributes,
};

define_row! {
    /// The `Module` table (0x00) holds exactly one row describing the current module.
    ModuleRow(Module) {
        /// Reserved, shall be zero
        generation: u16,
        /// The module name
        name: StringIndex,
        /// Identifies this build of the module
        mvid: GuidIndex,
        /// Reserved, shall be zero
        enc_id: GuidIndex,
        /// Reserved, shall be zero
        enc_base_id: GuidIndex,
    }
}

define_row! {
    /// The `TypeRef` table (0x01) references types defined in other modules or assemblies.
    TypeRefRow(TypeRef) {
        /// Where the type lives (`Module`, `ModuleRef`, `AssemblyRef` or an enclosing `TypeRef`)
        resolution_scope: CodedIndex<kind::ResolutionScope>,
        /// The type name
        type_name: StringIndex,
        /// The type namespace
        type_namespace: StringIndex,
    }
}

define_row! {
    /// The `TypeDef` table (0x02) defines the types of this module.
    ///
    /// Fields and methods are owned through range lists: a type owns the `Field` and
    /// `MethodDef` rows from its start up to the start of the next type.
    TypeDefRow(TypeDef) {
        /// A 4-byte bitmask of type [`TypeAttributes`]
        flags: u32,
        /// The type name
        type_name: StringIndex,
        /// The type namespace
        type_namespace: StringIndex,
        /// The base type, null for interfaces and `System.Object`
        extends: CodedIndex<kind::TypeDefOrRef>,
        /// The fields owned by this type
        field_list: RangeList<FieldRow>,
        /// The methods owned by this type
        method_list: RangeList<MethodDefRow>,
    }
}

impl TypeDefRow {
    /// The type attributes
    #[must_use]
    pub fn attributes(&self) -> TypeAttributes {
        TypeAttributes::from_bits_retain(self.flags)
    }
}

define_row! {
    /// The `Field` table (0x04) defines fields, owned by `TypeDef` ranges.
    FieldRow(Field) {
        /// A 2-byte bitmask of type [`FieldAttributes`]
        flags: u16,
        /// The field name
        name: StringIndex,
        /// The field signature
        signature: BlobIndex,
    }
}

impl FieldRow {
    /// The field attributes
    #[must_use]
    pub fn attributes(&self) -> FieldAttributes {
        FieldAttributes::from_bits_retain(self.flags)
    }
}

define_row! {
    /// The `MethodDef` table (0x06) defines methods, owned by `TypeDef` ranges.
    MethodDefRow(MethodDef) {
        /// Relative virtual address of the method body, 0 if there is none
        rva: u32,
        /// A 2-byte bitmask of type [`MethodImplAttributes`]
        impl_flags: u16,
        /// A 2-byte bitmask of type [`MethodAttributes`]
        flags: u16,
        /// The method name
        name: StringIndex,
        /// The method signature
        signature: BlobIndex,
        /// The parameters owned by this method
        param_list: RangeList<ParamRow>,
    }
}

impl MethodDefRow {
    /// The method attributes
    #[must_use]
    pub fn attributes(&self) -> MethodAttributes {
        MethodAttributes::from_bits_retain(self.flags)
    }

    /// The method implementation attributes
    #[must_use]
    pub fn impl_attributes(&self) -> MethodImplAttributes {
        MethodImplAttributes::from_bits_retain(self.impl_flags)
    }
}

define_row! {
    /// The `Param` table (0x08) describes parameters, owned by `MethodDef` ranges.
    ParamRow(Param) {
        /// A 2-byte bitmask of type [`ParamAttributes`]
        flags: u16,
        /// Parameter position, 0 is the return value
        sequence: u16,
        /// The parameter name
        name: StringIndex,
    }
}

impl ParamRow {
    /// The parameter attributes
    #[must_use]
    pub fn attributes(&self) -> ParamAttributes {
        ParamAttributes::from_bits_retain(self.flags)
    }
}

define_row! {
    /// The `InterfaceImpl` table (0x09) records the interfaces a type implements.
    InterfaceImplRow(InterfaceImpl) {
        /// The implementing type
        class: TableIndex<TypeDefRow>,
        /// The implemented interface
        interface: CodedIndex<kind::TypeDefOrRef>,
    }
}

define_row! {
    /// The `ClassLayout` table (0x0F) gives packing and size of explicitly laid out types.
    ClassLayoutRow(ClassLayout) {
        /// Field alignment in bytes
        packing_size: u16,
        /// Size of the type in bytes
        class_size: u32,
        /// The type being laid out
        parent: TableIndex<TypeDefRow>,
    }
}

define_row! {
    /// The `FieldLayout` table (0x10) gives explicit field offsets.
    FieldLayoutRow(FieldLayout) {
        /// Byte offset of the field within its type
        offset: u32,
        /// The field
        field: TableIndex<FieldRow>,
    }
}

define_row! {
    /// The `StandAloneSig` table (0x11) holds signatures not attached to a member (locals,
    /// `calli` call sites).
    StandAloneSigRow(StandAloneSig) {
        /// The signature
        signature: BlobIndex,
    }
}

define_row! {
    /// The `TypeSpec` table (0x1B) holds type specifications.
    TypeSpecRow(TypeSpec) {
        /// The type signature
        signature: BlobIndex,
    }
}

define_row! {
    /// The `FieldRVA` table (0x1D) gives the initial data of fields.
    FieldRvaRow(FieldRVA) {
        /// Relative virtual address of the data
        rva: u32,
        /// The field
        field: TableIndex<FieldRow>,
    }
}

define_row! {
    /// The `NestedClass` table (0x29) records which types are nested in which.
    NestedClassRow(NestedClass) {
        /// The nested type
        nested_class: TableIndex<TypeDefRow>,
        /// The enclosing type
        enclosing_class: TableIndex<TypeDefRow>,
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
    fn typedef_short() {
        let data = vec![
            0x00, 0x00, 0x00, 0x01, // flags
            0x42, 0x00, // type_name
            0x43, 0x00, // type_namespace
            0x09, 0x00, // extends
            0x01, 0x00, // field_list
            0x02, 0x00, // method_list
        ];

        let info = TableInfo::new_test(
            &[(TableId::Field, 1), (TableId::MethodDef, 1)],
            false,
            false,
            false,
        );
        assert_eq!(TypeDefRow::row_size(&info), 14);

        let mut cursor = ByteCursor::new(&data);
        let row = TypeDefRow::read_row(&mut cursor, &info).unwrap();
        assert_eq!(row.flags, 0x0100_0000);
        assert_eq!(row.type_name.offset(), 0x42);
        assert_eq!(row.type_namespace.offset(), 0x43);
        assert_eq!(row.extends.raw(), 0x09);
        assert_eq!(row.field_list.raw(), 1);
        assert_eq!(row.method_list.raw(), 2);
        assert!(!cursor.has_more_data());

        let mut sink = ByteSink::new();
        row.write_row(&mut sink, &info).unwrap();
        assert_eq!(sink.as_slice(), data.as_slice());
    }

    #[test]
    fn typedef_long() {
        let data = vec![
            0x00, 0x00, 0x00, 0x01, // flags
            0x00, 0x00, 0x00, 0x02, // type_name
            0x00, 0x00, 0x00, 0x03, // type_namespace
            0x00, 0x00, 0x00, 0x04, // extends
            0x00, 0x00, 0x00, 0x05, // field_list
            0x00, 0x00, 0x00, 0x06, // method_list
        ];

        let info = TableInfo::new_test(
            &[
                (TableId::Field, u16::MAX as u32 + 2),
                (TableId::MethodDef, u16::MAX as u32 + 2),
                (TableId::TypeSpec, 0x4000),
            ],
            true,
            true,
            true,
        );
        assert_eq!(TypeDefRow::row_size(&info), 24);

        let row = TypeDefRow::read_row(&mut ByteCursor::new(&data), &info).unwrap();
        assert_eq!(row.flags, 0x0100_0000);
        assert_eq!(row.type_name.offset(), 0x0200_0000);
        assert_eq!(row.extends.raw(), 0x0400_0000);
        assert_eq!(row.method_list.raw(), 0x0600_0000);
    }

    #[test]
    fn method_def_flags() {
        let mut row = MethodDefRow::default();
        row.flags = 0x0096;
        row.impl_flags = 0x0100;
        assert!(row.attributes().contains(MethodAttributes::HIDE_BY_SIG));
        assert!(row.attributes().contains(MethodAttributes::STATIC));
        assert!(row
            .impl_attributes()
            .contains(MethodImplAttributes::AGGRESSIVE_INLINING));
    }

    #[test]
    fn coded_index_in_row() {
        let mut row = InterfaceImplRow::default();
        row.class.set(2);
        row.interface
            .set(Some(RowRef::new(TableId::TypeRef, 7)))
            .unwrap();
        assert!(row
            .interface
            .set(Some(RowRef::new(TableId::Field, 1)))
            .is_err());
        assert_eq!(row.class.row(), Some(RowRef::new(TableId::TypeDef, 2)));
    }
}
