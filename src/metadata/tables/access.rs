//! The container of all 38 tables and type-safe access to them.
//!
//! [`Tables`] holds one [`Table`] per row kind; absent kinds are empty tables, never missing.
//! Code that knows the row type uses [`TableAccess`]:
//!
//! ```rust
//! use dotcodec::metadata::tables::{TableAccess, Tables, TypeRefRow};
//!
//! let mut tables = Tables::default();
//! let table: &mut dotcodec::metadata::tables::Table<TypeRefRow> = tables.table_mut();
//! table.push(TypeRefRow::default())?;
//! assert_eq!(TableAccess::<TypeRefRow>::table(&tables).len(), 1);
//! # Ok::<(), dotcodec::Error>(())
//! ```
//!
//! The pipelines drive every table through the object-safe [`AnyTable`] view returned by
//! [`Tables::get`] / [`Tables::get_mut`], and [`Tables::row`] returns a [`RowData`] for any
//! [`RowRef`].

use crate::metadata::tables::{
    AnyTable, AssemblyOsRow, AssemblyProcessorRow, AssemblyRefOsRow, AssemblyRefProcessorRow,
    AssemblyRefRow, AssemblyRow, ClassLayoutRow, ConstantRow, CustomAttributeRow,
    DeclSecurityRow, EventMapRow, EventRow, ExportedTypeRow, FieldLayoutRow, FieldMarshalRow,
    FieldRow, FieldRvaRow, FileRow, GenericParamConstraintRow, GenericParamRow, ImplMapRow,
    InterfaceImplRow, ManifestResourceRow, MemberRefRow, MethodDefRow, MethodImplRow,
    MethodSemanticsRow, MethodSpecRow, ModuleRefRow, ModuleRow, NestedClassRow, ParamRow,
    PropertyMapRow, PropertyRow, RowRef, StandAloneSigRow, Table, TableId, TableRow,
    TypeDefRow, TypeRefRow, TypeSpecRow,
};

/// Typed access to the table holding rows of kind `T`.
pub trait TableAccess<T: TableRow> {
    /// The table of `T` rows.
    fn table(&self) -> &Table<T>;

    /// The table of `T` rows, mutable.
    fn table_mut(&mut self) -> &mut Table<T>;
}

macro_rules! define_tables {
    ($(($field:ident, $row:ty, $variant:ident)),* $(,)?) => {
        /// One table per row kind.
        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct Tables {
            $(
                #[doc = concat!("The `", stringify!($variant), "` table")]
                pub $field: Table<$row>,
            )*
        }

        /// A borrowed row of any kind.
        #[derive(Clone, Copy, Debug, PartialEq)]
        #[allow(missing_docs)]
        pub enum RowData<'a> {
            $($variant(&'a $row),)*
        }

        impl RowData<'_> {
            /// The table the row belongs to.
            #[must_use]
            pub fn table(&self) -> TableId {
                match self {
                    $(RowData::$variant(_) => TableId::$variant,)*
                }
            }
        }

        impl Tables {
            /// Object-safe view of table `id`.
            #[must_use]
            pub fn get(&self, id: TableId) -> &dyn AnyTable {
                match id {
                    $(TableId::$variant => &self.$field,)*
                }
            }

            /// Mutable object-safe view of table `id`.
            pub fn get_mut(&mut self, id: TableId) -> &mut dyn AnyTable {
                match id {
                    $(TableId::$variant => &mut self.$field,)*
                }
            }

            /// The row `target` points at, `None` if it is past the end of its table.
            #[must_use]
            pub fn row(&self, target: RowRef) -> Option<RowData<'_>> {
                match target.table {
                    $(TableId::$variant => self.$field.get(target.rid).map(RowData::$variant),)*
                }
            }
        }

        $(
            impl TableAccess<$row> for Tables {
                fn table(&self) -> &Table<$row> {
                    &self.$field
                }

                fn table_mut(&mut self) -> &mut Table<$row> {
                    &mut self.$field
                }
            }
        )*
    };
}

define_tables!(
    (module, ModuleRow, Module),
    (type_ref, TypeRefRow, TypeRef),
    (type_def, TypeDefRow, TypeDef),
    (field, FieldRow, Field),
    (method_def, MethodDefRow, MethodDef),
    (param, ParamRow, Param),
    (interface_impl, InterfaceImplRow, InterfaceImpl),
    (member_ref, MemberRefRow, MemberRef),
    (constant, ConstantRow, Constant),
    (custom_attribute, CustomAttributeRow, CustomAttribute),
    (field_marshal, FieldMarshalRow, FieldMarshal),
    (decl_security, DeclSecurityRow, DeclSecurity),
    (class_layout, ClassLayoutRow, ClassLayout),
    (field_layout, FieldLayoutRow, FieldLayout),
    (stand_alone_sig, StandAloneSigRow, StandAloneSig),
    (event_map, EventMapRow, EventMap),
    (event, EventRow, Event),
    (property_map, PropertyMapRow, PropertyMap),
    (property, PropertyRow, Property),
    (method_semantics, MethodSemanticsRow, MethodSemantics),
    (method_impl, MethodImplRow, MethodImpl),
    (module_ref, ModuleRefRow, ModuleRef),
    (type_spec, TypeSpecRow, TypeSpec),
    (impl_map, ImplMapRow, ImplMap),
    (field_rva, FieldRvaRow, FieldRVA),
    (assembly, AssemblyRow, Assembly),
    (assembly_processor, AssemblyProcessorRow, AssemblyProcessor),
    (assembly_os, AssemblyOsRow, AssemblyOS),
    (assembly_ref, AssemblyRefRow, AssemblyRef),
    (assembly_ref_processor, AssemblyRefProcessorRow, AssemblyRefProcessor),
    (assembly_ref_os, AssemblyRefOsRow, AssemblyRefOS),
    (file, FileRow, File),
    (exported_type, ExportedTypeRow, ExportedType),
    (manifest_resource, ManifestResourceRow, ManifestResource),
    (nested_class, NestedClassRow, NestedClass),
    (generic_param, GenericParamRow, GenericParam),
    (method_spec, MethodSpecRow, MethodSpec),
    (generic_param_constraint, GenericParamConstraintRow, GenericParamConstraint),
);

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn every_id_maps_to_its_table() {
        let tables = Tables::default();
        for id in TableId::iter() {
            assert_eq!(tables.get(id).id(), id);
            assert_eq!(tables.get(id).row_count(), 0);
        }
    }

    #[test]
    fn row_lookup() {
        let mut tables = Tables::default();
        let mut row = ParamRow::default();
        row.sequence = 3;
        TableAccess::<ParamRow>::table_mut(&mut tables)
            .push(row.clone())
            .unwrap();

        let found = tables.row(RowRef::new(TableId::Param, 1)).unwrap();
        assert_eq!(found, RowData::Param(&row));
        assert_eq!(found.table(), TableId::Param);
        assert!(tables.row(RowRef::new(TableId::Param, 2)).is_none());
        assert!(tables.row(RowRef::new(TableId::Field, 1)).is_none());
    }
}
