//! The 38 row kinds of a compressed table stream.
//!
//! Each row is declared once through `define_row!`, which derives the row layout, its width
//! under a [`TableInfo`](crate::metadata::tables::TableInfo) and the read, resolve, persist and
//! write folds from the column list. Columns appear in the exact order of ECMA-335 II.22.

/// Declares a row struct and its [`TableRow`](crate::metadata::tables::TableRow) implementation.
macro_rules! define_row {
    (
        $(#[$meta:meta])*
        $name:ident($table:ident) {
            $(
                $(#[$field_meta:meta])*
                $field:ident: $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct $name {
            $(
                $(#[$field_meta])*
                pub $field: $ty,
            )*
        }

        impl $crate::metadata::tables::TableRow for $name {
            const TABLE_ID: $crate::metadata::tables::TableId =
                $crate::metadata::tables::TableId::$table;

            fn row_size(info: &$crate::metadata::tables::TableInfo) -> u32 {
                0 $(+ <$ty as $crate::metadata::tables::Column>::size(info))*
            }

            fn read_row(
                cursor: &mut $crate::file::ByteCursor<'_>,
                info: &$crate::metadata::tables::TableInfo,
            ) -> $crate::Result<Self> {
                Ok($name {
                    $($field: <$ty as $crate::metadata::tables::Column>::read(cursor, info)?,)*
                })
            }

            fn resolve(
                &mut self,
                ctx: &mut $crate::metadata::tables::RowContext<'_>,
            ) -> $crate::Result<()> {
                $($crate::metadata::tables::Column::resolve(&mut self.$field, ctx)?;)*
                Ok(())
            }

            fn persist(
                &mut self,
                ctx: &mut $crate::metadata::tables::RowContext<'_>,
            ) -> $crate::Result<()> {
                $($crate::metadata::tables::Column::persist(&mut self.$field, ctx)?;)*
                Ok(())
            }

            fn write_row(
                &self,
                sink: &mut $crate::file::ByteSink,
                info: &$crate::metadata::tables::TableInfo,
            ) -> $crate::Result<()> {
                $($crate::metadata::tables::Column::write(&self.$field, sink, info)?;)*
                Ok(())
            }

            fn for_each_range(
                &mut self,
                f: &mut dyn FnMut(&mut dyn $crate::metadata::tables::RangeColumn) -> $crate::Result<()>,
            ) -> $crate::Result<()> {
                $($crate::metadata::tables::Column::visit_range(&mut self.$field, f)?;)*
                Ok(())
            }
        }
    };
}

mod assembly;
mod generics;
mod members;
mod typesystem;

pub use assembly::*;
pub use generics::*;
pub use members::*;
pub use typesystem::*;
