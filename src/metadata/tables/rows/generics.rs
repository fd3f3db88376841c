//! Rows of generic parameters and instantiations.

use crate::metadata::tables::{
    kind, BlobIndex, CodedIndex, GenericParamAttributes, StringIndex, TableIndex,
};

define_row! {
    /// The `GenericParam` table (0x2A) defines the generic parameters of types and methods.
    GenericParamRow(GenericParam) {
        /// Position of the parameter, numbered from 0
        number: u16,
        /// A 2-byte bitmask of type [`GenericParamAttributes`]
        flags: u16,
        /// The generic type or method
        owner: CodedIndex<kind::TypeOrMethodDef>,
        /// The parameter name
        name: StringIndex,
    }
}

impl GenericParamRow {
    /// The generic parameter attributes
    #[must_use]
    pub fn attributes(&self) -> GenericParamAttributes {
        GenericParamAttributes::from_bits_retain(self.flags)
    }
}

define_row! {
    /// The `MethodSpec` table (0x2B) instantiates generic methods.
    MethodSpecRow(MethodSpec) {
        /// The generic method
        method: CodedIndex<kind::MethodDefOrRef>,
        /// The instantiation signature
        instantiation: BlobIndex,
    }
}

define_row! {
    /// The `GenericParamConstraint` table (0x2C) constrains generic parameters.
    GenericParamConstraintRow(GenericParamConstraint) {
        /// The constrained parameter
        owner: TableIndex<GenericParamRow>,
        /// The required base type or interface
        constraint: CodedIndex<kind::TypeDefOrRef>,
    }
}
