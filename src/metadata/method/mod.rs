//! CIL method bodies.
//!
//! [`MethodBody`] reads and writes the header, instruction stream and exception sections of a
//! method body. The instruction stream itself goes through [`crate::assembly`]; tokens found in
//! the body (operands, the local variable signature, catch types) are resolved and re-emitted
//! through a [`crate::metadata::token::TokenCodec`].
//!
//! Bodies are usually reached through [`crate::metadata::tables::TableSet::method_body`], which
//! locates the body of a `MethodDef` row by its RVA.

mod body;
mod exceptions;
mod types;

pub use body::MethodBody;
pub use exceptions::{
    ExceptionHandler, ExceptionHandlerFlags, ExceptionHandlerKind, FAT_CLAUSE_SIZE,
    TINY_CLAUSE_SIZE,
};
pub use types::{
    MethodBodyFlags, SectionFlags, FAT_HEADER_DWORDS, TINY_MAX_CODE_SIZE, TINY_MAX_STACK,
};
