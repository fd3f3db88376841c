//! CIL instruction stream codec.
//!
//! This module decodes and encodes the instruction stream of a method body (ECMA-335
//! Partition III). It knows nothing about method headers or exception sections; those live in
//! [`crate::metadata::method`], which drives this module.
//!
//! # Key Components
//!
//! - [`OpCode`] - the opcode table with mnemonic, [`OperandType`] and [`FlowType`] per opcode
//! - [`Instruction`] / [`Operand`] - decoded instructions with absolute branch targets
//! - [`decode_stream`] - bytes to instructions, tokens resolved through a
//!   [`crate::metadata::token::TokenCodec`]
//! - [`encode_stream`] - instructions to bytes, with target remapping and short-branch
//!   widening ([`CodeLayout`])

mod decoder;
mod encoder;
mod instruction;
mod opcodes;

pub use decoder::{decode_instruction, decode_stream};
pub use encoder::{encode_stream, CodeLayout, EncodedCode};
pub use instruction::{Immediate, Instruction, Operand};
pub use opcodes::{FlowType, OpCode, OperandType, FE_PREFIX};
