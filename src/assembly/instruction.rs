//! Decoded CIL instructions.
//!
//! An [`Instruction`] is an [`OpCode`] plus a typed [`Operand`]. Branch and switch operands
//! hold *absolute* offsets from the start of the instruction stream; the wire form (a delta
//! relative to the following instruction) only exists inside the decoder and encoder. Token
//! operands hold the [`TokenTarget`] they were resolved to.

use std::fmt;

use crate::{
    assembly::{FlowType, OpCode, OperandType},
    metadata::token::TokenTarget,
};

/// An immediate value embedded in the instruction stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
    /// Signed 8-bit value
    Int8(i8),
    /// Unsigned 8-bit value
    UInt8(u8),
    /// Unsigned 16-bit value
    UInt16(u16),
    /// Signed 32-bit value
    Int32(i32),
    /// Signed 64-bit value
    Int64(i64),
    /// 32-bit float
    Float32(f32),
    /// 64-bit float
    Float64(f64),
}

impl Immediate {
    /// The operand type this immediate is encoded as.
    #[must_use]
    pub fn operand_type(&self) -> OperandType {
        match self {
            Immediate::Int8(_) => OperandType::Int8,
            Immediate::UInt8(_) => OperandType::UInt8,
            Immediate::UInt16(_) => OperandType::UInt16,
            Immediate::Int32(_) => OperandType::Int32,
            Immediate::Int64(_) => OperandType::Int64,
            Immediate::Float32(_) => OperandType::Float32,
            Immediate::Float64(_) => OperandType::Float64,
        }
    }
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Immediate::Int8(value) => write!(f, "{value}"),
            Immediate::UInt8(value) => write!(f, "{value}"),
            Immediate::UInt16(value) => write!(f, "{value}"),
            Immediate::Int32(value) => write!(f, "{value}"),
            Immediate::Int64(value) => write!(f, "{value}"),
            Immediate::Float32(value) => write!(f, "{value}"),
            Immediate::Float64(value) => write!(f, "{value}"),
        }
    }
}

/// The operand of an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// An immediate value
    Immediate(Immediate),
    /// Absolute branch target offset
    Target(u32),
    /// Absolute jump table targets
    Switch(Vec<u32>),
    /// A resolved metadata token
    Token(TokenTarget),
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Offset from the start of the instruction stream, as decoded
    pub offset: u32,
    /// The opcode
    pub opcode: OpCode,
    /// The operand, shaped by [`OpCode::operand_type`]
    pub operand: Operand,
}

impl Instruction {
    /// Create an instruction without an operand.
    ///
    /// The offset is where the instruction *was* in a decoded stream; for new instructions it
    /// only matters as a branch target key.
    #[must_use]
    pub fn new(offset: u32, opcode: OpCode) -> Self {
        Instruction {
            offset,
            opcode,
            operand: Operand::None,
        }
    }

    /// Create an instruction with an operand.
    #[must_use]
    pub fn with_operand(offset: u32, opcode: OpCode, operand: Operand) -> Self {
        Instruction {
            offset,
            opcode,
            operand,
        }
    }

    /// Control flow behaviour of the opcode.
    #[must_use]
    pub fn flow_type(&self) -> FlowType {
        self.opcode.flow_type()
    }

    /// Encoded size of this instruction in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        let operand = match (&self.operand, self.opcode.operand_type().size()) {
            (Operand::Switch(targets), None) => 4 + 4 * targets.len(),
            (_, Some(size)) => size,
            (_, None) => 4,
        };
        self.opcode.size() + operand
    }

    /// Returns `true` for conditional and unconditional branches, `leave` and `switch`.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(
            self.opcode.operand_type(),
            OperandType::ShortBranch | OperandType::Branch | OperandType::Switch
        )
    }

    /// Absolute offsets this instruction may transfer control to.
    #[must_use]
    pub fn branch_targets(&self) -> Vec<u32> {
        match &self.operand {
            Operand::Target(target) => vec![*target],
            Operand::Switch(targets) => targets.clone(),
            _ => Vec::new(),
        }
    }

    /// The token target, if the operand is a token.
    #[must_use]
    pub fn token(&self) -> Option<&TokenTarget> {
        match &self.operand {
            Operand::Token(target) => Some(target),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04x}: {}", self.offset, self.opcode)?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Immediate(value) => write!(f, " {value}"),
            Operand::Target(target) => write!(f, " IL_{target:04x}"),
            Operand::Switch(targets) => {
                let labels: Vec<String> = targets.iter().map(|t| format!("IL_{t:04x}")).collect();
                write!(f, " ({})", labels.join(", "))
            }
            Operand::Token(TokenTarget::UserString { value, .. }) => {
                write!(f, " \"{}\"", value.to_string_lossy())
            }
            Operand::Token(target) => write!(f, " {}", target.token()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::metadata::tables::{RowRef, TableId};

    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(Instruction::new(0, OpCode::Ret).size(), 1);
        assert_eq!(Instruction::new(0, OpCode::Ceq).size(), 2);
        assert_eq!(
            Instruction::with_operand(0, OpCode::BrS, Operand::Target(4)).size(),
            2
        );
        assert_eq!(
            Instruction::with_operand(0, OpCode::Br, Operand::Target(4)).size(),
            5
        );
        assert_eq!(
            Instruction::with_operand(0, OpCode::Switch, Operand::Switch(vec![1, 2, 3])).size(),
            17
        );
        assert_eq!(
            Instruction::with_operand(0, OpCode::Ldarg, Operand::Immediate(Immediate::UInt16(1)))
                .size(),
            4
        );
    }

    #[test]
    fn targets_and_tokens() {
        let call = Instruction::with_operand(
            3,
            OpCode::Call,
            Operand::Token(TokenTarget::Row(RowRef::new(TableId::MethodDef, 2))),
        );
        assert_eq!(call.flow_type(), FlowType::Call);
        assert!(!call.is_branch());
        assert!(call.branch_targets().is_empty());
        assert_eq!(call.token().unwrap().token().value(), 0x0600_0002);
        assert_eq!(call.to_string(), "IL_0003: call 0x06000002");

        let switch = Instruction::with_operand(0, OpCode::Switch, Operand::Switch(vec![9, 12]));
        assert!(switch.is_branch());
        assert_eq!(switch.branch_targets(), vec![9, 12]);
        assert_eq!(switch.to_string(), "IL_0000: switch (IL_0009, IL_000c)");
    }
}
