//! CIL instruction stream decoding.
//!
//! [`decode_stream`] walks a code region linearly and turns it into [`Instruction`]s. Branch
//! deltas are converted to absolute offsets as soon as they are read, and every token operand
//! is resolved through a [`TokenCodec`] so that the caller sees rows and literals rather than
//! raw numbers.
//!
//! ```rust
//! use dotcodec::{
//!     assembly::{decode_stream, OpCode, Operand},
//!     file::ByteCursor,
//!     metadata::token::RawTokens,
//! };
//!
//! // br.s +1, nop, ret
//! let code = [0x2B, 0x01, 0x00, 0x2A];
//! let instructions = decode_stream(&mut ByteCursor::new(&code), &mut RawTokens)?;
//! assert_eq!(instructions.len(), 3);
//! assert_eq!(instructions[0].operand, Operand::Target(3));
//! assert_eq!(instructions[2].opcode, OpCode::Ret);
//! # Ok::<(), dotcodec::Error>(())
//! ```

use crate::{
    assembly::{Immediate, Instruction, OpCode, Operand, OperandType, FE_PREFIX},
    file::ByteCursor,
    metadata::token::{Token, TokenCodec},
    Result,
};

/// Decode every instruction from the current position to the end of `cursor`.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for reserved opcodes and branches before the start of
/// the stream, [`crate::Error::OutOfBounds`] for truncated operands, and the errors of
/// [`TokenCodec::resolve_token`].
pub fn decode_stream(
    cursor: &mut ByteCursor,
    codec: &mut dyn TokenCodec,
) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();
    while cursor.has_more_data() {
        instructions.push(decode_instruction(cursor, codec)?);
    }
    Ok(instructions)
}

/// Decode the instruction at the current position.
///
/// # Errors
/// See [`decode_stream`].
pub fn decode_instruction(
    cursor: &mut ByteCursor,
    codec: &mut dyn TokenCodec,
) -> Result<Instruction> {
    let offset = u32::try_from(cursor.pos())
        .map_err(|_| malformed_error!("Instruction offset {} too large", cursor.pos()))?;

    let first = cursor.read_le::<u8>()?;
    let value = if first == FE_PREFIX {
        0xFE00 | u16::from(cursor.read_le::<u8>()?)
    } else {
        u16::from(first)
    };
    let Some(opcode) = OpCode::from_value(value) else {
        return Err(malformed_error!(
            "Reserved opcode 0x{:X} at offset 0x{:X}",
            value,
            offset
        ));
    };

    let operand = match opcode.operand_type() {
        OperandType::None => Operand::None,
        OperandType::Int8 => Operand::Immediate(Immediate::Int8(cursor.read_le::<i8>()?)),
        OperandType::UInt8 => Operand::Immediate(Immediate::UInt8(cursor.read_le::<u8>()?)),
        OperandType::UInt16 => Operand::Immediate(Immediate::UInt16(cursor.read_le::<u16>()?)),
        OperandType::Int32 => Operand::Immediate(Immediate::Int32(cursor.read_le::<i32>()?)),
        OperandType::Int64 => Operand::Immediate(Immediate::Int64(cursor.read_le::<i64>()?)),
        OperandType::Float32 => Operand::Immediate(Immediate::Float32(cursor.read_le::<f32>()?)),
        OperandType::Float64 => Operand::Immediate(Immediate::Float64(cursor.read_le::<f64>()?)),
        OperandType::Token => {
            let token = Token::new(cursor.read_le::<u32>()?);
            Operand::Token(codec.resolve_token(token)?)
        }
        OperandType::ShortBranch => {
            let delta = i64::from(cursor.read_le::<i8>()?);
            Operand::Target(branch_target(cursor.pos(), delta, offset)?)
        }
        OperandType::Branch => {
            let delta = i64::from(cursor.read_le::<i32>()?);
            Operand::Target(branch_target(cursor.pos(), delta, offset)?)
        }
        OperandType::Switch => {
            let count = cursor.read_le::<u32>()? as usize;
            // Each case needs four bytes; reject counts the stream cannot hold before allocating
            if count > cursor.remaining() / 4 {
                return Err(out_of_bounds_error!());
            }

            let next = cursor.pos() + count * 4;
            let mut targets = Vec::with_capacity(count);
            for _ in 0..count {
                let delta = i64::from(cursor.read_le::<i32>()?);
                targets.push(branch_target(next, delta, offset)?);
            }
            Operand::Switch(targets)
        }
    };

    Ok(Instruction {
        offset,
        opcode,
        operand,
    })
}

/// Absolute target of a delta taken relative to the following instruction at `next`.
fn branch_target(next: usize, delta: i64, at: u32) -> Result<u32> {
    i64::try_from(next)
        .ok()
        .and_then(|next| next.checked_add(delta))
        .and_then(|target| u32::try_from(target).ok())
        .ok_or_else(|| {
            malformed_error!(
                "Branch at offset 0x{:X} targets outside the stream (delta {})",
                at,
                delta
            )
        })
}
