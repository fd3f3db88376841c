//! CIL instruction stream encoding.
//!
//! The encoder is the mirror of [`crate::assembly::decode_stream`]: absolute branch targets
//! become deltas again and token targets are turned back into tokens through a
//! [`TokenCodec`].
//!
//! # Layout
//!
//! Every instruction remembers the offset it was decoded at, and branch targets name those
//! offsets. Encoding first lays the instructions out again. If every instruction lands where
//! it was decoded the layout is the identity and targets are written unchanged; otherwise each
//! target is looked up in the old-to-new offset map, and a target that does not name an
//! instruction start (or the end of the stream) is an error. The same [`CodeLayout`] remaps
//! exception clause offsets.
//!
//! Short branches keep their form while the delta fits in one byte. A short branch whose new
//! delta does not fit is widened to its long form and the layout is recomputed until it is
//! stable; long branches are never shrunk, so an unmodified stream re-encodes byte for byte.
//!
//! ```rust
//! use dotcodec::{
//!     assembly::{decode_stream, encode_stream},
//!     file::ByteCursor,
//!     metadata::token::RawTokens,
//! };
//!
//! let code = [0x16, 0x2D, 0x01, 0x00, 0x2A]; // ldc.i4.0, brtrue.s +1, nop, ret
//! let instructions = decode_stream(&mut ByteCursor::new(&code), &mut RawTokens)?;
//! let encoded = encode_stream(&instructions, &mut RawTokens)?;
//! assert_eq!(encoded.code, code);
//! # Ok::<(), dotcodec::Error>(())
//! ```

use std::collections::HashMap;

use crate::{
    assembly::{Immediate, Instruction, OpCode, Operand, OperandType, FE_PREFIX},
    file::ByteSink,
    metadata::token::TokenCodec,
    Error, Result,
};

/// Where each instruction lands in an encoded stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLayout {
    offsets: Vec<u32>,
    remap: HashMap<u32, u32>,
    identity: bool,
    len: u32,
}

impl CodeLayout {
    /// Lay out `instructions` with the opcodes in `forms`.
    fn compute(instructions: &[Instruction], forms: &[OpCode]) -> Result<CodeLayout> {
        let mut offsets = Vec::with_capacity(instructions.len());
        let mut remap = HashMap::with_capacity(instructions.len() + 1);
        let mut identity = true;
        let mut position = 0_usize;

        for (instruction, &form) in instructions.iter().zip(forms) {
            let offset = u32::try_from(position)
                .map_err(|_| malformed_error!("Instruction stream exceeds 4 GiB"))?;
            offsets.push(offset);
            remap.entry(instruction.offset).or_insert(offset);
            identity &= instruction.offset == offset;
            position += form_size(instruction, form);
        }

        let len = u32::try_from(position)
            .map_err(|_| malformed_error!("Instruction stream exceeds 4 GiB"))?;
        if let Some(last) = instructions.last() {
            let old_end = u32::try_from(last.size())
                .ok()
                .and_then(|size| last.offset.checked_add(size));
            if let Some(old_end) = old_end {
                remap.entry(old_end).or_insert(len);
            }
        }

        Ok(CodeLayout {
            offsets,
            remap,
            identity,
            len,
        })
    }

    /// New offset of the instruction at `index`.
    #[must_use]
    pub fn offset_of(&self, index: usize) -> Option<u32> {
        self.offsets.get(index).copied()
    }

    /// Length of the encoded stream in bytes.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Returns `true` for an empty stream.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if every instruction kept its decoded offset.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Map an offset of the decoded layout to the new layout.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the layout changed and `offset` is neither an
    /// instruction start nor the end of the stream.
    pub fn remap(&self, offset: u32) -> Result<u32> {
        if self.identity {
            return Ok(offset);
        }
        self.remap.get(&offset).copied().ok_or_else(|| {
            malformed_error!(
                "Offset 0x{:X} does not name an instruction start in the edited stream",
                offset
            )
        })
    }
}

/// An encoded instruction stream and the layout it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCode {
    /// The instruction bytes
    pub code: Vec<u8>,
    /// Offsets of the encoded instructions
    pub layout: CodeLayout,
}

/// Encode `instructions` into a fresh instruction stream.
///
/// # Errors
/// Returns [`crate::Error::TypeMismatch`] if an operand does not fit its opcode,
/// [`crate::Error::Malformed`] for branch targets that cannot be remapped, and the errors of
/// [`TokenCodec::emit_token`].
pub fn encode_stream(
    instructions: &[Instruction],
    codec: &mut dyn TokenCodec,
) -> Result<EncodedCode> {
    let mut forms: Vec<OpCode> = instructions.iter().map(|i| i.opcode).collect();

    // Widening only ever grows the stream, so this settles after at most one pass per branch
    let layout = loop {
        let layout = CodeLayout::compute(instructions, &forms)?;
        let mut widened = false;

        for (index, instruction) in instructions.iter().enumerate() {
            if !forms[index].is_short_branch() {
                continue;
            }
            let Operand::Target(target) = instruction.operand else {
                continue;
            };

            let next = i64::from(layout.offsets[index])
                + form_size(instruction, forms[index]) as i64;
            let delta = i64::from(layout.remap(target)?) - next;
            if i8::try_from(delta).is_err() {
                forms[index] = forms[index].long_form();
                widened = true;
            }
        }

        if !widened {
            break layout;
        }
    };

    let mut sink = ByteSink::new();
    for (index, instruction) in instructions.iter().enumerate() {
        let form = forms[index];
        let next = i64::from(layout.offsets[index]) + form_size(instruction, form) as i64;
        write_opcode(&mut sink, form)?;
        write_operand(&mut sink, instruction, form, next, &layout, codec)?;
    }

    Ok(EncodedCode {
        code: sink.into_inner(),
        layout,
    })
}

/// Size of `instruction` when written with opcode `form`.
fn form_size(instruction: &Instruction, form: OpCode) -> usize {
    let operand = match (form.operand_type().size(), &instruction.operand) {
        (Some(size), _) => size,
        (None, Operand::Switch(targets)) => 4 + 4 * targets.len(),
        (None, _) => 4,
    };
    form.size() + operand
}

fn write_opcode(sink: &mut ByteSink, opcode: OpCode) -> Result<()> {
    let value = opcode.value();
    if value > 0xFF {
        sink.write_le::<u8>(FE_PREFIX)?;
    }
    sink.write_le::<u8>(value.to_le_bytes()[0])
}

fn write_operand(
    sink: &mut ByteSink,
    instruction: &Instruction,
    form: OpCode,
    next: i64,
    layout: &CodeLayout,
    codec: &mut dyn TokenCodec,
) -> Result<()> {
    let expected = form.operand_type();
    match (expected, &instruction.operand) {
        (OperandType::None, Operand::None) => Ok(()),
        (_, Operand::Immediate(value)) if value.operand_type() == expected => match *value {
            Immediate::Int8(v) => sink.write_le(v),
            Immediate::UInt8(v) => sink.write_le(v),
            Immediate::UInt16(v) => sink.write_le(v),
            Immediate::Int32(v) => sink.write_le(v),
            Immediate::Int64(v) => sink.write_le(v),
            Immediate::Float32(v) => sink.write_le(v),
            Immediate::Float64(v) => sink.write_le(v),
        },
        (OperandType::Token, Operand::Token(target)) => {
            let token = codec.emit_token(target)?;
            sink.write_le(token.value())
        }
        (OperandType::ShortBranch, Operand::Target(target)) => {
            let delta = i64::from(layout.remap(*target)?) - next;
            let delta = i8::try_from(delta).map_err(|_| {
                malformed_error!("Short branch delta {} out of range", delta)
            })?;
            sink.write_le(delta)
        }
        (OperandType::Branch, Operand::Target(target)) => {
            sink.write_le(branch_delta(layout.remap(*target)?, next)?)
        }
        (OperandType::Switch, Operand::Switch(targets)) => {
            let count = u32::try_from(targets.len())
                .map_err(|_| malformed_error!("Too many switch targets"))?;
            sink.write_le(count)?;
            for &target in targets {
                sink.write_le(branch_delta(layout.remap(target)?, next)?)?;
            }
            Ok(())
        }
        (expected, actual) => Err(Error::TypeMismatch {
            expected: format!("{} operand of {}", operand_name(expected), form),
            actual: format!("{actual:?}"),
        }),
    }
}

fn branch_delta(target: u32, next: i64) -> Result<i32> {
    let delta = i64::from(target) - next;
    i32::try_from(delta).map_err(|_| malformed_error!("Branch delta {} out of range", delta))
}

fn operand_name(operand: OperandType) -> &'static str {
    match operand {
        OperandType::None => "no",
        OperandType::Int8 => "int8",
        OperandType::UInt8 => "uint8",
        OperandType::UInt16 => "uint16",
        OperandType::Int32 => "int32",
        OperandType::Int64 => "int64",
        OperandType::Float32 => "float32",
        OperandType::Float64 => "float64",
        OperandType::Token => "token",
        OperandType::ShortBranch | OperandType::Branch => "branch target",
        OperandType::Switch => "switch table",
    }
}
