//! Reading and writing of CIL method bodies.
//!
//! A body is a header, the instruction stream and optional data sections (ECMA-335 II.25.4).
//! The header is either tiny (one byte: code size ≤ 0x3F, max stack 8, no locals, no
//! exception clauses) or fat (12 bytes: flags, max stack, code size, local variable signature
//! token). Data sections start on the next 4-byte boundary after the code and currently only
//! carry exception clauses.
//!
//! # Examples
//!
//! ```rust
//! use dotcodec::{assembly::OpCode, metadata::{method::MethodBody, token::RawTokens}};
//!
//! // Tiny header (code size 2), ldarg.0, ret
//! let data = [0x0A, 0x02, 0x2A];
//! let body = MethodBody::from_bytes(&data, &mut RawTokens)?;
//! assert_eq!(body.max_stack, 8);
//! assert!(!body.fat_header);
//! assert_eq!(body.instructions[1].opcode, OpCode::Ret);
//!
//! assert_eq!(body.encode(&mut RawTokens)?, data);
//! # Ok::<(), dotcodec::Error>(())
//! ```

use crate::{
    assembly::{decode_stream, encode_stream, Instruction},
    file::{ByteCursor, ByteSink},
    metadata::{
        method::{
            ExceptionHandler, MethodBodyFlags, SectionFlags, FAT_CLAUSE_SIZE, FAT_HEADER_DWORDS,
            TINY_CLAUSE_SIZE, TINY_MAX_CODE_SIZE, TINY_MAX_STACK,
        },
        token::{Token, TokenCodec, TokenTarget},
    },
    Result,
};

/// Clauses that fit in a tiny section, whose size field is one byte
const TINY_SECTION_MAX_CLAUSES: usize = (0xFF - 4) / TINY_CLAUSE_SIZE;

/// A decoded method body.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBody {
    /// Maximum number of items on the operand stack
    pub max_stack: u16,
    /// Zero-initialise all locals on entry
    pub init_locals: bool,
    /// The `StandAloneSig` row describing the locals, if any
    pub local_var_sig: Option<TokenTarget>,
    /// The instruction stream
    pub instructions: Vec<Instruction>,
    /// Exception handling clauses, in section order
    pub exception_handlers: Vec<ExceptionHandler>,
    /// Write a fat header even when a tiny one would do
    pub fat_header: bool,
    /// Write fat exception sections even when tiny ones would do
    pub fat_sections: bool,
    /// Size of the header as decoded, in bytes
    pub header_size: usize,
    /// Size of the instruction stream as decoded, in bytes
    pub code_size: usize,
}

impl MethodBody {
    /// An empty body with a tiny-header preference.
    #[must_use]
    pub fn new(instructions: Vec<Instruction>) -> Self {
        MethodBody {
            max_stack: TINY_MAX_STACK,
            init_locals: false,
            local_var_sig: None,
            instructions,
            exception_handlers: Vec::new(),
            fat_header: false,
            fat_sections: false,
            header_size: 0,
            code_size: 0,
        }
    }

    /// Decode a body that starts at the beginning of `data`, checking padding.
    ///
    /// # Errors
    /// See [`MethodBody::read`].
    pub fn from_bytes(data: &[u8], codec: &mut dyn TokenCodec) -> Result<MethodBody> {
        Self::read(&mut ByteCursor::new(data), codec, true)
    }

    /// Decode the body at the cursor position.
    ///
    /// Section alignment is relative to the cursor origin, which must be the body start.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an unknown header format, an undersized fat
    /// header, an unsupported data section or (with `verify_padding`) dirty section padding,
    /// [`crate::Error::OutOfBounds`] if the body runs past the cursor, and the errors of the
    /// instruction decoder and of `codec`.
    pub fn read(
        cursor: &mut ByteCursor,
        codec: &mut dyn TokenCodec,
        verify_padding: bool,
    ) -> Result<MethodBody> {
        let first = cursor.peek_byte()?;

        let format = MethodBodyFlags::from_bits_truncate(u16::from(first & 0b11));
        let (mut body, more_sections) = match format {
            MethodBodyFlags::TINY_FORMAT => {
                cursor.advance_by(1)?;
                let mut body = MethodBody::new(Vec::new());
                body.header_size = 1;
                body.code_size = usize::from(first >> 2);
                (body, false)
            }
            MethodBodyFlags::FAT_FORMAT => {
                let word = cursor.read_le::<u16>()?;
                let dwords = word >> 12;
                if dwords < FAT_HEADER_DWORDS {
                    return Err(malformed_error!(
                        "Fat method header of {} bytes is too small",
                        dwords * 4
                    ));
                }
                let flags = MethodBodyFlags::from_bits_truncate(word & 0x0FFF);

                let max_stack = cursor.read_le::<u16>()?;
                let code_size = cursor.read_le::<u32>()? as usize;
                let local_var_sig = match cursor.read_le::<u32>()? {
                    0 => None,
                    token => Some(codec.resolve_token(Token::new(token))?),
                };
                cursor.advance_by(usize::from(dwords - FAT_HEADER_DWORDS) * 4)?;

                let body = MethodBody {
                    max_stack,
                    init_locals: flags.contains(MethodBodyFlags::INIT_LOCALS),
                    local_var_sig,
                    instructions: Vec::new(),
                    exception_handlers: Vec::new(),
                    fat_header: true,
                    fat_sections: false,
                    header_size: usize::from(dwords) * 4,
                    code_size,
                };
                (body, flags.contains(MethodBodyFlags::MORE_SECTS))
            }
            _ => {
                return Err(malformed_error!(
                    "Method header is neither tiny nor fat - 0x{:02X}",
                    first
                ))
            }
        };

        let code_start = cursor.pos();
        let mut code = cursor.view(code_start, body.code_size)?;
        body.instructions = decode_stream(&mut code, codec)?;
        cursor.advance_by(body.code_size)?;

        if more_sections {
            body.read_sections(cursor, codec, verify_padding)?;
        }
        Ok(body)
    }

    fn read_sections(
        &mut self,
        cursor: &mut ByteCursor,
        codec: &mut dyn TokenCodec,
        verify_padding: bool,
    ) -> Result<()> {
        loop {
            if verify_padding {
                cursor.align(4)?;
            } else {
                cursor.align_unchecked(4)?;
            }

            let kind = SectionFlags::from_bits_retain(cursor.read_le::<u8>()?);
            if !kind.contains(SectionFlags::EHTABLE) || kind.contains(SectionFlags::OPT_ILTABLE) {
                return Err(malformed_error!(
                    "Unsupported method data section kind 0x{:02X}",
                    kind.bits()
                ));
            }

            let fat = kind.contains(SectionFlags::FAT_FORMAT);
            let (size, clause_size) = if fat {
                (cursor.read_u24()? as usize, FAT_CLAUSE_SIZE)
            } else {
                let size = usize::from(cursor.read_le::<u8>()?);
                cursor.advance_by(2)?;
                (size, TINY_CLAUSE_SIZE)
            };
            if size < 4 {
                return Err(malformed_error!(
                    "Exception section of {} bytes is too small",
                    size
                ));
            }

            for _ in 0..(size - 4) / clause_size {
                self.exception_handlers
                    .push(ExceptionHandler::read(cursor, fat, codec)?);
            }
            self.fat_sections |= fat;

            if !kind.contains(SectionFlags::MORE_SECTS) {
                return Ok(());
            }
        }
    }

    /// Encode this body.
    ///
    /// The instruction stream is laid out first; branch targets and clause offsets are remapped
    /// to that layout. A tiny header is written only if the body allows it and
    /// [`MethodBody::fat_header`] is not set; a tiny section likewise only if every clause fits
    /// it and [`MethodBody::fat_sections`] is not set.
    ///
    /// # Errors
    /// Returns the errors of [`crate::assembly::encode_stream`], of clause remapping, and of
    /// `codec` for the local variable signature and catch types.
    pub fn encode(&self, codec: &mut dyn TokenCodec) -> Result<Vec<u8>> {
        let encoded = encode_stream(&self.instructions, codec)?;
        let handlers = self
            .exception_handlers
            .iter()
            .map(|handler| handler.remapped(&encoded.layout))
            .collect::<Result<Vec<_>>>()?;
        let local_var_sig = match &self.local_var_sig {
            Some(target) => codec.emit_token(target)?.value(),
            None => 0,
        };

        let code_size = encoded.code.len();
        let tiny = !self.fat_header
            && code_size <= TINY_MAX_CODE_SIZE
            && local_var_sig == 0
            && handlers.is_empty()
            && self.max_stack <= TINY_MAX_STACK
            && !self.init_locals;

        let mut sink = ByteSink::new();
        if tiny {
            #[allow(clippy::cast_possible_truncation)]
            let header = ((code_size as u8) << 2) | MethodBodyFlags::TINY_FORMAT.bits() as u8;
            sink.write_le::<u8>(header)?;
        } else {
            let mut flags = MethodBodyFlags::FAT_FORMAT;
            flags.set(MethodBodyFlags::MORE_SECTS, !handlers.is_empty());
            flags.set(MethodBodyFlags::INIT_LOCALS, self.init_locals);

            let code_size = u32::try_from(code_size)
                .map_err(|_| malformed_error!("Method code of {} bytes is too large", code_size))?;
            sink.write_le::<u16>(flags.bits() | (FAT_HEADER_DWORDS << 12))?;
            sink.write_le::<u16>(self.max_stack)?;
            sink.write_le::<u32>(code_size)?;
            sink.write_le::<u32>(local_var_sig)?;
        }
        sink.write_bytes(&encoded.code)?;

        if !handlers.is_empty() {
            sink.align(4)?;

            let fat = self.fat_sections
                || handlers.len() > TINY_SECTION_MAX_CLAUSES
                || handlers.iter().any(|handler| !handler.fits_tiny());
            if fat {
                let size = 4 + handlers.len() * FAT_CLAUSE_SIZE;
                let size = u32::try_from(size)
                    .map_err(|_| malformed_error!("Too many exception clauses"))?;
                sink.write_le::<u8>((SectionFlags::EHTABLE | SectionFlags::FAT_FORMAT).bits())?;
                sink.write_u24(size)?;
            } else {
                #[allow(clippy::cast_possible_truncation)]
                let size = (4 + handlers.len() * TINY_CLAUSE_SIZE) as u8;
                sink.write_le::<u8>(SectionFlags::EHTABLE.bits())?;
                sink.write_le::<u8>(size)?;
                sink.write_le::<u16>(0)?;
            }

            for handler in &handlers {
                handler.write(&mut sink, fat, codec)?;
            }
        }

        Ok(sink.into_inner())
    }

    /// Full size of this body as decoded (header and code, without data sections).
    #[must_use]
    pub fn size(&self) -> usize {
        self.header_size + self.code_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{OpCode, Operand},
        metadata::{
            method::ExceptionHandlerKind,
            tables::{RowRef, TableId},
            token::RawTokens,
        },
        Error,
    };

    /// Fat header, try/catch, tiny exception section
    #[rustfmt::skip]
    const TRY_CATCH: [u8; 40] = [
        0x1B, 0x30,             // fat | more sects | init locals, 3 dwords
        0x02, 0x00,             // max stack
        0x09, 0x00, 0x00, 0x00, // code size
        0x01, 0x00, 0x00, 0x11, // StandAloneSig 1
        0x00,                   // 0: nop
        0xDE, 0x05,             // 1: leave.s -> 8
        0x26,                   // 3: pop
        0xDE, 0x02,             // 4: leave.s -> 8
        0x00,                   // 6: nop
        0x00,                   // 7: nop
        0x2A,                   // 8: ret
        0x00, 0x00, 0x00,       // padding
        0x01, 0x10, 0x00, 0x00, // tiny EH section, 16 bytes
        0x00, 0x00,             // catch
        0x00, 0x00, 0x03,       // try 0..3
        0x03, 0x00, 0x03,       // handler 3..6
        0x01, 0x00, 0x00, 0x01, // TypeRef 1
    ];

    #[test]
    fn tiny() {
        let body = MethodBody::from_bytes(&[0x0A, 0x02, 0x2A], &mut RawTokens).unwrap();
        assert_eq!(body.header_size, 1);
        assert_eq!(body.code_size, 2);
        assert_eq!(body.size(), 3);
        assert_eq!(body.max_stack, 8);
        assert!(body.local_var_sig.is_none());
        assert!(body.exception_handlers.is_empty());
    }

    #[test]
    fn fat_with_handlers() {
        let body = MethodBody::from_bytes(&TRY_CATCH, &mut RawTokens).unwrap();
        assert!(body.fat_header);
        assert!(!body.fat_sections);
        assert!(body.init_locals);
        assert_eq!(body.max_stack, 2);
        assert_eq!(body.header_size, 12);
        assert_eq!(body.code_size, 9);
        assert_eq!(
            body.local_var_sig,
            Some(TokenTarget::Row(RowRef::new(TableId::StandAloneSig, 1)))
        );
        assert_eq!(body.instructions.len(), 7);
        assert_eq!(body.instructions[1].operand, Operand::Target(8));

        assert_eq!(body.exception_handlers.len(), 1);
        let handler = &body.exception_handlers[0];
        assert_eq!(
            handler.kind,
            ExceptionHandlerKind::Catch(TokenTarget::Row(RowRef::new(TableId::TypeRef, 1)))
        );
        assert_eq!((handler.try_offset, handler.try_length), (0, 3));
        assert_eq!((handler.handler_offset, handler.handler_length), (3, 3));

        assert_eq!(body.encode(&mut RawTokens).unwrap(), TRY_CATCH);
    }

    #[test]
    fn edits_remap_clauses() {
        let mut body = MethodBody::from_bytes(&TRY_CATCH, &mut RawTokens).unwrap();
        body.instructions
            .insert(0, Instruction::new(u32::MAX, OpCode::Nop));

        let encoded = body.encode(&mut RawTokens).unwrap();
        let again = MethodBody::from_bytes(&encoded, &mut RawTokens).unwrap();
        assert_eq!(again.code_size, 10);
        assert_eq!(again.instructions[2].operand, Operand::Target(9));
        assert_eq!(again.instructions[4].operand, Operand::Target(9));

        let handler = &again.exception_handlers[0];
        assert_eq!((handler.try_offset, handler.try_length), (1, 3));
        assert_eq!((handler.handler_offset, handler.handler_length), (4, 3));
    }

    #[test]
    fn preferences() {
        // A fat header is kept for a body that would fit a tiny one
        let mut body = MethodBody::from_bytes(&TRY_CATCH, &mut RawTokens).unwrap();
        body.exception_handlers.clear();
        body.local_var_sig = None;
        body.init_locals = false;
        let encoded = body.encode(&mut RawTokens).unwrap();
        assert_eq!(encoded.len(), 12 + 9);
        assert_eq!(encoded[0] & 0x3, 0x3);

        body.fat_header = false;
        let encoded = body.encode(&mut RawTokens).unwrap();
        assert_eq!(encoded.len(), 1 + 9);
        assert_eq!(encoded[0], (9 << 2) | 0x2);

        // More than 8 stack slots forces a fat header
        body.max_stack = 9;
        assert_eq!(body.encode(&mut RawTokens).unwrap().len(), 12 + 9);

        // Fat sections on request
        let mut body = MethodBody::from_bytes(&TRY_CATCH, &mut RawTokens).unwrap();
        body.fat_sections = true;
        let encoded = body.encode(&mut RawTokens).unwrap();
        assert_eq!(encoded.len(), 24 + 4 + 24);
        assert_eq!(encoded[24], 0x41);
        let again = MethodBody::from_bytes(&encoded, &mut RawTokens).unwrap();
        assert!(again.fat_sections);
        assert_eq!(again.exception_handlers, body.exception_handlers);
    }

    #[test]
    fn padding() {
        let mut data = TRY_CATCH;
        data[22] = 0xCC;
        assert!(matches!(
            MethodBody::from_bytes(&data, &mut RawTokens),
            Err(Error::Malformed { .. })
        ));

        let body = MethodBody::read(&mut ByteCursor::new(&data), &mut RawTokens, false).unwrap();
        assert_eq!(body.exception_handlers.len(), 1);
    }

    #[test]
    fn malformed() {
        // neither tiny nor fat
        assert!(MethodBody::from_bytes(&[0x01, 0x2A], &mut RawTokens).is_err());
        // fat header claiming 8 bytes
        assert!(MethodBody::from_bytes(
            &[0x03, 0x20, 0x08, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2A],
            &mut RawTokens
        )
        .is_err());
        // code runs past the data
        assert!(matches!(
            MethodBody::from_bytes(&[0x0E, 0x2A], &mut RawTokens),
            Err(Error::OutOfBounds { .. })
        ));
    }
}
