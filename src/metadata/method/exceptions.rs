//! Exception handling clauses of CIL method bodies.
//!
//! Clauses live in the data sections that follow the instruction stream (ECMA-335 II.25.4.6).
//! A section is either tiny (12-byte clauses with 16-bit offsets and 8-bit lengths) or fat
//! (24-byte clauses with 32-bit fields). The last field of a clause is the catch type token for
//! a typed handler, the filter offset for a filter handler, and unused otherwise.

use bitflags::bitflags;

use crate::{
    assembly::CodeLayout,
    file::{ByteCursor, ByteSink},
    metadata::token::{Token, TokenCodec, TokenTarget},
    Result,
};

/// Size of a tiny clause in bytes
pub const TINY_CLAUSE_SIZE: usize = 12;

/// Size of a fat clause in bytes
pub const FAT_CLAUSE_SIZE: usize = 24;

bitflags! {
    /// Exception handler flags defining the type of exception handling clause.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExceptionHandlerFlags: u16 {
        /// A typed exception clause
        const EXCEPTION = 0x0000;
        /// An exception filter and handler clause
        const FILTER = 0x0001;
        /// A finally clause
        const FINALLY = 0x0002;
        /// A fault clause (finally that executes only on exception)
        const FAULT = 0x0004;
    }
}

/// What a handler does once its protected region throws.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExceptionHandlerKind {
    /// Catches exceptions of the given type
    Catch(TokenTarget),
    /// Runs the filter block at `filter_offset` to decide
    Filter {
        /// Absolute offset of the filter block
        filter_offset: u32,
    },
    /// Always runs when the protected region is left
    Finally,
    /// Runs only when the protected region throws
    Fault,
}

/// One exception handling clause.
///
/// Offsets are absolute offsets into the instruction stream, in the same coordinates as
/// branch targets.
///
/// ```text
/// try {
///     // try_offset .. try_offset + try_length
/// }
/// catch (Type) {
///     // handler_offset .. handler_offset + handler_length
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Handler type, with the catch type or filter offset
    pub kind: ExceptionHandlerKind,
    /// Start of the protected region
    pub try_offset: u32,
    /// Length of the protected region in bytes
    pub try_length: u32,
    /// Start of the handler block
    pub handler_offset: u32,
    /// Length of the handler block in bytes
    pub handler_length: u32,
}

impl ExceptionHandler {
    /// The flags word this clause is encoded with.
    #[must_use]
    pub fn flags(&self) -> ExceptionHandlerFlags {
        match self.kind {
            ExceptionHandlerKind::Catch(_) => ExceptionHandlerFlags::EXCEPTION,
            ExceptionHandlerKind::Filter { .. } => ExceptionHandlerFlags::FILTER,
            ExceptionHandlerKind::Finally => ExceptionHandlerFlags::FINALLY,
            ExceptionHandlerKind::Fault => ExceptionHandlerFlags::FAULT,
        }
    }

    /// Returns `true` if every field fits the tiny clause encoding.
    #[must_use]
    pub fn fits_tiny(&self) -> bool {
        self.try_offset <= 0xFFFF
            && self.try_length <= 0xFF
            && self.handler_offset <= 0xFFFF
            && self.handler_length <= 0xFF
    }

    /// Read one clause.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for unknown clause flags,
    /// [`crate::Error::OutOfBounds`] for a truncated clause, and the errors of
    /// [`TokenCodec::resolve_token`] for the catch type.
    pub fn read(
        cursor: &mut ByteCursor,
        fat: bool,
        codec: &mut dyn TokenCodec,
    ) -> Result<ExceptionHandler> {
        let (flags, try_offset, try_length, handler_offset, handler_length) = if fat {
            (
                cursor.read_le::<u32>()?,
                cursor.read_le::<u32>()?,
                cursor.read_le::<u32>()?,
                cursor.read_le::<u32>()?,
                cursor.read_le::<u32>()?,
            )
        } else {
            (
                u32::from(cursor.read_le::<u16>()?),
                u32::from(cursor.read_le::<u16>()?),
                u32::from(cursor.read_le::<u8>()?),
                u32::from(cursor.read_le::<u16>()?),
                u32::from(cursor.read_le::<u8>()?),
            )
        };
        let last = cursor.read_le::<u32>()?;

        let kind = match flags {
            0x0000 => ExceptionHandlerKind::Catch(codec.resolve_token(Token::new(last))?),
            0x0001 => ExceptionHandlerKind::Filter {
                filter_offset: last,
            },
            0x0002 => ExceptionHandlerKind::Finally,
            0x0004 => ExceptionHandlerKind::Fault,
            other => {
                return Err(malformed_error!(
                    "Invalid exception clause flags 0x{:X}",
                    other
                ))
            }
        };

        Ok(ExceptionHandler {
            kind,
            try_offset,
            try_length,
            handler_offset,
            handler_length,
        })
    }

    /// This clause with every offset moved to the new layout of its instruction stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a region boundary does not name an instruction
    /// start of the new layout.
    pub fn remapped(&self, layout: &CodeLayout) -> Result<ExceptionHandler> {
        let (try_offset, try_length) = remap_region(layout, self.try_offset, self.try_length)?;
        let (handler_offset, handler_length) =
            remap_region(layout, self.handler_offset, self.handler_length)?;
        let kind = match &self.kind {
            ExceptionHandlerKind::Filter { filter_offset } => ExceptionHandlerKind::Filter {
                filter_offset: layout.remap(*filter_offset)?,
            },
            other => other.clone(),
        };

        Ok(ExceptionHandler {
            kind,
            try_offset,
            try_length,
            handler_offset,
            handler_length,
        })
    }

    /// Write this clause in tiny or fat form.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a field does not fit the tiny form, and the
    /// errors of [`TokenCodec::emit_token`] for the catch type.
    pub fn write(&self, sink: &mut ByteSink, fat: bool, codec: &mut dyn TokenCodec) -> Result<()> {
        let flags = self.flags().bits();
        if fat {
            sink.write_le::<u32>(u32::from(flags))?;
            sink.write_le::<u32>(self.try_offset)?;
            sink.write_le::<u32>(self.try_length)?;
            sink.write_le::<u32>(self.handler_offset)?;
            sink.write_le::<u32>(self.handler_length)?;
        } else {
            if !self.fits_tiny() {
                return Err(malformed_error!(
                    "Exception clause at 0x{:X} does not fit the tiny form",
                    self.try_offset
                ));
            }
            sink.write_le::<u16>(flags)?;
            sink.write_le::<u16>(narrow(self.try_offset))?;
            sink.write_le::<u8>(narrow(self.try_length))?;
            sink.write_le::<u16>(narrow(self.handler_offset))?;
            sink.write_le::<u8>(narrow(self.handler_length))?;
        }

        let last = match &self.kind {
            ExceptionHandlerKind::Catch(target) => codec.emit_token(target)?.value(),
            ExceptionHandlerKind::Filter { filter_offset } => *filter_offset,
            ExceptionHandlerKind::Finally | ExceptionHandlerKind::Fault => 0,
        };
        sink.write_le::<u32>(last)
    }
}

/// Remap `offset .. offset + length` and return the new start and length.
fn remap_region(layout: &CodeLayout, offset: u32, length: u32) -> Result<(u32, u32)> {
    let end = offset
        .checked_add(length)
        .ok_or_else(|| malformed_error!("Exception region at 0x{:X} overflows", offset))?;
    let new_offset = layout.remap(offset)?;
    let new_end = layout.remap(end)?;
    let new_length = new_end.checked_sub(new_offset).ok_or_else(|| {
        malformed_error!("Exception region at 0x{:X} ends before it starts", offset)
    })?;
    Ok((new_offset, new_length))
}

/// Truncate a value already checked by [`ExceptionHandler::fits_tiny`].
fn narrow<T: TryFrom<u32> + Default>(value: u32) -> T {
    T::try_from(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        tables::{RowRef, TableId},
        token::RawTokens,
    };

    #[test]
    fn tiny_catch() {
        #[rustfmt::skip]
        let data = [
            0x00, 0x00,             // flags: exception
            0x01, 0x00,             // try offset
            0x0A,                   // try length
            0x0B, 0x00,             // handler offset
            0x06,                   // handler length
            0x05, 0x00, 0x00, 0x01, // TypeRef 5
        ];
        let mut cursor = ByteCursor::new(&data);
        let handler = ExceptionHandler::read(&mut cursor, false, &mut RawTokens).unwrap();
        assert_eq!(
            handler.kind,
            ExceptionHandlerKind::Catch(TokenTarget::Row(RowRef::new(TableId::TypeRef, 5)))
        );
        assert_eq!(handler.try_offset, 1);
        assert_eq!(handler.try_length, 10);
        assert_eq!(handler.handler_offset, 11);
        assert_eq!(handler.handler_length, 6);
        assert_eq!(handler.flags(), ExceptionHandlerFlags::EXCEPTION);

        let mut sink = ByteSink::new();
        handler.write(&mut sink, false, &mut RawTokens).unwrap();
        assert_eq!(sink.as_slice(), &data);
    }

    #[test]
    fn fat_filter_and_finally() {
        let mut data = Vec::new();
        for value in [1_u32, 0x100, 0x20, 0x140, 0x10, 0x120] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        let mut cursor = ByteCursor::new(&data);
        let handler = ExceptionHandler::read(&mut cursor, true, &mut RawTokens).unwrap();
        assert_eq!(
            handler.kind,
            ExceptionHandlerKind::Filter {
                filter_offset: 0x120
            }
        );
        assert!(handler.fits_tiny());

        let mut sink = ByteSink::new();
        handler.write(&mut sink, true, &mut RawTokens).unwrap();
        assert_eq!(sink.as_slice(), data.as_slice());

        let finally = ExceptionHandler {
            kind: ExceptionHandlerKind::Finally,
            try_offset: 0,
            try_length: 0x1_0000,
            handler_offset: 0,
            handler_length: 1,
        };
        assert!(!finally.fits_tiny());
        let mut sink = ByteSink::new();
        assert!(finally.write(&mut sink, false, &mut RawTokens).is_err());
    }

    #[test]
    fn invalid_flags() {
        let data = [0x03, 0x00, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let mut cursor = ByteCursor::new(&data);
        assert!(matches!(
            ExceptionHandler::read(&mut cursor, false, &mut RawTokens),
            Err(crate::Error::Malformed { .. })
        ));
    }
}
