//! The fixed-width metadata token.
//!
//! A token packs a table tag into its high byte and a 1-based row number into the low 24 bits.
//! Instruction operands, signature-less references and exception clause types all use this
//! form. Unlike coded indexes it has no width decision: it is always 4 bytes.
//!
//! The pseudo table `0x70` addresses the user-string heap; its low 24 bits are a heap offset.
//!
//! [`TokenCodec`] is the seam between the instruction codec and whatever owns the tables and
//! heaps: decoding turns every operand token into a [`TokenTarget`], encoding turns it back.

use std::fmt;

use widestring::U16String;

use crate::{metadata::tables::RowRef, Error, Result};

/// Table byte used by `ldstr` tokens to address the user-string heap
pub const USER_STRING_TABLE: u8 = 0x70;

/// A metadata token: `table << 24 | row`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Token(pub u32);

impl Token {
    /// Create a token from its raw value.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Create a token from a table byte and a row (or heap offset).
    ///
    /// Bits of `row` above the 24th are dropped.
    #[must_use]
    pub fn from_parts(table: u8, row: u32) -> Self {
        Token((u32::from(table) << 24) | (row & 0x00FF_FFFF))
    }

    /// The raw 32-bit value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The table byte.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The row (or, for user strings, the heap offset).
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns `true` for the all-zero token.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if this token addresses the user-string heap.
    #[must_use]
    pub fn is_user_string(&self) -> bool {
        self.table() == USER_STRING_TABLE
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// What a token operand refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenTarget {
    /// A row of one of the metadata tables
    Row(RowRef),
    /// A `#US` literal; `offset` is where it was read from, 0 for a new literal
    UserString {
        /// Heap offset the literal was read from
        offset: u32,
        /// The literal
        value: U16String,
    },
}

impl TokenTarget {
    /// The token as it was read, without consulting any heap.
    #[must_use]
    pub fn token(&self) -> Token {
        match self {
            TokenTarget::Row(row) => row.token(),
            TokenTarget::UserString { offset, .. } => Token::from_parts(USER_STRING_TABLE, *offset),
        }
    }
}

/// Resolves operand tokens while decoding and re-emits them while encoding.
pub trait TokenCodec {
    /// Turn a token read from a method body into its target.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidToken`] for row 0, an unknown table or a row past the end
    /// of its table.
    fn resolve_token(&mut self, token: Token) -> Result<TokenTarget>;

    /// Produce the token to write for `target`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidToken`] if the row does not exist, or a heap error if a
    /// literal cannot be added.
    fn emit_token(&mut self, target: &TokenTarget) -> Result<Token>;
}

/// A [`TokenCodec`] without tables or heaps.
///
/// Tokens are only checked for a known table and a non-zero row; literals keep their offset
/// and carry an empty value, so edits to them are not written back.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawTokens;

impl TokenCodec for RawTokens {
    fn resolve_token(&mut self, token: Token) -> Result<TokenTarget> {
        if token.is_user_string() {
            if token.row() == 0 {
                return Err(Error::InvalidToken(token));
            }
            return Ok(TokenTarget::UserString {
                offset: token.row(),
                value: U16String::new(),
            });
        }
        Ok(TokenTarget::Row(RowRef::try_from(token)?))
    }

    fn emit_token(&mut self, target: &TokenTarget) -> Result<Token> {
        Ok(target.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts() {
        let token = Token::new(0x0600_0001);
        assert_eq!(token.table(), 0x06);
        assert_eq!(token.row(), 1);
        assert_eq!(Token::from_parts(0x06, 1), token);
        assert_eq!(Token::from_parts(0x02, 0x0100_0005).row(), 5);
    }

    #[test]
    fn null_and_user_string() {
        assert!(Token::default().is_null());
        assert!(!Token::new(0x0600_0001).is_null());
        assert!(Token::new(0x7000_0010).is_user_string());
        assert!(!Token::new(0x0A00_0010).is_user_string());
    }

    #[test]
    fn conversions() {
        let token: Token = 0x0200_0005_u32.into();
        let back: u32 = token.into();
        assert_eq!(back, 0x0200_0005);
    }

    #[test]
    fn raw_tokens() {
        use crate::metadata::tables::TableId;

        let mut codec = RawTokens;
        let target = codec.resolve_token(Token::new(0x0A00_0003)).unwrap();
        assert_eq!(target, TokenTarget::Row(RowRef::new(TableId::MemberRef, 3)));
        assert_eq!(codec.emit_token(&target).unwrap(), Token::new(0x0A00_0003));

        let literal = codec.resolve_token(Token::new(0x7000_0001)).unwrap();
        assert_eq!(literal.token(), Token::new(0x7000_0001));

        assert!(matches!(
            codec.resolve_token(Token::new(0x0600_0000)),
            Err(Error::InvalidToken(_))
        ));
        assert!(matches!(
            codec.resolve_token(Token::new(0x0300_0001)),
            Err(Error::InvalidToken(_))
        ));
        assert!(codec.resolve_token(Token::new(0x7000_0000)).is_err());
    }

    #[test]
    fn formatting() {
        let token = Token(0x0600_0001);
        assert_eq!(format!("{}", token), "0x06000001");
        let debug = format!("{:?}", token);
        assert!(debug.contains("table: 0x06"));
        assert!(debug.contains("row: 1"));
    }
}
