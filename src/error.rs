use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds {
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every structural problem found while decoding or encoding metadata is fail-fast: the running
/// operation stops and hands back one of these variants. There is no partial-result mode.
///
/// # Error Categories
///
/// ## Format Errors
/// - [`Error::Malformed`] - Corrupted or invalid structure (bad magic, bad tag, dirty padding, ...)
/// - [`Error::OutOfBounds`] - Attempted to read or write beyond the permitted region
/// - [`Error::InvalidToken`] - A token naming an unknown table or a row past the table end
/// - [`Error::TypeMismatch`] - A value whose declared and actual kinds disagree
/// - [`Error::NotSupported`] - Recognised input this codec does not handle
/// - [`Error::RecursionLimit`] - Signature nesting too deep
///
/// ## Availability Errors
/// - [`Error::Unavailable`] - The source bytes could not be obtained at all
///
/// # Examples
///
/// ```rust
/// use dotcodec::{Error, file::ByteCursor};
///
/// let data = [0x01, 0x02];
/// let mut cursor = ByteCursor::new(&data);
/// match cursor.read_le::<u32>() {
///     Err(Error::OutOfBounds { .. }) => {}
///     other => panic!("unexpected result: {:?}", other),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The data is damaged and could not be decoded, or a value cannot be encoded.
    ///
    /// The error includes the source location where the malformation was detected
    /// for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted.
    ///
    /// Raised for reads that reach past a cursor's read limit, writes that would grow a sink
    /// past its hard limit, and views that do not fit inside their parent.
    #[error("Out of Bound access would have occurred - {file}:{line}")]
    OutOfBounds {
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A token does not name a row of this table set.
    ///
    /// The associated [`Token`] is the offending raw value.
    #[error("Invalid token - {0}")]
    InvalidToken(Token),

    /// A value does not match the type its container declares.
    ///
    /// Raised for constants whose element type and value disagree, for instruction operands that
    /// do not fit their opcode, and for signatures stored in the wrong table.
    #[error("Type mismatch - expected {expected}, found {actual}")]
    TypeMismatch {
        /// The element type the row declares
        expected: String,
        /// The value kind that was supplied
        actual: String,
    },

    /// This input is recognised but not supported.
    ///
    /// Uncompressed (`#-`) table streams and the pointer / edit-and-continue tables
    /// fall into this category.
    #[error("This input is not supported - {0}")]
    NotSupported(String),

    /// Recursion limit reached.
    ///
    /// Signature types may nest (arrays of pointers to generic instances, ...). Nesting deeper
    /// than the configured limit is refused.
    ///
    /// The associated value shows the limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// The source bytes could not be obtained.
    ///
    /// Wraps the I/O failure of the loader. This is not a format error: the data was never
    /// inspected.
    #[error("Source unavailable - {0}")]
    Unavailable(#[from] std::io::Error),
}
