//! Codec configuration
//!
//! Options controlling how strictly the read pipeline checks its input and which header
//! fields the write pipeline carries over from a decoded table stream.

use crate::metadata::signatures::MAX_RECURSION_DEPTH;

/// Configuration for decoding and re-encoding a table set
///
/// # Example
///
/// ```rust
/// use dotcodec::CodecConfig;
///
/// let config = CodecConfig {
///     write_limit: Some(16 * 1024 * 1024),
///     ..CodecConfig::default()
/// };
/// assert!(config.verify_padding);
/// assert!(!CodecConfig::lenient().verify_heap_flags);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct CodecConfig {
    /// Reject non-zero alignment padding (stream names, method body sections)
    pub verify_padding: bool,

    /// Reject a small heap-size flag on a heap of 0x10000 bytes or more before rows are read
    pub verify_heap_flags: bool,

    /// Re-emit the `sorted` bitset as read; otherwise `sorted` is written equal to `valid`
    pub preserve_sorted: bool,

    /// Hard cap in bytes for every buffer the write pipeline produces
    pub write_limit: Option<usize>,

    /// Maximum nesting depth accepted by the signature parser (default: 50)
    pub max_signature_depth: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            verify_padding: true,
            verify_heap_flags: true,
            preserve_sorted: true,
            write_limit: None,
            max_signature_depth: MAX_RECURSION_DEPTH,
        }
    }
}

impl CodecConfig {
    /// Every check enabled, and `sorted` normalised to `valid` on write
    #[must_use]
    pub fn strict() -> Self {
        Self {
            preserve_sorted: false,
            ..Self::default()
        }
    }

    /// Tolerates dirty padding and undersized heap flags, as some obfuscators produce them
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            verify_padding: false,
            verify_heap_flags: false,
            preserve_sorted: true,
            write_limit: None,
            max_signature_depth: MAX_RECURSION_DEPTH,
        }
    }
}
