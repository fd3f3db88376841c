//! Header and data-section flags of CIL method bodies (ECMA-335 II.25.4).

use bitflags::bitflags;

/// Largest code size a tiny header can describe
pub const TINY_MAX_CODE_SIZE: usize = 0x3F;

/// Max stack implied by a tiny header
pub const TINY_MAX_STACK: u16 = 8;

/// Size of a fat header in 4-byte units, stored in the top nibble of its first word
pub const FAT_HEADER_DWORDS: u16 = 3;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Flags that a method body can have
    pub struct MethodBodyFlags: u16 {
        /// Method header is tiny (1 byte, code size in the upper six bits)
        const TINY_FORMAT = 0x2;
        /// Method header is fat (12 bytes)
        const FAT_FORMAT = 0x3;
        /// More sections follow after this header
        const MORE_SECTS = 0x8;
        /// Call default constructor on all local variables
        const INIT_LOCALS = 0x10;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Flags that a method body section can have
    pub struct SectionFlags: u8 {
        /// Indicates that this section contains exception handling data
        const EHTABLE = 0x1;
        /// Reserved, shall be 0
        const OPT_ILTABLE = 0x2;
        /// Indicates that the data section format is fat
        const FAT_FORMAT = 0x40;
        /// Indicates that the data section is followed by another one
        const MORE_SECTS = 0x80;
    }
}
