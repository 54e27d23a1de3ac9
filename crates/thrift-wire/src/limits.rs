//! Limits and wire constants for decoding.
//!
//! The decoder handles untrusted input; every allocation and every level of
//! recursion it performs is bounded by one of these values.

/// Maximum nesting of structs and containers.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Maximum length of a binary (or string) value in bytes.
pub const MAX_BINARY_LEN: usize = 64 * 1024 * 1024;

/// Maximum element count of a single map, set, or list.
pub const MAX_CONTAINER_LEN: usize = 16 * 1024 * 1024;

/// Upper bound on up-front capacity reserved for a container.
///
/// Larger containers grow as elements are actually decoded.
pub const MAX_PREALLOC_ELEMENTS: usize = 4096;

/// Idle lazy views kept per pool; extra released views are freed.
pub const MAX_IDLE_VIEWS: usize = 1024;

/// Strict envelope version word (high bit set).
pub const VERSION_1: u32 = 0x8001_0000;

/// Mask selecting the version from the first envelope word.
pub const VERSION_MASK: u32 = 0xffff_0000;

/// Mask selecting the message kind from the first envelope word.
pub const ENVELOPE_KIND_MASK: u32 = 0x0000_00ff;

/// Maximum method name length in an envelope.
pub const MAX_METHOD_NAME_LEN: usize = 64 * 1024;

/// Size of the length prefix written for framed replies.
pub const FRAME_HEADER_SIZE: usize = 4;
