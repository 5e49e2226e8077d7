//! Stable exit codes for the overseer CLI.

/// Report rendered (and posted, when asked).
pub const OK: i32 = 0;
/// Invalid usage, configuration, or an I/O failure outside evidence gathering.
pub const INVALID: i32 = 1;
/// The parent issue could not be fetched.
pub const UNRESOLVED: i32 = 2;
