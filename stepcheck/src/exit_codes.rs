//! Stable exit codes for `stepcheck` commands.

/// Every step is implemented, or there was nothing to validate.
pub const OK: i32 = 0;
/// Parse failure, bad config or suite document, or the runner could not start.
pub const INVALID: i32 = 1;
/// At least one step failed validation.
pub const VALIDATION_FAILED: i32 = 2;
