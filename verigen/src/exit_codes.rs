//! Stable exit codes for the verigen CLI.

/// Run succeeded, or the spec/config is valid.
pub const OK: i32 = 0;
/// Bad input, config or I/O failure before or outside the loop.
pub const INVALID: i32 = 1;
/// The run ended on repeated unparseable replies.
pub const FAILED_PARSE: i32 = 2;
/// The run used its whole step budget without a final answer.
pub const FAILED_MAX_STEPS: i32 = 3;
/// The run ended on repeated tool errors.
pub const FAILED_TOOL: i32 = 4;
