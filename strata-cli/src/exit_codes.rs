/// Exit codes for CI/automation.
pub const SUCCESS: i32 = 0;
pub const VALIDATION_FAILED: i32 = 2;
pub const CYCLE: i32 = 3;
pub const MISSING_INPUT: i32 = 4;
pub const MISSING_SECRET: i32 = 5;
pub const APPLY_FAILED: i32 = 6;
pub const RUNTIME_ERROR: i32 = 10;
