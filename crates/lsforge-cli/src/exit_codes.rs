//! Process exit codes. Kept in one place so every command agrees.
//!
//! | Code | Meaning                   |
//! |------|---------------------------|
//! | 0    | Success                   |
//! | 1    | Generic failure           |
//! | 2    | Invalid arguments (clap)  |
//! | 3    | Missing external tool     |
//! | 4    | Cancelled                 |

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
#[allow(dead_code)] // clap produces this one itself on parse errors
pub const USAGE: i32 = 2;
pub const TOOL_MISSING: i32 = 3;
pub const CANCELLED: i32 = 4;
