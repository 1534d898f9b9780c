//! Exit codes for the CLI tool.

use arcvfs::Error;

/// Exit code constants
pub const SUCCESS: i32 = 0;
/// Fatal error occurred
pub const FATAL_ERROR: i32 = 2;
/// Path does not resolve
pub const NOT_FOUND: i32 = 3;
/// I/O error
pub const IO_ERROR: i32 = 5;

/// Exit code enum for structured handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    FatalError,
    NotFound,
    IoError,
}

impl ExitCode {
    /// Returns the numeric exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::FatalError => FATAL_ERROR,
            Self::NotFound => NOT_FOUND,
            Self::IoError => IO_ERROR,
        }
    }
}

/// Converts a layer error to an exit code
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    match error {
        e if e.is_not_found() => ExitCode::NotFound,
        Error::Io(_) => ExitCode::IoError,
        _ => ExitCode::FatalError,
    }
}
