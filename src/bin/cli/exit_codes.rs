//! Exit codes for the CLI tool.

use dsarc::Error;

/// Exit code constants
pub const SUCCESS: i32 = 0;
/// Operation completed with warnings
pub const WARNING: i32 = 1;
/// Fatal error occurred
pub const FATAL_ERROR: i32 = 2;
/// Archive format error
pub const BAD_ARCHIVE: i32 = 3;
/// Folder layout cannot be rebuilt
pub const BAD_FOLDER: i32 = 4;
/// I/O error
pub const IO_ERROR: i32 = 5;
/// Ctrl+C (128 + SIGINT)
pub const USER_INTERRUPT: i32 = 130;
/// Invalid command line arguments
pub const BAD_ARGS: i32 = 255;

/// Exit code enum for structured handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    Warning,
    FatalError,
    BadArchive,
    BadFolder,
    IoError,
    UserInterrupt,
    BadArgs,
}

impl ExitCode {
    /// Returns the numeric exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::Warning => WARNING,
            Self::FatalError => FATAL_ERROR,
            Self::BadArchive => BAD_ARCHIVE,
            Self::BadFolder => BAD_FOLDER,
            Self::IoError => IO_ERROR,
            Self::UserInterrupt => USER_INTERRUPT,
            Self::BadArgs => BAD_ARGS,
        }
    }

    /// Success, or `Warning` when anything was reported along the way
    pub fn from_warnings(count: usize) -> Self {
        if count == 0 {
            Self::Success
        } else {
            Self::Warning
        }
    }
}

/// Converts a dsarc error to an exit code
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    match error {
        Error::Io(_) | Error::DirectoryNotFound(_) => ExitCode::IoError,
        e if e.is_corruption() => ExitCode::BadArchive,
        Error::MissingChunk { .. }
        | Error::MissingSources { .. }
        | Error::UndeterminedArchiveType { .. }
        | Error::ReferenceCycle { .. }
        | Error::InvalidTagLength { .. } => ExitCode::BadFolder,
        Error::UnsupportedChunk { .. } | Error::InvalidArgument(_) => ExitCode::BadArgs,
        Error::Cancelled => ExitCode::UserInterrupt,
        // Future error variants - required by #[non_exhaustive]
        _ => ExitCode::FatalError,
    }
}
