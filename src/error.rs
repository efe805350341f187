//! Error kinds produced by the filesystem core.
//!
//! User-facing commands report these to stderr and move on (the process
//! exits with status `0`, per the CLI contract); a handful of kinds are
//! treated as programmer errors or fatal conditions and abort the process
//! instead, matching the original tool's `abort()` calls on corruption.

use std::fmt;
use std::io;
use std::process::exit;

/// An error produced while operating on a volume.
#[derive(Debug)]
pub enum VolumeError {
    /// The underlying device read/write failed.
    Io(io::Error),
    /// The superblock signature did not read `_ECH_FS_`.
    BadSignature,
    /// `image_size % block_size != 0`.
    MisalignedImage,
    /// The declared block count in the superblock does not match
    /// `image_size / block_size`. Non-fatal; reported as a warning.
    DeclaredCountMismatch { declared: u64, actual: u64 },
    /// A directory table access fell outside the directory region.
    OutOfBoundsDirectory,
    /// The requested path does not name an existing entry.
    NotFound,
    /// The requested path already names an entry of the requested type.
    AlreadyExists,
    /// The host source path is not a regular file.
    NotARegularFile,
    /// A required command-line argument was not supplied.
    MissingArgument(&'static str),
    /// The requested block size is invalid (not a positive multiple of 512).
    InvalidBlockSize,
    /// The host failed to provide memory for an allocation-heavy operation.
    AllocationFailure,
}

impl fmt::Display for VolumeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::BadSignature => write!(f, "echidnaFS signature missing"),
            Self::MisalignedImage => write!(f, "image is not block-aligned"),
            Self::DeclaredCountMismatch { declared, actual } => write!(
                f,
                "declared block count mismatch: declared {declared}, actual {actual}"
            ),
            Self::OutOfBoundsDirectory => write!(f, "attempted to access directory table out of bounds"),
            Self::NotFound => write!(f, "no such file or directory"),
            Self::AlreadyExists => write!(f, "already exists"),
            Self::NotARegularFile => write!(f, "not a regular file"),
            Self::MissingArgument(name) => write!(f, "missing argument: {name}"),
            Self::InvalidBlockSize => write!(f, "block size must be a positive multiple of 512"),
            Self::AllocationFailure => write!(f, "allocation failure"),
        }
    }
}

impl std::error::Error for VolumeError {}

impl From<io::Error> for VolumeError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Shorthand used throughout the core.
pub type Result<T> = std::result::Result<T, VolumeError>;

/// Prints a usage/argument error to stderr and exits with a non-zero
/// status, the same `bin: error: msg` shape as a malformed invocation of
/// the original tool.
pub fn cli_error<M: fmt::Display>(bin: &str, msg: M) -> ! {
    eprintln!("{bin}: error: {msg}");
    exit(1);
}

/// Whether an error should abort the process outright rather than being
/// reported and letting the command return.
///
/// Mirrors the C original's `abort()` calls for signature/alignment/bounds
/// violations and host memory exhaustion.
impl VolumeError {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::BadSignature
                | Self::MisalignedImage
                | Self::OutOfBoundsDirectory
                | Self::AllocationFailure
        )
    }
}
