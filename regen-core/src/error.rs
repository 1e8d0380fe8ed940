//! Error types for regen-core

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for regen-core
#[derive(Error, Debug)]
pub enum Error {
    // Usage errors (rejected before any I/O)
    #[error("archive file name not specified")]
    MissingPath,

    #[error("redundancy percentage must be between 1 and 99, got {0}")]
    InvalidPercentage(u32),

    #[error("checksum block length must be between 1 and {max}, got {got}", max = u16::MAX)]
    InvalidChecksumBlockLen { got: usize },

    #[error("bruteforce limit must be greater than 0")]
    InvalidBruteforceLimit,

    #[error("archive is empty")]
    EmptyArchive,

    #[error("archive of {size} bytes is too small to split into {parity_blocks} parity strips")]
    ArchiveTooSmall { size: u64, parity_blocks: u64 },

    // Format errors (abort before touching the archive)
    #[error("regen file not found: {0:?}")]
    RedundancyMissing(PathBuf),

    #[error("not a valid regen file")]
    NotRedundancyFile,

    #[error("regen file version {0} not supported. Update the program")]
    UnsupportedVersion(u16),

    #[error(
        "regen file is {actual} bytes, expected {expected} for a {archive_size} byte archive \
         (was the archive resized after generation?)"
    )]
    RedundancyLengthMismatch { actual: u64, expected: u64, archive_size: u64 },

    #[error("error reading hash file {0:?}")]
    DigestMissing(PathBuf),

    #[error("invalid hash file {0:?}")]
    InvalidDigestFile(PathBuf),

    // Aggregate data errors
    #[error("failed blocks: {failed} ({corrected} corrected)")]
    FailedBlocks { failed: usize, corrected: usize },

    // IO errors
    #[error(transparent)]
    Io(#[from] io::Error),
}
