//! Error types shared across the crate, following the teacher's convention of
//! small enums with a hand-written [`Display`]/[`Error`] impl rather than a
//! derive-macro crate.

use std::{error::Error, fmt, path::PathBuf};

/// Raised while validating CLI flags into a [`crate::args::Config`] (§7,
/// "Configuration error"). Always fatal at startup.
#[derive(Debug)]
pub enum ConfigError {
    MissingFile(PathBuf),
    OutputExists(PathBuf),
    InvalidRange { flag: &'static str, value: String },
    InvalidPolyxChars(String),
    UmiLenRequired,
    Other(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingFile(path) => write!(f, "input file does not exist: {}", path.display()),
            ConfigError::OutputExists(path) => write!(
                f,
                "output file already exists and --notoverwrite was given: {}",
                path.display()
            ),
            ConfigError::InvalidRange { flag, value } => write!(f, "`{flag}` is out of range: {value}"),
            ConfigError::InvalidPolyxChars(chars) => {
                write!(f, "poly-X trim characters must be a subset of ATCGN, got `{chars}`")
            }
            ConfigError::UmiLenRequired => write!(f, "--umi_len must be nonzero when --umi_loc selects an in-read location"),
            ConfigError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl Error for ConfigError {}

/// Raised by the FASTQ tokenizer (§4.1, §7 "Malformed record").
#[derive(Debug)]
pub enum FastqError {
    Io(std::io::Error),
    MalformedRecord { offset: u64, reason: &'static str },
    UnequalLengths { offset: u64, seq_len: usize, qual_len: usize },
}

impl fmt::Display for FastqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FastqError::Io(e) => write!(f, "{e}"),
            FastqError::MalformedRecord { offset, reason } => {
                write!(f, "malformed FASTQ record at byte offset {offset}: {reason}")
            }
            FastqError::UnequalLengths {
                offset,
                seq_len,
                qual_len,
            } => write!(
                f,
                "record at byte offset {offset} has sequence length {seq_len} but quality length {qual_len}"
            ),
        }
    }
}

impl Error for FastqError {}

impl From<std::io::Error> for FastqError {
    #[inline]
    fn from(value: std::io::Error) -> Self {
        FastqError::Io(value)
    }
}

impl From<FastqError> for std::io::Error {
    #[inline]
    fn from(value: FastqError) -> Self {
        match value {
            FastqError::Io(e) => e,
            other => std::io::Error::other(other.to_string()),
        }
    }
}
