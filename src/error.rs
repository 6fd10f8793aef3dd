//! Typed errors for the library layer.
//!
//! Per-artifact failures ([`ClassFileError`]) are counted and skipped by the scanner.
//! Root-level failures ([`ScanError`]) abort a whole scan and carry a fixed
//! [`ErrorCode`] so callers can report them uniformly.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

macro_rules! malformed_error {
    ($msg:expr) => {
        crate::error::ClassFileError::Malformed {
            message: $msg.to_string(),
        }
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::error::ClassFileError::Malformed {
            message: format!($fmt, $($arg)*),
        }
    };
}

pub(crate) use malformed_error;

/// Failure while decoding a single class file.
#[derive(Debug, Error)]
pub enum ClassFileError {
    #[error("not a class file (magic {0:#010x})")]
    BadMagic(u32),

    #[error("unsupported class file version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    #[error("read of {len} bytes at offset {offset} exceeds {available} available bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        available: usize,
    },

    #[error("invalid constant pool reference #{index}: {expected}")]
    InvalidConstant { index: u16, expected: &'static str },

    #[error("malformed class file: {message}")]
    Malformed { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Stable code attached to every root-level scan failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    GetMethodInvokeLinkFail,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::GetMethodInvokeLinkFail => "GET_METHOD_INVOKE_LINK_FAIL",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::GetMethodInvokeLinkFail => "failed to build method invoke links",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failure at or above the root-enumeration boundary. Aborts the whole scan.
#[derive(Debug, Error)]
#[error("[{code}] {}: {root}", code.message())]
pub struct ScanError {
    pub code: ErrorCode,
    pub root: PathBuf,
    #[source]
    pub source: anyhow::Error,
}

impl ScanError {
    pub fn new(root: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        Self {
            code: ErrorCode::GetMethodInvokeLinkFail,
            root: root.into(),
            source: source.into(),
        }
    }
}

/// Invalid ant-style exclusion pattern.
#[derive(Debug, Error)]
#[error("invalid exclusion pattern '{pattern}': {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: globset::Error,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
