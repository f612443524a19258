//! Crate-wide error type.
//!
//! Every error is fatal to the operation that raised it. Nothing is rolled back: a failing
//! instruction leaves the machine exactly as far along as it got.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Direction of a bus access, reported by [`Error::Address`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Read => f.write_str("read from"),
            Access::Write => f.write_str("write to"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown register '{0}'")]
    RegisterName(String),
    #[error("{value:#X} does not fit the {bits}-bit {name} register")]
    Range {
        name: &'static str,
        value: u32,
        bits: u32,
    },
    #[error("{access} unmapped address ${addr:04X}")]
    Address { addr: u16, access: Access },
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("bad ROM: {0}")]
    RomFormat(String),
    #[error("trace: {0}")]
    Trace(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Trace(err.to_string())
    }
}
