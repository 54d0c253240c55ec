use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::common::io_error_msg;

/// Every way a parse can fail. None of these are recoverable: the run is
/// abandoned and the partial output must not be consumed.
#[derive(Debug, Error)]
pub enum PfpError {
    #[error("invalid byte {byte:#04x} at offset {offset} (bytes at or below the sentinel are reserved)")]
    InvalidByte { offset: u64, byte: u8 },

    #[error(
        "hash collision on {hash:#x}: {:?} vs {:?}",
        String::from_utf8_lossy(.stored),
        String::from_utf8_lossy(.found)
    )]
    Collision {
        hash: u64,
        stored: Vec<u8>,
        found: Vec<u8>,
    },

    #[error("maximum number of occurrences ({max}) exceeded for dictionary word {hash:#x}")]
    OccurrenceOverflow { hash: u64, max: u32 },

    #[error("cannot {op} '{}': {}", .path.display(), io_error_msg(.source))]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("internal consistency failure: {0}")]
    Inconsistent(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("scan cancelled after a failure in another thread")]
    Cancelled,
}

impl PfpError {
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        PfpError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// True for the secondary error reported by threads that stopped because
    /// another thread failed first.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PfpError::Cancelled)
    }
}
