//! Error type shared by every stage of a training run.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T, E = WordVecError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum WordVecError {
    /// The configuration can't produce a usable network.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Pruning removed every word, so there is nothing to train.
    #[error("vocabulary is empty after discarding words seen fewer than {min_count} times")]
    EmptyVocabulary { min_count: u64 },

    /// A one-shot step was run out of order, or twice.
    #[error("cannot {action}: expected state {expected}, found {found}")]
    InvalidState {
        action: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("io error while processing {path:?}: {source}")]
    Io { source: io::Error, path: PathBuf },

    /// A vocabulary or vector file that doesn't parse.
    #[error("{path:?}, line {line}: {message}")]
    Format {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl WordVecError {
    pub fn io(source: io::Error, path: &Path) -> Self {
        WordVecError::Io {
            source,
            path: path.to_path_buf(),
        }
    }

    pub fn format(path: &Path, line: usize, message: impl Into<String>) -> Self {
        WordVecError::Format {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }
}

impl From<bincode::Error> for WordVecError {
    fn from(err: bincode::Error) -> Self {
        WordVecError::Serialization(err.to_string())
    }
}
