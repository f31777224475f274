//! Error taxonomy for the bulk loader.
//!
//! Every error that can occur during a build is fatal to that build: there is
//! no partial recovery, only a clean teardown (see [`crate::build::Orchestrator`]).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoadError>;

/// Where in the input an error occurred, for CLI-friendly reporting.
#[derive(Debug, Clone, Default)]
pub struct ErrorLocation {
    pub file: Option<PathBuf>,
    pub block: Option<usize>,
    pub line_in_block: Option<usize>,
}

impl ErrorLocation {
    pub fn new(file: impl Into<PathBuf>, block: usize, line_in_block: usize) -> Self {
        Self {
            file: Some(file.into()),
            block: Some(block),
            line_in_block: Some(line_in_block),
        }
    }
}

impl std::fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.file, self.block, self.line_in_block) {
            (Some(file), Some(block), Some(line)) => {
                write!(f, "{} (block {block}, line {line})", file.display())
            }
            (Some(file), _, _) => write!(f, "{}", file.display()),
            _ => write!(f, "<unknown location>"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("parse error at {location}: {message}")]
    Parse {
        location: ErrorLocation,
        message: String,
    },

    #[error("schema error: {0}")]
    Schema(String),

    #[error("constraint violation at {location}: {message}")]
    Constraint {
        location: ErrorLocation,
        message: String,
    },

    #[error("compression scheme precondition violated: {0}")]
    Fit(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("descriptor error: {0}")]
    Descriptor(#[from] serde_json::Error),

    #[error("internal error (implementation bug): {0}")]
    Internal(String),
}

impl LoadError {
    pub fn parse(location: ErrorLocation, message: impl Into<String>) -> Self {
        Self::Parse {
            location,
            message: message.into(),
        }
    }

    pub fn constraint(location: ErrorLocation, message: impl Into<String>) -> Self {
        Self::Constraint {
            location,
            message: message.into(),
        }
    }
}
