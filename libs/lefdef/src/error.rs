//! DEF parser error types.

use std::path::PathBuf;

/// A result whose error type is [`ParseError`].
pub type Result<T> = std::result::Result<T, ParseError>;

/// An error that stops a DEF parse.
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    /// The input file could not be read or decompressed.
    #[error("failed to read `{path}`: {err}")]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        err: std::io::Error,
    },
    /// The input is not well-formed DEF.
    #[error("line {line}: {msg}")]
    Syntax {
        /// The 1-based line number of the offending token.
        line: usize,
        /// A description of the problem.
        msg: String,
    },
    /// A callback requested that parsing stop.
    #[error("line {line}: parsing aborted by callback")]
    Aborted {
        /// The line on which the aborting construct ended.
        line: usize,
    },
}

impl ParseError {
    /// The line associated with this error, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Io { .. } => None,
            Self::Syntax { line, .. } | Self::Aborted { line } => Some(*line),
        }
    }
}
