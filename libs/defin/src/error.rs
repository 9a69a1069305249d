//! DEF import error types.

/// A result whose error type is [`DefError`].
pub type Result<T> = std::result::Result<T, DefError>;

/// Why an import did not produce a block.
#[derive(thiserror::Error, Debug)]
pub enum DefError {
    /// The file could not be read or is not well-formed DEF, or a
    /// construct stopped the parse.
    #[error("DEF parse failed: {0}")]
    Parse(#[from] lefdef::ParseError),
    /// The file parsed, but some constructs could not be imported.
    #[error("DEF import failed with {errors} error(s)")]
    Failed {
        /// The number of errors logged during the import.
        errors: usize,
    },
    /// The file ended without a DESIGN statement.
    #[error("no DESIGN statement found")]
    NoDesign,
    /// Reader options could not be parsed.
    #[error("invalid reader options: {0}")]
    Options(#[from] toml::de::Error),
    /// Reader options could not be read from disk.
    #[error("failed to read reader options: {0}")]
    Io(#[from] std::io::Error),
}
