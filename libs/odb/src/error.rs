//! Database stream errors.

/// A result whose error type is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// An error reading or writing a database stream.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The underlying reader or writer failed.
    #[error("database stream I/O failed")]
    Io(#[from] std::io::Error),
    /// The stream does not begin with the database magic bytes.
    #[error("not a database stream")]
    BadMagic,
    /// The stream was written with a schema this build cannot read.
    #[error("unsupported database schema {major}.{minor}")]
    UnsupportedSchema { major: u16, minor: u16 },
    /// The stream is structurally invalid.
    #[error("corrupt database stream: {0}")]
    Format(String),
}
