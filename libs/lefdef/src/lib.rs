//! Readers for the LEF/DEF family of physical design exchange formats.
//!
//! Only DEF is supported. The reader is callback driven: each completed
//! construct is handed to a [`DefCallbacks`](def::DefCallbacks) implementation
//! in file order, and the implementation decides whether parsing continues.

pub mod def;
pub mod error;

pub use error::ParseError;
