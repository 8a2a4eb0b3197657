pub mod constants;
#[cfg(test)]
pub mod utility;

use std::sync::PoisonError;

/// Errors surfaced by parsing, planning, executing, and storing documents.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    /// Invalid user input, typically a malformed statement or pipeline.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Invalid data encountered while evaluating, e.g. multiplying strings.
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// A document with the same _id already exists in the collection.
    #[error("duplicate key error: collection {collection} already contains _id {id}")]
    DuplicateKey { collection: String, id: String },
    /// Settings could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
    /// An IO error, including terminal errors from the shell.
    #[error("io error: {0}")]
    IO(String),
    /// A lock was poisoned by a panicking holder.
    #[error("poisoned lock: {0}")]
    Poisoned(String),
}

/// A rustydoc Result returning Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Constructs an Error::InvalidInput for the given format string.
#[macro_export]
macro_rules! errinput {
    ($($args:tt)*) => { Err($crate::common::Error::InvalidInput(format!($($args)*))) };
}

/// Constructs an Error::InvalidData for the given format string.
#[macro_export]
macro_rules! errdata {
    ($($args:tt)*) => { Err($crate::common::Error::InvalidData(format!($($args)*))) };
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IO(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<rustyline::error::ReadlineError> for Error {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        Error::IO(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidData(err.to_string())
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Error::Poisoned(err.to_string())
    }
}
