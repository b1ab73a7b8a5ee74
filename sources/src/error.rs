//! Error types for configuration source reading.
//!
//! Only failures that make a source's content untrustworthy are errors.
//! Missing files, unsupported extensions and undecodable environment values
//! are logged and skipped by the resolvers instead.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading a configuration source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// File I/O failure on a file that exists.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing failure.
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parsing failure.
    #[error("invalid YAML in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The file parsed, but its top level is not a mapping.
    #[error("{} must contain a top-level object", path.display())]
    NotAnObject { path: PathBuf },

    /// A custom parser rejected the file.
    #[error("parser for {} failed: {message}", path.display())]
    Parser { path: PathBuf, message: String },
}

/// Convenience alias for results with [`SourceError`].
pub type Result<T> = std::result::Result<T, SourceError>;
