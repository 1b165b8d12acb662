//! Error types for notecount-core.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),

    /// Configuration file not found after searching all locations.
    #[error("no configuration file found")]
    NotFound,

    /// A page or reading rate is zero, negative, or not finite.
    #[error("invalid rate for `{field}`: {value} (must be a positive number)")]
    InvalidRate {
        /// Name of the offending configuration field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The auto-detect ratio is outside `(0, 1]`.
    #[error("invalid auto-detect threshold: {0} (must be in (0, 1])")]
    InvalidThreshold(f64),
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised by a [`VaultSource`](crate::vault::VaultSource) while
/// listing or reading notes.
#[derive(Error, Debug)]
pub enum VaultError {
    /// The note could not be read from disk.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Vault-relative path of the note.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The note's filesystem metadata could not be read.
    #[error("failed to stat {path}: {source}")]
    Metadata {
        /// Vault-relative path of the note.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The note is not valid UTF-8 text.
    #[error("{path} is not valid UTF-8")]
    NotUtf8 {
        /// Vault-relative path of the note.
        path: String,
    },

    /// The vault root could not be traversed.
    #[error("failed to walk vault at {root}: {source}")]
    Walk {
        /// Absolute vault root.
        root: Utf8PathBuf,
        /// Underlying traversal error.
        #[source]
        source: walkdir::Error,
    },

    /// The path does not exist in the vault.
    #[error("no such note: {0}")]
    NotFound(String),
}

/// Result type alias using [`VaultError`].
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors that can occur while loading or saving the persisted cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Reading or writing the cache file failed.
    #[error("cache file {path}: {source}")]
    Io {
        /// Location of the cache file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The cache file is not valid JSON.
    #[error("cache file {path} is not valid JSON: {source}")]
    Json {
        /// Location of the cache file.
        path: Utf8PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias using [`CacheError`].
pub type CacheResult<T> = Result<T, CacheError>;
