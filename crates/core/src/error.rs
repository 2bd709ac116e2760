//! Error types for s3utils
//!
//! Every failure is surfaced to the immediate caller unchanged. Incomplete
//! environment credentials are not an error: they select the profile path.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout s3utils
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by s3utils operations
#[derive(Debug, Error)]
pub enum Error {
    /// Region, profile or client setup failed at the provider boundary
    #[error("Failed to create session: {0}")]
    SessionCreation(String),

    /// A metadata lookup failed with anything other than not-found
    #[error("Provider error: {message}")]
    Provider {
        /// Structured error code reported by the provider, if any
        code: Option<String>,
        message: String,
    },

    /// The local file could not be opened for reading
    #[error("Cannot access file '{}': {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The provider rejected or failed the data transfer
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Every candidate name up to the configured bound is taken
    #[error("No free object name for '{base}' after {attempts} suffixed attempts")]
    NamesExhausted { base: String, attempts: u32 },
}

impl Error {
    /// Build a provider error without a structured code
    pub fn provider(message: impl Into<String>) -> Self {
        Error::Provider {
            code: None,
            message: message.into(),
        }
    }

    pub(crate) fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileAccess {
            path: path.into(),
            source,
        }
    }

    /// Structured provider code, when the error carries one
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Provider { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
