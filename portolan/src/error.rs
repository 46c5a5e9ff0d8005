//! Error types used by the crate.

use thiserror::Error;

/// Portolan error type.
#[derive(Debug, Error)]
pub enum PortolanError {
    /// I/O error (network or file).
    #[error("failed to load data")]
    Io,
    /// Image decoding error.
    #[error("image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),
    /// A background task was cancelled or panicked.
    #[error("background task failed")]
    Task,
    /// Render backend failure.
    #[error("render backend error: {0}")]
    Render(String),
    /// Generic error - details are inside.
    #[error("{0}")]
    Generic(String),
}

impl From<reqwest::Error> for PortolanError {
    fn from(_value: reqwest::Error) -> Self {
        Self::Io
    }
}
