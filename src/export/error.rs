//! Error types for document export.

use thiserror::Error;

/// Errors raised while exporting a transcript.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Image request failed.
    #[error("image request failed: {0}")]
    Fetch(#[from] reqwest::Error),
    /// Image host answered with a non-success status.
    #[error("image host returned HTTP {0}")]
    Status(u16),
    /// Image exceeded the byte cap.
    #[error("image larger than {limit} bytes")]
    TooLarge {
        /// Configured byte cap.
        limit: usize,
    },
    /// Image URL is not on the allow-list.
    #[error("image host not allowed: {0}")]
    Disallowed(String),
    /// Image bytes could not be decoded.
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    /// Document assembly failed.
    #[error("PDF generation failed: {0}")]
    Pdf(String),
}

/// Result alias for export operations.
pub type ExportResult<T> = Result<T, ExportError>;
