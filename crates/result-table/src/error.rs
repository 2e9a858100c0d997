use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to load PDF: {0}")]
    PdfLoad(#[from] lopdf::Error),

    #[error("PDF is encrypted")]
    Encrypted,

    #[error("failed to extract positioned text with {backend}: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error("no pages available after applying selection")]
    NoPagesSelected,
}

impl ExtractionError {
    pub(crate) fn backend(backend: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            backend,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconstructError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("reconstructed table is too ambiguous (confidence={confidence:.2})")]
    AmbiguousTable { confidence: f32 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SoftError {
    #[error("no candidate table reached the consistency threshold (best score {best_score:.2})")]
    NoConsistentTable { best_score: f32 },

    #[error("no non-empty data rows remained after processing")]
    EmptyResult,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("refusing to store an unsuccessful reconstruction")]
    Unsuccessful,

    #[error("invalid upload metadata: {0}")]
    InvalidMetadata(String),
}
