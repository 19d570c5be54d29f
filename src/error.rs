use std::path::PathBuf;
use thiserror::Error;

/// The main error type for maccnet operations.
#[derive(Debug, Error)]
pub enum MaccError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path \"{}\" does not exist or is not a file", path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("\"{field}\" is required in {context}")]
    MissingField {
        field: &'static str,
        context: String,
    },

    #[error("Invalid value for \"{field}\" in {context}: {message}")]
    InvalidValue {
        field: &'static str,
        context: String,
        message: String,
    },

    #[error("Accumulator of scale {scale} cannot be created \"{line}\": no convolution at downsampling x{scale}")]
    UndefinedScale { scale: u64, line: String },

    #[error("Failed to serialize summary as JSON: {0}")]
    SummaryJson(#[from] serde_json::Error),
}
