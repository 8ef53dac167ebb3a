use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] ::image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration mismatch: expected {expected} {what}, got {actual}")]
    ConfigurationMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Degenerate alignment: {0}")]
    DegenerateAlignment(String),

    #[error("Landmark group '{0}' not found")]
    MissingLandmarkGroup(String),

    #[error("Empty image: {width}x{height}")]
    EmptyImage { width: usize, height: usize },

    #[error("Algorithm failure: {0}")]
    Algorithm(String),
}

pub type Result<T> = std::result::Result<T, Error>;
