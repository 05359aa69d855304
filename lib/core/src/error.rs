use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid feature data: {0}")]
    Data(String),

    #[error("Track '{0}' does not exist in the dataset")]
    TrackNotFound(String),

    #[error("No trained model available, train the model first")]
    NotTrained,

    #[error("Feature extraction failed for {file}: {reason}")]
    Extraction { file: String, reason: String },

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether the error names a track missing from the trained table
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::TrackNotFound(_))
    }
}
