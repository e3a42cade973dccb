#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// No 4-vertex polygon among the largest contours.
    #[error("could not detect document corners")]
    NoDocumentFound,

    #[error("degenerate document geometry: {0}")]
    DegenerateGeometry(String),

    #[error("image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("text extraction failed: {0}")]
    TextExtraction(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        ScanError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
