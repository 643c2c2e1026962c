use thiserror::Error;

// ---------------------------------------------------------------------------
// Library error type
// ---------------------------------------------------------------------------

/// Errors raised by the grid, diagram and age-fitting layers.
///
/// File loaders return `anyhow::Result` so they can attach path context;
/// everything that validates shapes, ranges or column names returns this.
#[derive(Debug, Error)]
pub enum HokiError {
    /// Input has the wrong shape, columns or type.
    #[error("format error: {0}")]
    Format(String),

    /// The requested age range cannot be interpreted.
    #[error("invalid age range: {0}")]
    AgeRange(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, HokiError>;
