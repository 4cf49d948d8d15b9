use thiserror::Error;

pub type Result<T> = std::result::Result<T, CanvasError>;

#[derive(Error, Debug)]
pub enum CanvasError {
    #[error("could not decode background image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("could not encode image: {0}")]
    Encode(#[source] image::ImageError),
    #[error("background image has no pixels")]
    EmptyBackground,
    #[error("invalid stroke data: {0}")]
    InvalidStrokes(#[from] serde_json::Error),
    #[error("invalid color: {0}")]
    InvalidColor(String),
}
