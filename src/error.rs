use thiserror::Error;

/// Why a launch request was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LaunchError {
    #[error("launches are disabled while particles gather")]
    Gathering,

    #[error("particle capacity of {0} reached")]
    AtCapacity(usize),

    #[error("launch target coincides with its origin")]
    ZeroDistance,
}

#[derive(Debug, Error)]
pub enum PictureError {
    #[error("failed to read picture: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode picture: {0}")]
    Decode(#[from] image::ImageError),

    #[error("picture has zero width or height")]
    Empty,

    #[error("pixel buffer holds {got} bytes, expected {expected}")]
    SizeMismatch { expected: usize, got: usize },
}
