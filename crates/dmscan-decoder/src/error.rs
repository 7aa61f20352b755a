use crate::PrimitiveError;
use dmscan_core::{GeometryError, ImageError};

/// Errors returned by the decoder and well-decode units.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Primitive(#[from] PrimitiveError),

    #[error("invalid decode options: {0}")]
    InvalidOptions(String),

    /// A caller broke the well-decoder contract.
    #[error("logic error: {0}")]
    Logic(&'static str),
}
