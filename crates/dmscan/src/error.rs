use dmscan_core::{GridError, ImageError};
use dmscan_decoder::DecodeError;

/// Errors that fail a whole decode pass.
///
/// Problems confined to one well never show up here; they are folded into
/// that well's outcome.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("could not load image {path}: {reason}")]
    ImageLoad { path: String, reason: String },

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("no well could be mapped onto the image")]
    NoValidWells,

    #[error("duplicate well label {0}")]
    DuplicateLabel(String),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("no symbol decoder backend is available; rebuild with the `rxing` feature")]
    NoBackend,

    #[error("could not build the worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
