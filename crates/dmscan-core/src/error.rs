/// Errors raised when building geometry values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}

/// Errors raised by the image buffer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid image dimensions (width={width}, height={height})")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("invalid image buffer length (expected {expected} bytes, got {got})")]
    BufferSize { expected: usize, got: usize },

    #[error("invalid image resolution: {dpi} dpi")]
    InvalidDpi { dpi: u32 },

    #[error("region {region} lies outside the {width}x{height} image")]
    OutOfBounds {
        region: String,
        width: u32,
        height: u32,
    },
}

/// Errors raised by the plate grid generator.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("plate rows must be in 1..=26 (got {0})")]
    Rows(u32),

    #[error("plate columns must be in 1..={max} (got {0})", max = crate::MAX_COLS)]
    Cols(u32),

    #[error("plate size must be positive and finite (width={width}, height={height})")]
    PlateSize { width: f64, height: f64 },

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}
