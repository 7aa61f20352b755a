//! Core types for datamatrix rack scanning.
//!
//! This crate is intentionally small and free of any barcode decoder. It
//! holds the geometry values shared by every stage, the grayscale [`Dib`]
//! image buffer, and the well layout generator for SBS racks.

mod error;
mod geometry;
mod grid;
mod image;
mod logger;

pub use error::{GeometryError, GridError, ImageError};
pub use geometry::{BoundingBox, Coord, Point, Rect, WellRectangle};
pub use grid::{well_label, ColumnOrder, PlateGrid, MAX_COLS, SBS_COLS, SBS_ROWS, WELL_SHRINK};
pub use image::Dib;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
