//! High-level facade crate for the `dmscan-*` workspace.
//!
//! This crate provides:
//! - re-exports of the geometry/image core and the per-well decoder
//! - [`DmScanLib`], which decodes every well of a rack image on a bounded
//!   worker pool and reports one result per well
//! - (feature-gated) image loading from disk and an `rxing`-backed
//!   datamatrix [`SymbolDecoder`](dmscan_decoder::SymbolDecoder)
//!
//! ## Quickstart
//!
//! ```no_run
//! use dmscan::{DecodeOptions, DecodedSymbol, Dib, DmScanLib, PlateGrid, PrimitiveError};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Plug in a real datamatrix decoder here.
//! let primitive = |_: &Dib, _: &DecodeOptions| -> Result<Option<DecodedSymbol>, PrimitiveError> {
//!     Ok(None)
//! };
//! let scanner = DmScanLib::new(Arc::new(primitive))?;
//!
//! let image = dmscan::load::load_dib("rack.bmp", None)?;
//! let (w, h) = image.size_inches();
//! let wells = PlateGrid::sbs(w, h).well_rects()?;
//!
//! let scan = scanner.decode_wells(image, DecodeOptions::default(), &wells)?;
//! for (label, message) in scan.decoded_wells() {
//!     println!("{label}: {message}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `dmscan::core`: points, boxes, well rectangles, the `Dib` buffer, rack grids.
//! - `dmscan::decoder`: `Decoder`, `WellDecoder`, options and outcomes.
//! - `dmscan::load` (feature `image`): reading rack images from disk.
//! - `dmscan::io`: JSON job configs and reports.

pub use dmscan_core as core;
pub use dmscan_decoder as decoder;

pub use dmscan_core::{
    BoundingBox, ColumnOrder, Dib, PlateGrid, Point, Rect, WellRectangle, SBS_COLS, SBS_ROWS,
};
pub use dmscan_decoder::{
    CancelToken, DecodeOptions, DecodedSymbol, NotDecodedReason, PrimitiveError, SymbolDecoder,
    WellOutcome,
};

mod error;
pub mod io;
mod observer;
mod result;
mod scan;

#[cfg(feature = "image")]
pub mod load;

#[cfg(feature = "rxing")]
mod rxing_backend;

pub use error::ScanError;
pub use io::{ConfigIoError, PlateScanConfig, PlateScanReport};
pub use observer::{LogObserver, PassSummary, ScanObserver, WellEvent};
pub use result::{ImageScan, PlateScan, WellResult};
pub use scan::{DmScanConfig, DmScanLib};

#[cfg(feature = "rxing")]
pub use rxing_backend::RxingDecoder;
