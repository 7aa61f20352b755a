use crate::DecodeError;
use serde::{Deserialize, Serialize};

/// Tuning parameters handed to the symbol decoder.
///
/// The field meanings follow libdmtx-style region finders; decoders that do
/// not use a knob simply ignore it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Distance in pixels between scan lines when searching for a symbol.
    pub scan_gap: f64,
    /// Maximum deviation from a right angle, in degrees, for the symbol's
    /// L-shaped finder.
    pub square_dev: i64,
    /// Minimum edge strength (0..=100) for a finder edge.
    pub edge_thresh: i64,
    /// Maximum number of error corrections; `-1` means unlimited.
    pub corrections: i64,
    /// Internal downscale factor applied by the decoder.
    pub shrink: i64,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            scan_gap: 5.0,
            square_dev: 15,
            edge_thresh: 5,
            corrections: 10,
            shrink: 1,
        }
    }
}

impl DecodeOptions {
    pub fn new(scan_gap: f64, square_dev: i64, edge_thresh: i64, corrections: i64, shrink: i64) -> Self {
        Self {
            scan_gap,
            square_dev,
            edge_thresh,
            corrections,
            shrink,
        }
    }

    /// Reject values no decoder can work with.
    pub fn validate(&self) -> Result<(), DecodeError> {
        if !self.scan_gap.is_finite() || self.scan_gap < 0.0 {
            return Err(DecodeError::InvalidOptions(format!(
                "scan_gap must be a non-negative number (got {})",
                self.scan_gap
            )));
        }
        if !(0..=90).contains(&self.square_dev) {
            return Err(DecodeError::InvalidOptions(format!(
                "square_dev must be in 0..=90 degrees (got {})",
                self.square_dev
            )));
        }
        if !(0..=100).contains(&self.edge_thresh) {
            return Err(DecodeError::InvalidOptions(format!(
                "edge_thresh must be in 0..=100 (got {})",
                self.edge_thresh
            )));
        }
        if self.corrections < -1 {
            return Err(DecodeError::InvalidOptions(format!(
                "corrections must be -1 or more (got {})",
                self.corrections
            )));
        }
        if self.shrink < 1 {
            return Err(DecodeError::InvalidOptions(format!(
                "shrink must be at least 1 (got {})",
                self.shrink
            )));
        }
        Ok(())
    }
}
