//! JSON configuration and report helpers for rack decoding.

use crate::{DmScanConfig, ImageScan, PlateScan, ScanError, WellResult};
use dmscan_core::{ColumnOrder, Dib, PlateGrid, SBS_COLS, SBS_ROWS};
use dmscan_decoder::{DecodeOptions, DecodedSymbol};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn default_rows() -> u32 {
    SBS_ROWS
}

fn default_cols() -> u32 {
    SBS_COLS
}

/// A saved rack decoding job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateScanConfig {
    pub image_path: String,
    /// Overrides the resolution stored in the image file.
    #[serde(default)]
    pub dpi: Option<u32>,
    #[serde(default = "default_rows")]
    pub rows: u32,
    #[serde(default = "default_cols")]
    pub cols: u32,
    #[serde(default)]
    pub column_order: ColumnOrder,
    /// Plate width in inches; defaults to the image width.
    #[serde(default)]
    pub plate_width: Option<f64>,
    /// Plate height in inches; defaults to the image height.
    #[serde(default)]
    pub plate_height: Option<f64>,
    #[serde(default)]
    pub options: DecodeOptions,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub output_path: Option<String>,
}

impl PlateScanConfig {
    /// An 8x12 job over the whole image with default options.
    pub fn new(image_path: impl Into<String>) -> Self {
        Self {
            image_path: image_path.into(),
            dpi: None,
            rows: SBS_ROWS,
            cols: SBS_COLS,
            column_order: ColumnOrder::default(),
            plate_width: None,
            plate_height: None,
            options: DecodeOptions::default(),
            workers: None,
            output_path: None,
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output report path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("dmscan_report.json"))
    }

    /// Rack layout for `image`, filling the plate size from the image.
    pub fn plate_grid(&self, image: &Dib) -> PlateGrid {
        let (width, height) = image.size_inches();
        PlateGrid {
            rows: self.rows,
            cols: self.cols,
            width: self.plate_width.unwrap_or(width),
            height: self.plate_height.unwrap_or(height),
            column_order: self.column_order,
        }
    }

    pub fn scan_config(&self) -> DmScanConfig {
        DmScanConfig {
            workers: self.workers,
        }
    }
}

/// Everything a decode run produced, for writing to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateScanReport {
    pub image_path: String,
    pub options: DecodeOptions,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub dpi: Option<u32>,
    #[serde(default)]
    pub decoded: usize,
    #[serde(default)]
    pub wells: Vec<WellResult>,
    #[serde(default)]
    pub symbols: Vec<DecodedSymbol>,
    #[serde(default)]
    pub systemic_failure: bool,
    #[serde(default)]
    pub elapsed_ms: f64,
    #[serde(default)]
    pub error: Option<String>,
}

impl PlateScanReport {
    pub fn new(image_path: impl Into<String>, options: DecodeOptions) -> Self {
        Self {
            image_path: image_path.into(),
            options,
            width: None,
            height: None,
            dpi: None,
            decoded: 0,
            wells: Vec::new(),
            symbols: Vec::new(),
            systemic_failure: false,
            elapsed_ms: 0.0,
            error: None,
        }
    }

    /// Populate report fields from a gridded pass.
    pub fn set_plate(&mut self, scan: &PlateScan) {
        self.width = Some(scan.width);
        self.height = Some(scan.height);
        self.dpi = Some(scan.dpi);
        self.decoded = scan.decoded_count();
        self.wells = scan.wells.clone();
        self.systemic_failure = scan.systemic_failure();
        self.elapsed_ms = scan.elapsed_ms;
        self.error = None;
    }

    /// Populate report fields from a whole-image pass.
    pub fn set_image(&mut self, scan: &ImageScan) {
        self.width = Some(scan.width);
        self.height = Some(scan.height);
        self.dpi = Some(scan.dpi);
        self.decoded = scan.symbols.len();
        self.symbols = scan.symbols.clone();
        self.elapsed_ms = scan.elapsed_ms;
        self.error = None;
    }

    /// Record a failed pass.
    pub fn set_error(&mut self, err: &ScanError) {
        self.error = Some(err.to_string());
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use dmscan_core::{BoundingBox, Point, Rect};
    use dmscan_decoder::{NotDecodedReason, WellOutcome};

    #[test]
    fn minimal_config_takes_sbs_defaults() {
        let cfg: PlateScanConfig = serde_json::from_str(r#"{"image_path": "rack.bmp"}"#).unwrap();
        assert_eq!(cfg, PlateScanConfig::new("rack.bmp"));
        assert_eq!(cfg.output_path(), PathBuf::from("dmscan_report.json"));
    }

    #[test]
    fn plate_grid_defaults_to_image_size() {
        let image = Dib::filled(1200, 800, 300, 255).unwrap();
        let mut cfg = PlateScanConfig::new("rack.bmp");
        let grid = cfg.plate_grid(&image);
        assert_relative_eq!(grid.width, 4.0);
        assert_relative_eq!(grid.height, 2.6667, epsilon = 1e-4);

        cfg.plate_width = Some(3.5);
        cfg.column_order = ColumnOrder::Descending;
        let grid = cfg.plate_grid(&image);
        assert_eq!(grid.width, 3.5);
        assert_eq!(grid.column_order, ColumnOrder::Descending);
    }

    #[test]
    fn config_and_report_survive_disk() {
        let dir = tempfile::tempdir().unwrap();

        let mut cfg = PlateScanConfig::new("rack.bmp");
        cfg.workers = Some(2);
        cfg.options.scan_gap = 3.0;
        let cfg_path = dir.path().join("cfg.json");
        cfg.write_json(&cfg_path).unwrap();
        assert_eq!(PlateScanConfig::load_json(&cfg_path).unwrap(), cfg);

        let bbox = BoundingBox::new(Point::new(0u32, 0), Point::new(100, 100)).unwrap();
        let scan = PlateScan {
            width: 1200,
            height: 800,
            dpi: 300,
            wells: vec![
                WellResult {
                    label: "A1".into(),
                    bbox: Some(bbox),
                    outcome: WellOutcome::Decoded {
                        message: "TUBE-001".into(),
                        rect: Rect::from_bounding_box(&bbox),
                    },
                    elapsed_ms: 1.5,
                },
                WellResult {
                    label: "A2".into(),
                    bbox: None,
                    outcome: WellOutcome::not_decoded(NotDecodedReason::InvalidGeometry(
                        "bad".into(),
                    )),
                    elapsed_ms: 0.0,
                },
            ],
            elapsed_ms: 12.0,
        };
        let mut report = PlateScanReport::new("rack.bmp", cfg.options);
        report.set_plate(&scan);
        assert_eq!(report.decoded, 1);

        let report_path = dir.path().join("report.json");
        report.write_json(&report_path).unwrap();
        assert_eq!(PlateScanReport::load_json(&report_path).unwrap(), report);
    }
}
