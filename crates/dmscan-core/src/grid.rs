//! Well layout for SBS-format racks.
//!
//! A rack is a `rows x cols` grid of equal wells covering the plate area.
//! Rows are lettered from `A`, columns numbered from 1.

use crate::{BoundingBox, GridError, Point, WellRectangle};
use serde::{Deserialize, Serialize};

/// Rows of a standard 96-well rack.
pub const SBS_ROWS: u32 = 8;
/// Columns of a standard 96-well rack.
pub const SBS_COLS: u32 = 12;

/// Widest grid the generator accepts.
pub const MAX_COLS: u32 = 999;

/// Each well box is shrunk by this factor so the last row and column never
/// round past the image edge.
pub const WELL_SHRINK: f64 = 0.9999;

/// How column numbers run across the image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnOrder {
    /// Column 1 on the left.
    #[default]
    Ascending,
    /// Column 1 on the right, as seen on a flatbed scanner looking up at the
    /// bottom of the rack.
    Descending,
}

/// Label of the well at zero-based `row` and one-based `column`.
pub fn well_label(row: u32, column: u32) -> Result<String, GridError> {
    if row >= 26 {
        return Err(GridError::Rows(row.saturating_add(1)));
    }
    let letter = char::from(b'A' + row as u8);
    Ok(format!("{letter}{column}"))
}

/// Rack layout in inches.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlateGrid {
    pub rows: u32,
    pub cols: u32,
    /// Plate width in inches.
    pub width: f64,
    /// Plate height in inches.
    pub height: f64,
    #[serde(default)]
    pub column_order: ColumnOrder,
}

impl PlateGrid {
    /// A standard 8x12 rack covering `width` x `height` inches.
    pub fn sbs(width: f64, height: f64) -> Self {
        Self {
            rows: SBS_ROWS,
            cols: SBS_COLS,
            width,
            height,
            column_order: ColumnOrder::Ascending,
        }
    }

    pub fn with_column_order(mut self, order: ColumnOrder) -> Self {
        self.column_order = order;
        self
    }

    /// Generate one well per grid cell, row by row.
    ///
    /// The output order is deterministic: row `A` first, and within a row
    /// left to right in image space.
    pub fn well_rects(&self) -> Result<Vec<WellRectangle<f64>>, GridError> {
        if self.rows == 0 || self.rows > 26 {
            return Err(GridError::Rows(self.rows));
        }
        if self.cols == 0 || self.cols > MAX_COLS {
            return Err(GridError::Cols(self.cols));
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.width) || !positive(self.height) {
            return Err(GridError::PlateSize {
                width: self.width,
                height: self.height,
            });
        }

        let well_width = self.width / f64::from(self.cols);
        let well_height = self.height / f64::from(self.rows);
        let hor_step = Point::new(well_width, 0.0);
        let ver_step = Point::new(0.0, well_height);

        let first = BoundingBox::new(
            Point::new(0.0, 0.0),
            Point::new(well_width * WELL_SHRINK, well_height * WELL_SHRINK),
        )?;

        let mut wells = Vec::with_capacity(self.rows as usize * self.cols as usize);
        for row in 0..self.rows {
            let mut bbox = first.translate(&ver_step.scale(f64::from(row)));
            for col in 0..self.cols {
                let column = match self.column_order {
                    ColumnOrder::Ascending => col + 1,
                    ColumnOrder::Descending => self.cols - col,
                };
                wells.push(WellRectangle::new(well_label(row, column)?, bbox));
                bbox = bbox.translate(&hor_step);
            }
        }
        log::debug!(
            "generated {} wells ({}x{}) over {:.3}x{:.3} in",
            wells.len(),
            self.rows,
            self.cols,
            self.width,
            self.height
        );
        Ok(wells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn labels(wells: &[WellRectangle<f64>]) -> Vec<&str> {
        wells.iter().map(|w| w.label()).collect()
    }

    #[test]
    fn sbs_labels_run_a1_to_h12() {
        let wells = PlateGrid::sbs(4.0, 800.0 / 300.0).well_rects().unwrap();
        assert_eq!(wells.len(), 96);

        let expected_a: Vec<String> = (1..=12).map(|c| format!("A{c}")).collect();
        let expected_h: Vec<String> = (1..=12).map(|c| format!("H{c}")).collect();
        assert_eq!(labels(&wells[..12]), expected_a);
        assert_eq!(labels(&wells[84..]), expected_h);
    }

    #[test]
    fn descending_columns_mirror_labels() {
        let wells = PlateGrid::sbs(4.0, 3.0)
            .with_column_order(ColumnOrder::Descending)
            .well_rects()
            .unwrap();
        assert_eq!(wells[0].label(), "A12");
        assert_eq!(wells[11].label(), "A1");
        assert_eq!(wells[95].label(), "H1");
    }

    #[test]
    fn generation_is_deterministic() {
        let grid = PlateGrid::sbs(5.0, 3.3);
        assert_eq!(grid.well_rects().unwrap(), grid.well_rects().unwrap());
    }

    #[test]
    fn wells_tile_the_plate() {
        let wells = PlateGrid::sbs(4.0, 8.0 / 3.0).well_rects().unwrap();
        let h12 = wells.last().unwrap().bounding_box();
        assert_relative_eq!(h12.top_left().x, 11.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(h12.top_left().y, 7.0 / 3.0, epsilon = 1e-9);
        assert!(h12.bottom_right().x < 4.0);
        assert!(h12.bottom_right().y < 8.0 / 3.0);

        // 1200x800 px at 300 dpi: every well converts to a 100x100 px box.
        for well in &wells {
            let px = well.to_pixels(300).unwrap();
            assert_eq!(px.bounding_box().width(), 100, "{}", well);
            assert_eq!(px.bounding_box().height(), 100, "{}", well);
        }
    }

    #[test]
    fn rejects_bad_grids() {
        let mut grid = PlateGrid::sbs(4.0, 3.0);
        grid.rows = 27;
        assert_eq!(grid.well_rects(), Err(GridError::Rows(27)));
        grid.rows = 8;
        grid.cols = 0;
        assert_eq!(grid.well_rects(), Err(GridError::Cols(0)));
        grid.cols = u32::MAX;
        assert_eq!(grid.well_rects(), Err(GridError::Cols(u32::MAX)));
        grid.cols = MAX_COLS;
        assert_eq!(grid.well_rects().unwrap().len(), 8 * MAX_COLS as usize);
        let bad = PlateGrid::sbs(0.0, 3.0);
        assert!(matches!(bad.well_rects(), Err(GridError::PlateSize { .. })));
    }

    #[test]
    fn well_label_letters() {
        assert_eq!(well_label(0, 1).unwrap(), "A1");
        assert_eq!(well_label(7, 12).unwrap(), "H12");
        assert!(well_label(26, 1).is_err());
        assert_eq!(well_label(u32::MAX, 1), Err(GridError::Rows(u32::MAX)));
    }
}
