//! Immutable geometry values.
//!
//! Two coordinate spaces are in play: well layouts are described in
//! fractional inches (`f64`) relative to the plate origin, and everything the
//! decoder touches lives in integer pixel space (`u32`). [`BoundingBox::to_pixels`]
//! is the only bridge between the two.

use crate::GeometryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// Numeric type usable as a coordinate.
pub trait Coord:
    Copy
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
{
}

impl<T> Coord for T where
    T: Copy
        + PartialOrd
        + fmt::Debug
        + fmt::Display
        + Add<Output = T>
        + Sub<Output = T>
        + Mul<Output = T>
{
}

/// A 2D point or translation vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

impl<T: Coord> Point<T> {
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }

    /// Multiply both axes by `factor`.
    ///
    /// Used to derive the offset of row `n` of a uniform grid from the offset
    /// of row 1.
    pub fn scale(&self, factor: T) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Offset this point by `vector`.
    pub fn translate(&self, vector: &Point<T>) -> Self {
        Self::new(self.x + vector.x, self.y + vector.y)
    }
}

impl<T: fmt::Display> fmt::Display for Point<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned box defined by its top-left and bottom-right corners.
///
/// The box is stored as origin plus extent, so translating it never perturbs
/// its width or height, even for floating point coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "[Point<T>; 2]",
    into = "[Point<T>; 2]",
    bound(
        serialize = "T: Coord + Serialize",
        deserialize = "T: Coord + Deserialize<'de>"
    )
)]
pub struct BoundingBox<T> {
    origin: Point<T>,
    size: Point<T>,
}

impl<T: Coord> BoundingBox<T> {
    /// Build a box from its top-left and bottom-right corners.
    ///
    /// Fails when the corners coincide or are inverted on either axis.
    pub fn new(top_left: Point<T>, bottom_right: Point<T>) -> Result<Self, GeometryError> {
        // Written so that NaN coordinates are rejected too.
        let ordered = top_left.x < bottom_right.x && top_left.y < bottom_right.y;
        if !ordered {
            return Err(GeometryError::InvalidGeometry(format!(
                "degenerate or inverted box {top_left} - {bottom_right}"
            )));
        }
        Ok(Self {
            origin: top_left,
            size: Point::new(bottom_right.x - top_left.x, bottom_right.y - top_left.y),
        })
    }

    #[inline]
    pub fn top_left(&self) -> Point<T> {
        self.origin
    }

    #[inline]
    pub fn bottom_right(&self) -> Point<T> {
        self.origin.translate(&self.size)
    }

    /// Both corners, top-left first.
    pub fn points(&self) -> [Point<T>; 2] {
        [self.top_left(), self.bottom_right()]
    }

    #[inline]
    pub fn width(&self) -> T {
        self.size.x
    }

    #[inline]
    pub fn height(&self) -> T {
        self.size.y
    }

    /// A new box offset by `vector`, same size.
    pub fn translate(&self, vector: &Point<T>) -> Self {
        Self {
            origin: self.origin.translate(vector),
            size: self.size,
        }
    }

    /// True when `p` lies inside the box, bottom-right edge included.
    pub fn contains_point(&self, p: &Point<T>) -> bool {
        let br = self.bottom_right();
        p.x >= self.origin.x && p.y >= self.origin.y && p.x <= br.x && p.y <= br.y
    }

    /// True when `other` lies entirely inside this box.
    pub fn contains(&self, other: &BoundingBox<T>) -> bool {
        self.contains_point(&other.top_left()) && self.contains_point(&other.bottom_right())
    }

    /// Overlapping part of two boxes, `None` when they only touch or are disjoint.
    pub fn intersection(&self, other: &BoundingBox<T>) -> Option<Self> {
        let (a0, a1) = (self.top_left(), self.bottom_right());
        let (b0, b1) = (other.top_left(), other.bottom_right());
        let tl = Point::new(max_of(a0.x, b0.x), max_of(a0.y, b0.y));
        let br = Point::new(min_of(a1.x, b1.x), min_of(a1.y, b1.y));
        Self::new(tl, br).ok()
    }
}

impl BoundingBox<f64> {
    /// Convert a box in inches into pixel space at `dpi`.
    ///
    /// Each corner is rounded to the nearest pixel; the result is half-open,
    /// i.e. it covers columns `x0..x1` and rows `y0..y1`.
    pub fn to_pixels(&self, dpi: u32) -> Result<BoundingBox<u32>, GeometryError> {
        if dpi == 0 {
            return Err(GeometryError::InvalidGeometry(
                "cannot convert to pixels at 0 dpi".to_string(),
            ));
        }
        let scale = f64::from(dpi);
        let to_px = |v: f64| -> Result<u32, GeometryError> {
            let px = (v * scale).round();
            if !px.is_finite() || px < 0.0 || px > f64::from(u32::MAX) {
                return Err(GeometryError::InvalidGeometry(format!(
                    "coordinate {v} in is not representable in pixels at {dpi} dpi"
                )));
            }
            Ok(px as u32)
        };
        let [tl, br] = self.points();
        BoundingBox::new(
            Point::new(to_px(tl.x)?, to_px(tl.y)?),
            Point::new(to_px(br.x)?, to_px(br.y)?),
        )
    }
}

impl<T: Coord> TryFrom<[Point<T>; 2]> for BoundingBox<T> {
    type Error = GeometryError;

    fn try_from(points: [Point<T>; 2]) -> Result<Self, Self::Error> {
        Self::new(points[0], points[1])
    }
}

impl<T: Coord> From<BoundingBox<T>> for [Point<T>; 2] {
    fn from(bbox: BoundingBox<T>) -> Self {
        bbox.points()
    }
}

impl<T: Coord> fmt::Display for BoundingBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.top_left(), self.bottom_right())
    }
}

fn max_of<T: PartialOrd>(a: T, b: T) -> T {
    if b > a {
        b
    } else {
        a
    }
}

fn min_of<T: PartialOrd>(a: T, b: T) -> T {
    if b < a {
        b
    } else {
        a
    }
}

/// Quadrilateral in pixel space, corners ordered TL, TR, BR, BL.
///
/// Decoded symbols are rarely axis aligned, so the decoder reports the four
/// symbol corners rather than a [`BoundingBox`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect<T> {
    pub corners: [Point<T>; 4],
}

impl<T: Coord> Rect<T> {
    pub const fn new(corners: [Point<T>; 4]) -> Self {
        Self { corners }
    }

    /// The axis-aligned rectangle covering `bbox`.
    pub fn from_bounding_box(bbox: &BoundingBox<T>) -> Self {
        let tl = bbox.top_left();
        let br = bbox.bottom_right();
        Self::new([tl, Point::new(br.x, tl.y), br, Point::new(tl.x, br.y)])
    }

    pub fn translate(&self, vector: &Point<T>) -> Self {
        Self {
            corners: self.corners.map(|c| c.translate(vector)),
        }
    }

    /// Smallest axis-aligned box containing all four corners.
    pub fn bounding_box(&self) -> Result<BoundingBox<T>, GeometryError> {
        let first = self.corners[0];
        let (mut lo, mut hi) = (first, first);
        for c in &self.corners[1..] {
            lo = Point::new(min_of(lo.x, c.x), min_of(lo.y, c.y));
            hi = Point::new(max_of(hi.x, c.x), max_of(hi.y, c.y));
        }
        BoundingBox::new(lo, hi)
    }
}

impl<T: fmt::Display> fmt::Display for Rect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = &self.corners;
        write!(f, "[{a}, {b}, {c}, {d}]")
    }
}

/// One named rack position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Coord + Serialize",
    deserialize = "T: Coord + Deserialize<'de>"
))]
pub struct WellRectangle<T> {
    label: String,
    bbox: BoundingBox<T>,
}

impl<T: Coord> WellRectangle<T> {
    pub fn new(label: impl Into<String>, bbox: BoundingBox<T>) -> Self {
        Self {
            label: label.into(),
            bbox,
        }
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn bounding_box(&self) -> &BoundingBox<T> {
        &self.bbox
    }
}

impl WellRectangle<f64> {
    /// Convert an inch-space well into pixel space at `dpi`.
    pub fn to_pixels(&self, dpi: u32) -> Result<WellRectangle<u32>, GeometryError> {
        Ok(WellRectangle::new(self.label.clone(), self.bbox.to_pixels(dpi)?))
    }
}

impl<T: Coord> fmt::Display for WellRectangle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.bbox)
    }
}
