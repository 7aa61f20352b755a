use crate::{BoundingBox, ImageError, Point};

/// Owned 8-bit grayscale raster with its scan resolution.
///
/// Pixels are stored row-major, `data.len() == width * height`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dib {
    width: u32,
    height: u32,
    dpi: u32,
    data: Vec<u8>,
}

impl Dib {
    /// Wrap a row-major grayscale buffer.
    pub fn new(width: u32, height: u32, dpi: u32, data: Vec<u8>) -> Result<Self, ImageError> {
        let expected = checked_len(width, height)?;
        if data.len() != expected {
            return Err(ImageError::BufferSize {
                expected,
                got: data.len(),
            });
        }
        if dpi == 0 {
            return Err(ImageError::InvalidDpi { dpi });
        }
        Ok(Self {
            width,
            height,
            dpi,
            data,
        })
    }

    /// An image with every pixel set to `value`.
    pub fn filled(width: u32, height: u32, dpi: u32, value: u8) -> Result<Self, ImageError> {
        let len = checked_len(width, height)?;
        Self::new(width, height, dpi, vec![value; len])
    }

    /// Copy a grayscale buffer from a borrowed slice.
    pub fn from_slice(width: u32, height: u32, dpi: u32, pixels: &[u8]) -> Result<Self, ImageError> {
        let expected = checked_len(width, height)?;
        if pixels.len() != expected {
            return Err(ImageError::BufferSize {
                expected,
                got: pixels.len(),
            });
        }
        Self::new(width, height, dpi, pixels.to_vec())
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Same pixels, different resolution tag.
    pub fn with_dpi(self, dpi: u32) -> Result<Self, ImageError> {
        if dpi == 0 {
            return Err(ImageError::InvalidDpi { dpi });
        }
        Ok(Self { dpi, ..self })
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// One row of pixels.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let w = self.width as usize;
        let start = y as usize * w;
        self.data.get(start..start + w)
    }

    /// Whole image as a pixel-space box.
    pub fn bounds(&self) -> BoundingBox<u32> {
        // Dimensions are validated non-zero at construction.
        BoundingBox::new(Point::new(0, 0), Point::new(self.width, self.height))
            .unwrap_or_else(|_| unreachable!("image dimensions are non-zero"))
    }

    /// Physical size of the image in inches.
    pub fn size_inches(&self) -> (f64, f64) {
        let dpi = f64::from(self.dpi);
        (f64::from(self.width) / dpi, f64::from(self.height) / dpi)
    }

    /// Copy out the part of the image covered by `region`.
    ///
    /// `region` is half-open in pixel space. A region that sticks out of the
    /// image is clipped; one that misses the image entirely is an error. The
    /// source image is never modified.
    pub fn crop(&self, region: &BoundingBox<u32>) -> Result<Dib, ImageError> {
        let clipped = self
            .bounds()
            .intersection(region)
            .ok_or_else(|| ImageError::OutOfBounds {
                region: region.to_string(),
                width: self.width,
                height: self.height,
            })?;

        let x0 = clipped.top_left().x as usize;
        let y0 = clipped.top_left().y;
        let w = clipped.width();
        let h = clipped.height();

        let mut data = Vec::with_capacity(w as usize * h as usize);
        for y in y0..y0 + h {
            let row = self.row(y).ok_or_else(|| ImageError::OutOfBounds {
                region: region.to_string(),
                width: self.width,
                height: self.height,
            })?;
            data.extend_from_slice(&row[x0..x0 + w as usize]);
        }

        Dib::new(w, h, self.dpi, data)
    }

    /// Paint `value` into the part of `region` that overlaps the image.
    pub fn fill_region(&mut self, region: &BoundingBox<u32>, value: u8) {
        let Some(clipped) = self.bounds().intersection(region) else {
            return;
        };
        let w = self.width as usize;
        let [tl, br] = clipped.points();
        for y in tl.y as usize..br.y as usize {
            self.data[y * w + tl.x as usize..y * w + br.x as usize].fill(value);
        }
    }
}

fn checked_len(width: u32, height: u32) -> Result<usize, ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidDimensions { width, height });
    }
    (width as usize)
        .checked_mul(height as usize)
        .ok_or(ImageError::InvalidDimensions { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Dib {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| ((x + 7 * y) % 251) as u8))
            .collect();
        Dib::new(width, height, 300, data).expect("valid image")
    }

    fn bbox(x0: u32, y0: u32, x1: u32, y1: u32) -> BoundingBox<u32> {
        BoundingBox::new(Point::new(x0, y0), Point::new(x1, y1)).unwrap()
    }

    #[test]
    fn rejects_bad_buffers() {
        assert_eq!(
            Dib::new(4, 4, 300, vec![0; 15]),
            Err(ImageError::BufferSize {
                expected: 16,
                got: 15
            })
        );
        assert!(matches!(
            Dib::new(0, 4, 300, vec![]),
            Err(ImageError::InvalidDimensions { .. })
        ));
        assert_eq!(
            Dib::new(1, 1, 0, vec![0]),
            Err(ImageError::InvalidDpi { dpi: 0 })
        );
    }

    #[test]
    fn crop_inside_matches_region_size_and_pixels() {
        let img = gradient(120, 80);
        let region = bbox(10, 20, 40, 35);
        let sub = img.crop(&region).unwrap();

        assert_eq!((sub.width(), sub.height()), (30, 15));
        assert_eq!(sub.dpi(), img.dpi());
        for y in 0..sub.height() {
            for x in 0..sub.width() {
                assert_eq!(sub.pixel(x, y), img.pixel(x + 10, y + 20));
            }
        }
    }

    #[test]
    fn crop_clips_partial_overlap() {
        let img = gradient(50, 50);
        let sub = img.crop(&bbox(40, 45, 70, 90)).unwrap();
        assert_eq!((sub.width(), sub.height()), (10, 5));
        assert_eq!(sub.pixel(0, 0), img.pixel(40, 45));
    }

    #[test]
    fn crop_outside_is_out_of_bounds() {
        let img = gradient(50, 50);
        let err = img.crop(&bbox(60, 0, 80, 10)).unwrap_err();
        assert!(matches!(err, ImageError::OutOfBounds { width: 50, .. }));
    }

    #[test]
    fn crop_leaves_source_untouched() {
        let img = gradient(64, 32);
        let before = img.clone();
        let _ = img.crop(&bbox(0, 0, 32, 16)).unwrap();
        let _ = img.crop(&bbox(16, 8, 64, 32)).unwrap();
        assert_eq!(img, before);
    }

    #[test]
    fn fill_region_paints_only_the_overlap() {
        let mut img = Dib::filled(10, 10, 96, 255).unwrap();
        img.fill_region(&bbox(8, 8, 20, 20), 0);
        assert_eq!(img.pixel(7, 7), Some(255));
        assert_eq!(img.pixel(8, 8), Some(0));
        assert_eq!(img.pixel(9, 9), Some(0));
        assert_eq!(img.data().iter().filter(|&&v| v == 0).count(), 4);
    }

    #[test]
    fn size_in_inches_uses_dpi() {
        let img = Dib::filled(1200, 800, 300, 0).unwrap();
        assert_eq!(img.size_inches(), (4.0, 800.0 / 300.0));
    }
}
