//! Reading rack images from disk.

use crate::ScanError;
use dmscan_core::Dib;
use std::fs;
use std::path::Path;

/// Resolution assumed when the file carries none and none is given.
pub const DEFAULT_DPI: u32 = 300;

const INCHES_PER_METRE: f64 = 0.0254;

/// Load any format `image` understands as a grayscale [`Dib`].
///
/// DPI comes from `dpi` if given, otherwise from a Windows bitmap header,
/// otherwise [`DEFAULT_DPI`].
pub fn load_dib(path: impl AsRef<Path>, dpi: Option<u32>) -> Result<Dib, ScanError> {
    let path = path.as_ref();
    let load_err = |reason: String| ScanError::ImageLoad {
        path: path.display().to_string(),
        reason,
    };

    let bytes = fs::read(path).map_err(|e| load_err(e.to_string()))?;
    let gray = image::load_from_memory(&bytes)
        .map_err(|e| load_err(e.to_string()))?
        .to_luma8();

    let dpi = dpi.or_else(|| bmp_dpi(&bytes)).unwrap_or(DEFAULT_DPI);
    let dib = dib_from_gray(&gray, dpi)?;
    log::info!(
        "loaded {}: {}x{} px at {} dpi",
        path.display(),
        dib.width(),
        dib.height(),
        dib.dpi()
    );
    Ok(dib)
}

/// Copy an `image::GrayImage` into a [`Dib`].
pub fn dib_from_gray(gray: &image::GrayImage, dpi: u32) -> Result<Dib, ScanError> {
    Ok(Dib::from_slice(gray.width(), gray.height(), dpi, gray.as_raw())?)
}

/// Horizontal resolution stored in a BMP `BITMAPINFOHEADER`, if any.
pub fn bmp_dpi(bytes: &[u8]) -> Option<u32> {
    if bytes.len() < 46 || &bytes[..2] != b"BM" {
        return None;
    }
    let header_size = u32::from_le_bytes(bytes[14..18].try_into().ok()?);
    if header_size < 40 {
        return None;
    }
    let pixels_per_metre = i32::from_le_bytes(bytes[38..42].try_into().ok()?);
    if pixels_per_metre <= 0 {
        return None;
    }
    let dpi = (f64::from(pixels_per_metre) * INCHES_PER_METRE).round() as u32;
    (dpi > 0).then_some(dpi)
}
