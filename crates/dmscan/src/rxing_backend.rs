//! Datamatrix decoding backed by the `rxing` crate.

use dmscan_core::{Dib, Point, Rect};
use dmscan_decoder::{DecodeOptions, DecodedSymbol, PrimitiveError, SymbolDecoder};
use rxing::{BarcodeFormat, DecodeHints, Exceptions};

/// [`SymbolDecoder`] reading datamatrix symbols with `rxing`.
///
/// `rxing` does not expose the edge/square/gap tuning knobs, so only the
/// image is forwarded. A symbol that is missing, or found but unreadable
/// (format, checksum or error-correction failures), counts as no symbol. Any other `rxing` error
/// is a decoder failure.
#[derive(Clone, Copy, Debug, Default)]
pub struct RxingDecoder;

impl RxingDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl SymbolDecoder for RxingDecoder {
    fn decode(
        &self,
        image: &Dib,
        _options: &DecodeOptions,
    ) -> Result<Option<DecodedSymbol>, PrimitiveError> {
        // `helpers::detect_in_luma` swaps width and height; call the hinted
        // form directly.
        let found = rxing::helpers::detect_in_luma_with_hints(
            image.data().to_vec(),
            image.width(),
            image.height(),
            Some(BarcodeFormat::DATA_MATRIX),
            &mut DecodeHints::default(),
        );
        match found {
            Ok(result) => Ok(Some(symbol(image, result.getText(), result.getPoints()))),
            Err(err) => no_symbol(err).map(|()| None),
        }
    }

    fn decode_all(
        &self,
        image: &Dib,
        _options: &DecodeOptions,
    ) -> Result<Vec<DecodedSymbol>, PrimitiveError> {
        match rxing::helpers::detect_multiple_in_luma(
            image.data().to_vec(),
            image.width(),
            image.height(),
        ) {
            Ok(results) => Ok(results
                .iter()
                .filter(|r| *r.getBarcodeFormat() == BarcodeFormat::DATA_MATRIX)
                .map(|r| symbol(image, r.getText(), r.getPoints()))
                .collect()),
            Err(err) => no_symbol(err).map(|()| Vec::new()),
        }
    }
}

/// `Ok` when `err` only means nothing readable was there.
fn no_symbol(err: Exceptions) -> Result<(), PrimitiveError> {
    match err {
        Exceptions::NotFoundException(_)
        | Exceptions::FormatException(_)
        | Exceptions::ChecksumException(_)
        | Exceptions::ReedSolomonException(_) => {
            log::trace!("rxing: {err}");
            Ok(())
        }
        other => Err(PrimitiveError::new(format!("rxing: {other}"))),
    }
}

/// Axis-aligned corners around the reported points, clamped to the image.
fn symbol(image: &Dib, text: &str, points: &[rxing::Point]) -> DecodedSymbol {
    let (w, h) = (image.width() as f32, image.height() as f32);
    let (mut x0, mut y0, mut x1, mut y1) = (w, h, 0.0f32, 0.0f32);
    for p in points {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    if points.is_empty() {
        (x0, y0, x1, y1) = (0.0, 0.0, w, h);
    }
    let clamp = |v: f32, hi: f32| v.clamp(0.0, hi) as u32;
    let tl = Point::new(clamp(x0.floor(), w), clamp(y0.floor(), h));
    let br = Point::new(clamp(x1.ceil(), w), clamp(y1.ceil(), h));
    DecodedSymbol {
        message: text.to_string(),
        rect: Rect::new([tl, Point::new(br.x, tl.y), br, Point::new(tl.x, br.y)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_image_decodes_to_nothing() {
        let image = Dib::filled(64, 64, 300, 255).unwrap();
        let options = DecodeOptions::default();
        assert_eq!(RxingDecoder.decode(&image, &options).unwrap(), None);
        assert!(RxingDecoder.decode_all(&image, &options).unwrap().is_empty());
    }

    #[test]
    fn missing_or_unreadable_symbols_are_not_failures() {
        assert_eq!(no_symbol(Exceptions::NOT_FOUND), Ok(()));
        assert_eq!(no_symbol(Exceptions::FORMAT), Ok(()));
        assert_eq!(no_symbol(Exceptions::CHECKSUM), Ok(()));
        assert_eq!(no_symbol(Exceptions::REED_SOLOMON), Ok(()));
    }

    #[test]
    fn other_rxing_errors_are_decoder_failures() {
        let err = no_symbol(Exceptions::illegal_argument_with("bad luma")).unwrap_err();
        assert!(err.0.contains("bad luma"), "{err}");
        assert!(no_symbol(Exceptions::ILLEGAL_STATE).is_err());
    }

    #[test]
    fn symbol_corners_stay_inside_the_image() {
        let image = Dib::filled(50, 40, 300, 255).unwrap();
        let points = [
            rxing::Point { x: -3.2, y: 5.5 },
            rxing::Point { x: 60.0, y: 5.5 },
            rxing::Point { x: 60.0, y: 30.1 },
        ];
        let sym = symbol(&image, "X", &points);
        assert_eq!(sym.rect.corners[0], Point::new(0, 5));
        assert_eq!(sym.rect.corners[2], Point::new(50, 31));
    }
}
