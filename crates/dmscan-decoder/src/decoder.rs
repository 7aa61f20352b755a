use crate::{DecodeError, DecodeOptions, DecodedSymbol, PrimitiveError, SymbolDecoder, WellDecoder};
use dmscan_core::Dib;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Shared, read-only state of one decode pass.
///
/// Holds the working image, the options and the symbol decoder. Nothing in
/// here changes after construction, so any number of [`WellDecoder`]s may
/// use one `Decoder` from different threads.
pub struct Decoder {
    image: Arc<Dib>,
    options: DecodeOptions,
    primitive: Arc<dyn SymbolDecoder>,
}

impl Decoder {
    /// Build a decoder for `image`, validating `options`.
    pub fn new(
        image: Arc<Dib>,
        options: DecodeOptions,
        primitive: Arc<dyn SymbolDecoder>,
    ) -> Result<Self, DecodeError> {
        options.validate()?;
        Ok(Self {
            image,
            options,
            primitive,
        })
    }

    /// Image every well is cropped from.
    #[inline]
    pub fn working_image(&self) -> &Dib {
        &self.image
    }

    #[inline]
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode one well's cropped image and record the result on `well`.
    ///
    /// Finding no symbol leaves `well` untouched and is not an error. An
    /// error means the symbol decoder itself failed or reported a symbol
    /// outside the image it was given.
    pub fn decode_well_rect(
        &self,
        sub_image: &Dib,
        well: &mut WellDecoder<'_>,
    ) -> Result<(), DecodeError> {
        let Some(symbol) = self.primitive.decode(sub_image, &self.options)? else {
            return Ok(());
        };
        check_symbol_inside(&symbol, sub_image)?;
        well.set_message(symbol.message);
        well.set_decode_rectangle(&symbol.rect)?;
        Ok(())
    }

    /// Decode every symbol anywhere in the working image.
    ///
    /// Used when no well layout is available. Symbols are returned in
    /// reading order (top to bottom, then left to right, by first corner);
    /// overlapping detections are passed through as the symbol decoder
    /// reported them.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self),
            fields(width = self.image.width(), height = self.image.height())
        )
    )]
    pub fn decode_image(&self) -> Result<Vec<DecodedSymbol>, DecodeError> {
        let mut symbols = self.primitive.decode_all(&self.image, &self.options)?;
        for symbol in &symbols {
            check_symbol_inside(symbol, &self.image)?;
        }
        symbols.sort_by_key(|s| {
            let p = s.rect.corners[0];
            (p.y, p.x)
        });
        log::info!("whole-image decode found {} symbols", symbols.len());
        Ok(symbols)
    }
}

fn check_symbol_inside(symbol: &DecodedSymbol, image: &Dib) -> Result<(), PrimitiveError> {
    let bounds = image.bounds();
    if symbol.rect.corners.iter().all(|c| bounds.contains_point(c)) {
        Ok(())
    } else {
        Err(PrimitiveError::new(format!(
            "symbol corners {} fall outside the {}x{} image",
            symbol.rect,
            image.width(),
            image.height()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{paint_symbol, PaintedSymbols};
    use dmscan_core::{BoundingBox, Point, Rect};

    fn decoder_for(image: Dib) -> Decoder {
        Decoder::new(
            Arc::new(image),
            DecodeOptions::default(),
            Arc::new(PaintedSymbols),
        )
        .unwrap()
    }

    #[test]
    fn rejects_invalid_options() {
        let image = Arc::new(Dib::filled(10, 10, 300, 255).unwrap());
        let opts = DecodeOptions {
            shrink: 0,
            ..DecodeOptions::default()
        };
        assert!(matches!(
            Decoder::new(image, opts, Arc::new(PaintedSymbols)),
            Err(DecodeError::InvalidOptions(_))
        ));
    }

    #[test]
    fn whole_image_decode_returns_symbols_in_reading_order() {
        let mut image = Dib::filled(300, 200, 300, 255).unwrap();
        paint_symbol(&mut image, 150, 120, 20, 7);
        paint_symbol(&mut image, 20, 10, 20, 3);
        paint_symbol(&mut image, 200, 10, 20, 5);

        let decoder = decoder_for(image);
        let found = decoder.decode_image().unwrap();
        let messages: Vec<&str> = found.iter().map(|s| s.message.as_str()).collect();
        assert_eq!(messages, ["TUBE-003", "TUBE-005", "TUBE-007"]);
        assert_eq!(found[0].rect.corners[0], Point::new(20, 10));
    }

    #[test]
    fn symbol_outside_sub_image_is_a_primitive_failure() {
        let image = Dib::filled(50, 50, 300, 255).unwrap();
        let liar = |_: &Dib, _: &DecodeOptions| -> Result<Option<DecodedSymbol>, PrimitiveError> {
            let bbox = BoundingBox::new(Point::new(40u32, 40), Point::new(90, 90)).unwrap();
            Ok(Some(DecodedSymbol {
                message: "X".to_string(),
                rect: Rect::from_bounding_box(&bbox),
            }))
        };
        let decoder =
            Decoder::new(Arc::new(image), DecodeOptions::default(), Arc::new(liar)).unwrap();
        assert!(matches!(
            decoder.decode_image(),
            Err(DecodeError::Primitive(_))
        ));
    }
}
