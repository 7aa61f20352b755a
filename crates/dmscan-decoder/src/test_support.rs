//! A stand-in symbol decoder for unit tests.
//!
//! A "symbol" is a solid square painted with gray level `v < 200` on a light
//! background; it decodes to `TUBE-vvv`.

use crate::{DecodeOptions, DecodedSymbol, PrimitiveError, SymbolDecoder};
use dmscan_core::{BoundingBox, Dib, Point, Rect};
use std::collections::BTreeMap;

pub(crate) const INK_LIMIT: u8 = 200;

pub(crate) struct PaintedSymbols;

impl SymbolDecoder for PaintedSymbols {
    fn decode(
        &self,
        image: &Dib,
        options: &DecodeOptions,
    ) -> Result<Option<DecodedSymbol>, PrimitiveError> {
        Ok(self.decode_all(image, options)?.into_iter().next())
    }

    fn decode_all(
        &self,
        image: &Dib,
        _options: &DecodeOptions,
    ) -> Result<Vec<DecodedSymbol>, PrimitiveError> {
        let mut extents: BTreeMap<u8, (Point<u32>, Point<u32>)> = BTreeMap::new();
        for y in 0..image.height() {
            for x in 0..image.width() {
                let Some(v) = image.pixel(x, y).filter(|&v| v < INK_LIMIT) else {
                    continue;
                };
                let e = extents
                    .entry(v)
                    .or_insert((Point::new(x, y), Point::new(x, y)));
                e.0 = Point::new(e.0.x.min(x), e.0.y.min(y));
                e.1 = Point::new(e.1.x.max(x), e.1.y.max(y));
            }
        }
        extents
            .into_iter()
            .map(|(v, (lo, hi))| {
                let bbox = BoundingBox::new(lo, Point::new(hi.x + 1, hi.y + 1))
                    .map_err(|e| PrimitiveError::new(e.to_string()))?;
                Ok(DecodedSymbol {
                    message: format!("TUBE-{v:03}"),
                    rect: Rect::from_bounding_box(&bbox),
                })
            })
            .collect()
    }
}

/// Paint a `size`-pixel square symbol with gray level `value` at `(x, y)`.
pub(crate) fn paint_symbol(image: &mut Dib, x: u32, y: u32, size: u32, value: u8) {
    assert!(value < INK_LIMIT);
    let bbox = BoundingBox::new(Point::new(x, y), Point::new(x + size, y + size)).unwrap();
    image.fill_region(&bbox, value);
}
