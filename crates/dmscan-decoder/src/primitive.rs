//! The seam to the actual barcode-symbol decoder.

use crate::DecodeOptions;
use dmscan_core::{Dib, Rect};
use serde::{Deserialize, Serialize};

/// The symbol decoder itself failed, as opposed to finding nothing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("decode primitive failed: {0}")]
pub struct PrimitiveError(pub String);

impl PrimitiveError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// A symbol found in an image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedSymbol {
    pub message: String,
    /// Symbol corners in the coordinates of the image that was decoded.
    pub rect: Rect<u32>,
}

/// A barcode decoder operating on a grayscale pixel buffer.
///
/// Implementations are shared by every worker of a decode pass, so they must
/// be safe to call concurrently on different images and must not rely on
/// per-call mutable state.
pub trait SymbolDecoder: Send + Sync {
    /// Find at most one symbol in `image`.
    ///
    /// Returns `Ok(None)` when the image holds no readable symbol.
    fn decode(
        &self,
        image: &Dib,
        options: &DecodeOptions,
    ) -> Result<Option<DecodedSymbol>, PrimitiveError>;

    /// Find every symbol in `image`.
    ///
    /// The default reports at most the single symbol found by [`decode`].
    ///
    /// [`decode`]: SymbolDecoder::decode
    fn decode_all(
        &self,
        image: &Dib,
        options: &DecodeOptions,
    ) -> Result<Vec<DecodedSymbol>, PrimitiveError> {
        Ok(self.decode(image, options)?.into_iter().collect())
    }
}

impl<F> SymbolDecoder for F
where
    F: Fn(&Dib, &DecodeOptions) -> Result<Option<DecodedSymbol>, PrimitiveError> + Send + Sync,
{
    fn decode(
        &self,
        image: &Dib,
        options: &DecodeOptions,
    ) -> Result<Option<DecodedSymbol>, PrimitiveError> {
        self(image, options)
    }
}
