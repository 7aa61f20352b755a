//! Per-well datamatrix decoding.
//!
//! A [`Decoder`] owns the shared working image, the [`DecodeOptions`] and a
//! [`SymbolDecoder`] implementation. One [`WellDecoder`] per rack position
//! crops its region out of the working image and hands it to the decoder;
//! the result is translated back into full-image coordinates.
//!
//! The symbol decoder itself is pluggable: anything implementing
//! [`SymbolDecoder`] (including a plain closure) can be used.

mod cancel;
mod decoder;
mod error;
mod options;
mod primitive;
mod well;

#[cfg(test)]
mod test_support;

pub use cancel::CancelToken;
pub use decoder::Decoder;
pub use error::DecodeError;
pub use options::DecodeOptions;
pub use primitive::{DecodedSymbol, PrimitiveError, SymbolDecoder};
pub use well::{NotDecodedReason, WellDecoder, WellDescription, WellOutcome, WellState};
