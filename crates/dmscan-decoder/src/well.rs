//! One well, one unit of work.
//!
//! A [`WellDecoder`] moves through three states: constructed (identity
//! only), running (inside [`WellDecoder::run`]) and completed. The outcome is
//! written exactly once, when the unit completes, so a well that never ran
//! or was abandoned can never expose a half-written result.

use crate::{DecodeError, Decoder};
use dmscan_core::{BoundingBox, Dib, ImageError, Rect, WellRectangle};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Why a well produced no message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum NotDecodedReason {
    /// The region was decoded cleanly and holds no readable symbol.
    NotFound,
    /// The well region does not overlap the image.
    OutOfBounds,
    /// The well geometry could not be mapped into pixel space.
    InvalidGeometry(String),
    /// The symbol decoder failed on this well.
    PrimitiveFailure(String),
    /// The pass was cancelled before this well ran.
    Cancelled,
}

/// Terminal result of one well.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WellOutcome {
    Decoded {
        message: String,
        /// Symbol corners in the coordinates of the full image.
        rect: Rect<u32>,
    },
    NotDecoded {
        reason: NotDecodedReason,
    },
}

impl WellOutcome {
    pub fn is_decoded(&self) -> bool {
        matches!(self, Self::Decoded { .. })
    }

    /// Decoded message, `None` if the well was not decoded.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Decoded { message, .. } => Some(message),
            Self::NotDecoded { .. } => None,
        }
    }

    pub fn not_decoded(reason: NotDecodedReason) -> Self {
        Self::NotDecoded { reason }
    }

    /// Why the well was not decoded, `None` if it was.
    pub fn reason(&self) -> Option<&NotDecodedReason> {
        match self {
            Self::Decoded { .. } => None,
            Self::NotDecoded { reason } => Some(reason),
        }
    }
}

/// Lifecycle of a [`WellDecoder`].
///
/// `Constructed -> Running -> Completed`, or straight to `Completed` when the
/// unit is abandoned. A unit left `Running` had its symbol decoder unwind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WellState {
    Constructed,
    Running,
    Completed,
}

/// Plain-data snapshot of a well decoder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WellDescription {
    pub label: String,
    pub bbox: BoundingBox<u32>,
    pub outcome: Option<WellOutcome>,
}

/// Decodes a single well region of the decoder's working image.
pub struct WellDecoder<'a> {
    decoder: &'a Decoder,
    well: WellRectangle<u32>,
    image: Option<Dib>,
    message: String,
    decoded_rect: Option<Rect<u32>>,
    state: WellState,
    outcome: Option<WellOutcome>,
}

impl<'a> WellDecoder<'a> {
    /// Bind `well` (in pixel coordinates) to a shared decoder.
    pub fn new(decoder: &'a Decoder, well: WellRectangle<u32>) -> Self {
        log::trace!("well decoder for {well}");
        Self {
            decoder,
            well,
            image: None,
            message: String::new(),
            decoded_rect: None,
            state: WellState::Constructed,
            outcome: None,
        }
    }

    #[inline]
    pub fn label(&self) -> &str {
        self.well.label()
    }

    #[inline]
    pub fn bounding_box(&self) -> &BoundingBox<u32> {
        self.well.bounding_box()
    }

    #[inline]
    pub fn state(&self) -> WellState {
        self.state
    }

    /// Crop this well out of the working image and decode it.
    ///
    /// A well without a symbol, outside the image, or on which the symbol
    /// decoder fails still completes normally; the reason ends up in
    /// [`outcome`](Self::outcome). Only running a unit more than once is an
    /// error.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self), fields(label = %self.well.label()))
    )]
    pub fn run(&mut self) -> Result<(), DecodeError> {
        if self.state != WellState::Constructed {
            return Err(DecodeError::Logic("well decoder already started"));
        }
        self.state = WellState::Running;

        let decoder = self.decoder;
        let image = match decoder.working_image().crop(self.well.bounding_box()) {
            Ok(image) => image,
            Err(err @ ImageError::OutOfBounds { .. }) => {
                log::debug!("{}: {err}", self.label());
                self.complete(WellOutcome::not_decoded(NotDecodedReason::OutOfBounds));
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let outcome = match decoder.decode_well_rect(&image, self) {
            Ok(()) => match self.decoded_rect {
                Some(rect) if !self.message.is_empty() => WellOutcome::Decoded {
                    message: self.message.clone(),
                    rect,
                },
                _ => WellOutcome::not_decoded(NotDecodedReason::NotFound),
            },
            Err(err) => WellOutcome::not_decoded(NotDecodedReason::PrimitiveFailure(
                err.to_string(),
            )),
        };
        self.image = Some(image);
        self.complete(outcome);

        match &self.outcome {
            Some(WellOutcome::Decoded { message, .. }) => {
                log::debug!("{}: \"{}\" {}", self.label(), message, self.bounding_box())
            }
            _ => log::debug!("{} - could not be decoded", self.label()),
        }
        Ok(())
    }

    /// Finish this unit without decoding it.
    ///
    /// Works from `Constructed` and from a `Running` unit whose decode
    /// unwound. Any partially recorded message or rectangle is discarded.
    pub fn abandon(&mut self, reason: NotDecodedReason) {
        self.complete(WellOutcome::not_decoded(reason));
    }

    fn complete(&mut self, outcome: WellOutcome) {
        if !outcome.is_decoded() {
            self.message.clear();
            self.decoded_rect = None;
        }
        self.outcome = Some(outcome);
        self.state = WellState::Completed;
    }

    /// Record the decoded message.
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    /// Record where the symbol was found.
    ///
    /// `rect` is in the coordinates of this well's cropped image; it is
    /// stored in the coordinates of the full working image.
    pub fn set_decode_rectangle(&mut self, rect: &Rect<u32>) -> Result<(), DecodeError> {
        let offset = self.well.bounding_box().top_left();
        let fits = rect
            .corners
            .iter()
            .all(|c| c.x.checked_add(offset.x).is_some() && c.y.checked_add(offset.y).is_some());
        if !fits {
            return Err(DecodeError::Logic("decoded rectangle overflows pixel space"));
        }
        self.decoded_rect = Some(rect.translate(&offset));
        Ok(())
    }

    /// Decoded message; empty unless the well decoded.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Where the symbol sits in the full image.
    ///
    /// Only valid after a successful decode; check [`message`](Self::message)
    /// first.
    pub fn decoded_rectangle(&self) -> Result<&Rect<u32>, DecodeError> {
        match (&self.outcome, &self.decoded_rect) {
            (Some(WellOutcome::Decoded { .. }), Some(rect)) => Ok(rect),
            _ => Err(DecodeError::Logic(
                "decoded rectangle requested for a well that was not decoded",
            )),
        }
    }

    /// Cropped well image, present once the unit has run.
    pub fn image(&self) -> Option<&Dib> {
        self.image.as_ref()
    }

    /// Terminal outcome, `None` until the unit completes.
    pub fn outcome(&self) -> Option<&WellOutcome> {
        self.outcome.as_ref()
    }

    pub fn describe(&self) -> WellDescription {
        WellDescription {
            label: self.label().to_string(),
            bbox: *self.bounding_box(),
            outcome: self.outcome.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{paint_symbol, PaintedSymbols};
    use crate::{DecodeOptions, DecodedSymbol, PrimitiveError};
    use dmscan_core::Point;
    use std::sync::Arc;

    fn bbox(x0: u32, y0: u32, x1: u32, y1: u32) -> BoundingBox<u32> {
        BoundingBox::new(Point::new(x0, y0), Point::new(x1, y1)).unwrap()
    }

    fn plate_with_symbol_at(x: u32, y: u32) -> Decoder {
        let mut image = Dib::filled(200, 100, 300, 255).unwrap();
        paint_symbol(&mut image, x, y, 30, 42);
        Decoder::new(
            Arc::new(image),
            DecodeOptions::default(),
            Arc::new(PaintedSymbols),
        )
        .unwrap()
    }

    #[test]
    fn decodes_symbol_and_translates_rectangle() {
        let decoder = plate_with_symbol_at(130, 40);
        let mut well = WellDecoder::new(&decoder, WellRectangle::new("A2", bbox(100, 0, 200, 100)));
        assert_eq!(well.state(), WellState::Constructed);
        assert!(well.image().is_none());

        well.run().unwrap();

        assert_eq!(well.state(), WellState::Completed);
        assert_eq!(well.message(), "TUBE-042");
        let rect = well.decoded_rectangle().unwrap();
        assert_eq!(rect.corners[0], Point::new(130, 40));
        assert_eq!(rect.corners[2], Point::new(160, 70));
        assert!(well.bounding_box().contains(&rect.bounding_box().unwrap()));
        assert_eq!(well.image().map(|i| (i.width(), i.height())), Some((100, 100)));
    }

    #[test]
    fn blank_well_completes_without_message() {
        let decoder = plate_with_symbol_at(130, 40);
        let mut well = WellDecoder::new(&decoder, WellRectangle::new("A1", bbox(0, 0, 100, 100)));
        well.run().unwrap();

        assert_eq!(well.message(), "");
        assert_eq!(
            well.outcome(),
            Some(&WellOutcome::not_decoded(NotDecodedReason::NotFound))
        );
        assert!(matches!(
            well.decoded_rectangle(),
            Err(DecodeError::Logic(_))
        ));
    }

    #[test]
    fn rectangle_before_run_is_a_logic_error() {
        let decoder = plate_with_symbol_at(0, 0);
        let well = WellDecoder::new(&decoder, WellRectangle::new("A1", bbox(0, 0, 50, 50)));
        assert!(matches!(
            well.decoded_rectangle(),
            Err(DecodeError::Logic(_))
        ));
    }

    #[test]
    fn well_outside_image_is_out_of_bounds() {
        let decoder = plate_with_symbol_at(0, 0);
        let mut well =
            WellDecoder::new(&decoder, WellRectangle::new("H12", bbox(300, 300, 400, 400)));
        well.run().unwrap();
        assert_eq!(
            well.outcome(),
            Some(&WellOutcome::not_decoded(NotDecodedReason::OutOfBounds))
        );
    }

    #[test]
    fn primitive_failure_is_captured_per_well() {
        let image = Arc::new(Dib::filled(100, 100, 300, 255).unwrap());
        let broken = |_: &Dib, _: &DecodeOptions| -> Result<Option<DecodedSymbol>, PrimitiveError> {
            Err(PrimitiveError::new("decoder crashed"))
        };
        let decoder = Decoder::new(image, DecodeOptions::default(), Arc::new(broken)).unwrap();
        let mut well = WellDecoder::new(&decoder, WellRectangle::new("C3", bbox(0, 0, 50, 50)));
        well.run().unwrap();

        match well.outcome() {
            Some(WellOutcome::NotDecoded {
                reason: NotDecodedReason::PrimitiveFailure(msg),
            }) => assert!(msg.contains("decoder crashed")),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(well.message(), "");
    }

    #[test]
    fn running_twice_is_rejected() {
        let decoder = plate_with_symbol_at(10, 10);
        let mut well = WellDecoder::new(&decoder, WellRectangle::new("A1", bbox(0, 0, 100, 100)));
        well.run().unwrap();
        assert!(matches!(well.run(), Err(DecodeError::Logic(_))));
        assert_eq!(well.message(), "TUBE-042");
    }

    #[test]
    fn unwinding_decoder_leaves_unit_running_until_abandoned() {
        let image = Arc::new(Dib::filled(100, 100, 300, 255).unwrap());
        let panics = |_: &Dib, _: &DecodeOptions| -> Result<Option<DecodedSymbol>, PrimitiveError> {
            panic!("decoder bug")
        };
        let decoder = Decoder::new(image, DecodeOptions::default(), Arc::new(panics)).unwrap();
        let mut well = WellDecoder::new(&decoder, WellRectangle::new("B2", bbox(0, 0, 50, 50)));

        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| well.run()));
        assert!(unwound.is_err());
        assert_eq!(well.state(), WellState::Running);
        assert!(well.outcome().is_none());
        assert!(matches!(well.run(), Err(DecodeError::Logic(_))));

        well.abandon(NotDecodedReason::PrimitiveFailure("decoder bug".into()));
        assert_eq!(well.state(), WellState::Completed);
        assert!(!well.outcome().unwrap().is_decoded());
    }

    #[test]
    fn abandon_discards_partial_results() {
        let decoder = plate_with_symbol_at(10, 10);
        let mut well = WellDecoder::new(&decoder, WellRectangle::new("A1", bbox(0, 0, 100, 100)));
        well.set_message("half");
        well.set_decode_rectangle(&Rect::from_bounding_box(&bbox(0, 0, 5, 5)))
            .unwrap();
        well.abandon(NotDecodedReason::Cancelled);

        assert_eq!(well.message(), "");
        assert!(well.decoded_rectangle().is_err());
        let described = well.describe();
        assert_eq!(described.label, "A1");
        assert_eq!(
            described.outcome,
            Some(WellOutcome::not_decoded(NotDecodedReason::Cancelled))
        );
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = WellOutcome::not_decoded(NotDecodedReason::PrimitiveFailure("x".into()));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "not_decoded");
        assert_eq!(json["reason"]["kind"], "primitive_failure");
        assert_eq!(json["reason"]["detail"], "x");
    }
}
