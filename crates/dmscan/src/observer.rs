//! Structured events emitted while a pass runs.

use dmscan_decoder::{NotDecodedReason, WellOutcome};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One well finished.
#[derive(Clone, Copy, Debug)]
pub struct WellEvent<'a> {
    pub label: &'a str,
    pub outcome: &'a WellOutcome,
    pub elapsed: Duration,
}

/// Totals for a finished pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PassSummary {
    pub wells: usize,
    pub decoded: usize,
    pub not_found: usize,
    pub out_of_bounds: usize,
    pub invalid_geometry: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub elapsed_ms: f64,
    /// Every well the symbol decoder was run on failed with a decoder error.
    pub systemic_failure: bool,
}

impl PassSummary {
    pub(crate) fn tally<'a>(outcomes: impl IntoIterator<Item = &'a WellOutcome>) -> Self {
        let mut s = Self::default();
        for outcome in outcomes {
            s.wells += 1;
            match outcome {
                WellOutcome::Decoded { .. } => s.decoded += 1,
                WellOutcome::NotDecoded { reason } => match reason {
                    NotDecodedReason::NotFound => s.not_found += 1,
                    NotDecodedReason::OutOfBounds => s.out_of_bounds += 1,
                    NotDecodedReason::InvalidGeometry(_) => s.invalid_geometry += 1,
                    NotDecodedReason::PrimitiveFailure(_) => s.failed += 1,
                    NotDecodedReason::Cancelled => s.cancelled += 1,
                },
            }
        }
        s.systemic_failure = s.failed > 0 && s.decoded == 0 && s.not_found == 0;
        s
    }
}

/// Receiver for pass events.
///
/// `well_finished` is called from worker threads as wells complete, in no
/// particular order; `pass_finished` is called once after every well is done.
pub trait ScanObserver: Send + Sync {
    fn well_finished(&self, _event: &WellEvent<'_>) {}

    fn pass_finished(&self, _summary: &PassSummary) {}
}

/// Forwards events to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl ScanObserver for LogObserver {
    fn well_finished(&self, event: &WellEvent<'_>) {
        match event.outcome {
            WellOutcome::Decoded { message, .. } => log::debug!(
                "{}: \"{}\" ({:.1} ms)",
                event.label,
                message,
                event.elapsed.as_secs_f64() * 1e3
            ),
            WellOutcome::NotDecoded { reason } => log::debug!(
                "{}: not decoded, {:?} ({:.1} ms)",
                event.label,
                reason,
                event.elapsed.as_secs_f64() * 1e3
            ),
        }
    }

    fn pass_finished(&self, summary: &PassSummary) {
        log::info!(
            "decoded {}/{} wells in {:.1} ms",
            summary.decoded,
            summary.wells,
            summary.elapsed_ms
        );
        if summary.systemic_failure {
            log::warn!(
                "symbol decoder failed on all {} attempted wells; the image is likely unusable",
                summary.failed
            );
        }
    }
}
