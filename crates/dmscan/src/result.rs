use crate::PassSummary;
use dmscan_core::BoundingBox;
use dmscan_decoder::{DecodedSymbol, WellOutcome};
use serde::{Deserialize, Serialize};

/// Result for one well of a gridded pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WellResult {
    pub label: String,
    /// Well region in image pixels; `None` if it could not be mapped.
    pub bbox: Option<BoundingBox<u32>>,
    #[serde(flatten)]
    pub outcome: WellOutcome,
    pub elapsed_ms: f64,
}

impl WellResult {
    pub fn message(&self) -> Option<&str> {
        self.outcome.message()
    }
}

/// Outcome of a gridded decode pass.
///
/// Wells are kept in the order the caller supplied them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlateScan {
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
    pub wells: Vec<WellResult>,
    pub elapsed_ms: f64,
}

impl PlateScan {
    /// Number of wells with a decoded message.
    pub fn decoded_count(&self) -> usize {
        self.wells.iter().filter(|w| w.outcome.is_decoded()).count()
    }

    /// Result for `label`.
    pub fn get(&self, label: &str) -> Option<&WellResult> {
        self.wells.iter().find(|w| w.label == label)
    }

    /// `(label, message)` for every decoded well, in caller order.
    pub fn decoded_wells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.wells
            .iter()
            .filter_map(|w| w.message().map(|m| (w.label.as_str(), m)))
    }

    pub fn summary(&self) -> PassSummary {
        PassSummary {
            elapsed_ms: self.elapsed_ms,
            ..PassSummary::tally(self.wells.iter().map(|w| &w.outcome))
        }
    }

    /// The symbol decoder failed on every well it was run on.
    pub fn systemic_failure(&self) -> bool {
        self.summary().systemic_failure
    }
}

/// Outcome of a whole-image (non-gridded) decode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageScan {
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
    pub symbols: Vec<DecodedSymbol>,
    pub elapsed_ms: f64,
}
