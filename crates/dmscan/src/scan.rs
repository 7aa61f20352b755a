//! The decode pass: one working image, many wells, a bounded worker pool.

use crate::{ImageScan, LogObserver, PassSummary, PlateScan, ScanError, ScanObserver, WellEvent, WellResult};
use dmscan_core::{Dib, WellRectangle};
use dmscan_decoder::{
    CancelToken, DecodeOptions, Decoder, NotDecodedReason, SymbolDecoder, WellDecoder, WellOutcome,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Orchestrator settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmScanConfig {
    /// Worker threads; `None` uses one per available CPU.
    #[serde(default)]
    pub workers: Option<usize>,
}

impl DmScanConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }
}

/// Decodes rack images well by well.
///
/// Owns the worker pool and the symbol decoder; both are reused across
/// passes.
pub struct DmScanLib {
    pool: rayon::ThreadPool,
    primitive: Arc<dyn SymbolDecoder>,
    observer: Arc<dyn ScanObserver>,
}

struct WellTask<'a> {
    unit: WellDecoder<'a>,
    elapsed: Duration,
}

impl DmScanLib {
    /// Orchestrator with one worker per CPU.
    pub fn new(primitive: Arc<dyn SymbolDecoder>) -> Result<Self, ScanError> {
        Self::with_config(DmScanConfig::default(), primitive)
    }

    pub fn with_config(
        config: DmScanConfig,
        primitive: Arc<dyn SymbolDecoder>,
    ) -> Result<Self, ScanError> {
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|i| format!("dmscan-well-{i}"));
        if let Some(workers) = config.workers {
            builder = builder.num_threads(workers.max(1));
        }
        let pool = builder.build()?;
        log::debug!("decode pool with {} workers", pool.current_num_threads());
        Ok(Self {
            pool,
            primitive,
            observer: Arc::new(LogObserver),
        })
    }

    /// Replace the default [`LogObserver`].
    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Decode every well of `wells` (in inches) in `image`.
    pub fn decode_wells(
        &self,
        image: Dib,
        options: DecodeOptions,
        wells: &[WellRectangle<f64>],
    ) -> Result<PlateScan, ScanError> {
        self.decode_wells_with_cancel(image, options, wells, &CancelToken::new())
    }

    /// Like [`decode_wells`](Self::decode_wells), stopping early once
    /// `cancel` fires. Wells that had not started end up `Cancelled`.
    ///
    /// The pass fails only if the options are invalid, labels repeat, or no
    /// well both converts to pixels and overlaps the image; anything else is
    /// reported per well.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip_all,
            fields(width = image.width(), height = image.height(), wells = wells.len())
        )
    )]
    pub fn decode_wells_with_cancel(
        &self,
        image: Dib,
        options: DecodeOptions,
        wells: &[WellRectangle<f64>],
        cancel: &CancelToken,
    ) -> Result<PlateScan, ScanError> {
        let started = Instant::now();
        check_unique_labels(wells)?;

        let (width, height, dpi) = (image.width(), image.height(), image.dpi());
        let bounds = image.bounds();
        let mut results: Vec<Option<WellResult>> = Vec::with_capacity(wells.len());
        let mut pixel_wells = Vec::with_capacity(wells.len());
        for (index, well) in wells.iter().enumerate() {
            match well.to_pixels(dpi) {
                Ok(px) if bounds.intersection(px.bounding_box()).is_none() => {
                    log::warn!("{}: {} lies outside the image", well.label(), px.bounding_box());
                    results.push(Some(WellResult {
                        label: well.label().to_string(),
                        bbox: Some(*px.bounding_box()),
                        outcome: WellOutcome::not_decoded(NotDecodedReason::OutOfBounds),
                        elapsed_ms: 0.0,
                    }));
                }
                Ok(px) => {
                    pixel_wells.push((index, px));
                    results.push(None);
                }
                Err(err) => {
                    log::warn!("{}: {err}", well.label());
                    results.push(Some(WellResult {
                        label: well.label().to_string(),
                        bbox: None,
                        outcome: WellOutcome::not_decoded(NotDecodedReason::InvalidGeometry(
                            err.to_string(),
                        )),
                        elapsed_ms: 0.0,
                    }));
                }
            }
        }
        if pixel_wells.is_empty() {
            return Err(ScanError::NoValidWells);
        }

        let decoder = Decoder::new(Arc::new(image), options, Arc::clone(&self.primitive))?;
        let (indices, mut tasks): (Vec<usize>, Vec<WellTask<'_>>) = pixel_wells
            .into_iter()
            .map(|(index, px)| {
                let task = WellTask {
                    unit: WellDecoder::new(&decoder, px),
                    elapsed: Duration::ZERO,
                };
                (index, task)
            })
            .unzip();

        let observer = self.observer.as_ref();
        // `install` returns only after every task has run.
        self.pool.install(|| {
            tasks
                .par_iter_mut()
                .for_each(|task| run_task(task, cancel, observer));
        });

        for (index, task) in indices.into_iter().zip(tasks) {
            let unit = task.unit;
            let outcome = unit.outcome().cloned().unwrap_or_else(|| {
                WellOutcome::not_decoded(NotDecodedReason::PrimitiveFailure(
                    "well task did not complete".to_string(),
                ))
            });
            results[index] = Some(WellResult {
                label: unit.label().to_string(),
                bbox: Some(*unit.bounding_box()),
                outcome,
                elapsed_ms: task.elapsed.as_secs_f64() * 1e3,
            });
        }

        let scan = PlateScan {
            width,
            height,
            dpi,
            wells: results.into_iter().flatten().collect(),
            elapsed_ms: started.elapsed().as_secs_f64() * 1e3,
        };
        self.observer.pass_finished(&scan.summary());
        Ok(scan)
    }

    /// Decode every symbol in `image` without a well layout.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(width = image.width(), height = image.height()))
    )]
    pub fn decode_image(&self, image: Dib, options: DecodeOptions) -> Result<ImageScan, ScanError> {
        let started = Instant::now();
        let (width, height, dpi) = (image.width(), image.height(), image.dpi());
        let decoder = Decoder::new(Arc::new(image), options, Arc::clone(&self.primitive))?;
        let symbols = self.pool.install(|| decoder.decode_image())?;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1e3;
        self.observer.pass_finished(&PassSummary {
            wells: symbols.len(),
            decoded: symbols.len(),
            elapsed_ms,
            ..PassSummary::default()
        });
        Ok(ImageScan {
            width,
            height,
            dpi,
            symbols,
            elapsed_ms,
        })
    }

    /// Load `path` and decode `wells` in it.
    ///
    /// The image's own DPI is used unless `dpi` is given.
    #[cfg(feature = "image")]
    pub fn decode_image_wells(
        &self,
        path: impl AsRef<std::path::Path>,
        dpi: Option<u32>,
        options: DecodeOptions,
        wells: &[WellRectangle<f64>],
    ) -> Result<PlateScan, ScanError> {
        let image = crate::load::load_dib(path, dpi)?;
        self.decode_wells(image, options, wells)
    }

    /// Load `path` and decode every symbol in it.
    #[cfg(feature = "image")]
    pub fn decode_image_file(
        &self,
        path: impl AsRef<std::path::Path>,
        dpi: Option<u32>,
        options: DecodeOptions,
    ) -> Result<ImageScan, ScanError> {
        let image = crate::load::load_dib(path, dpi)?;
        self.decode_image(image, options)
    }
}

fn check_unique_labels(wells: &[WellRectangle<f64>]) -> Result<(), ScanError> {
    let mut seen = HashSet::with_capacity(wells.len());
    for well in wells {
        if !seen.insert(well.label()) {
            return Err(ScanError::DuplicateLabel(well.label().to_string()));
        }
    }
    Ok(())
}

fn run_task(task: &mut WellTask<'_>, cancel: &CancelToken, observer: &dyn ScanObserver) {
    let started = Instant::now();
    if cancel.is_cancelled() {
        task.unit.abandon(NotDecodedReason::Cancelled);
    } else {
        // The unit only publishes its outcome at the very end of `run`, and
        // `abandon` discards anything recorded before a panic.
        match catch_unwind(AssertUnwindSafe(|| task.unit.run())) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                log::error!("{}: {err}", task.unit.label());
                task.unit
                    .abandon(NotDecodedReason::PrimitiveFailure(err.to_string()));
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                log::error!("{}: symbol decoder panicked: {reason}", task.unit.label());
                task.unit.abandon(NotDecodedReason::PrimitiveFailure(format!(
                    "symbol decoder panicked: {reason}"
                )));
            }
        }
    }
    task.elapsed = started.elapsed();

    if let Some(outcome) = task.unit.outcome() {
        observer.well_finished(&WellEvent {
            label: task.unit.label(),
            outcome,
            elapsed: task.elapsed,
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
