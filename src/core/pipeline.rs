//! Sequential sampling pipeline
//!
//! Drives the spiral walker over the grid, issuing two strictly ordered
//! duration lookups per cell through the [`DirectionLookup`] collaborator.
//! At most one lookup is ever in flight: the second lookup of a cell starts
//! only after the first resolves, and the walker only advances after the
//! cell's sample is emitted. This trades throughput for staying friendly to
//! the service's rate limits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::core::directions::{DirectionLookup, LookupOutcome};
use crate::core::error::{Error, Result};
use crate::core::geo::{cell_to_point, GeoPoint};
use crate::core::grid::{cell_count, GridCell, SpiralWalker};

/// Progress callback: (completed lookups, total lookups)
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Options for a survey run
pub struct SurveyOptions {
    /// Kilometers between adjacent grid lines
    pub spacing_km: f64,

    /// Process rings `0..max_ring`; the walker stops once its ring index
    /// reaches this bound
    pub max_ring: u32,

    /// Delay before retrying a rate-limited lookup
    pub backoff: Duration,

    /// Retries per lookup before giving the cell up as failed.
    /// `None` retries forever, which can starve the run if the service
    /// never stops rate-limiting.
    pub max_retries: Option<u32>,

    /// Checked at every suspension point; cancelling aborts the run
    pub cancel: CancellationToken,

    /// Optional progress callback, fired once per resolved lookup
    pub progress: Option<ProgressCallback>,
}

impl Default for SurveyOptions {
    fn default() -> Self {
        Self {
            spacing_km: 1.0,
            max_ring: 9,
            backoff: Duration::from_millis(1000),
            max_retries: Some(30),
            cancel: CancellationToken::new(),
            progress: None,
        }
    }
}

/// One grid point with its two resolved travel durations.
///
/// A `None` duration is the "unknown" sentinel: the service reported that
/// no transit route exists for that leg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Grid coordinates relative to the survey center
    pub cell: GridCell,
    /// The cell projected onto the map
    pub point: GeoPoint,
    /// Seconds of travel to the first location
    pub to_first: Option<u32>,
    /// Seconds of travel to the second location
    pub to_second: Option<u32>,
}

impl Sample {
    /// Combined travel time, counting unknown legs as `cap` (worst case).
    pub fn total_seconds(&self, cap: u32) -> u32 {
        let first = self.to_first.unwrap_or(cap);
        let second = self.to_second.unwrap_or(cap);
        first.saturating_add(second)
    }
}

/// Telemetry for one survey run, owned by the pipeline instance
#[derive(Debug, Clone, Default)]
pub struct SurveyReport {
    /// Samples emitted
    pub samples: u64,
    /// Lookups issued, retries included
    pub lookups: u64,
    /// Rate-limit responses that triggered a backoff
    pub rate_limit_retries: u64,
    /// Legs that resolved to the no-route sentinel
    pub no_route_legs: u64,
    /// Cells given up after exhausting the retry budget; no sample was
    /// emitted for these
    pub failed_cells: Vec<GridCell>,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

// Outcome of one leg after retries are spent.
enum Leg {
    Known(u32),
    Unknown,
    Exhausted,
}

/// The sampling pipeline: one walker, one lookup backend, one run.
///
/// Created with the two locations being compared; the grid is centered on
/// their midpoint unless [`Survey::with_center`] overrides it.
pub struct Survey<L> {
    lookup: L,
    first: GeoPoint,
    second: GeoPoint,
    center: GeoPoint,
    options: SurveyOptions,
    walker: SpiralWalker,
    pending_advance: bool,
    completed_lookups: u64,
    total_lookups: u64,
    started: Instant,
    report: SurveyReport,
}

impl<L: DirectionLookup> Survey<L> {
    /// Create a survey of the grid around the midpoint of `first` and
    /// `second`.
    pub fn new(lookup: L, first: GeoPoint, second: GeoPoint, options: SurveyOptions) -> Result<Self> {
        if !options.spacing_km.is_finite() || options.spacing_km <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "grid spacing must be positive, got {}",
                options.spacing_km
            )));
        }
        for point in [first, second] {
            if !point.lat.is_finite() || !point.lng.is_finite() {
                return Err(Error::InvalidInput(format!(
                    "location ({}, {}) is not a finite coordinate",
                    point.lat, point.lng
                )));
            }
        }

        let center = GeoPoint::midpoint(first, second);
        let total_lookups = cell_count(options.max_ring) * 2;
        Ok(Self {
            lookup,
            first,
            second,
            center,
            options,
            walker: SpiralWalker::new(),
            pending_advance: false,
            completed_lookups: 0,
            total_lookups,
            started: Instant::now(),
            report: SurveyReport::default(),
        })
    }

    /// Override the grid center (defaults to the midpoint).
    pub fn with_center(mut self, center: GeoPoint) -> Self {
        self.center = center;
        self
    }

    /// The grid center this survey samples around.
    pub fn center(&self) -> GeoPoint {
        self.center
    }

    /// Drive the whole traversal, invoking `on_sample` once per visited
    /// cell, in spiral order, before the walker advances past that cell.
    pub async fn run<F>(mut self, mut on_sample: F) -> Result<SurveyReport>
    where
        F: FnMut(&Sample),
    {
        while let Some(sample) = self.next_sample().await? {
            on_sample(&sample);
        }
        self.report.elapsed = self.started.elapsed();
        Ok(self.report)
    }

    /// Process cells until the next emitted sample, or `None` when the
    /// traversal is complete. Cells that exhaust their retry budget are
    /// recorded in the report and skipped.
    pub async fn next_sample(&mut self) -> Result<Option<Sample>> {
        if self.pending_advance {
            self.pending_advance = false;
            self.walker.advance();
        }

        while self.walker.ring_index() < self.options.max_ring {
            if self.options.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let cell = self.walker.current();
            let point = cell_to_point(self.center, self.options.spacing_km, cell);
            debug!(
                "sampling cell ({}, {}) ring {} at ({:.5}, {:.5})",
                cell.x,
                cell.y,
                self.walker.ring_index(),
                point.lat,
                point.lng
            );

            let first_leg = self.lookup_leg(cell, point, self.first).await?;
            let to_first = match first_leg {
                Leg::Known(seconds) => Some(seconds),
                Leg::Unknown => None,
                Leg::Exhausted => {
                    self.fail_cell(cell, 2);
                    continue;
                }
            };

            let second_leg = self.lookup_leg(cell, point, self.second).await?;
            let to_second = match second_leg {
                Leg::Known(seconds) => Some(seconds),
                Leg::Unknown => None,
                Leg::Exhausted => {
                    self.fail_cell(cell, 1);
                    continue;
                }
            };

            let sample = Sample {
                cell,
                point,
                to_first,
                to_second,
            };
            self.report.samples += 1;
            // Emit before advancing; the next call moves the walker on.
            self.pending_advance = true;
            return Ok(Some(sample));
        }

        Ok(None)
    }

    // One leg of a cell: retry the same (from, to) pair on rate limiting,
    // fixed backoff, without touching the walker or the other leg.
    async fn lookup_leg(&mut self, cell: GridCell, from: GeoPoint, to: GeoPoint) -> Result<Leg> {
        let mut retries = 0u32;

        loop {
            if self.options.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            self.report.lookups += 1;
            let outcome = self.lookup.travel_duration(from, to).await;
            match outcome {
                Ok(LookupOutcome::Duration(seconds)) => {
                    self.bump_progress(1);
                    return Ok(Leg::Known(seconds));
                }
                Ok(LookupOutcome::NoRoute) => {
                    self.report.no_route_legs += 1;
                    self.bump_progress(1);
                    return Ok(Leg::Unknown);
                }
                Ok(LookupOutcome::RateLimited) => {
                    self.report.rate_limit_retries += 1;
                    retries += 1;
                    if let Some(max) = self.options.max_retries {
                        if retries > max {
                            return Ok(Leg::Exhausted);
                        }
                    }
                    debug!(
                        "rate limited at cell ({}, {}), retry {} after {:?}",
                        cell.x, cell.y, retries, self.options.backoff
                    );
                    tokio::select! {
                        _ = self.options.cancel.cancelled() => return Err(Error::Cancelled),
                        _ = tokio::time::sleep(self.options.backoff) => {}
                    }
                }
                Err(err) => {
                    return Err(Error::Lookup {
                        cell,
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    // Give a cell up: record it, keep the progress bar honest about the
    // legs that will never resolve, move on.
    fn fail_cell(&mut self, cell: GridCell, skipped_legs: u64) {
        warn!(
            "giving up on cell ({}, {}) after retry budget exhausted",
            cell.x, cell.y
        );
        self.report.failed_cells.push(cell);
        self.bump_progress(skipped_legs);
        self.walker.advance();
    }

    fn bump_progress(&mut self, legs: u64) {
        self.completed_lookups += legs;
        if let Some(progress) = &self.options.progress {
            progress(self.completed_lookups, self.total_lookups);
        }
    }
}
