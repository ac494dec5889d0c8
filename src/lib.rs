//! # Fairgrid Library
//!
//! Samples a spiral grid of points around the midpoint of two locations and
//! asks a transit-directions service how long the commute from each point
//! to both locations takes. The result is one *sample* per grid cell, in
//! spiral order, ready to paint as a red/green parity layer: green where
//! both commutes are short and balanced, red where they are not.
//!
//! Lookups run strictly one at a time - the pipeline exists to be polite to
//! rate-limited directions services, not to be fast.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use fairgrid::GeoPoint;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let home_a = GeoPoint::new(52.4595, 13.3284);
//!     let home_b = GeoPoint::new(52.5433, 13.4128);
//!
//!     // Survey the default 9-ring grid with 1 km spacing.
//!     let (samples, report) = fairgrid::survey(home_a, home_b).await?;
//!     println!("{} samples in {:?}", samples.len(), report.elapsed);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Progress Tracking
//!
//! ```rust,no_run
//! # use fairgrid::GeoPoint;
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (samples, _) = fairgrid::survey_with_progress(
//!         GeoPoint::new(52.4595, 13.3284),
//!         GeoPoint::new(52.5433, 13.4128),
//!         |done, total| {
//!             println!("lookup {}/{}", done, total);
//!         },
//!     )
//!     .await?;
//!     println!("{} samples", samples.len());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use futures::Stream;

// Re-export core types that users might need
pub use crate::core::directions::{DirectionLookup, DirectionsConfig, HttpDirections, LookupOutcome};
pub use crate::core::error::{Error, Result};
pub use crate::core::geo::GeoPoint;
pub use crate::core::grid::{cell_count, GridCell, SpiralWalker};
pub use crate::core::pipeline::{ProgressCallback, Sample, Survey, SurveyOptions, SurveyReport};
pub use crate::core::render::{parity_color, to_geojson, ParityRect};

// Internal modules
mod core;

/// Survey the grid around two locations with default options.
///
/// Uses the HTTP directions backend configured from the environment
/// (`FAIRGRID_API_KEY`). Returns the emitted samples in spiral order along
/// with the run's telemetry.
pub async fn survey(first: GeoPoint, second: GeoPoint) -> Result<(Vec<Sample>, SurveyReport)> {
    survey_with_options(first, second, SurveyOptions::default(), DirectionsConfig::from_env()).await
}

/// Survey with a progress callback receiving `(completed, total)` lookups.
pub async fn survey_with_progress<F>(
    first: GeoPoint,
    second: GeoPoint,
    progress: F,
) -> Result<(Vec<Sample>, SurveyReport)>
where
    F: Fn(u64, u64) + Send + Sync + 'static,
{
    let options = SurveyOptions {
        progress: Some(Arc::new(progress)),
        ..Default::default()
    };
    survey_with_options(first, second, options, DirectionsConfig::from_env()).await
}

/// Survey with full control over pipeline options and the directions
/// backend configuration.
pub async fn survey_with_options(
    first: GeoPoint,
    second: GeoPoint,
    options: SurveyOptions,
    config: DirectionsConfig,
) -> Result<(Vec<Sample>, SurveyReport)> {
    let lookup = HttpDirections::new(config);
    let survey = Survey::new(lookup, first, second, options)?;

    let mut samples = Vec::new();
    let report = survey.run(|sample| samples.push(*sample)).await?;
    Ok((samples, report))
}

/// Survey as a stream of samples, yielded in spiral order.
///
/// Each item is one emitted sample; a run-level failure ends the stream
/// with an `Err` item. Use [`survey_with_options`] when you need the final
/// [`SurveyReport`].
pub fn survey_stream(
    first: GeoPoint,
    second: GeoPoint,
    options: SurveyOptions,
    config: DirectionsConfig,
) -> impl Stream<Item = Result<Sample>> {
    let lookup = HttpDirections::new(config);
    let survey = Survey::new(lookup, first, second, options);

    futures::stream::unfold(Some(survey), |state| async move {
        match state? {
            Err(err) => Some((Err(err), None)),
            Ok(mut survey) => match survey.next_sample().await {
                Ok(Some(sample)) => Some((Ok(sample), Some(Ok(survey)))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            },
        }
    })
}
