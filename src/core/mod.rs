//! Core library modules for fairgrid
//!
//! This module contains the internal implementation details of the fairgrid library.

pub mod directions;
pub mod error;
pub mod geo;
pub mod grid;
pub mod pipeline;
pub mod render;

// Re-export main types for internal use
pub use directions::{DirectionLookup, DirectionsConfig, HttpDirections, LookupOutcome};
pub use pipeline::{Sample, Survey, SurveyOptions, SurveyReport};
