//! Table-tennis bounce heatmaps from per-frame ball detections.
//!
//! This crate provides:
//! - stable re-exports of the underlying `bounce-map-*` crates,
//! - frame sources and a replay detector for recorded model output,
//! - [`BounceAnalyzer`], the single-clip pipeline
//!   (detect → accumulate → project → find bounces → aggregate),
//! - [`run_analysis`], which also writes `heatmap.png`, `bounces.csv`,
//!   `report.json` and an optional annotated preview.
//!
//! ## Quickstart
//!
//! ```no_run
//! use bounce_map::{AnalysisConfig, run_analysis};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AnalysisConfig::new("frames/", "detections.json", "calib.json");
//! let report = run_analysis(&config)?;
//! println!("{} bounce(s)", report.bounces.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `bounce_map::core`: table geometry, calibration and homography.
//! - `bounce_map::track`: detector adapter, trajectory, projection, bounces.
//! - `bounce_map::heatmap`: histogram and rendering.

pub use bounce_map_core as core;
pub use bounce_map_heatmap as heatmap;
pub use bounce_map_track as track;

pub use bounce_map_core::{CalibrationPoints, TableSpec};
pub use bounce_map_track::{BounceEvent, BounceParams, DetectorParams};

pub mod csv;
mod error;
pub mod io;
mod pipeline;
pub mod preview;
pub mod replay;
pub mod source;

pub use error::AnalysisError;
pub use io::{AnalysisConfig, AnalysisReport, BounceIoError};
pub use pipeline::{run_analysis, Analysis, AnalyzerParams, BounceAnalyzer};
pub use replay::ReplayDetector;
pub use source::{Frame, FrameSource, ImageSequenceSource, InMemorySource, SourceError, VideoInfo};
