//! Trajectory side of the bounce pipeline.
//!
//! - [`detect_best`] reduces one frame's detector output to at most one
//!   [`FrameObservation`],
//! - [`Trajectory`] accumulates observations into a sparse, frame-ordered track,
//! - [`TableProjector`] maps the track onto the table plane,
//! - [`BounceDetector`] turns the projected track into [`BounceEvent`]s.
//!
//! The default bounce heuristic is [`LocalMaxBounceDetector`]; alternative
//! heuristics plug in through the [`BounceDetector`] trait without touching
//! calibration or aggregation.

mod bounce;
mod detection;
mod error;
mod projector;
mod trajectory;

pub use bounce::{
    effective_frame_rate, find_bounces, BounceDetector, BounceEvent, BounceParams, BounceScan,
    BounceStats, LocalMaxBounceDetector, FALLBACK_FRAME_RATE,
};
pub use detection::{
    detect_best, detect_best_with_box, select_best, BallBox, BallDetector, Detection,
    DetectorParams,
};
pub use error::TrackError;
pub use projector::{TableProjector, TrackPoint};
pub use trajectory::{FrameObservation, Trajectory};
