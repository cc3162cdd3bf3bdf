//! Core types and utilities for table-tennis bounce analysis.
//!
//! This crate is intentionally small and purely geometric. It knows about the
//! physical table, the four-corner calibration and the image-to-table
//! homography, but nothing about detectors, videos or heatmaps.

mod calibration;
mod homography;
mod logger;
mod table;

pub use calibration::{compute_homography, CalibrationError, CalibrationPoints, CornerLabel};
pub use homography::{homography_from_4pt, Homography, PROJECTION_EPS};
pub use table::{TableSpec, DEFAULT_EDGE_MARGIN_M, TABLE_HEIGHT_M, TABLE_WIDTH_M};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
