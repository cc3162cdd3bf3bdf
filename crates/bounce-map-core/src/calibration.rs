//! Four-corner table calibration.
//!
//! The user clicks the table corners once per video in TL, TR, BR, BL order.
//! The points are persisted as a small JSON record (`{"points": [[x, y], ...]}`)
//! and turned into an image-to-table homography before any frame is processed.

use std::{fs, path::Path};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{homography_from_4pt, Homography, TableSpec};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Twice the triangle area (px²) under which three corners count as collinear.
const MIN_TRIANGLE_AREA2: f64 = 1e-6;

/// Errors raised while loading or validating a table calibration.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error("expected exactly 4 calibration points (TL, TR, BR, BL), got {got}")]
    PointCount { got: usize },
    #[error("calibration point {index} is not finite")]
    NonFinite { index: usize },
    #[error("calibration corners {a}, {b} and {c} are collinear or coincident")]
    Degenerate {
        a: CornerLabel,
        b: CornerLabel,
        c: CornerLabel,
    },
    #[error("calibration homography is singular")]
    Singular,
    #[error("invalid table dimensions {width_m} x {height_m} m")]
    InvalidTable { width_m: f64, height_m: f64 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Calibration corner names, in click order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CornerLabel {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl CornerLabel {
    pub const ORDER: [CornerLabel; 4] = [
        CornerLabel::TopLeft,
        CornerLabel::TopRight,
        CornerLabel::BottomRight,
        CornerLabel::BottomLeft,
    ];

    pub fn short(&self) -> &'static str {
        match self {
            CornerLabel::TopLeft => "TL",
            CornerLabel::TopRight => "TR",
            CornerLabel::BottomRight => "BR",
            CornerLabel::BottomLeft => "BL",
        }
    }
}

impl std::fmt::Display for CornerLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short())
    }
}

/// Wire form of the calibration record. `img_pts` is the key older tooling wrote.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CalibrationRecord {
    #[serde(alias = "img_pts")]
    points: Vec<[f64; 2]>,
}

/// Image-pixel table corners in TL, TR, BR, BL order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CalibrationRecord", into = "CalibrationRecord")]
pub struct CalibrationPoints {
    points: [Point2<f64>; 4],
}

impl CalibrationPoints {
    pub fn new(points: [Point2<f64>; 4]) -> Self {
        Self { points }
    }

    /// Build from raw `[x, y]` pairs, checking the count.
    pub fn from_pairs(pairs: &[[f64; 2]]) -> Result<Self, CalibrationError> {
        let points: [[f64; 2]; 4] = pairs
            .try_into()
            .map_err(|_| CalibrationError::PointCount { got: pairs.len() })?;
        Ok(Self::new(points.map(|[x, y]| Point2::new(x, y))))
    }

    #[inline]
    pub fn points(&self) -> &[Point2<f64>; 4] {
        &self.points
    }

    pub fn corner(&self, label: CornerLabel) -> Point2<f64> {
        self.points[label as usize]
    }

    /// Reject non-finite or collinear/coincident corner configurations.
    ///
    /// Every triple of corners must span a triangle of non-zero area;
    /// otherwise the table plane cannot be recovered.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        for (index, p) in self.points.iter().enumerate() {
            if !p.x.is_finite() || !p.y.is_finite() {
                return Err(CalibrationError::NonFinite { index });
            }
        }

        const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
        for [i, j, k] in TRIPLES {
            let (a, b, c) = (self.points[i], self.points[j], self.points[k]);
            let area2 = ((b - a).perp(&(c - a))).abs();
            if area2 < MIN_TRIANGLE_AREA2 {
                return Err(CalibrationError::Degenerate {
                    a: CornerLabel::ORDER[i],
                    b: CornerLabel::ORDER[j],
                    c: CornerLabel::ORDER[k],
                });
            }
        }
        Ok(())
    }

    /// Load a calibration record from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Parse a calibration record, mapping a wrong point count to
    /// [`CalibrationError::PointCount`] rather than a JSON error.
    pub fn from_json_str(raw: &str) -> Result<Self, CalibrationError> {
        let record: CalibrationRecord = serde_json::from_str(raw)?;
        Self::try_from(record)
    }

    /// Write this calibration to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CalibrationError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl TryFrom<CalibrationRecord> for CalibrationPoints {
    type Error = CalibrationError;

    fn try_from(record: CalibrationRecord) -> Result<Self, Self::Error> {
        Self::from_pairs(&record.points)
    }
}

impl From<CalibrationPoints> for CalibrationRecord {
    fn from(value: CalibrationPoints) -> Self {
        Self {
            points: value.points.iter().map(|p| [p.x, p.y]).collect(),
        }
    }
}

/// Compute the image-to-table homography for a calibrated view.
///
/// The destination rectangle is `(0,0), (W,0), (W,H), (0,H)` in meters,
/// taken from `table`. Degenerate inputs fail here, before any frame work.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(points)))]
pub fn compute_homography(
    points: &CalibrationPoints,
    table: &TableSpec,
) -> Result<Homography, CalibrationError> {
    if !table.is_valid() {
        return Err(CalibrationError::InvalidTable {
            width_m: table.width_m,
            height_m: table.height_m,
        });
    }
    points.validate()?;

    let h = homography_from_4pt(points.points(), &table.corners())
        .ok_or(CalibrationError::Singular)?;
    log::debug!("table homography: {:?}", h.to_array());
    Ok(h)
}
