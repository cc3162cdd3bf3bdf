use bounce_map_core::{Homography, TableSpec, DEFAULT_EDGE_MARGIN_M};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{FrameObservation, Trajectory};

/// Observation together with its position on the table plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub observation: FrameObservation,
    /// Projected position in table meters.
    pub table: Point2<f64>,
    /// Whether `table` lies on the table grown by the projector margin.
    pub inside: bool,
}

impl TrackPoint {
    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.observation.frame_index
    }

    #[inline]
    pub fn image_y(&self) -> f64 {
        self.observation.image_y
    }

    #[inline]
    pub fn confidence(&self) -> f32 {
        self.observation.confidence
    }
}

/// Maps image-pixel observations onto the table surface.
#[derive(Clone, Copy, Debug)]
pub struct TableProjector {
    homography: Homography,
    table: TableSpec,
    margin: f64,
}

impl TableProjector {
    pub fn new(homography: Homography, table: TableSpec) -> Self {
        Self {
            homography,
            table,
            margin: DEFAULT_EDGE_MARGIN_M,
        }
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    #[inline]
    pub fn homography(&self) -> &Homography {
        &self.homography
    }

    #[inline]
    pub fn table(&self) -> &TableSpec {
        &self.table
    }

    #[inline]
    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn project_point(&self, obs: &FrameObservation) -> TrackPoint {
        let table = self.homography.apply(obs.image_point());
        TrackPoint {
            observation: *obs,
            table,
            inside: self.table.contains(table, self.margin),
        }
    }

    /// Project every observation of `track`, preserving order and gaps.
    pub fn project(&self, track: &Trajectory) -> Vec<TrackPoint> {
        track.iter().map(|o| self.project_point(o)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use bounce_map_core::{compute_homography, CalibrationPoints};

    fn projector() -> TableProjector {
        // 100 px per meter, table drawn axis-aligned at (100, 50).
        let calib = CalibrationPoints::from_pairs(&[
            [100.0, 50.0],
            [374.0, 50.0],
            [374.0, 202.5],
            [100.0, 202.5],
        ])
        .unwrap();
        let table = TableSpec::default();
        TableProjector::new(compute_homography(&calib, &table).unwrap(), table)
    }

    #[test]
    fn projects_pixels_to_meters() {
        let p = projector().project_point(&FrameObservation::new(0, 237.0, 126.25, 0.8));
        assert_abs_diff_eq!(p.table.x, 1.37, epsilon = 1e-9);
        assert_abs_diff_eq!(p.table.y, 0.7625, epsilon = 1e-9);
        assert!(p.inside);
    }

    #[test]
    fn margin_decides_edge_points() {
        // 3 cm left of the TL corner.
        let obs = FrameObservation::new(0, 97.0, 60.0, 0.8);
        assert!(projector().project_point(&obs).inside);
        assert!(!projector().with_margin(0.0).project_point(&obs).inside);
    }

    #[test]
    fn projection_preserves_order_and_gaps() {
        let track = Trajectory::from_observations([
            FrameObservation::new(2, 120.0, 60.0, 0.5),
            FrameObservation::new(9, 500.0, 60.0, 0.5),
        ])
        .unwrap();
        let pts = projector().project(&track);
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[0].frame_index(), 2);
        assert_eq!(pts[1].frame_index(), 9);
        assert!(!pts[1].inside);
    }
}
