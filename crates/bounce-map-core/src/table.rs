use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Length of a regulation table along the TL→TR calibration edge, in meters.
pub const TABLE_WIDTH_M: f64 = 2.74;
/// Width of a regulation table along the TL→BL calibration edge, in meters.
pub const TABLE_HEIGHT_M: f64 = 1.525;
/// Tolerance applied around the table footprint when gating bounce candidates.
pub const DEFAULT_EDGE_MARGIN_M: f64 = 0.05;

/// Physical table rectangle in table-plane meters.
///
/// The table frame has its origin at the top-left calibration corner, `x`
/// running towards the top-right corner and `y` towards the bottom-left one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub width_m: f64,
    pub height_m: f64,
}

impl Default for TableSpec {
    fn default() -> Self {
        Self {
            width_m: TABLE_WIDTH_M,
            height_m: TABLE_HEIGHT_M,
        }
    }
}

impl TableSpec {
    /// Table corners in TL, TR, BR, BL order.
    pub fn corners(&self) -> [Point2<f64>; 4] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(self.width_m, 0.0),
            Point2::new(self.width_m, self.height_m),
            Point2::new(0.0, self.height_m),
        ]
    }

    /// Whether `p` lies inside the table grown by `margin` on every side.
    ///
    /// Both axes are tested independently against `[-margin, dim + margin]`.
    #[inline]
    pub fn contains(&self, p: Point2<f64>, margin: f64) -> bool {
        (-margin..=self.width_m + margin).contains(&p.x)
            && (-margin..=self.height_m + margin).contains(&p.y)
    }

    pub fn is_valid(&self) -> bool {
        self.width_m.is_finite()
            && self.height_m.is_finite()
            && self.width_m > 0.0
            && self.height_m > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn margin_extends_each_axis_independently() {
        let table = TableSpec::default();
        assert!(table.contains(Point2::new(0.0, 0.0), 0.0));
        assert!(table.contains(Point2::new(TABLE_WIDTH_M, TABLE_HEIGHT_M), 0.0));
        assert!(!table.contains(Point2::new(-0.01, 0.5), 0.0));
        assert!(table.contains(Point2::new(-0.04, 0.5), 0.05));
        assert!(table.contains(Point2::new(2.78, 1.56), 0.05));
        assert!(!table.contains(Point2::new(2.80, 0.5), 0.05));
        assert!(!table.contains(Point2::new(1.0, -0.06), 0.05));
    }

    #[test]
    fn nan_is_never_inside() {
        let table = TableSpec::default();
        assert!(!table.contains(Point2::new(f64::NAN, 0.5), 1.0));
    }
}
