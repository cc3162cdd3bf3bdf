use bounce_map_core::TableSpec;
use bounce_map_track::BounceEvent;
use serde::{Deserialize, Serialize};

/// Histogram shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapParams {
    /// Bins along the table length (TL→TR).
    pub bins_x: usize,
    /// Bins along the table width (TL→BL).
    pub bins_y: usize,
}

impl Default for HeatmapParams {
    fn default() -> Self {
        Self {
            bins_x: 30,
            bins_y: 17,
        }
    }
}

/// Raw bounce counts over `[0, width_m] x [0, height_m]`, row-major by `iy`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeatmapBins {
    pub bins_x: usize,
    pub bins_y: usize,
    pub table: TableSpec,
    pub counts: Vec<u32>,
}

impl HeatmapBins {
    /// All-zero histogram. A zero bin count on either axis is raised to 1.
    pub fn empty(table: TableSpec, params: HeatmapParams) -> Self {
        let bins_x = params.bins_x.max(1);
        let bins_y = params.bins_y.max(1);
        Self {
            bins_x,
            bins_y,
            table,
            counts: vec![0; bins_x * bins_y],
        }
    }

    #[inline]
    pub fn count(&self, ix: usize, iy: usize) -> Option<u32> {
        if ix >= self.bins_x || iy >= self.bins_y {
            return None;
        }
        Some(self.counts[iy * self.bins_x + ix])
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    pub fn max_count(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// Bin holding table position `(x, y)`.
    ///
    /// Bins are half-open except the last one per axis, which also takes the
    /// far edge. Positions outside the table (allowed by the edge margin) are
    /// clamped into the border bin so no event is ever dropped.
    pub fn bin_of(&self, x: f64, y: f64) -> (usize, usize) {
        (
            axis_bin(x, self.table.width_m, self.bins_x),
            axis_bin(y, self.table.height_m, self.bins_y),
        )
    }

    fn add(&mut self, x: f64, y: f64) {
        let (ix, iy) = self.bin_of(x, y);
        self.counts[iy * self.bins_x + ix] += 1;
    }
}

fn axis_bin(v: f64, extent: f64, bins: usize) -> usize {
    let t = (v / extent * bins as f64).floor();
    if t.is_nan() || t < 0.0 {
        0
    } else {
        (t as usize).min(bins - 1)
    }
}

/// Bin bounce events by table position. Counts are unweighted.
///
/// An empty event list yields a well-formed all-zero histogram.
pub fn aggregate(events: &[BounceEvent], table: TableSpec, params: HeatmapParams) -> HeatmapBins {
    let mut bins = HeatmapBins::empty(table, params);
    for e in events {
        bins.add(e.table_x, e.table_y);
    }
    log::debug!(
        "heatmap: {} event(s) into {}x{} bins, peak {}",
        events.len(),
        bins.bins_x,
        bins.bins_y,
        bins.max_count()
    );
    bins
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(frame: u64, x: f64, y: f64) -> BounceEvent {
        BounceEvent {
            frame_index: frame,
            time_seconds: frame as f64 / 30.0,
            table_x: x,
            table_y: y,
            confidence: 0.9,
        }
    }

    #[test]
    fn empty_input_gives_zero_grid_of_fixed_shape() {
        let bins = aggregate(&[], TableSpec::default(), HeatmapParams::default());
        assert_eq!((bins.bins_x, bins.bins_y), (30, 17));
        assert_eq!(bins.counts.len(), 30 * 17);
        assert!(bins.is_empty());
        assert_eq!(bins.max_count(), 0);
    }

    #[test]
    fn total_equals_event_count_including_margin_events() {
        let events = [
            event(0, 0.0, 0.0),
            event(10, 2.74, 1.525),
            event(20, -0.04, 0.7),
            event(30, 2.78, 1.56),
            event(40, 1.37, 0.76),
            event(50, 1.37, 0.76),
        ];
        let bins = aggregate(&events, TableSpec::default(), HeatmapParams::default());
        assert_eq!(bins.total(), events.len() as u64);
        assert_eq!(bins.max_count(), 2);
    }

    #[test]
    fn axes_follow_calibration_edges() {
        let table = TableSpec::default();
        let bins = aggregate(
            &[event(0, 2.7, 0.05)],
            table,
            HeatmapParams { bins_x: 10, bins_y: 5 },
        );
        // Near the TR corner: last column, first row.
        assert_eq!(bins.count(9, 0), Some(1));
        assert_eq!(bins.count(0, 4), Some(0));
        assert_eq!(bins.count(10, 0), None);
    }

    #[test]
    fn far_edge_belongs_to_last_bin() {
        let bins = HeatmapBins::empty(TableSpec::default(), HeatmapParams { bins_x: 4, bins_y: 2 });
        assert_eq!(bins.bin_of(2.74, 1.525), (3, 1));
        assert_eq!(bins.bin_of(1.0, 0.0), (1, 0));
        assert_eq!(bins.bin_of(f64::NAN, -1.0), (0, 0));
    }
}
