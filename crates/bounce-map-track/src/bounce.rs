//! Bounce detection on a projected ball track.
//!
//! The default heuristic treats a local maximum of the image `y` coordinate
//! (ball lowest on screen, then rising again) as a table contact. It assumes a
//! static, slightly elevated camera and is kept deliberately simple; other
//! heuristics can be swapped in through [`BounceDetector`].

use bounce_map_core::{TableSpec, DEFAULT_EDGE_MARGIN_M};
use serde::{Deserialize, Serialize};

use crate::TrackPoint;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Frame rate assumed when a source reports none.
pub const FALLBACK_FRAME_RATE: f64 = 30.0;

/// Use `fps` if it is a usable frame rate, [`FALLBACK_FRAME_RATE`] otherwise.
#[inline]
pub fn effective_frame_rate(fps: f64) -> f64 {
    if fps.is_finite() && fps > 0.0 {
        fps
    } else {
        FALLBACK_FRAME_RATE
    }
}

/// Inferred table contact.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BounceEvent {
    pub frame_index: u64,
    pub time_seconds: f64,
    pub table_x: f64,
    pub table_y: f64,
    pub confidence: f32,
}

/// Gating parameters for the local-maximum bounce heuristic.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BounceParams {
    /// Minimum time between two accepted bounces.
    pub min_gap_seconds: f64,
    /// Candidates below this detector confidence are dropped.
    pub min_confidence: f32,
    /// Tolerance around the table footprint, in meters.
    pub edge_margin: f64,
}

impl Default for BounceParams {
    fn default() -> Self {
        Self {
            min_gap_seconds: 0.25,
            min_confidence: 0.15,
            edge_margin: DEFAULT_EDGE_MARGIN_M,
        }
    }
}

impl BounceParams {
    /// Debounce gap in whole frames.
    ///
    /// Rounded up so that accepted bounces are always at least
    /// `min_gap_seconds` apart in time.
    pub fn min_gap_frames(&self, frame_rate: f64) -> u64 {
        let gap = self.min_gap_seconds * effective_frame_rate(frame_rate);
        if !gap.is_finite() || gap <= 0.0 {
            return 0;
        }
        // Absorb float noise such as 0.1 * 30.0 = 3.0000000000000004.
        (gap - 1e-9).ceil().max(0.0) as u64
    }
}

/// Why candidates were dropped during one scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BounceStats {
    /// Interior points that were strict local maxima of image `y`.
    pub candidates: usize,
    pub low_confidence: usize,
    pub off_table: usize,
    pub debounced: usize,
}

/// Output of a bounce scan.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BounceScan {
    pub events: Vec<BounceEvent>,
    pub stats: BounceStats,
}

/// Strategy turning a projected track into bounce events.
///
/// `track` is in ascending frame order and may have gaps. Implementations
/// must be pure: the same input yields the same events.
pub trait BounceDetector {
    fn detect(&self, track: &[TrackPoint], frame_rate: f64) -> BounceScan;
}

/// Local maximum in image `y`, gated by confidence, table footprint and a
/// minimum time gap.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalMaxBounceDetector {
    pub params: BounceParams,
    pub table: TableSpec,
}

impl LocalMaxBounceDetector {
    pub fn new(params: BounceParams, table: TableSpec) -> Self {
        Self { params, table }
    }
}

impl BounceDetector for LocalMaxBounceDetector {
    fn detect(&self, track: &[TrackPoint], frame_rate: f64) -> BounceScan {
        scan_bounces(track, &self.table, frame_rate, &self.params)
    }
}

/// Find bounce events with the local-maximum heuristic.
///
/// Neighbours are the previous and next *observations*, not adjacent frame
/// numbers: across a detection gap the nearest detected frames are compared.
/// Equal `y` values never form a maximum, so a plateau at the lowest point
/// produces no bounce.
pub fn find_bounces(
    track: &[TrackPoint],
    table: &TableSpec,
    frame_rate: f64,
    params: &BounceParams,
) -> Vec<BounceEvent> {
    scan_bounces(track, table, frame_rate, params).events
}

#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(track, table, params), fields(points = track.len()))
)]
fn scan_bounces(
    track: &[TrackPoint],
    table: &TableSpec,
    frame_rate: f64,
    params: &BounceParams,
) -> BounceScan {
    let mut scan = BounceScan::default();
    if track.len() < 3 {
        return scan;
    }

    let fps = effective_frame_rate(frame_rate);
    let min_gap = params.min_gap_frames(fps);
    let mut last_accepted: Option<u64> = None;

    for w in track.windows(3) {
        let [prev, cur, next] = [&w[0], &w[1], &w[2]];
        if !(prev.image_y() < cur.image_y() && cur.image_y() > next.image_y()) {
            continue;
        }
        scan.stats.candidates += 1;

        if cur.confidence() < params.min_confidence {
            scan.stats.low_confidence += 1;
            continue;
        }
        if !table.contains(cur.table, params.edge_margin) {
            scan.stats.off_table += 1;
            continue;
        }
        let frame = cur.frame_index();
        if last_accepted.is_some_and(|last| frame.saturating_sub(last) < min_gap) {
            log::trace!("frame {frame}: bounce candidate within debounce gap");
            scan.stats.debounced += 1;
            continue;
        }

        scan.events.push(BounceEvent {
            frame_index: frame,
            time_seconds: frame as f64 / fps,
            table_x: cur.table.x,
            table_y: cur.table.y,
            confidence: cur.confidence(),
        });
        last_accepted = Some(frame);
    }

    log::debug!(
        "bounce scan: {} point(s), {} candidate(s), {} accepted (low conf {}, off table {}, debounced {})",
        track.len(),
        scan.stats.candidates,
        scan.events.len(),
        scan.stats.low_confidence,
        scan.stats.off_table,
        scan.stats.debounced
    );
    scan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameObservation;
    use nalgebra::Point2;

    fn point(frame: u64, y: f64, conf: f32) -> TrackPoint {
        TrackPoint {
            observation: FrameObservation::new(frame, 100.0, y, conf),
            table: Point2::new(1.0, 0.5),
            inside: true,
        }
    }

    #[test]
    fn gap_frames_round_up() {
        let p = BounceParams::default();
        assert_eq!(p.min_gap_frames(30.0), 8);
        assert_eq!(p.min_gap_frames(60.0), 15);
        let p = BounceParams {
            min_gap_seconds: 0.1,
            ..BounceParams::default()
        };
        assert_eq!(p.min_gap_frames(30.0), 3);
        let p = BounceParams {
            min_gap_seconds: 0.0,
            ..BounceParams::default()
        };
        assert_eq!(p.min_gap_frames(30.0), 0);
    }

    #[test]
    fn partial_params_fill_defaults() {
        let p: BounceParams = serde_json::from_str(r#"{ "min_gap_seconds": 0.5 }"#).unwrap();
        assert_eq!(p.min_gap_seconds, 0.5);
        assert_eq!(p.min_confidence, 0.15);
        assert_eq!(p.edge_margin, DEFAULT_EDGE_MARGIN_M);
    }

    #[test]
    fn invalid_frame_rate_falls_back() {
        assert_eq!(effective_frame_rate(0.0), FALLBACK_FRAME_RATE);
        assert_eq!(effective_frame_rate(f64::NAN), FALLBACK_FRAME_RATE);
        assert_eq!(effective_frame_rate(-25.0), FALLBACK_FRAME_RATE);
        assert_eq!(effective_frame_rate(59.94), 59.94);
    }

    #[test]
    fn event_time_uses_frame_rate() {
        let track = [point(48, 2.0, 0.9), point(50, 10.0, 0.9), point(51, 3.0, 0.9)];
        let events = find_bounces(&track, &TableSpec::default(), 25.0, &BounceParams::default());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].time_seconds, 2.0);
        assert_eq!(events[0].table_x, 1.0);
    }

    #[test]
    fn stats_count_each_rejection() {
        let mut track = vec![point(0, 0.0, 0.9)];
        // Low-confidence peak at frame 1.
        track.push(point(1, 10.0, 0.05));
        track.push(point(2, 0.0, 0.9));
        // Accepted peak at frame 3.
        track.push(point(3, 10.0, 0.9));
        track.push(point(4, 0.0, 0.9));
        // Debounced peak at frame 5.
        track.push(point(5, 10.0, 0.9));
        track.push(point(6, 0.0, 0.9));
        // Off-table peak at frame 30.
        let mut off = point(30, 10.0, 0.9);
        off.table = Point2::new(3.5, 0.5);
        track.push(off);
        track.push(point(31, 0.0, 0.9));

        let scan = LocalMaxBounceDetector::default().detect(&track, 30.0);
        assert_eq!(scan.events.len(), 1);
        assert_eq!(scan.events[0].frame_index, 3);
        assert_eq!(
            scan.stats,
            BounceStats {
                candidates: 4,
                low_confidence: 1,
                off_table: 1,
                debounced: 1,
            }
        );
    }
}
