//! Frame detector adapter.
//!
//! The ball detector is an external, pretrained model. It is consumed through
//! the [`BallDetector`] trait and its output for one frame is reduced to the
//! single most confident box.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::FrameObservation;

/// Axis-aligned bounding box in image pixels (`x1,y1` top-left, `x2,y2` bottom-right).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BallBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BallBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    #[inline]
    pub fn center(&self) -> Point2<f64> {
        Point2::new((self.x1 + self.x2) * 0.5, (self.y1 + self.y2) * 0.5)
    }

    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }
}

/// One candidate box emitted by the detector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BallBox,
    pub confidence: f32,
}

/// Inference settings forwarded to the detector for every frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Minimum confidence the detector should report.
    pub confidence_threshold: f32,
    /// Square model input size in pixels.
    pub input_size: u32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            input_size: 640,
        }
    }
}

/// Black-box ball detector.
///
/// Implementations are expected to drop boxes below `confidence_threshold`
/// themselves. `F` is the frame representation the model consumes.
pub trait BallDetector<F: ?Sized> {
    type Error: std::error::Error;

    fn predict(
        &mut self,
        frame: &F,
        confidence_threshold: f32,
        input_size: u32,
    ) -> Result<Vec<Detection>, Self::Error>;
}

/// Pick the highest-confidence detection.
///
/// Ties keep the earliest candidate in detector order. Candidates with a
/// non-finite box or confidence, or below `confidence_threshold`, are ignored.
pub fn select_best(detections: &[Detection], confidence_threshold: f32) -> Option<&Detection> {
    let mut best: Option<&Detection> = None;
    for det in detections {
        if !det.confidence.is_finite()
            || !det.bbox.is_finite()
            || det.confidence < confidence_threshold
        {
            continue;
        }
        // Strict comparison keeps the first of equal confidences.
        if best.is_none_or(|b| det.confidence > b.confidence) {
            best = Some(det);
        }
    }
    best
}

/// Run the detector on one frame and reduce its output to at most one observation.
///
/// Inference failures are logged and treated as "no ball in this frame"; the
/// bounce heuristic already tolerates missing frames.
pub fn detect_best<F: ?Sized, D: BallDetector<F>>(
    detector: &mut D,
    frame: &F,
    frame_index: u64,
    params: &DetectorParams,
) -> Option<FrameObservation> {
    detect_best_with_box(detector, frame, frame_index, params).map(|(obs, _)| obs)
}

/// Like [`detect_best`], also returning the winning box for overlays.
pub fn detect_best_with_box<F: ?Sized, D: BallDetector<F>>(
    detector: &mut D,
    frame: &F,
    frame_index: u64,
    params: &DetectorParams,
) -> Option<(FrameObservation, Detection)> {
    let detections = match detector.predict(frame, params.confidence_threshold, params.input_size)
    {
        Ok(d) => d,
        Err(err) => {
            log::warn!("frame {frame_index}: detector failed, skipping frame: {err}");
            return None;
        }
    };

    let best = *select_best(&detections, params.confidence_threshold)?;
    let center = best.bbox.center();
    log::trace!(
        "frame {frame_index}: {} candidate(s), best conf {:.3} at ({:.1}, {:.1})",
        detections.len(),
        best.confidence,
        center.x,
        center.y
    );
    let obs = FrameObservation::new(frame_index, center.x, center.y, best.confidence);
    Some((obs, best))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("inference backend crashed")]
    struct Crash;

    /// Detector that replays a fixed answer for every frame.
    struct Scripted(Result<Vec<Detection>, ()>);

    impl BallDetector<()> for Scripted {
        type Error = Crash;

        fn predict(&mut self, _: &(), _: f32, _: u32) -> Result<Vec<Detection>, Crash> {
            self.0.clone().map_err(|_| Crash)
        }
    }

    fn det(cx: f64, cy: f64, confidence: f32) -> Detection {
        Detection {
            bbox: BallBox::new(cx - 4.0, cy - 4.0, cx + 4.0, cy + 4.0),
            confidence,
        }
    }

    #[test]
    fn picks_highest_confidence_center() {
        let mut detector = Scripted(Ok(vec![
            det(10.0, 10.0, 0.4),
            det(200.0, 120.0, 0.9),
            det(50.0, 60.0, 0.7),
        ]));
        let obs = detect_best(&mut detector, &(), 7, &DetectorParams::default()).expect("ball");
        assert_eq!(obs.frame_index, 7);
        assert_eq!((obs.image_x, obs.image_y), (200.0, 120.0));
        assert_eq!(obs.confidence, 0.9);
    }

    #[test]
    fn equal_confidence_keeps_first_seen() {
        let dets = [det(1.0, 1.0, 0.8), det(2.0, 2.0, 0.8), det(3.0, 3.0, 0.5)];
        let best = select_best(&dets, 0.0).unwrap();
        assert_eq!(best.bbox.center(), Point2::new(1.0, 1.0));
    }

    #[test]
    fn no_candidates_means_no_observation() {
        let mut detector = Scripted(Ok(Vec::new()));
        assert!(detect_best(&mut detector, &(), 0, &DetectorParams::default()).is_none());
    }

    #[test]
    fn below_threshold_and_nan_are_ignored() {
        let dets = [det(1.0, 1.0, 0.1), det(2.0, 2.0, f32::NAN)];
        assert!(select_best(&dets, 0.25).is_none());
    }

    #[test]
    fn detector_failure_is_treated_as_missing_frame() {
        let mut detector = Scripted(Err(()));
        assert!(detect_best(&mut detector, &(), 3, &DetectorParams::default()).is_none());
    }
}
