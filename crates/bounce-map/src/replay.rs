//! Detector that replays recorded detections.
//!
//! Inference runs outside this crate; its per-frame boxes are stored as JSON:
//!
//! ```json
//! { "detections": [ { "frame": 12, "x1": 310.0, "y1": 200.5, "x2": 322.0, "y2": 212.5, "conf": 0.81 } ] }
//! ```
//!
//! Frames without entries simply have no ball.

use std::{collections::BTreeMap, convert::Infallible, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    io::BounceIoError,
    source::Frame,
    track::{BallBox, BallDetector, Detection},
};

/// One recorded detector box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedDetection {
    pub frame: u64,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(alias = "confidence")]
    pub conf: f32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DetectionLog {
    #[serde(default)]
    detections: Vec<RecordedDetection>,
}

/// [`BallDetector`] backed by a detection log, keyed by frame index.
#[derive(Clone, Debug, Default)]
pub struct ReplayDetector {
    by_frame: BTreeMap<u64, Vec<Detection>>,
}

impl ReplayDetector {
    pub fn new(records: impl IntoIterator<Item = RecordedDetection>) -> Self {
        let mut by_frame: BTreeMap<u64, Vec<Detection>> = BTreeMap::new();
        for r in records {
            by_frame.entry(r.frame).or_default().push(Detection {
                bbox: BallBox::new(r.x1, r.y1, r.x2, r.y2),
                confidence: r.conf,
            });
        }
        Self { by_frame }
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, BounceIoError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, BounceIoError> {
        let log: DetectionLog = serde_json::from_str(raw)?;
        Ok(Self::new(log.detections))
    }

    /// Number of frames with at least one recorded box.
    pub fn frames_with_detections(&self) -> usize {
        self.by_frame.len()
    }

    /// Recorded boxes for `frame` in file order, unfiltered.
    pub fn detections(&self, frame: u64) -> &[Detection] {
        self.by_frame.get(&frame).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl BallDetector<Frame> for ReplayDetector {
    type Error = Infallible;

    fn predict(
        &mut self,
        frame: &Frame,
        confidence_threshold: f32,
        _input_size: u32,
    ) -> Result<Vec<Detection>, Self::Error> {
        Ok(self
            .detections(frame.index)
            .iter()
            .filter(|d| d.confidence >= confidence_threshold)
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{detect_best, DetectorParams};
    use image::RgbImage;

    const LOG: &str = r#"{
        "detections": [
            { "frame": 3, "x1": 10.0, "y1": 20.0, "x2": 14.0, "y2": 24.0, "conf": 0.4 },
            { "frame": 3, "x1": 50.0, "y1": 60.0, "x2": 54.0, "y2": 64.0, "conf": 0.9 },
            { "frame": 3, "x1": 90.0, "y1": 90.0, "x2": 94.0, "y2": 94.0, "conf": 0.1 },
            { "frame": 7, "x1": 0.0, "y1": 0.0, "x2": 2.0, "y2": 2.0, "confidence": 0.5 }
        ]
    }"#;

    fn frame(index: u64) -> Frame {
        Frame {
            index,
            image: RgbImage::new(1, 1),
        }
    }

    #[test]
    fn replays_boxes_above_threshold() {
        let mut det = ReplayDetector::from_json_str(LOG).expect("parse");
        assert_eq!(det.frames_with_detections(), 2);

        let boxes = det.predict(&frame(3), 0.25, 640).unwrap();
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].confidence, 0.4);

        assert!(det.predict(&frame(4), 0.25, 640).unwrap().is_empty());
    }

    #[test]
    fn best_box_center_becomes_observation() {
        let mut det = ReplayDetector::from_json_str(LOG).expect("parse");
        let obs = detect_best(&mut det, &frame(3), 3, &DetectorParams::default()).expect("obs");
        assert_eq!((obs.image_x, obs.image_y), (52.0, 62.0));
        assert_eq!(obs.confidence, 0.9);
    }

    #[test]
    fn empty_log_is_valid() {
        let det = ReplayDetector::from_json_str("{}").expect("parse");
        assert_eq!(det.frames_with_detections(), 0);
    }

    #[test]
    fn malformed_log_is_an_error() {
        assert!(matches!(
            ReplayDetector::from_json_str("{\"detections\": [1]}"),
            Err(BounceIoError::Json(_))
        ));
    }
}
