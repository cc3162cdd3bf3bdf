use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::TrackError;

/// Best ball position found in one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameObservation {
    pub frame_index: u64,
    pub image_x: f64,
    pub image_y: f64,
    pub confidence: f32,
}

impl FrameObservation {
    pub fn new(frame_index: u64, image_x: f64, image_y: f64, confidence: f32) -> Self {
        Self {
            frame_index,
            image_x,
            image_y,
            confidence,
        }
    }

    #[inline]
    pub fn image_point(&self) -> Point2<f64> {
        Point2::new(self.image_x, self.image_y)
    }

    fn is_finite(&self) -> bool {
        self.image_x.is_finite() && self.image_y.is_finite() && self.confidence.is_finite()
    }
}

/// Sparse, frame-ordered ball track.
///
/// Frames without a detection are simply absent; gaps are implied by the
/// stored `frame_index` and never interpolated.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    observations: Vec<FrameObservation>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a trajectory from observations that are already in frame order.
    pub fn from_observations(
        observations: impl IntoIterator<Item = FrameObservation>,
    ) -> Result<Self, TrackError> {
        let mut track = Self::new();
        for obs in observations {
            track.push(obs)?;
        }
        Ok(track)
    }

    /// Append an observation. Frame indices must be strictly ascending.
    pub fn push(&mut self, obs: FrameObservation) -> Result<(), TrackError> {
        if !obs.is_finite() {
            return Err(TrackError::NonFinite {
                frame: obs.frame_index,
            });
        }
        if let Some(last) = self.observations.last() {
            if obs.frame_index <= last.frame_index {
                return Err(TrackError::OutOfOrder {
                    previous: last.frame_index,
                    next: obs.frame_index,
                });
            }
        }
        self.observations.push(obs);
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    #[inline]
    pub fn observations(&self) -> &[FrameObservation] {
        &self.observations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrameObservation> {
        self.observations.iter()
    }

    /// Number of frames skipped between consecutive observations, summed.
    pub fn missing_frames(&self) -> u64 {
        self.observations
            .windows(2)
            .map(|w| w[1].frame_index - w[0].frame_index - 1)
            .sum()
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a FrameObservation;
    type IntoIter = std::slice::Iter<'a, FrameObservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
