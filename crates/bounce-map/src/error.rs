use crate::{
    core::CalibrationError, heatmap::HeatmapError, io::BounceIoError, source::SourceError,
    track::TrackError,
};

/// Failure of an analysis run.
///
/// Calibration and source errors are raised before any output is written.
/// An empty trajectory is not an error; it is flagged on the result instead.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("failed to load detections from {path}: {source}")]
    Detections {
        path: String,
        #[source]
        source: BounceIoError,
    },
    #[error(transparent)]
    Track(#[from] TrackError),
    #[error(transparent)]
    Heatmap(#[from] HeatmapError),
    #[error("failed to write {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: BounceIoError,
    },
    #[error("failed to write preview frame {path}: {source}")]
    Preview {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

impl AnalysisError {
    pub(crate) fn output(path: &std::path::Path, source: impl Into<BounceIoError>) -> Self {
        Self::Output {
            path: path.display().to_string(),
            source: source.into(),
        }
    }
}
