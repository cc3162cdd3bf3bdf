//! JSON configuration and report helpers for bounce analysis.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    core::{CalibrationError, CalibrationPoints, TableSpec},
    heatmap::{HeatmapBins, HeatmapParams, RenderParams},
    pipeline::AnalyzerParams,
    replay::ReplayDetector,
    source::{ImageSequenceSource, SourceError, VideoInfo},
    track::{BounceEvent, BounceParams, BounceStats, DetectorParams, FALLBACK_FRAME_RATE},
};

#[derive(thiserror::Error, Debug)]
pub enum BounceIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn default_output_dir() -> String {
    "bounce_out".to_string()
}

/// Configuration of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Directory of decoded frames, read in file-name order.
    pub frames_dir: String,
    /// Frame rate of the source clip; missing or invalid means 30 fps.
    #[serde(default)]
    pub frame_rate: Option<f64>,
    /// Recorded detector output for the clip.
    pub detections_path: String,
    /// Four table corners, TL, TR, BR, BL.
    pub calibration_path: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub detector: Option<DetectorParams>,
    #[serde(default)]
    pub bounce: Option<BounceParams>,
    #[serde(default)]
    pub heatmap: Option<HeatmapParams>,
    #[serde(default)]
    pub render: Option<RenderParams>,
    #[serde(default)]
    pub table: Option<TableSpec>,
    /// Write an annotated PNG sequence next to the numeric outputs.
    #[serde(default)]
    pub preview: bool,
}

impl AnalysisConfig {
    /// Config with the given inputs and default parameters.
    pub fn new(
        frames_dir: impl Into<String>,
        detections_path: impl Into<String>,
        calibration_path: impl Into<String>,
    ) -> Self {
        Self {
            frames_dir: frames_dir.into(),
            frame_rate: None,
            detections_path: detections_path.into(),
            calibration_path: calibration_path.into(),
            output_dir: default_output_dir(),
            detector: None,
            bounce: None,
            heatmap: None,
            render: None,
            table: None,
            preview: false,
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, BounceIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), BounceIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate.unwrap_or(FALLBACK_FRAME_RATE)
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }

    pub fn heatmap_path(&self) -> PathBuf {
        self.output_dir().join("heatmap.png")
    }

    pub fn csv_path(&self) -> PathBuf {
        self.output_dir().join("bounces.csv")
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir().join("report.json")
    }

    pub fn preview_dir(&self) -> PathBuf {
        self.output_dir().join("preview")
    }

    pub fn render_params(&self) -> RenderParams {
        self.render.unwrap_or_default()
    }

    /// Build analyzer parameters, applying overrides from the config.
    pub fn build_params(&self) -> AnalyzerParams {
        let mut params = AnalyzerParams::default();
        if let Some(table) = self.table {
            params.table = table;
        }
        if let Some(detector) = self.detector {
            params.detector = detector;
        }
        if let Some(bounce) = self.bounce {
            params.bounce = bounce;
        }
        if let Some(heatmap) = self.heatmap {
            params.heatmap = heatmap;
        }
        params
    }

    pub fn load_calibration(&self) -> Result<CalibrationPoints, CalibrationError> {
        CalibrationPoints::load_json(&self.calibration_path)
    }

    pub fn build_detector(&self) -> Result<ReplayDetector, BounceIoError> {
        ReplayDetector::load_json(&self.detections_path)
    }

    pub fn open_source(&self) -> Result<ImageSequenceSource, SourceError> {
        ImageSequenceSource::open(&self.frames_dir, self.frame_rate())
    }
}

/// Shape and peak of the written heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatmapSummary {
    pub bins_x: usize,
    pub bins_y: usize,
    pub total: u64,
    pub max_count: u32,
}

impl From<&HeatmapBins> for HeatmapSummary {
    fn from(bins: &HeatmapBins) -> Self {
        Self {
            bins_x: bins.bins_x,
            bins_y: bins.bins_y,
            total: bins.total(),
            max_count: bins.max_count(),
        }
    }
}

/// Files produced by a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputPaths {
    pub heatmap: String,
    pub csv: String,
    pub report: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_dir: Option<String>,
}

/// Summary written to `report.json` after a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub source: VideoInfo,
    pub frames_processed: u64,
    pub observations: usize,
    /// Frames between the first and last observation without a detection.
    pub missing_frames: u64,
    pub empty_trajectory: bool,
    pub stats: BounceStats,
    pub bounces: Vec<BounceEvent>,
    pub heatmap: HeatmapSummary,
    pub outputs: OutputPaths,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AnalysisReport {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, BounceIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), BounceIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
