//! End-to-end bounce analysis.
//!
//! [`BounceAnalyzer`] owns one detector handle and one calibration for a
//! single clip. It runs frames strictly in order:
//! detect → accumulate → project → find bounces → aggregate.
//! [`run_analysis`] wires it to a JSON config and writes the output files.

use std::fs;

use serde::{Deserialize, Serialize};

use crate::{
    core::{compute_homography, CalibrationError, CalibrationPoints, Homography, TableSpec},
    csv::save_bounces_csv,
    error::AnalysisError,
    heatmap::{aggregate, save_heatmap_png, HeatmapBins, HeatmapParams},
    io::{AnalysisConfig, AnalysisReport, HeatmapSummary, OutputPaths},
    preview::write_preview,
    source::{Frame, FrameSource, VideoInfo},
    track::{
        detect_best_with_box, BallDetector, BounceDetector, BounceEvent, BounceParams, BounceScan,
        Detection, DetectorParams, LocalMaxBounceDetector, TableProjector, TrackPoint, Trajectory,
    },
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Parameters for one analysis run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerParams {
    pub table: TableSpec,
    pub detector: DetectorParams,
    pub bounce: BounceParams,
    pub heatmap: HeatmapParams,
}

/// Everything computed from one clip.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub info: VideoInfo,
    pub frames_processed: u64,
    /// Winning detector box per frame with a ball, ascending by frame.
    pub boxes: Vec<(u64, Detection)>,
    pub trajectory: Trajectory,
    pub track: Vec<TrackPoint>,
    pub scan: BounceScan,
    pub heatmap: HeatmapBins,
}

impl Analysis {
    pub fn events(&self) -> &[BounceEvent] {
        &self.scan.events
    }

    /// No ball was observed in any frame. Outputs are still well formed.
    pub fn is_empty_trajectory(&self) -> bool {
        self.trajectory.is_empty()
    }

    pub fn frame_rate(&self) -> f64 {
        self.info.frame_rate
    }
}

/// Single-clip pipeline around an owned detector.
pub struct BounceAnalyzer<D> {
    detector: D,
    projector: TableProjector,
    params: AnalyzerParams,
    bounces: Box<dyn BounceDetector>,
}

impl<D> BounceAnalyzer<D>
where
    D: BallDetector<Frame>,
{
    /// Validate the calibration and build the projector.
    ///
    /// Fails before any frame is touched if the corners are degenerate.
    pub fn new(
        detector: D,
        calibration: &CalibrationPoints,
        params: AnalyzerParams,
    ) -> Result<Self, CalibrationError> {
        let homography = compute_homography(calibration, &params.table)?;
        let projector =
            TableProjector::new(homography, params.table).with_margin(params.bounce.edge_margin);
        Ok(Self {
            detector,
            projector,
            params,
            bounces: Box::new(LocalMaxBounceDetector::new(params.bounce, params.table)),
        })
    }

    /// Replace the bounce heuristic.
    pub fn with_bounce_detector(mut self, bounces: impl BounceDetector + 'static) -> Self {
        self.bounces = Box::new(bounces);
        self
    }

    pub fn homography(&self) -> &Homography {
        self.projector.homography()
    }

    pub fn params(&self) -> &AnalyzerParams {
        &self.params
    }

    pub fn into_detector(self) -> D {
        self.detector
    }

    /// Consume `source` to its end and infer bounces.
    ///
    /// A frame decode error ends the run; detector failures only drop the
    /// affected frame.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn run<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> Result<Analysis, AnalysisError> {
        let info = source.info();
        let mut trajectory = Trajectory::new();
        let mut boxes = Vec::new();
        let mut frames_processed = 0u64;

        while let Some(frame) = source.next_frame()? {
            frames_processed += 1;
            if let Some((obs, det)) =
                detect_best_with_box(&mut self.detector, &frame, frame.index, &self.params.detector)
            {
                trajectory.push(obs)?;
                boxes.push((frame.index, det));
            }
        }

        let track = self.projector.project(&trajectory);
        let scan = self.bounces.detect(&track, info.frame_rate);
        let heatmap = aggregate(&scan.events, self.params.table, self.params.heatmap);

        if trajectory.is_empty() {
            log::warn!("no ball observed in {frames_processed} frame(s); outputs will be empty");
        } else {
            log::info!(
                "{frames_processed} frame(s), {} observation(s), {} missing, {} bounce(s)",
                trajectory.len(),
                trajectory.missing_frames(),
                scan.events.len()
            );
        }

        Ok(Analysis {
            info,
            frames_processed,
            boxes,
            trajectory,
            track,
            scan,
            heatmap,
        })
    }
}

/// Run a configured analysis and write heatmap, CSV and report.
///
/// Order of failure: calibration, detections, frame source. Nothing is
/// written unless all three are usable. Once frames flow, a run always
/// yields a heatmap and an event table, empty if no bounce was found.
pub fn run_analysis(config: &AnalysisConfig) -> Result<AnalysisReport, AnalysisError> {
    let calibration = config.load_calibration()?;
    let params = config.build_params();
    let detector = config
        .build_detector()
        .map_err(|source| AnalysisError::Detections {
            path: config.detections_path.clone(),
            source,
        })?;
    let mut analyzer = BounceAnalyzer::new(detector, &calibration, params)?;
    let mut source = config.open_source()?;

    let analysis = analyzer.run(&mut source)?;

    let out_dir = config.output_dir();
    fs::create_dir_all(&out_dir).map_err(|e| AnalysisError::output(&out_dir, e))?;

    let csv_path = config.csv_path();
    save_bounces_csv(analysis.events(), &csv_path)
        .map_err(|e| AnalysisError::output(&csv_path, e))?;
    let heatmap_path = config.heatmap_path();
    save_heatmap_png(&analysis.heatmap, &config.render_params(), &heatmap_path)?;

    let mut outputs = OutputPaths {
        heatmap: heatmap_path.display().to_string(),
        csv: csv_path.display().to_string(),
        report: config.report_path().display().to_string(),
        preview_dir: None,
    };

    if config.preview {
        let dir = config.preview_dir();
        let mut again = config.open_source()?;
        let written = write_preview(
            &mut again,
            &analysis,
            analyzer.homography(),
            &params.table,
            &dir,
        )?;
        log::info!("wrote {written} preview frame(s) to {}", dir.display());
        outputs.preview_dir = Some(dir.display().to_string());
    }

    let report = AnalysisReport {
        source: analysis.info,
        frames_processed: analysis.frames_processed,
        observations: analysis.trajectory.len(),
        missing_frames: analysis.trajectory.missing_frames(),
        empty_trajectory: analysis.is_empty_trajectory(),
        stats: analysis.scan.stats,
        bounces: analysis.events().to_vec(),
        heatmap: HeatmapSummary::from(&analysis.heatmap),
        outputs,
        note: analysis
            .is_empty_trajectory()
            .then(|| "no ball detections in any frame".to_string()),
    };
    let report_path = config.report_path();
    report
        .write_json(&report_path)
        .map_err(|e| AnalysisError::output(&report_path, e))?;
    Ok(report)
}
