//! bounce-map CLI: bounce heatmaps for table-tennis clips.

use std::{path::PathBuf, process::ExitCode};

use bounce_map::{
    core::{compute_homography, CalibrationPoints},
    run_analysis, AnalysisConfig, TableSpec,
};
use clap::{Args, Parser, Subcommand};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "bounce-map")]
#[command(about = "Infer ball bounces from detections and render a table heatmap")]
#[command(version)]
struct Cli {
    /// Log debug messages.
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON (requires the `tracing` feature).
    #[arg(long, global = true)]
    json_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run bounce analysis on a frame sequence.
    Analyze(AnalyzeArgs),

    /// Validate four table corners and write a calibration file.
    Calibrate(CalibrateArgs),
}

#[derive(Debug, Clone, Args)]
struct AnalyzeArgs {
    /// JSON analysis config; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of decoded frames.
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Source frame rate (falls back to 30 when unknown).
    #[arg(long)]
    fps: Option<f64>,

    /// Recorded detector output (JSON).
    #[arg(long)]
    detections: Option<PathBuf>,

    /// Table corner calibration (JSON).
    #[arg(long)]
    calib: Option<PathBuf>,

    /// Output directory.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Detector confidence threshold.
    #[arg(long)]
    conf: Option<f32>,

    /// Detector input size in pixels.
    #[arg(long)]
    imgsz: Option<u32>,

    /// Write annotated preview frames.
    #[arg(long)]
    preview: bool,
}

#[derive(Debug, Clone, Args)]
struct CalibrateArgs {
    /// Corners as `x,y` in TL TR BR BL order.
    #[arg(long, num_args = 4, value_parser = parse_point, required = true)]
    points: Vec<[f64; 2]>,

    /// Output calibration file.
    #[arg(long, default_value = "calib.json")]
    out: PathBuf,
}

fn parse_point(raw: &str) -> Result<[f64; 2], String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected x,y, got `{raw}`"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid coordinate `{v}`: {e}"))
    };
    Ok([parse(x)?, parse(y)?])
}

fn path_string(p: PathBuf) -> String {
    p.display().to_string()
}

fn init_logging(verbose: bool, json: bool) {
    #[cfg(feature = "tracing")]
    {
        let _ = verbose;
        bounce_map::core::init_tracing(json);
        let _ = tracing_log::LogTracer::init();
    }
    #[cfg(not(feature = "tracing"))]
    {
        if json {
            eprintln!("--json-log needs the `tracing` feature; using plain logs");
        }
        let level = if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        let _ = bounce_map::core::init_with_level(level);
    }
}

fn build_config(args: AnalyzeArgs) -> CliResult<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::load_json(path)?,
        None => {
            let (Some(frames), Some(detections), Some(calib)) =
                (&args.frames, &args.detections, &args.calib)
            else {
                return Err("without --config, --frames, --detections and --calib are required".into());
            };
            AnalysisConfig::new(
                path_string(frames.clone()),
                path_string(detections.clone()),
                path_string(calib.clone()),
            )
        }
    };

    if let Some(frames) = args.frames {
        config.frames_dir = path_string(frames);
    }
    if let Some(detections) = args.detections {
        config.detections_path = path_string(detections);
    }
    if let Some(calib) = args.calib {
        config.calibration_path = path_string(calib);
    }
    if let Some(out) = args.out {
        config.output_dir = path_string(out);
    }
    if args.fps.is_some() {
        config.frame_rate = args.fps;
    }
    if args.conf.is_some() || args.imgsz.is_some() {
        let mut detector = config.detector.unwrap_or_default();
        if let Some(conf) = args.conf {
            detector.confidence_threshold = conf;
        }
        if let Some(imgsz) = args.imgsz {
            detector.input_size = imgsz;
        }
        config.detector = Some(detector);
    }
    config.preview |= args.preview;
    Ok(config)
}

fn run_analyze(args: AnalyzeArgs) -> CliResult<()> {
    let config = build_config(args)?;
    let report = run_analysis(&config)?;

    if report.empty_trajectory {
        log::warn!("no ball detected in {} frame(s)", report.frames_processed);
    }
    println!(
        "{} bounce(s) in {} frame(s); wrote {}, {}, {}",
        report.bounces.len(),
        report.frames_processed,
        report.outputs.csv,
        report.outputs.heatmap,
        report.outputs.report
    );
    Ok(())
}

fn run_calibrate(args: CalibrateArgs) -> CliResult<()> {
    let points = CalibrationPoints::from_pairs(&args.points)?;
    compute_homography(&points, &TableSpec::default())?;
    points.write_json(&args.out)?;
    println!("calibration written to {}", args.out.display());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_log);

    let result = match cli.command {
        Commands::Analyze(args) => run_analyze(args),
        Commands::Calibrate(args) => run_calibrate(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bounce_map::DetectorParams;

    #[test]
    fn parses_points() {
        assert_eq!(parse_point("12.5, 40").unwrap(), [12.5, 40.0]);
        assert!(parse_point("12.5").is_err());
        assert!(parse_point("a,1").is_err());
    }

    #[test]
    fn flags_override_detector_params() {
        let cli = Cli::parse_from([
            "bounce-map", "analyze", "--frames", "f", "--detections", "d.json", "--calib",
            "c.json", "--conf", "0.4",
        ]);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let config = build_config(args).unwrap();
        let detector = config.detector.unwrap();
        assert_eq!(detector.confidence_threshold, 0.4);
        assert_eq!(detector.input_size, DetectorParams::default().input_size);
    }
}
