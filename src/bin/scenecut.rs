use clap::Parser;
use log::{error, info};
use scenecut::{
    error_body, H264Mp4Encoder, HttpClassifier, PipelineConfig, SceneCutPipeline, SceneCutResult,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Split a video into one file per detected scene
#[derive(Parser, Debug)]
#[command(name = "scenecut")]
#[command(version)]
#[command(about = "Shot boundary detection and scene splitting", long_about = None)]
struct Args {
    /// Input MP4/MOV file
    #[arg(short, long)]
    video: PathBuf,

    /// Directory for scene files, defaults to <video dir>/<video stem>
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Transition threshold in [0, 1]
    #[arg(long)]
    threshold: Option<f32>,

    /// Classifier base URL
    #[arg(long)]
    endpoint: Option<String>,

    #[arg(long)]
    batch_size: Option<usize>,

    /// File-name prefix, defaults to the video stem
    #[arg(long)]
    prefix: Option<String>,

    /// Append the frame range to every file name
    #[arg(long)]
    include_frame_range: bool,

    /// Abort on the first segment that cannot be written
    #[arg(long)]
    fail_fast: bool,

    /// Embed a JPEG preview of each scene in the report
    #[arg(long)]
    previews: bool,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    match run(&args) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            println!("{}", error_body(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> SceneCutResult<String> {
    let config = build_config(args)?;
    let output_dir = match &args.output {
        Some(dir) => dir.clone(),
        None => default_output_dir(&args.video),
    };

    let classifier = HttpClassifier::new(config.classifier.clone(), config.window_length)?;
    classifier.check_ready()?;
    info!("Classifier at {} is ready", config.classifier.endpoint);

    let pipeline = SceneCutPipeline::new(classifier, H264Mp4Encoder::new(), config)?;
    let report = pipeline.process_file(&args.video, &output_dir)?;
    report.to_json()
}

fn build_config(args: &Args) -> SceneCutResult<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if let Some(endpoint) = &args.endpoint {
        config.classifier.endpoint = endpoint.clone();
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    match &args.prefix {
        Some(prefix) => config.segments.prefix = prefix.clone(),
        None if args.config.is_none() => {
            if let Some(stem) = video_stem(&args.video) {
                config.segments.prefix = stem;
            }
        }
        None => {}
    }
    config.segments.include_frame_range |= args.include_frame_range;
    config.segments.fail_fast |= args.fail_fast;
    config.segments.previews |= args.previews;

    config.validate()?;
    Ok(config)
}

fn video_stem(video: &Path) -> Option<String> {
    video
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
}

fn default_output_dir(video: &Path) -> PathBuf {
    let parent = video.parent().unwrap_or_else(|| Path::new("."));
    parent.join(video_stem(video).unwrap_or_else(|| "scenes".to_string()))
}
