//! 動画ファイルのスクワット / 座り姿勢を解析し、JSON レポートを標準出力に書く

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use posture_coach::config::Config;
use posture_coach::pose::OnnxPoseEstimator;
use posture_coach::video::{is_supported_video, VideoFrames, SUPPORTED_EXTENSIONS};
use posture_coach::SessionAggregator;

#[derive(Parser)]
#[command(name = "posture_coach", version = env!("GIT_VERSION"))]
#[command(about = "Posture feedback for short squat / desk-sitting clips")]
struct Cli {
    /// 解析する動画 (mp4, avi, mov, mkv)
    video: PathBuf,

    /// 姿勢の種類 (squat | desk)
    #[arg(short, long, default_value = "squat")]
    posture: String,

    /// 設定ファイル
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// 読み込むフレーム数の上限（設定ファイルより優先）
    #[arg(long)]
    max_frames: Option<usize>,

    /// logs/ 以下にもログを書く
    #[arg(long)]
    log_file: bool,
}

fn open_log_file() -> Result<(std::fs::File, String)> {
    std::fs::create_dir_all("logs")?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = format!("logs/analyze_{}.log", ts);
    let file = std::fs::File::create(&path).with_context(|| format!("Failed to create {}", path))?;
    Ok((file, path))
}

fn init_logging(log_file: bool) -> Result<()> {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(d) = "posture_coach=info".parse() {
        filter = filter.add_directive(d);
    }

    let file_layer = if log_file {
        let (file, path) = open_log_file()?;
        eprintln!("Log: {}", path);
        Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file)?;
    info!("posture_coach {}", env!("GIT_VERSION"));

    if !is_supported_video(&cli.video) {
        bail!(
            "Unsupported video format {} (expected one of {:?})",
            cli.video.display(),
            SUPPORTED_EXTENSIONS
        );
    }

    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(n) = cli.max_frames {
        config.session.max_frames = n;
    }
    config.validate()?;
    info!(
        "scales: {:?}, box_size: {}, stride: {}, max_frames: {}",
        config.search.scales, config.model.box_size, config.model.stride, config.session.max_frames
    );

    let estimator = OnnxPoseEstimator::new(&config.model)?;
    let mut session = SessionAggregator::from_config(estimator, &config)?;

    let frames = VideoFrames::open(&cli.video)?;
    let (w, h) = frames.resolution();
    info!("video: {} ({}x{})", cli.video.display(), w, h);

    let report = session.analyze(frames, &cli.posture)?;
    info!(
        "frames read: {}, failed: {}, distinct feedback: {}",
        report.frames_read,
        report.frames_failed,
        report.summary.len()
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
