use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use splice_compositor::{
    assets::{AssetClassifier, AssetLibrary, AssetLoader},
    batch::{ArchiveWriter, BatchOrchestrator, DirectoryWriter, ZipArchiveWriter},
    composition::{Batch, BatchParams},
    config::Config,
    error::{CompositionError, CompositorError},
    progress::LogProgress,
    transcoder::{FfmpegTranscoder, Transcoder},
};

#[derive(Parser)]
#[command(
    name = "splice-compositor",
    version,
    about = "Splice every lead clip with every body clip using FFmpeg",
    long_about = "Splice-Compositor pairs each lead clip (file name containing キャッチ or 冒頭) with each body clip (ボディ) and writes one output per pair, optionally mixing in BGM and changing playback speed."
)]
struct Cli {
    /// Video clips to splice
    #[arg(required = true)]
    videos: Vec<PathBuf>,

    /// Background music (MP3)
    #[arg(short, long)]
    bgm: Option<PathBuf>,

    /// Playback speed multiplier (1.0 = unchanged, accepted range 0.5-100)
    #[arg(short, long)]
    speed: Option<f64>,

    /// BGM volume in percent
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    bgm_volume: Option<u8>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Pack the outputs into a dated ZIP archive
    #[arg(short, long)]
    zip: bool,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the FFmpeg command for each job without running anything
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!("Starting Splice-Compositor v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => Config::default(),
    };
    if let Some(speed) = cli.speed {
        config.composition.speed_factor = speed;
    }
    if let Some(percent) = cli.bgm_volume {
        config.composition.bgm_volume = f64::from(percent) / 100.0;
    }
    config.validate()?;

    let library = load_library(&cli, &config).await?;
    let batch = Batch::compose(&library, BatchParams::from(&config.composition))?;
    if batch.is_empty() {
        let err = CompositorError::from(CompositionError::MissingRole {
            leads: batch.lead_count(),
            bodies: batch.body_count(),
        });
        bail!(err.user_message());
    }

    let orchestrator = BatchOrchestrator::new(FfmpegTranscoder::new(&config.encoder), &config);

    if cli.dry_run {
        let program = orchestrator.transcoder().program();
        for (output_name, strategy) in orchestrator.plan(&batch) {
            println!("# {}", output_name);
            for plan in strategy.plans() {
                println!("{}", plan.command_line(&program));
            }
        }
        return Ok(());
    }

    let stop = orchestrator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Stop requested, finishing the current job");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let result = orchestrator.run(&batch, &LogProgress).await;

    if let Err(e) = orchestrator.transcoder().shutdown().await {
        warn!("Failed to remove scratch directory: {}", e);
    }

    let report = result.map_err(|e| anyhow!(e.user_message()))?;
    for failure in report.failures() {
        if let Some(e) = failure.error() {
            warn!("{}: {}", failure.output_name, e);
        }
    }

    if report.cleanup_warning_count() > 0 {
        warn!("{} scratch files could not be removed", report.cleanup_warning_count());
    }

    let succeeded = report.success_count();
    let total = report.total;
    if succeeded == 0 {
        bail!("No outputs were produced ({} jobs failed)", report.failure_count());
    }

    let artifacts = report.into_artifacts();
    let path = if cli.zip {
        ZipArchiveWriter::today(&cli.output, &config.output).write(&artifacts)?
    } else {
        DirectoryWriter::new(&cli.output).write(&artifacts)?
    };

    info!("🎉 {}/{} outputs written to {:?}", succeeded, total, path);
    Ok(())
}

/// Read the clips and BGM named on the command line
async fn load_library(cli: &Cli, config: &Config) -> Result<AssetLibrary> {
    let mut library = AssetLibrary::new(AssetClassifier::new(&config.classifier));

    let mut candidates = Vec::with_capacity(cli.videos.len());
    for path in &cli.videos {
        match AssetLoader::load(path).await {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => warn!("Skipping {:?}: {}", path, e),
        }
    }

    let report = library.add_videos(candidates)?;
    for rejected in &report.rejected {
        warn!("{}", CompositorError::from(rejected.clone()).user_message());
    }
    for (name, role) in &report.accepted {
        info!("   {} [{}: {}]", name, role, library.classifier().label(name));
    }
    info!(
        "{} lead x {} body clips -> {} outputs",
        library.lead_count(),
        library.body_count(),
        library.pair_count()
    );

    if let Some(bgm) = &cli.bgm {
        let candidate = AssetLoader::load(bgm).await?;
        library.set_background(candidate)?;
    }

    Ok(library)
}
