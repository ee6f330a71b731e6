//! # Splice-Compositor
//!
//! Batch-splice lead and body video clips into finished outputs with FFmpeg,
//! optionally mixing in a BGM track and changing playback speed.
//!
//! Every lead clip is paired with every body clip. Each pair becomes one job,
//! and each job picks the cheapest FFmpeg strategy that produces a correct
//! result:
//!
//! - no speed change, no BGM: stream-copy concat, re-encoding only if the copy fails
//! - no speed change, BGM: concat + mix, encoded with fast settings
//! - speed change: full re-encode with `setpts`/`atempo`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use splice_compositor::{
//!     assets::{AssetLibrary, AssetLoader},
//!     batch::{ArchiveWriter, BatchOrchestrator, DirectoryWriter},
//!     composition::{Batch, BatchParams},
//!     progress::LogProgress,
//!     transcoder::FfmpegTranscoder,
//!     Config,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//!
//! let mut library = AssetLibrary::default();
//! library.add_videos(AssetLoader::load_all(&["キャッチ_A.mp4", "ボディ_A.mp4"]).await?)?;
//!
//! let batch = Batch::compose(&library, BatchParams::from(&config.composition))?;
//! let orchestrator = BatchOrchestrator::new(FfmpegTranscoder::new(&config.encoder), &config);
//! let report = orchestrator.run(&batch, &LogProgress).await?;
//!
//! DirectoryWriter::new("out").write(&report.into_artifacts())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`assets`] - Input loading, lead/body classification and deduplication
//! - [`composition`] - Batch formation, mode selection and filter graphs
//! - [`execution`] - Per-job staging, invocation, fallback and cleanup
//! - [`batch`] - Sequential batch runs and output packaging
//! - [`transcoder`] - The FFmpeg engine behind a small trait
//! - [`progress`] - Progress events and sinks
//! - [`config`] - Configuration management

pub mod assets;
pub mod batch;
pub mod composition;
pub mod config;
pub mod error;
pub mod execution;
pub mod progress;
pub mod transcoder;

// Re-export commonly used types for convenience
pub use crate::{
    batch::{BatchOrchestrator, BatchReport},
    composition::{Batch, ExecutionMode},
    config::Config,
    error::{CompositorError, Result},
    transcoder::{FfmpegTranscoder, Transcoder},
};
