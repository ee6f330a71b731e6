//! # Execution
//!
//! Runs a single composition job against the transcoder:
//!
//! 1. Stage the lead, body and optional BGM under run-unique names
//! 2. Run the job's strategy (copy concat jobs get a re-encode retry)
//! 3. Retrieve the output
//! 4. Remove every name the job touched, whatever happened above
//!
//! ```rust,no_run
//! use splice_compositor::config::Config;
//! use splice_compositor::execution::ExecutionEngine;
//! use splice_compositor::progress::LogProgress;
//! use splice_compositor::transcoder::{FfmpegTranscoder, Transcoder};
//! # async fn run(job: splice_compositor::composition::CompositionJob) -> splice_compositor::Result<()> {
//! let config = Config::default();
//! let transcoder = FfmpegTranscoder::new(&config.encoder);
//! transcoder.initialize().await?;
//!
//! let engine = ExecutionEngine::new(transcoder, &config);
//! let execution = engine.execute(&job, "run_0", &LogProgress).await;
//! let bytes = execution.outcome?;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod resources;
pub mod strategy;

pub use engine::{ExecutionEngine, JobExecution};
pub use resources::ResourceScope;
pub use strategy::ExecutionStrategy;
