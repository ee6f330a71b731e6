//! # Batch Runs
//!
//! Drives a whole batch through the execution engine one job at a time and
//! packages the successful outputs.
//!
//! - [`BatchOrchestrator`] initializes the transcoder once, runs each job in
//!   lead-major order and records a [`JobResult`] per job. A failing job never
//!   stops the batch.
//! - [`DirectoryWriter`] and [`ZipArchiveWriter`] write the outputs of a
//!   finished [`BatchReport`].

pub mod archive;
pub mod orchestrator;

pub use archive::{ArchiveWriter, DirectoryWriter, OutputArtifact, ZipArchiveWriter};
pub use orchestrator::{BatchOrchestrator, BatchReport, BatchRunContext, JobOutcome, JobResult};
