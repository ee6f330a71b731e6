//! # Composition
//!
//! Turns the accepted assets into a batch of lead + body jobs, picks an
//! execution mode for each job, and compiles the FFmpeg filter graph and
//! argument vector for it.

pub mod batch;
pub mod filter_graph;
pub mod mode;
pub mod plan;

// Re-exports for convenience
pub use batch::{Batch, BatchParams, CompositionJob};
pub use filter_graph::FilterGraphCompiler;
pub use mode::{ExecutionMode, SPEED_EPSILON};
pub use plan::{ExecutionPlan, StagingNames, SupportFile};
