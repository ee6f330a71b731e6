//! # Transcoder Engine
//!
//! The external engine every job runs against. The pipeline only ever talks
//! to it through file names in a shared namespace and an argument vector, so
//! the engine itself stays a black box.
//!
//! [`FfmpegTranscoder`] backs the namespace with a scratch directory and runs
//! the `ffmpeg` executable inside it.

pub mod ffmpeg;

#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;

use crate::error::EngineError;

pub use ffmpeg::FfmpegTranscoder;

/// Engine collaborator used by the execution engine
///
/// `initialize` must be idempotent: the first call does the work, later
/// calls return immediately with the same outcome.
pub trait Transcoder: Send + Sync {
    /// Prepare the engine; must complete before any other call
    fn initialize(&self) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Write `bytes` under `name` in the shared namespace
    fn stage(&self, name: &str, bytes: &[u8]) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Run the engine with a full argument vector
    fn invoke(&self, arguments: &[String]) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Read back a file from the namespace
    fn retrieve(&self, name: &str) -> impl Future<Output = Result<Vec<u8>, EngineError>> + Send;

    /// Delete a file from the namespace; removing a missing name succeeds
    fn remove(&self, name: &str) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Program name shown in dry-run command lines
    fn program(&self) -> String {
        "ffmpeg".to_string()
    }
}
