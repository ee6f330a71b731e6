//! # Progress Reporting
//!
//! Events emitted by the orchestrator and the execution engine at fixed
//! points of a run: batch start, job start, before and after each transcoder
//! invocation, after cleanup, job end and batch end.
//!
//! Sinks are synchronous and called inline; a channel sender is itself a sink
//! for callers that want to consume events on another task.

use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::composition::ExecutionMode;

/// Which plan of a job's strategy is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Primary,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    BatchStarted {
        total: usize,
    },
    JobStarted {
        index: usize,
        total: usize,
        output_name: String,
        mode: ExecutionMode,
    },
    InvocationStarted {
        index: usize,
        attempt: Attempt,
        plan: String,
    },
    InvocationFinished {
        index: usize,
        attempt: Attempt,
        success: bool,
    },
    CleanupFinished {
        index: usize,
        warnings: usize,
    },
    JobFinished {
        completed: usize,
        total: usize,
        output_name: String,
        /// `None` on success, the failure message otherwise
        error: Option<String>,
    },
    BatchFinished {
        succeeded: usize,
        failed: usize,
        skipped: usize,
        total: usize,
    },
}

impl ProgressEvent {
    /// Fraction of the batch completed, for events that carry it
    pub fn fraction(&self) -> Option<f64> {
        match self {
            Self::JobFinished { completed, total, .. } => Some(fraction(*completed, *total)),
            Self::BatchFinished { .. } => Some(1.0),
            Self::BatchStarted { .. } => Some(0.0),
            _ => None,
        }
    }
}

/// `completed / total`, with an empty batch counting as done
pub fn fraction(completed: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        completed as f64 / total as f64
    }
}

/// Receiver of progress events
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Writes events to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::BatchStarted { total } => {
                info!("🎬 Processing {} outputs", total);
            }
            ProgressEvent::JobStarted { index, total, output_name, mode } => {
                info!("Processing... ({}/{}) {} [{}]", index + 1, total, output_name, mode);
            }
            ProgressEvent::InvocationStarted { attempt, plan, .. } => {
                debug!("   {:?} attempt: {}", attempt, plan);
            }
            ProgressEvent::InvocationFinished { attempt, success, .. } => {
                debug!("   {:?} attempt {}", attempt, if success { "succeeded" } else { "failed" });
            }
            ProgressEvent::CleanupFinished { warnings, .. } => {
                if warnings > 0 {
                    warn!("   Cleanup left {} warnings", warnings);
                }
            }
            ProgressEvent::JobFinished { completed, total, output_name, error } => match error {
                None => info!(
                    "   ✅ {} ({:.0}%)",
                    output_name,
                    fraction(completed, total) * 100.0
                ),
                Some(message) => warn!("   ❌ {} failed: {}", output_name, message),
            },
            ProgressEvent::BatchFinished { succeeded, failed, skipped, total } => {
                info!(
                    "🎉 Done: {}/{} succeeded, {} failed, {} skipped",
                    succeeded, total, failed, skipped
                );
            }
        }
    }
}

impl ProgressSink for UnboundedSender<ProgressEvent> {
    fn report(&self, event: ProgressEvent) {
        // A dropped receiver only means nobody is listening any more
        let _ = self.send(event);
    }
}

/// Keeps every event in memory
impl ProgressSink for Mutex<Vec<ProgressEvent>> {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction() {
        assert_eq!(fraction(1, 4), 0.25);
        assert_eq!(fraction(3, 3), 1.0);
        assert_eq!(fraction(0, 0), 1.0);
    }

    #[test]
    fn test_event_fraction() {
        let event = ProgressEvent::JobFinished {
            completed: 2,
            total: 3,
            output_name: "a.mp4".to_string(),
            error: None,
        };
        assert!((event.fraction().unwrap() - 2.0 / 3.0).abs() < 1e-9);

        let event = ProgressEvent::CleanupFinished { index: 0, warnings: 0 };
        assert!(event.fraction().is_none());
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.report(ProgressEvent::BatchStarted { total: 2 });
        assert_eq!(rx.recv().await, Some(ProgressEvent::BatchStarted { total: 2 }));

        drop(rx);
        // Sending after the receiver is gone must not panic
        tx.report(ProgressEvent::BatchStarted { total: 2 });
    }

    #[test]
    fn test_recording_sink() {
        let sink: Mutex<Vec<ProgressEvent>> = Mutex::new(Vec::new());
        sink.report(ProgressEvent::BatchStarted { total: 1 });
        assert_eq!(sink.lock().unwrap().len(), 1);
    }
}
