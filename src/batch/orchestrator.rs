use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info, warn};

use crate::batch::archive::OutputArtifact;
use crate::composition::{Batch, ExecutionMode};
use crate::config::Config;
use crate::error::{CleanupWarning, CompositionError, ExecutionError, Result};
use crate::execution::{ExecutionEngine, ExecutionStrategy};
use crate::progress::{Attempt, ProgressEvent, ProgressSink};
use crate::transcoder::Transcoder;

/// How a single job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success(OutputArtifact),
    Failure(ExecutionError),
}

/// Record of one job in a finished run
#[derive(Debug, Clone)]
pub struct JobResult {
    pub index: usize,
    pub output_name: String,
    pub mode: ExecutionMode,
    pub attempt: Option<Attempt>,
    pub outcome: JobOutcome,
    pub cleanup_warnings: Vec<CleanupWarning>,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Success(_))
    }

    pub fn error(&self) -> Option<&ExecutionError> {
        match &self.outcome {
            JobOutcome::Failure(e) => Some(e),
            JobOutcome::Success(_) => None,
        }
    }
}

/// State owned by one batch run
///
/// Holds the run token that keeps staging names unique, the job sequence,
/// and the results gathered so far.
#[derive(Debug)]
pub struct BatchRunContext {
    run_token: String,
    sequence: usize,
    results: Vec<JobResult>,
    skipped: usize,
    started: Instant,
}

impl BatchRunContext {
    pub fn new() -> Self {
        Self {
            run_token: format!("{:08x}", SmallRng::from_entropy().gen::<u32>()),
            sequence: 0,
            results: Vec::new(),
            skipped: 0,
            started: Instant::now(),
        }
    }

    pub fn run_token(&self) -> &str {
        &self.run_token
    }

    /// Next staging tag: `{run token}_{sequence}`
    pub fn next_tag(&mut self) -> String {
        let tag = format!("{}_{:04}", self.run_token, self.sequence);
        self.sequence += 1;
        tag
    }

    fn record(&mut self, result: JobResult) {
        self.results.push(result);
    }

    fn finish(self, total: usize) -> BatchReport {
        BatchReport {
            run_token: self.run_token,
            results: self.results,
            skipped: self.skipped,
            total,
            elapsed: self.started.elapsed(),
        }
    }
}

impl Default for BatchRunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub run_token: String,
    pub results: Vec<JobResult>,
    /// Jobs never started because the run was stopped
    pub skipped: usize,
    pub total: usize,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }

    pub fn cleanup_warning_count(&self) -> usize {
        self.results.iter().map(|r| r.cleanup_warnings.len()).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// Successful outputs in job order
    pub fn artifacts(&self) -> impl Iterator<Item = &OutputArtifact> {
        self.results.iter().filter_map(|r| match &r.outcome {
            JobOutcome::Success(artifact) => Some(artifact),
            JobOutcome::Failure(_) => None,
        })
    }

    pub fn into_artifacts(self) -> Vec<OutputArtifact> {
        self.results
            .into_iter()
            .filter_map(|r| match r.outcome {
                JobOutcome::Success(artifact) => Some(artifact),
                JobOutcome::Failure(_) => None,
            })
            .collect()
    }
}

/// Runs every job of a batch in order against one transcoder
///
/// A failed job is recorded and the batch moves on; only a transcoder that
/// cannot be initialized stops the run before any job starts.
pub struct BatchOrchestrator<T: Transcoder> {
    engine: ExecutionEngine<T>,
    stop: Arc<AtomicBool>,
}

impl<T: Transcoder> BatchOrchestrator<T> {
    pub fn new(transcoder: T, config: &Config) -> Self {
        Self {
            engine: ExecutionEngine::new(transcoder, config),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an external stop flag; once set, no further job is started
    pub fn with_stop_signal(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn engine(&self) -> &ExecutionEngine<T> {
        &self.engine
    }

    pub fn transcoder(&self) -> &T {
        self.engine.transcoder()
    }

    /// Output names and strategies for every job, without touching the transcoder
    pub fn plan(&self, batch: &Batch) -> Vec<(String, ExecutionStrategy)> {
        let mut context = BatchRunContext::new();
        batch
            .iter()
            .map(|job| {
                let (_, strategy) = self.engine.plan_job(job, &context.next_tag());
                (job.output_name(self.engine.output_extension()), strategy)
            })
            .collect()
    }

    /// Run the whole batch
    pub async fn run<S>(&self, batch: &Batch, sink: &S) -> Result<BatchReport>
    where
        S: ProgressSink + ?Sized,
    {
        if batch.is_empty() {
            return Err(CompositionError::MissingRole {
                leads: batch.lead_count(),
                bodies: batch.body_count(),
            }
            .into());
        }

        if let Err(e) = self.engine.transcoder().initialize().await {
            error!("Transcoder initialization failed: {}", e);
            return Err(e.into());
        }

        let total = batch.len();
        let mut context = BatchRunContext::new();
        info!("🚀 Starting batch of {} jobs (run {})", total, context.run_token());
        sink.report(ProgressEvent::BatchStarted { total });

        for (position, job) in batch.iter().enumerate() {
            if self.stop.load(Ordering::SeqCst) {
                context.skipped = total - position;
                warn!("Stop requested, skipping remaining {} jobs", context.skipped);
                break;
            }

            let output_name = job.output_name(self.engine.output_extension());
            sink.report(ProgressEvent::JobStarted {
                index: job.index(),
                total,
                output_name: output_name.clone(),
                mode: job.mode(),
            });

            let tag = context.next_tag();
            let execution = self.engine.execute(job, &tag, sink).await;

            let outcome = match execution.outcome {
                Ok(bytes) => JobOutcome::Success(OutputArtifact::new(output_name.clone(), bytes)),
                Err(e) => {
                    warn!("Job {} ({}) failed: {}", job.index(), output_name, e);
                    JobOutcome::Failure(e)
                }
            };

            sink.report(ProgressEvent::JobFinished {
                completed: position + 1,
                total,
                output_name: output_name.clone(),
                error: match &outcome {
                    JobOutcome::Failure(e) => Some(e.to_string()),
                    JobOutcome::Success(_) => None,
                },
            });

            context.record(JobResult {
                index: job.index(),
                output_name,
                mode: execution.mode,
                attempt: execution.attempt,
                outcome,
                cleanup_warnings: execution.cleanup_warnings,
            });
        }

        let report = context.finish(total);
        sink.report(ProgressEvent::BatchFinished {
            succeeded: report.success_count(),
            failed: report.failure_count(),
            skipped: report.skipped,
            total,
        });

        info!(
            "Batch finished in {:.1}s: {} succeeded, {} failed, {} skipped",
            report.elapsed.as_secs_f64(),
            report.success_count(),
            report.failure_count(),
            report.skipped
        );

        Ok(report)
    }
}
