use tracing::{debug, info};

use crate::composition::{CompositionJob, ExecutionMode, FilterGraphCompiler, StagingNames};
use crate::config::Config;
use crate::error::{CleanupWarning, ExecutionError};
use crate::execution::resources::ResourceScope;
use crate::execution::strategy::ExecutionStrategy;
use crate::progress::{Attempt, ProgressEvent, ProgressSink};
use crate::transcoder::Transcoder;

/// Outcome of running one job through the engine
#[derive(Debug)]
pub struct JobExecution {
    pub mode: ExecutionMode,

    /// Plan that produced the output; `None` when the job failed
    pub attempt: Option<Attempt>,

    /// Bytes of the finished output, or the job's failure
    pub outcome: Result<Vec<u8>, ExecutionError>,

    /// Names that could not be removed afterwards
    pub cleanup_warnings: Vec<CleanupWarning>,
}

impl JobExecution {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Runs single jobs against a transcoder: stage, invoke, retrieve, clean up
///
/// The transcoder must already be initialized; the engine never calls
/// `initialize` itself.
pub struct ExecutionEngine<T: Transcoder> {
    transcoder: T,
    compiler: FilterGraphCompiler,
    output_extension: String,
}

impl<T: Transcoder> ExecutionEngine<T> {
    pub fn new(transcoder: T, config: &Config) -> Self {
        Self {
            transcoder,
            compiler: FilterGraphCompiler::new(config.encoder.clone()),
            output_extension: config.output.extension.clone(),
        }
    }

    pub fn transcoder(&self) -> &T {
        &self.transcoder
    }

    pub fn compiler(&self) -> &FilterGraphCompiler {
        &self.compiler
    }

    pub fn output_extension(&self) -> &str {
        &self.output_extension
    }

    /// Staging names and strategy for a job under a run-unique tag
    pub fn plan_job(&self, job: &CompositionJob, tag: &str) -> (StagingNames, ExecutionStrategy) {
        let names = StagingNames::for_job(tag, job, &self.output_extension);
        let strategy = ExecutionStrategy::for_job(&self.compiler, job, &names);
        (names, strategy)
    }

    /// Execute one job.
    ///
    /// Every name the job touches is released before this returns, whether
    /// the job succeeded or not.
    pub async fn execute<S>(&self, job: &CompositionJob, tag: &str, sink: &S) -> JobExecution
    where
        S: ProgressSink + ?Sized,
    {
        let (names, strategy) = self.plan_job(job, tag);
        let mut scope = ResourceScope::new(job.index());

        // The engine may leave a partial output behind on failure
        scope.track(names.output.as_str());

        let result = self.run(job, &names, &strategy, &mut scope, sink).await;

        let cleanup_warnings = scope.release(&self.transcoder).await;
        sink.report(ProgressEvent::CleanupFinished {
            index: job.index(),
            warnings: cleanup_warnings.len(),
        });

        let (attempt, outcome) = match result {
            Ok((attempt, bytes)) => {
                info!("Job {}: produced {:.2} MB", job.index(), bytes.len() as f64 / 1024.0 / 1024.0);
                (Some(attempt), Ok(bytes))
            }
            Err(e) => (None, Err(e)),
        };

        JobExecution {
            mode: strategy.primary.mode,
            attempt,
            outcome,
            cleanup_warnings,
        }
    }

    async fn run<S>(
        &self,
        job: &CompositionJob,
        names: &StagingNames,
        strategy: &ExecutionStrategy,
        scope: &mut ResourceScope,
        sink: &S,
    ) -> Result<(Attempt, Vec<u8>), ExecutionError>
    where
        S: ProgressSink + ?Sized,
    {
        let mut inputs = vec![(&names.lead, job.lead()), (&names.body, job.body())];
        if let (Some(name), Some(asset)) = (&names.background, job.background()) {
            inputs.push((name, asset));
        }

        for (name, asset) in inputs {
            scope.track(name.as_str());
            self.transcoder
                .stage(name, asset.raw_bytes())
                .await
                .map_err(ExecutionError::Staging)?;
            debug!("Job {}: staged {} as {}", job.index(), asset.name(), name);
        }

        let attempt = strategy.run(&self.transcoder, scope, job.index(), sink).await?;

        let bytes = self
            .transcoder
            .retrieve(&names.output)
            .await
            .map_err(ExecutionError::Retrieval)?;

        Ok((attempt, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetCandidate, AssetRole, MediaAsset};
    use crate::composition::{Batch, BatchParams};
    use crate::progress::NullProgress;
    use crate::transcoder::testing::ScriptedTranscoder;

    fn job(speed_factor: f64, with_background: bool) -> CompositionJob {
        let lead = MediaAsset::new(AssetCandidate::new("キャッチ_A.mp4", None, vec![1u8; 4]), AssetRole::Lead);
        let body = MediaAsset::new(AssetCandidate::new("ボディ_A.mp4", None, vec![2u8; 4]), AssetRole::Body);
        let background = with_background
            .then(|| MediaAsset::new(AssetCandidate::new("bgm.mp3", None, vec![3u8; 4]), AssetRole::Background));
        let params = BatchParams {
            speed_factor,
            background_volume: 0.3,
            ..BatchParams::default()
        };
        Batch::from_parts(&[lead], &[body], background, params).unwrap().jobs()[0].clone()
    }

    #[tokio::test]
    async fn test_success_leaves_nothing_behind() {
        let engine = ExecutionEngine::new(ScriptedTranscoder::new(), &Config::default());

        let execution = engine.execute(&job(1.0, false), "t_0", &NullProgress).await;
        assert!(execution.is_success());
        assert_eq!(execution.mode, ExecutionMode::CopyConcat);
        assert_eq!(execution.attempt, Some(Attempt::Primary));
        assert!(!execution.outcome.unwrap().is_empty());
        assert!(execution.cleanup_warnings.is_empty());
        assert!(engine.transcoder().resident_names().is_empty());
    }

    #[tokio::test]
    async fn test_failure_leaves_nothing_behind() {
        let transcoder = ScriptedTranscoder::new().with_fail_rule(|_| Some("Invalid data".to_string()));
        let engine = ExecutionEngine::new(transcoder, &Config::default());

        let execution = engine.execute(&job(1.5, false), "t_1", &NullProgress).await;
        assert!(matches!(execution.outcome, Err(ExecutionError::Invocation(_))));
        assert_eq!(execution.attempt, None);
        assert!(engine.transcoder().resident_names().is_empty());
    }

    #[tokio::test]
    async fn test_background_is_staged_and_mixed() {
        let engine = ExecutionEngine::new(ScriptedTranscoder::new(), &Config::default());

        let execution = engine.execute(&job(1.0, true), "t_2", &NullProgress).await;
        assert!(execution.is_success());
        assert_eq!(execution.mode, ExecutionMode::BgmFastMix);

        let invocations = engine.transcoder().invocations();
        assert_eq!(invocations.len(), 1);
        assert!(invocations[0].contains(&"bgm_t_2.mp3".to_string()));
        assert!(engine.transcoder().resident_names().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_warning_keeps_success() {
        let transcoder = ScriptedTranscoder::new().with_undeletable("lead_");
        let engine = ExecutionEngine::new(transcoder, &Config::default());

        let execution = engine.execute(&job(1.0, false), "t_3", &NullProgress).await;
        assert!(execution.is_success());
        assert_eq!(execution.cleanup_warnings.len(), 1);
        assert_eq!(execution.cleanup_warnings[0].name, "lead_t_3.mp4");
    }

    #[test]
    fn test_plan_job_uses_output_extension() {
        let mut config = Config::default();
        config.output.extension = "mov".to_string();
        let engine = ExecutionEngine::new(ScriptedTranscoder::new(), &config);

        let (names, strategy) = engine.plan_job(&job(1.0, false), "x");
        assert_eq!(names.output, "output_x.mov");
        assert!(strategy.fallback.is_some());
    }
}
