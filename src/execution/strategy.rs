use tracing::{info, warn};

use crate::composition::{CompositionJob, ExecutionPlan, FilterGraphCompiler, StagingNames};
use crate::error::ExecutionError;
use crate::execution::resources::ResourceScope;
use crate::progress::{Attempt, ProgressEvent, ProgressSink};
use crate::transcoder::Transcoder;

/// A primary plan and the optional plan tried when it fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionStrategy {
    pub primary: ExecutionPlan,
    pub fallback: Option<ExecutionPlan>,
}

impl ExecutionStrategy {
    /// Build the strategy for a job; only the copy concat has a fallback
    pub fn for_job(compiler: &FilterGraphCompiler, job: &CompositionJob, names: &StagingNames) -> Self {
        let mode = job.mode();
        let primary = compiler.compile(mode, job, names);
        let fallback = mode.has_fallback().then(|| compiler.copy_fallback(names));

        Self { primary, fallback }
    }

    /// Plans in the order they would be tried
    pub fn plans(&self) -> impl Iterator<Item = &ExecutionPlan> {
        std::iter::once(&self.primary).chain(self.fallback.iter())
    }

    /// Run the primary plan, then the fallback if the primary fails.
    ///
    /// Support files are tracked in `scope` before they are staged. Returns
    /// the attempt that produced the output.
    pub async fn run<T, S>(
        &self,
        transcoder: &T,
        scope: &mut ResourceScope,
        job_index: usize,
        sink: &S,
    ) -> Result<Attempt, ExecutionError>
    where
        T: Transcoder,
        S: ProgressSink + ?Sized,
    {
        let primary_error = match attempt(transcoder, scope, job_index, sink, &self.primary, Attempt::Primary).await {
            Ok(()) => return Ok(Attempt::Primary),
            Err(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            return Err(primary_error);
        };

        warn!("Job {}: copy concat failed, retrying with re-encode: {}", job_index, primary_error);
        match attempt(transcoder, scope, job_index, sink, fallback, Attempt::Fallback).await {
            Ok(()) => {
                info!("Job {}: re-encode fallback succeeded", job_index);
                Ok(Attempt::Fallback)
            }
            Err(fallback_error) => Err(ExecutionError::FallbackFailed {
                primary: primary_error.to_string(),
                fallback: fallback_error.to_string(),
            }),
        }
    }
}

async fn attempt<T, S>(
    transcoder: &T,
    scope: &mut ResourceScope,
    job_index: usize,
    sink: &S,
    plan: &ExecutionPlan,
    which: Attempt,
) -> Result<(), ExecutionError>
where
    T: Transcoder,
    S: ProgressSink + ?Sized,
{
    for file in &plan.support_files {
        scope.track(file.name.as_str());
        transcoder
            .stage(&file.name, &file.contents)
            .await
            .map_err(ExecutionError::Staging)?;
    }

    sink.report(ProgressEvent::InvocationStarted {
        index: job_index,
        attempt: which,
        plan: plan.describe(),
    });

    let result = transcoder.invoke(&plan.arguments).await;

    sink.report(ProgressEvent::InvocationFinished {
        index: job_index,
        attempt: which,
        success: result.is_ok(),
    });

    result.map_err(ExecutionError::Invocation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::assets::{AssetCandidate, AssetRole, MediaAsset};
    use crate::composition::{Batch, BatchParams, ExecutionMode};
    use crate::transcoder::testing::ScriptedTranscoder;

    fn job(speed_factor: f64) -> CompositionJob {
        let lead = MediaAsset::new(AssetCandidate::new("キャッチ_A.mp4", None, vec![1u8]), AssetRole::Lead);
        let body = MediaAsset::new(AssetCandidate::new("ボディ_A.mp4", None, vec![2u8]), AssetRole::Body);
        let params = BatchParams { speed_factor, ..BatchParams::default() };
        Batch::from_parts(&[lead], &[body], None, params).unwrap().jobs()[0].clone()
    }

    async fn staged(transcoder: &ScriptedTranscoder, names: &StagingNames) {
        transcoder.stage(&names.lead, b"lead").await.unwrap();
        transcoder.stage(&names.body, b"body").await.unwrap();
    }

    #[test]
    fn test_fallback_only_for_copy_concat() {
        let compiler = FilterGraphCompiler::default();

        let copy = job(1.0);
        let names = StagingNames::for_job("a", &copy, "mp4");
        let strategy = ExecutionStrategy::for_job(&compiler, &copy, &names);
        assert_eq!(strategy.primary.mode, ExecutionMode::CopyConcat);
        assert!(strategy.fallback.as_ref().unwrap().filter_graph.is_some());
        assert_eq!(strategy.plans().count(), 2);

        let reencode = job(1.5);
        let names = StagingNames::for_job("b", &reencode, "mp4");
        let strategy = ExecutionStrategy::for_job(&compiler, &reencode, &names);
        assert!(strategy.fallback.is_none());
        assert_eq!(strategy.plans().count(), 1);
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let transcoder = ScriptedTranscoder::new();
        let job = job(1.0);
        let names = StagingNames::for_job("a", &job, "mp4");
        staged(&transcoder, &names).await;

        let strategy = ExecutionStrategy::for_job(&FilterGraphCompiler::default(), &job, &names);
        let mut scope = ResourceScope::new(0);
        let sink: Mutex<Vec<ProgressEvent>> = Mutex::new(Vec::new());

        let used = strategy.run(&transcoder, &mut scope, 0, &sink).await.unwrap();
        assert_eq!(used, Attempt::Primary);
        assert_eq!(transcoder.invocations().len(), 1);
        assert_eq!(scope.tracked(), &["concat_a.txt".to_string()]);
        assert_eq!(sink.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_copy_failure_falls_back_to_reencode() {
        let transcoder = ScriptedTranscoder::new().with_fail_rule(|args| {
            args.iter()
                .any(|arg| arg == "copy")
                .then(|| "Non-monotonous DTS".to_string())
        });
        let job = job(1.0);
        let names = StagingNames::for_job("a", &job, "mp4");
        staged(&transcoder, &names).await;

        let strategy = ExecutionStrategy::for_job(&FilterGraphCompiler::default(), &job, &names);
        let mut scope = ResourceScope::new(0);
        let sink: Mutex<Vec<ProgressEvent>> = Mutex::new(Vec::new());

        let used = strategy.run(&transcoder, &mut scope, 0, &sink).await.unwrap();
        assert_eq!(used, Attempt::Fallback);
        assert_eq!(transcoder.invocations().len(), 2);

        let events = sink.lock().unwrap();
        assert!(events.contains(&ProgressEvent::InvocationFinished {
            index: 0,
            attempt: Attempt::Primary,
            success: false,
        }));
        assert!(events.contains(&ProgressEvent::InvocationFinished {
            index: 0,
            attempt: Attempt::Fallback,
            success: true,
        }));
    }

    #[tokio::test]
    async fn test_both_attempts_fail() {
        let transcoder = ScriptedTranscoder::new().with_fail_rule(|_| Some("boom".to_string()));
        let job = job(1.0);
        let names = StagingNames::for_job("a", &job, "mp4");
        staged(&transcoder, &names).await;

        let strategy = ExecutionStrategy::for_job(&FilterGraphCompiler::default(), &job, &names);
        let mut scope = ResourceScope::new(0);

        let err = strategy
            .run(&transcoder, &mut scope, 0, &crate::progress::NullProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::FallbackFailed { .. }));
    }

    #[tokio::test]
    async fn test_reencode_failure_is_terminal() {
        let transcoder = ScriptedTranscoder::new().with_fail_rule(|_| Some("boom".to_string()));
        let job = job(2.0);
        let names = StagingNames::for_job("a", &job, "mp4");
        staged(&transcoder, &names).await;

        let strategy = ExecutionStrategy::for_job(&FilterGraphCompiler::default(), &job, &names);
        let mut scope = ResourceScope::new(0);

        let err = strategy
            .run(&transcoder, &mut scope, 0, &crate::progress::NullProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Invocation(_)));
        assert_eq!(transcoder.invocations().len(), 1);
    }
}
