use tracing::{debug, warn};

use crate::error::CleanupWarning;
use crate::transcoder::Transcoder;

/// Names a job has put (or may have put) into the shared namespace
///
/// Every name is recorded before the call that creates it, so partial
/// writes are covered too. [`ResourceScope::release`] must run once the job
/// is over, whatever its outcome.
#[derive(Debug)]
pub struct ResourceScope {
    job_index: usize,
    names: Vec<String>,
}

impl ResourceScope {
    pub fn new(job_index: usize) -> Self {
        Self {
            job_index,
            names: Vec::new(),
        }
    }

    /// Record a name for removal
    pub fn track<S: Into<String>>(&mut self, name: S) {
        let name = name.into();
        if !self.names.contains(&name) {
            self.names.push(name);
        }
    }

    pub fn tracked(&self) -> &[String] {
        &self.names
    }

    /// Remove every tracked name, returning one warning per failed removal.
    ///
    /// A failed removal does not stop the remaining ones.
    pub async fn release<T: Transcoder>(self, transcoder: &T) -> Vec<CleanupWarning> {
        let mut warnings = Vec::new();

        for name in self.names {
            match transcoder.remove(&name).await {
                Ok(()) => debug!("Job {}: removed {}", self.job_index, name),
                Err(e) => {
                    warn!("Job {}: cleanup of {} failed: {}", self.job_index, name, e);
                    warnings.push(CleanupWarning {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcoder::testing::ScriptedTranscoder;

    #[tokio::test]
    async fn test_release_removes_everything() {
        let transcoder = ScriptedTranscoder::new();
        let mut scope = ResourceScope::new(0);

        for name in ["lead_x.mp4", "body_x.mp4"] {
            scope.track(name);
            transcoder.stage(name, b"data").await.unwrap();
        }
        // Tracked but never created
        scope.track("output_x.mp4");
        scope.track("lead_x.mp4");
        assert_eq!(scope.tracked().len(), 3);

        let warnings = scope.release(&transcoder).await;
        assert!(warnings.is_empty());
        assert!(transcoder.resident_names().is_empty());
    }

    #[tokio::test]
    async fn test_failed_removal_does_not_stop_others() {
        let transcoder = ScriptedTranscoder::new().with_undeletable("body_");
        let mut scope = ResourceScope::new(3);

        for name in ["body_x.mp4", "lead_x.mp4", "output_x.mp4"] {
            scope.track(name);
            transcoder.stage(name, b"data").await.unwrap();
        }

        let warnings = scope.release(&transcoder).await;
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].name, "body_x.mp4");
        assert_eq!(transcoder.resident_names(), vec!["body_x.mp4".to_string()]);
    }
}
