use crate::composition::batch::CompositionJob;
use crate::composition::mode::ExecutionMode;

/// Names a job uses inside the transcoder's shared namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingNames {
    pub lead: String,
    pub body: String,
    pub background: Option<String>,
    pub concat_list: String,
    pub output: String,
}

impl StagingNames {
    /// Derive collision-free names from a run-unique job tag
    pub fn for_job(tag: &str, job: &CompositionJob, output_extension: &str) -> Self {
        let lead_ext = job.lead().extension().unwrap_or_else(|| "mp4".to_string());
        let body_ext = job.body().extension().unwrap_or_else(|| "mp4".to_string());

        Self {
            lead: format!("lead_{}.{}", tag, lead_ext),
            body: format!("body_{}.{}", tag, body_ext),
            background: job.background().map(|_| format!("bgm_{}.mp3", tag)),
            concat_list: format!("concat_{}.txt", tag),
            output: format!("output_{}.{}", tag, output_extension),
        }
    }
}

/// A file the engine writes into the namespace before invoking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportFile {
    pub name: String,
    pub contents: Vec<u8>,
}

/// Everything needed for one transcoder invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub mode: ExecutionMode,

    /// `-filter_complex` expression; `None` for the concat-list copy path
    pub filter_graph: Option<String>,

    /// Full argument vector, excluding the program name
    pub arguments: Vec<String>,

    /// Files to stage in addition to the job's inputs
    pub support_files: Vec<SupportFile>,
}

impl ExecutionPlan {
    /// Short description for logs
    pub fn describe(&self) -> String {
        match &self.filter_graph {
            Some(_) => format!("{} (filter graph)", self.mode),
            None => format!("{} (concat list)", self.mode),
        }
    }

    /// Arguments rendered as a shell-like command line, for dry runs
    pub fn command_line(&self, program: &str) -> String {
        let mut line = program.to_string();
        for arg in &self.arguments {
            line.push(' ');
            if arg.is_empty() || arg.contains([' ', ';', '[', ']', '\'', '*']) {
                line.push('\'');
                line.push_str(&arg.replace('\'', "'\\''"));
                line.push('\'');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetCandidate, AssetRole, MediaAsset};
    use crate::composition::batch::{Batch, BatchParams};

    fn asset(name: &str, role: AssetRole) -> MediaAsset {
        MediaAsset::new(AssetCandidate::new(name, None, vec![0u8]), role)
    }

    #[test]
    fn test_staging_names_follow_tag() {
        let batch = Batch::from_parts(
            &[asset("キャッチ_A.MOV", AssetRole::Lead)],
            &[asset("ボディ_A", AssetRole::Body)],
            Some(asset("bgm.mp3", AssetRole::Background)),
            BatchParams::default(),
        )
        .unwrap();

        let names = StagingNames::for_job("r1_0007", &batch.jobs()[0], "mp4");
        assert_eq!(names.lead, "lead_r1_0007.mov");
        assert_eq!(names.body, "body_r1_0007.mp4");
        assert_eq!(names.background.as_deref(), Some("bgm_r1_0007.mp3"));
        assert_eq!(names.concat_list, "concat_r1_0007.txt");
        assert_eq!(names.output, "output_r1_0007.mp4");
    }

    #[test]
    fn test_command_line_quotes_graph() {
        let plan = ExecutionPlan {
            mode: ExecutionMode::Reencode,
            filter_graph: Some("[0:v]null[outv]".to_string()),
            arguments: vec!["-filter_complex".to_string(), "[0:v]null[outv]".to_string()],
            support_files: Vec::new(),
        };
        assert_eq!(plan.command_line("ffmpeg"), "ffmpeg -filter_complex '[0:v]null[outv]'");
    }
}
