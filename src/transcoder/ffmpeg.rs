use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::EncoderConfig;
use crate::error::EngineError;
use crate::transcoder::Transcoder;

/// Lines of FFmpeg stderr kept in failure messages
const STDERR_TAIL_LINES: usize = 6;

/// FFmpeg executable working inside a private scratch directory
///
/// The scratch directory is the shared namespace for the whole run; every
/// name passed to this transcoder is a bare file name inside it. Each
/// instance gets its own directory, so two transcoders in one process never
/// see each other's files.
pub struct FfmpegTranscoder {
    program: PathBuf,
    scratch_dir: PathBuf,
    ready: OnceCell<()>,
}

impl FfmpegTranscoder {
    pub fn new(config: &EncoderConfig) -> Self {
        let root = config
            .scratch_root
            .clone()
            .unwrap_or_else(std::env::temp_dir);

        Self {
            program: config.ffmpeg_path.clone(),
            scratch_dir: root.join(format!(
                "splice_compositor_{}_{:08x}",
                std::process::id(),
                SmallRng::from_entropy().gen::<u32>()
            )),
            ready: OnceCell::new(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.initialized()
    }

    /// Names currently present in the namespace
    pub async fn resident_names(&self) -> Result<Vec<String>, EngineError> {
        let listing_failed = |e: std::io::Error| EngineError::RetrieveFailed {
            name: self.scratch_dir.display().to_string(),
            reason: e.to_string(),
        };

        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.scratch_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(listing_failed(e)),
        };

        while let Some(entry) = entries.next_entry().await.map_err(listing_failed)? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// Remove the scratch directory and everything left in it
    pub async fn shutdown(&self) -> std::io::Result<()> {
        match tokio::fs::remove_dir_all(&self.scratch_dir).await {
            Ok(()) => {
                debug!("Removed scratch directory {:?}", self.scratch_dir);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn check_binary(&self) -> Result<(), EngineError> {
        let status = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| EngineError::InitializationFailed {
                reason: format!("cannot run {:?}: {}", self.program, e),
            })?;

        if !status.success() {
            return Err(EngineError::InitializationFailed {
                reason: format!("{:?} -version exited with {}", self.program, status),
            });
        }

        Ok(())
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, EngineError> {
        if !self.ready.initialized() {
            return Err(EngineError::NotInitialized);
        }

        let is_bare = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if !is_bare {
            return Err(EngineError::StageFailed {
                name: name.to_string(),
                reason: "names must be bare file names".to_string(),
            });
        }

        Ok(self.scratch_dir.join(name))
    }
}

impl Transcoder for FfmpegTranscoder {
    async fn initialize(&self) -> Result<(), EngineError> {
        self.ready
            .get_or_try_init(|| async {
                self.check_binary().await?;
                tokio::fs::create_dir_all(&self.scratch_dir)
                    .await
                    .map_err(|e| EngineError::InitializationFailed {
                        reason: format!("cannot create {:?}: {}", self.scratch_dir, e),
                    })?;
                info!("FFmpeg ready ({:?}), scratch: {:?}", self.program, self.scratch_dir);
                Ok::<(), EngineError>(())
            })
            .await
            .map(|_| ())
    }

    async fn stage(&self, name: &str, bytes: &[u8]) -> Result<(), EngineError> {
        let path = self.path_for(name)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| EngineError::StageFailed {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        debug!("Staged {} ({:.2} MB)", name, bytes.len() as f64 / 1024.0 / 1024.0);
        Ok(())
    }

    async fn invoke(&self, arguments: &[String]) -> Result<(), EngineError> {
        if !self.ready.initialized() {
            return Err(EngineError::NotInitialized);
        }

        debug!("Running {:?} {:?}", self.program, arguments);
        let output = Command::new(&self.program)
            .args(["-hide_banner", "-nostdin"])
            .args(arguments)
            .current_dir(&self.scratch_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| EngineError::InvocationFailed {
                reason: format!("failed to spawn FFmpeg: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr_tail(&stderr, STDERR_TAIL_LINES);
            warn!("FFmpeg exited with {}: {}", output.status, reason);
            return Err(EngineError::InvocationFailed {
                reason: format!("FFmpeg exited with {}: {}", output.status, reason),
            });
        }

        Ok(())
    }

    async fn retrieve(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        let path = self.path_for(name)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| EngineError::RetrieveFailed {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    async fn remove(&self, name: &str) -> Result<(), EngineError> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineError::RemoveFailed {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn program(&self) -> String {
        self.program.display().to_string()
    }
}

/// Last `lines` non-empty lines of FFmpeg's stderr, joined with " | "
fn stderr_tail(stderr: &str, lines: usize) -> String {
    let kept: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let start = kept.len().saturating_sub(lines);

    if kept.is_empty() {
        "no error output".to_string()
    } else {
        kept[start..].join(" | ")
    }
}
