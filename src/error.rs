use thiserror::Error;

/// Main error type for the Splice-Compositor library
#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Transcoder engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Composition error: {0}")]
    Composition(#[from] CompositionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while accepting input assets
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("Duplicate asset: {name} ({byte_size} bytes) is already loaded")]
    Duplicate { name: String, byte_size: u64 },

    #[error("Unsupported media type for {name}: {media_type}")]
    UnsupportedType { name: String, media_type: String },

    #[error("All {count} selected files are already loaded")]
    AllDuplicates { count: usize },

    #[error("Failed to load asset file: {path}")]
    LoadFailed { path: String },
}

/// Errors raised by the transcoder engine collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Transcoder initialization failed: {reason}")]
    InitializationFailed { reason: String },

    #[error("Transcoder used before initialization")]
    NotInitialized,

    #[error("Failed to stage {name}: {reason}")]
    StageFailed { name: String, reason: String },

    #[error("Transcoder invocation failed: {reason}")]
    InvocationFailed { reason: String },

    #[error("Failed to retrieve {name}: {reason}")]
    RetrieveFailed { name: String, reason: String },

    #[error("Failed to remove {name}: {reason}")]
    RemoveFailed { name: String, reason: String },
}

/// Per-job execution failures; recoverable at batch granularity
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Staging failed: {0}")]
    Staging(EngineError),

    #[error("{0}")]
    Invocation(EngineError),

    #[error("Output retrieval failed: {0}")]
    Retrieval(EngineError),

    #[error("Copy concat failed ({primary}); re-encode fallback also failed ({fallback})")]
    FallbackFailed { primary: String, fallback: String },
}

/// Batch formation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositionError {
    #[error("Both lead and body clips are required (leads: {leads}, bodies: {bodies})")]
    MissingRole { leads: usize, bodies: usize },

    #[error("Invalid composition parameters: {details}")]
    InvalidParameters { details: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Output packaging errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("No completed outputs to package")]
    NothingToWrite,

    #[error("Failed to write archive {path}: {reason}")]
    WriteFailed { path: String, reason: String },
}

/// A staged name that could not be removed after a job.
///
/// Never an error in its own right: it is logged and attached to the job
/// result, and the job keeps its primary outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cleanup of {name} failed: {reason}")]
pub struct CleanupWarning {
    pub name: String,
    pub reason: String,
}

/// Convenience type alias for Results using CompositorError
pub type Result<T> = std::result::Result<T, CompositorError>;

impl CompositorError {
    /// Check if this error leaves the batch able to continue
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Per-asset and per-job failures never abort the batch
            Self::Asset(_) | Self::Execution(_) => true,
            // Engine initialization and everything else stops the run
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Asset(AssetError::Duplicate { name, .. }) => {
                format!("'{}' is already loaded and was skipped.", name)
            }
            Self::Asset(AssetError::UnsupportedType { name, .. }) => {
                format!("'{}' is not a supported file. Videos must be video files and BGM must be MP3.", name)
            }
            Self::Engine(EngineError::InitializationFailed { reason }) => {
                format!("FFmpeg could not be started: {}. Please check that FFmpeg is installed.", reason)
            }
            Self::Composition(CompositionError::MissingRole { .. }) => {
                "Please provide both lead (キャッチ/冒頭) and body (ボディ) clips.".to_string()
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let duplicate: CompositorError = AssetError::Duplicate {
            name: "a.mp4".to_string(),
            byte_size: 10,
        }
        .into();
        assert!(duplicate.is_recoverable());

        let init: CompositorError = EngineError::InitializationFailed {
            reason: "missing binary".to_string(),
        }
        .into();
        assert!(!init.is_recoverable());
    }

    #[test]
    fn test_fallback_message_keeps_both_causes() {
        let err = ExecutionError::FallbackFailed {
            primary: "codec mismatch".to_string(),
            fallback: "out of memory".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("codec mismatch"));
        assert!(message.contains("out of memory"));
    }
}
