use std::path::Path;

use tracing::debug;

use crate::assets::types::AssetCandidate;
use crate::error::{AssetError, Result};

/// Reads candidate files from disk
///
/// Stands in for a file picker: the declared media type is inferred from the
/// file extension, the same way a browser fills in `File.type`.
pub struct AssetLoader;

impl AssetLoader {
    /// Load a file into a candidate record
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<AssetCandidate> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| AssetError::LoadFailed {
                path: path.display().to_string(),
            })?
            .to_string();

        let bytes = tokio::fs::read(path).await.map_err(|_| AssetError::LoadFailed {
            path: path.display().to_string(),
        })?;

        let media_type = Self::media_type_for(path).map(str::to_string);
        debug!(
            "Read {} ({:.2} MB, {})",
            name,
            bytes.len() as f64 / 1024.0 / 1024.0,
            media_type.as_deref().unwrap_or("unknown type")
        );

        Ok(AssetCandidate::new(name, media_type, bytes))
    }

    /// Load several files, stopping at the first unreadable one
    pub async fn load_all<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<AssetCandidate>> {
        let mut candidates = Vec::with_capacity(paths.len());
        for path in paths {
            candidates.push(Self::load(path).await?);
        }
        Ok(candidates)
    }

    /// Map a file extension to its media type
    pub fn media_type_for(path: &Path) -> Option<&'static str> {
        let extension = path.extension()?.to_str()?.to_lowercase();

        let media_type = match extension.as_str() {
            "mp4" => "video/mp4",
            "m4v" => "video/x-m4v",
            "mov" => "video/quicktime",
            "mkv" => "video/x-matroska",
            "webm" => "video/webm",
            "avi" => "video/x-msvideo",
            "mpeg" | "mpg" => "video/mpeg",
            "3gp" => "video/3gpp",
            "mp3" => "audio/mpeg",
            "wav" => "audio/wav",
            "m4a" => "audio/mp4",
            _ => return None,
        };

        Some(media_type)
    }
}
