use std::fmt;
use std::sync::Arc;

/// Role of an accepted asset within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetRole {
    /// Opening segment, placed first in every output
    Lead,
    /// Main segment, placed after the lead
    Body,
    /// Optional BGM track mixed under the spliced audio
    Background,
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lead => write!(f, "lead"),
            Self::Body => write!(f, "body"),
            Self::Background => write!(f, "bgm"),
        }
    }
}

/// A file offered by the input collaborator, not yet accepted
#[derive(Debug, Clone)]
pub struct AssetCandidate {
    /// File name as supplied, including extension
    pub name: String,

    /// Declared media type (e.g. `video/mp4`), if the source provided one
    pub declared_media_type: Option<String>,

    /// File contents
    pub raw_bytes: Arc<[u8]>,
}

impl AssetCandidate {
    /// Create a new candidate
    pub fn new<N, B>(name: N, declared_media_type: Option<String>, raw_bytes: B) -> Self
    where
        N: Into<String>,
        B: Into<Arc<[u8]>>,
    {
        Self {
            name: name.into(),
            declared_media_type,
            raw_bytes: raw_bytes.into(),
        }
    }

    /// Size of the contents in bytes
    pub fn byte_size(&self) -> u64 {
        self.raw_bytes.len() as u64
    }

    /// Check whether the declared media type is a video container
    pub fn is_video(&self) -> bool {
        self.declared_media_type
            .as_deref()
            .is_some_and(|media_type| media_type.starts_with("video/"))
    }

    /// Check whether this is an MP3 track, by declared type or `.mp3` suffix
    pub fn is_mp3(&self) -> bool {
        self.declared_media_type.as_deref() == Some("audio/mpeg")
            || self.name.to_lowercase().ends_with(".mp3")
    }
}

/// An accepted, classified input clip or BGM track
///
/// Contents are shared, so cloning an asset into many jobs is cheap.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    name: String,
    byte_size: u64,
    role: AssetRole,
    raw_bytes: Arc<[u8]>,
}

impl MediaAsset {
    /// Accept a candidate under the given role
    pub fn new(candidate: AssetCandidate, role: AssetRole) -> Self {
        Self {
            byte_size: candidate.byte_size(),
            name: candidate.name,
            role,
            raw_bytes: candidate.raw_bytes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    pub fn role(&self) -> AssetRole {
        self.role
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    /// Deduplication identity: same name and same size
    pub fn same_identity(&self, name: &str, byte_size: u64) -> bool {
        self.name == name && self.byte_size == byte_size
    }

    /// File name without its final extension (`a.b.mp4` -> `a.b`)
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }

    /// Final extension, lowercased, when there is one
    pub fn extension(&self) -> Option<String> {
        let base = base_name(&self.name);
        if base.len() == self.name.len() {
            return None;
        }
        Some(self.name[base.len() + 1..].to_lowercase())
    }
}

/// Strip the last `.suffix` from a file name.
///
/// A trailing dot or a dot inside a directory component is left alone.
pub fn base_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() && !name[idx + 1..].contains(['/', '\\']) => &name[..idx],
        _ => name,
    }
}
