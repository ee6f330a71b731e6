use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::assets::types::base_name;
use crate::config::OutputConfig;
use crate::error::{ArchiveError, Result};

/// A finished output, ready to be written out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl OutputArtifact {
    pub fn new<S: Into<String>>(name: S, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Destination for a batch's successful outputs
pub trait ArchiveWriter {
    /// Write every artifact and return the path that now holds them
    fn write(&self, artifacts: &[OutputArtifact]) -> Result<PathBuf>;
}

/// Writes each output as a plain file in a directory
#[derive(Debug, Clone)]
pub struct DirectoryWriter {
    dir: PathBuf,
}

impl DirectoryWriter {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }
}

impl ArchiveWriter for DirectoryWriter {
    fn write(&self, artifacts: &[OutputArtifact]) -> Result<PathBuf> {
        if artifacts.is_empty() {
            return Err(ArchiveError::NothingToWrite.into());
        }

        fs::create_dir_all(&self.dir).map_err(|e| write_failed(&self.dir, e))?;

        for (artifact, name) in artifacts.iter().zip(unique_names(artifacts)) {
            let path = self.dir.join(&name);
            fs::write(&path, &artifact.bytes).map_err(|e| write_failed(&path, e))?;
            debug!("Wrote {:?}", path);
        }

        info!("💾 Saved {} outputs to {:?}", artifacts.len(), self.dir);
        Ok(self.dir.clone())
    }
}

/// Packs every output into one uncompressed ZIP under a single folder
///
/// Video is already compressed, so entries are stored as-is.
#[derive(Debug, Clone)]
pub struct ZipArchiveWriter {
    path: PathBuf,
    folder: String,
}

impl ZipArchiveWriter {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(path: P, folder: S) -> Self {
        Self {
            path: path.into(),
            folder: folder.into(),
        }
    }

    /// Archive in `dir` named after the configured prefix and `date`
    pub fn dated(dir: &Path, config: &OutputConfig, date: NaiveDate) -> Self {
        Self::new(
            dir.join(dated_name(&config.archive_prefix, date)),
            config.archive_folder.clone(),
        )
    }

    /// Same as [`ZipArchiveWriter::dated`] using today's local date
    pub fn today(dir: &Path, config: &OutputConfig) -> Self {
        Self::dated(dir, config, chrono::Local::now().date_naive())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArchiveWriter for ZipArchiveWriter {
    fn write(&self, artifacts: &[OutputArtifact]) -> Result<PathBuf> {
        if artifacts.is_empty() {
            return Err(ArchiveError::NothingToWrite.into());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_failed(parent, e))?;
        }

        let file = File::create(&self.path).map_err(|e| write_failed(&self.path, e))?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .large_file(artifacts.iter().map(|a| a.bytes.len() as u64).sum::<u64>() >= u32::MAX as u64);

        zip.add_directory(format!("{}/", self.folder), options)
            .map_err(|e| write_failed(&self.path, e))?;

        for (artifact, name) in artifacts.iter().zip(unique_names(artifacts)) {
            zip.start_file(format!("{}/{}", self.folder, name), options)
                .map_err(|e| write_failed(&self.path, e))?;
            zip.write_all(&artifact.bytes)
                .map_err(|e| write_failed(&self.path, e))?;
        }

        zip.finish().map_err(|e| write_failed(&self.path, e))?;

        info!("📦 Archived {} outputs into {:?}", artifacts.len(), self.path);
        Ok(self.path.clone())
    }
}

/// `{prefix}_{YYYY-MM-DD}.zip`
pub fn dated_name(prefix: &str, date: NaiveDate) -> String {
    format!("{}_{}.zip", prefix, date.format("%Y-%m-%d"))
}

/// Artifact names with collisions suffixed `_2`, `_3`, ... before the extension
fn unique_names(artifacts: &[OutputArtifact]) -> Vec<String> {
    let mut seen = HashSet::new();

    artifacts
        .iter()
        .map(|artifact| {
            let mut name = artifact.name.clone();
            let mut n = 2;
            while !seen.insert(name.clone()) {
                let stem = base_name(&artifact.name);
                name = match artifact.name.get(stem.len()..) {
                    Some(ext) if !ext.is_empty() => format!("{}_{}{}", stem, n, ext),
                    _ => format!("{}_{}", artifact.name, n),
                };
                n += 1;
            }
            name
        })
        .collect()
}

fn write_failed<E: std::fmt::Display>(path: &Path, e: E) -> ArchiveError {
    ArchiveError::WriteFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}
