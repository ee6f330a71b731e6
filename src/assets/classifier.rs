use tracing::{debug, info};

use crate::assets::types::{AssetCandidate, AssetRole, MediaAsset};
use crate::config::ClassifierConfig;
use crate::error::AssetError;

/// Filename-based lead/body classifier
///
/// A clip is a lead when any lead marker appears earlier in its name than the
/// body marker. Everything else, including names with neither marker, is a
/// body clip.
#[derive(Debug, Clone)]
pub struct AssetClassifier {
    lead_markers: Vec<String>,
    body_marker: String,
}

impl Default for AssetClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

impl AssetClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            lead_markers: config.lead_markers.clone(),
            body_marker: config.body_marker.clone(),
        }
    }

    /// Classify a video file name
    pub fn classify(&self, name: &str) -> AssetRole {
        let lead_idx = self
            .lead_markers
            .iter()
            .filter_map(|marker| name.find(marker.as_str()))
            .min()
            .unwrap_or(usize::MAX);
        let body_idx = name.find(self.body_marker.as_str()).unwrap_or(usize::MAX);

        if lead_idx < body_idx {
            AssetRole::Lead
        } else {
            // Body marker first, or no marker at all
            AssetRole::Body
        }
    }

    /// Listing label: the first lead marker contained in the name, else the
    /// body marker
    pub fn label<'a>(&'a self, name: &str) -> &'a str {
        self.lead_markers
            .iter()
            .find(|marker| name.contains(marker.as_str()))
            .map(String::as_str)
            .unwrap_or(&self.body_marker)
    }
}

/// Outcome of adding several candidates at once
#[derive(Debug, Default)]
pub struct AddReport {
    /// Names accepted, with their roles
    pub accepted: Vec<(String, AssetRole)>,

    /// Candidates turned away and why
    pub rejected: Vec<AssetError>,
}

/// The set of accepted inputs for the next batch
///
/// Videos keep their insertion order; the lead/body partition is rebuilt
/// whenever the set changes.
#[derive(Debug, Default)]
pub struct AssetLibrary {
    classifier: AssetClassifier,
    videos: Vec<MediaAsset>,
    leads: Vec<usize>,
    bodies: Vec<usize>,
    background: Option<MediaAsset>,
}

impl AssetLibrary {
    pub fn new(classifier: AssetClassifier) -> Self {
        Self {
            classifier,
            ..Self::default()
        }
    }

    pub fn classifier(&self) -> &AssetClassifier {
        &self.classifier
    }

    /// Accept one video candidate
    pub fn add_video(&mut self, candidate: AssetCandidate) -> Result<AssetRole, AssetError> {
        self.check_video(&candidate)?;

        let role = self.classifier.classify(&candidate.name);
        debug!("Accepted {} as {} clip", candidate.name, role);
        self.videos.push(MediaAsset::new(candidate, role));
        self.reclassify();
        Ok(role)
    }

    /// Accept a selection of candidates, skipping non-video files and
    /// duplicates.
    ///
    /// Fails with `AllDuplicates` when every video in the selection was
    /// already loaded; the library is unchanged in that case.
    pub fn add_videos<I>(&mut self, candidates: I) -> Result<AddReport, AssetError>
    where
        I: IntoIterator<Item = AssetCandidate>,
    {
        let mut report = AddReport::default();
        let mut video_count = 0usize;
        let mut duplicate_count = 0usize;

        for candidate in candidates {
            if candidate.is_video() {
                video_count += 1;
            }

            let name = candidate.name.clone();
            match self.check_video(&candidate) {
                Ok(()) => {
                    let role = self.classifier.classify(&name);
                    self.videos.push(MediaAsset::new(candidate, role));
                    report.accepted.push((name, role));
                }
                Err(err) => {
                    if matches!(err, AssetError::Duplicate { .. }) {
                        debug!("Skipping duplicate file: {}", name);
                        duplicate_count += 1;
                    }
                    report.rejected.push(err);
                }
            }
        }

        if video_count > 0 && duplicate_count == video_count {
            return Err(AssetError::AllDuplicates { count: video_count });
        }

        self.reclassify();
        info!(
            "Loaded {} new clips ({} total: {} lead, {} body)",
            report.accepted.len(),
            self.videos.len(),
            self.leads.len(),
            self.bodies.len()
        );
        Ok(report)
    }

    /// Remove the video at `index` (insertion order)
    pub fn remove_video(&mut self, index: usize) -> Option<MediaAsset> {
        if index >= self.videos.len() {
            return None;
        }
        let removed = self.videos.remove(index);
        self.reclassify();
        Some(removed)
    }

    pub fn clear_videos(&mut self) {
        self.videos.clear();
        self.reclassify();
    }

    /// Set the BGM track, replacing any previous one
    pub fn set_background(&mut self, candidate: AssetCandidate) -> Result<(), AssetError> {
        if !candidate.is_mp3() {
            return Err(AssetError::UnsupportedType {
                media_type: candidate
                    .declared_media_type
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
                name: candidate.name,
            });
        }

        info!("BGM set to {}", candidate.name);
        self.background = Some(MediaAsset::new(candidate, AssetRole::Background));
        Ok(())
    }

    pub fn clear_background(&mut self) {
        self.background = None;
    }

    pub fn background(&self) -> Option<&MediaAsset> {
        self.background.as_ref()
    }

    /// All videos in insertion order
    pub fn videos(&self) -> &[MediaAsset] {
        &self.videos
    }

    /// Lead clips in insertion order
    pub fn leads(&self) -> impl Iterator<Item = &MediaAsset> + '_ {
        self.leads.iter().map(move |&i| &self.videos[i])
    }

    /// Body clips in insertion order
    pub fn bodies(&self) -> impl Iterator<Item = &MediaAsset> + '_ {
        self.bodies.iter().map(move |&i| &self.videos[i])
    }

    pub fn lead_count(&self) -> usize {
        self.leads.len()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of outputs the current inputs would produce
    pub fn pair_count(&self) -> usize {
        self.leads.len() * self.bodies.len()
    }

    fn check_video(&self, candidate: &AssetCandidate) -> Result<(), AssetError> {
        if !candidate.is_video() {
            return Err(AssetError::UnsupportedType {
                name: candidate.name.clone(),
                media_type: candidate
                    .declared_media_type
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            });
        }

        let byte_size = candidate.byte_size();
        if self
            .videos
            .iter()
            .any(|existing| existing.same_identity(&candidate.name, byte_size))
        {
            return Err(AssetError::Duplicate {
                name: candidate.name.clone(),
                byte_size,
            });
        }

        Ok(())
    }

    fn reclassify(&mut self) {
        self.leads.clear();
        self.bodies.clear();

        for (i, asset) in self.videos.iter().enumerate() {
            match asset.role() {
                AssetRole::Lead => self.leads.push(i),
                _ => self.bodies.push(i),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(name: &str, size: usize) -> AssetCandidate {
        AssetCandidate::new(name, Some("video/mp4".to_string()), vec![0u8; size])
    }

    #[test]
    fn test_lead_marker_before_body_marker() {
        let classifier = AssetClassifier::default();
        assert_eq!(classifier.classify("キャッチ_A.mp4"), AssetRole::Lead);
        assert_eq!(classifier.classify("冒頭_01.mp4"), AssetRole::Lead);
        assert_eq!(classifier.classify("キャッチ_ボディ.mp4"), AssetRole::Lead);
        assert_eq!(classifier.classify("x_冒頭_ボディ_キャッチ.mp4"), AssetRole::Lead);
    }

    #[test]
    fn test_body_marker_first_or_alone() {
        let classifier = AssetClassifier::default();
        assert_eq!(classifier.classify("ボディ_A.mp4"), AssetRole::Body);
        assert_eq!(classifier.classify("ボディ_キャッチ.mp4"), AssetRole::Body);
        assert_eq!(classifier.classify("ボディ_冒頭.mp4"), AssetRole::Body);
    }

    #[test]
    fn test_no_marker_defaults_to_body() {
        let classifier = AssetClassifier::default();
        assert_eq!(classifier.classify("clip.mp4"), AssetRole::Body);
        assert_eq!(classifier.classify(""), AssetRole::Body);
    }

    #[test]
    fn test_custom_markers() {
        let classifier = AssetClassifier::new(&ClassifierConfig {
            lead_markers: vec!["hook".to_string()],
            body_marker: "main".to_string(),
        });
        assert_eq!(classifier.classify("hook_main.mp4"), AssetRole::Lead);
        assert_eq!(classifier.classify("main_hook.mp4"), AssetRole::Body);
    }

    #[test]
    fn test_label() {
        let classifier = AssetClassifier::default();
        assert_eq!(classifier.label("キャッチ_冒頭.mp4"), "キャッチ");
        assert_eq!(classifier.label("冒頭.mp4"), "冒頭");
        assert_eq!(classifier.label("clip.mp4"), "ボディ");
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut library = AssetLibrary::default();
        library.add_video(video("キャッチ_A.mp4", 10)).unwrap();
        library.add_video(video("ボディ_A.mp4", 10)).unwrap();

        let err = library.add_video(video("キャッチ_A.mp4", 10)).unwrap_err();
        assert!(matches!(err, AssetError::Duplicate { .. }));
        assert_eq!(library.pair_count(), 1);

        // Same name, different size is a different asset
        library.add_video(video("キャッチ_A.mp4", 11)).unwrap();
        assert_eq!(library.pair_count(), 2);
    }

    #[test]
    fn test_non_video_rejected() {
        let mut library = AssetLibrary::default();
        let candidate = AssetCandidate::new("notes.txt", Some("text/plain".to_string()), vec![1u8]);
        let err = library.add_video(candidate).unwrap_err();
        assert!(matches!(err, AssetError::UnsupportedType { .. }));
        assert!(library.videos().is_empty());
    }

    #[test]
    fn test_add_videos_all_duplicates() {
        let mut library = AssetLibrary::default();
        library.add_videos(vec![video("ボディ_A.mp4", 3)]).unwrap();

        let err = library.add_videos(vec![video("ボディ_A.mp4", 3)]).unwrap_err();
        assert_eq!(err, AssetError::AllDuplicates { count: 1 });
        assert_eq!(library.videos().len(), 1);
    }

    #[test]
    fn test_add_videos_partial_report() {
        let mut library = AssetLibrary::default();
        library.add_video(video("ボディ_A.mp4", 3)).unwrap();

        let report = library
            .add_videos(vec![
                video("ボディ_A.mp4", 3),
                video("キャッチ_B.mp4", 3),
                AssetCandidate::new("cover.png", Some("image/png".to_string()), vec![0u8]),
            ])
            .unwrap();

        assert_eq!(report.accepted, vec![("キャッチ_B.mp4".to_string(), AssetRole::Lead)]);
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(library.lead_count(), 1);
        assert_eq!(library.body_count(), 1);
    }

    #[test]
    fn test_remove_reclassifies() {
        let mut library = AssetLibrary::default();
        library.add_video(video("キャッチ_A.mp4", 1)).unwrap();
        library.add_video(video("ボディ_A.mp4", 1)).unwrap();
        library.add_video(video("ボディ_B.mp4", 1)).unwrap();
        assert_eq!(library.pair_count(), 2);

        let removed = library.remove_video(1).unwrap();
        assert_eq!(removed.name(), "ボディ_A.mp4");
        let bodies: Vec<_> = library.bodies().map(MediaAsset::name).collect();
        assert_eq!(bodies, vec!["ボディ_B.mp4"]);

        assert!(library.remove_video(5).is_none());
        library.clear_videos();
        assert_eq!(library.pair_count(), 0);
    }

    #[test]
    fn test_background_requires_mp3() {
        let mut library = AssetLibrary::default();
        let wav = AssetCandidate::new("bgm.wav", Some("audio/wav".to_string()), vec![0u8]);
        assert!(library.set_background(wav).is_err());
        assert!(library.background().is_none());

        let mp3 = AssetCandidate::new("bgm.mp3", None, vec![0u8]);
        library.set_background(mp3).unwrap();
        assert_eq!(library.background().unwrap().role(), AssetRole::Background);

        library.clear_background();
        assert!(library.background().is_none());
    }
}
