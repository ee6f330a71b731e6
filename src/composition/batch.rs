use tracing::{debug, info};

use crate::assets::{AssetLibrary, MediaAsset};
use crate::composition::mode::{ExecutionMode, SPEED_EPSILON};
use crate::config::{CompositionConfig, ATEMPO_RANGE};
use crate::error::CompositionError;

/// Speed and BGM settings captured when a batch is formed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchParams {
    pub speed_factor: f64,
    pub background_volume: f64,
    pub speed_epsilon: f64,
}

impl Default for BatchParams {
    fn default() -> Self {
        Self {
            speed_factor: 1.0,
            background_volume: 0.0,
            speed_epsilon: SPEED_EPSILON,
        }
    }
}

impl From<&CompositionConfig> for BatchParams {
    fn from(config: &CompositionConfig) -> Self {
        Self {
            speed_factor: config.speed_factor,
            background_volume: config.bgm_volume,
            speed_epsilon: config.speed_epsilon,
        }
    }
}

impl BatchParams {
    fn validate(&self) -> Result<(), CompositionError> {
        if !self.speed_factor.is_finite() || !ATEMPO_RANGE.contains(&self.speed_factor) {
            return Err(CompositionError::InvalidParameters {
                details: format!(
                    "speed factor {} outside {}-{}",
                    self.speed_factor,
                    ATEMPO_RANGE.start(),
                    ATEMPO_RANGE.end()
                ),
            });
        }

        if !(0.0..=1.0).contains(&self.background_volume) {
            return Err(CompositionError::InvalidParameters {
                details: format!("BGM volume {} outside 0.0-1.0", self.background_volume),
            });
        }

        Ok(())
    }
}

/// One lead + body pair to be spliced into a single output
#[derive(Debug, Clone)]
pub struct CompositionJob {
    index: usize,
    lead: MediaAsset,
    body: MediaAsset,
    background: Option<MediaAsset>,
    speed_factor: f64,
    background_volume: f64,
    speed_epsilon: f64,
}

impl CompositionJob {
    /// Position in the batch (0-based, lead-major)
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn lead(&self) -> &MediaAsset {
        &self.lead
    }

    pub fn body(&self) -> &MediaAsset {
        &self.body
    }

    pub fn background(&self) -> Option<&MediaAsset> {
        self.background.as_ref()
    }

    pub fn speed_factor(&self) -> f64 {
        self.speed_factor
    }

    /// BGM gain; 0.0 when the job has no BGM
    pub fn background_volume(&self) -> f64 {
        self.background_volume
    }

    /// Execution mode for this job
    pub fn mode(&self) -> ExecutionMode {
        ExecutionMode::select_with_epsilon(
            self.speed_factor,
            self.background.is_some(),
            self.speed_epsilon,
        )
    }

    /// Suggested output file name: `{lead}_{body}.{extension}`
    pub fn output_name(&self, extension: &str) -> String {
        format!("{}_{}.{}", self.lead.base_name(), self.body.base_name(), extension)
    }
}

/// Ordered set of jobs for one run
#[derive(Debug, Clone, Default)]
pub struct Batch {
    jobs: Vec<CompositionJob>,
    lead_count: usize,
    body_count: usize,
}

impl Batch {
    /// Form the batch from the library's current lead/body partition
    pub fn compose(library: &AssetLibrary, params: BatchParams) -> Result<Self, CompositionError> {
        let leads: Vec<MediaAsset> = library.leads().cloned().collect();
        let bodies: Vec<MediaAsset> = library.bodies().cloned().collect();
        Self::from_parts(&leads, &bodies, library.background().cloned(), params)
    }

    /// Cross product of `leads` × `bodies`, lead-major
    pub fn from_parts(
        leads: &[MediaAsset],
        bodies: &[MediaAsset],
        background: Option<MediaAsset>,
        params: BatchParams,
    ) -> Result<Self, CompositionError> {
        params.validate()?;

        let background_volume = if background.is_some() {
            params.background_volume
        } else {
            0.0
        };

        let mut jobs = Vec::with_capacity(leads.len() * bodies.len());
        for lead in leads {
            for body in bodies {
                let job = CompositionJob {
                    index: jobs.len(),
                    lead: lead.clone(),
                    body: body.clone(),
                    background: background.clone(),
                    speed_factor: params.speed_factor,
                    background_volume,
                    speed_epsilon: params.speed_epsilon,
                };
                debug!("Job {}: {} -> {} ({})", job.index, lead.name(), body.name(), job.mode());
                jobs.push(job);
            }
        }

        info!(
            "Composed batch of {} jobs ({} lead x {} body{})",
            jobs.len(),
            leads.len(),
            bodies.len(),
            if background.is_some() { ", with BGM" } else { "" }
        );

        Ok(Self {
            jobs,
            lead_count: leads.len(),
            body_count: bodies.len(),
        })
    }

    pub fn jobs(&self) -> &[CompositionJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompositionJob> {
        self.jobs.iter()
    }

    /// Leads the batch was formed from
    pub fn lead_count(&self) -> usize {
        self.lead_count
    }

    /// Bodies the batch was formed from
    pub fn body_count(&self) -> usize {
        self.body_count
    }
}
