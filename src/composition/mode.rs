use std::fmt;

/// Speed deviations at or below this count as "no speed change"
pub const SPEED_EPSILON: f64 = 0.001;

/// How a job is executed against the transcoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    /// Container-level concat with stream copy, no re-encode
    CopyConcat,
    /// Speed unchanged, BGM mixed in; both streams pass through one fast
    /// filter-graph encode
    BgmFastMix,
    /// Full re-encode with timestamp and tempo transforms
    Reencode,
}

impl ExecutionMode {
    /// Select the cheapest mode that can honour the job parameters
    pub fn select(speed_factor: f64, has_background: bool) -> Self {
        Self::select_with_epsilon(speed_factor, has_background, SPEED_EPSILON)
    }

    /// As [`ExecutionMode::select`] with an explicit speed tolerance
    pub fn select_with_epsilon(speed_factor: f64, has_background: bool, epsilon: f64) -> Self {
        if has_speed_change(speed_factor, epsilon) {
            Self::Reencode
        } else if has_background {
            Self::BgmFastMix
        } else {
            Self::CopyConcat
        }
    }

    /// Whether the primary attempt has a re-encode fallback
    pub fn has_fallback(&self) -> bool {
        matches!(self, Self::CopyConcat)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CopyConcat => write!(f, "copy-concat"),
            Self::BgmFastMix => write!(f, "bgm-fast-mix"),
            Self::Reencode => write!(f, "re-encode"),
        }
    }
}

/// `|speed - 1| > epsilon`
pub fn has_speed_change(speed_factor: f64, epsilon: f64) -> bool {
    (speed_factor - 1.0).abs() > epsilon
}
