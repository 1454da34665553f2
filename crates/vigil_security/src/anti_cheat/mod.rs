//! # Anti-Cheat Detection
//!
//! Replay-based cheat detection.
//!
//! ## Detection Methods
//!
//! - **Steal**: two replays trace the same cursor path ([`steal`])
//! - **Relax**: hit timing too consistent to be human ([`relax`])
//! - **Correction**: sharp mid-motion reversals of the cursor ([`correction`])
//!
//! | detector   | unit   | statistic            | flagged when     |
//! |------------|--------|----------------------|------------------|
//! | steal      | pair   | similarity (0-1]     | `>= threshold`   |
//! | relax      | replay | unstable rate        | `<= threshold`   |
//! | correction | replay | smallest snap angle  | `<= threshold`   |

pub mod correction;
pub mod relax;
pub mod steal;

pub use correction::CorrectionDetector;
pub use relax::DeviationInvestigator;
pub use steal::{PairCursor, TrajectoryComparer};

use std::fmt;

use crate::config::DetectConfig;
use crate::error::ConfigError;

/// Detectors, named after the cheat they look for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DetectorKind {
    /// Replay copied from another player.
    Steal,
    /// Automated tapping.
    Relax,
    /// Aim correction software.
    Correction,
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Steal => "steal",
            Self::Relax => "relax",
            Self::Correction => "correction",
        })
    }
}

/// An enabled detector and its threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detector {
    /// Which detector.
    pub kind: DetectorKind,
    /// Threshold, in the unit of the detector's statistic.
    pub threshold: f64,
}

impl Detector {
    /// Steal detection flagging pairs at or above `similarity`.
    #[must_use]
    pub const fn steal(similarity: f64) -> Self {
        Self { kind: DetectorKind::Steal, threshold: similarity }
    }

    /// Relax detection flagging unstable rates at or below `unstable_rate`.
    #[must_use]
    pub const fn relax(unstable_rate: f64) -> Self {
        Self { kind: DetectorKind::Relax, threshold: unstable_rate }
    }

    /// Correction detection flagging snaps at or below `max_angle` degrees.
    #[must_use]
    pub const fn correction(max_angle: f64) -> Self {
        Self { kind: DetectorKind::Correction, threshold: max_angle }
    }

    /// A detector using the configured default threshold for `kind`.
    #[must_use]
    pub fn with_default_threshold(kind: DetectorKind, config: &DetectConfig) -> Self {
        let threshold = match kind {
            DetectorKind::Steal => config.steal_threshold,
            DetectorKind::Relax => config.relax_threshold,
            DetectorKind::Correction => config.correction_max_angle,
        };
        Self { kind, threshold }
    }

    /// Checks the threshold.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidThreshold`] for negative or NaN thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold.is_nan() || self.threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold { kind: self.kind, value: self.threshold });
        }
        Ok(())
    }
}
