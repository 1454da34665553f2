//! # Detection Error Types
//!
//! Configuration errors surface while a check is built. Collaborator
//! failures surface per unit of work. Insufficient data is not an error
//! and never appears here (see [`crate::result::Outcome`]).

use thiserror::Error;

use crate::anti_cheat::DetectorKind;
use crate::replay::{MapId, ReplayRef};

/// Invalid configuration, reported before any detector runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Threshold is negative or not a number.
    #[error("invalid threshold {value} for {kind} detector")]
    InvalidThreshold {
        /// Detector the threshold belongs to.
        kind: DetectorKind,
        /// The rejected value.
        value: f64,
    },

    /// The same detector kind was enabled twice on one check.
    #[error("{0} detector enabled more than once")]
    DuplicateDetector(DetectorKind),

    /// The caller required at least one detector but none were enabled.
    #[error("check has no enabled detectors")]
    NoDetectors,

    /// An engine setting is out of range.
    #[error("invalid setting `{key}`: {reason}")]
    InvalidSetting {
        /// Config key.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The configuration file could not be read or parsed.
    #[error("invalid configuration file: {0}")]
    Parse(String),
}

/// Failure reported by a [`crate::loader::Loader`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The source no longer has the referenced replay data.
    #[error("replay unavailable: {reason}")]
    UnavailableReplay {
        /// Reason given by the source.
        reason: String,
    },

    /// The source asked the caller to retry later.
    #[error("rate limited by replay source")]
    RateLimited {
        /// Suggested wait in seconds, if the source gave one.
        retry_after_secs: Option<u64>,
    },

    /// The replay bytes could not be decoded.
    #[error("replay could not be decoded: {0}")]
    Decode(String),
}

/// Failure reported by a [`crate::beatmap::BeatmapProvider`] or its library.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// The map identifier cannot be resolved.
    #[error("unknown map {0}")]
    UnknownMap(MapId),

    /// The asset store could not be reached or opened.
    #[error("beatmap assets unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced to the caller of the engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectError {
    /// The check or engine configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A replay referenced by the check failed to materialize.
    #[error("failed to load {reference}: {source}")]
    Load {
        /// The reference that failed.
        reference: ReplayRef,
        /// Loader failure.
        #[source]
        source: LoadError,
    },

    /// Beatmap timing needed by a detector could not be obtained.
    #[error("no beatmap timing for replay {replay_id} (map {map_id}): {source}")]
    Asset {
        /// Replay whose unit of work was skipped.
        replay_id: u64,
        /// Map that could not be resolved.
        map_id: MapId,
        /// Provider failure.
        #[source]
        source: AssetError,
    },
}

impl DetectError {
    /// Whether retrying the same run later could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Load { source, .. } => matches!(source, LoadError::RateLimited { .. }),
            Self::Asset { source, .. } => matches!(source, AssetError::Unavailable(_)),
            Self::Config(_) => false,
        }
    }
}

/// Result type for detection operations.
pub type DetectResult<T> = Result<T, DetectError>;
