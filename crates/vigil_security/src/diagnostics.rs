//! # Run Diagnostics
//!
//! The engine reports lifecycle events of every run to a [`DiagnosticSink`].
//! The default sink forwards them to `tracing`; [`MemorySink`] keeps them
//! for inspection.
//!
//! ```text
//! RunStarted ─► DetectorStarted ─► UnitEvaluated* / UnitFailed* ─► ... ─► Drained
//!                                  AssetsAcquired (first relax unit)
//!                                  AssetsReleased (drain or drop)
//! ```

use parking_lot::Mutex;

use crate::anti_cheat::DetectorKind;
use crate::result::Subjects;

/// A lifecycle event of one run.
#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostic {
    /// References of a check were materialized.
    CheckLoaded {
        /// Loader calls made. Zero when everything was already loaded.
        materialized: usize,
    },
    /// A run began.
    RunStarted {
        /// Replays in the primary set.
        primary: usize,
        /// Replays in the secondary set, if any.
        secondary: Option<usize>,
        /// Enabled detectors, in run order.
        detectors: Vec<DetectorKind>,
    },
    /// A detector began its units of work.
    DetectorStarted {
        /// Detector.
        kind: DetectorKind,
        /// Units it will produce.
        units: usize,
    },
    /// A unit produced a result.
    UnitEvaluated {
        /// Detector.
        kind: DetectorKind,
        /// Replays involved.
        subjects: Subjects,
        /// Statistic, `None` when insufficient.
        statistic: Option<f64>,
        /// Whether the unit was flagged.
        verdict: bool,
    },
    /// A unit was skipped because a collaborator failed.
    UnitFailed {
        /// Detector.
        kind: DetectorKind,
        /// Replay whose unit was skipped.
        replay_id: u64,
        /// Failure description.
        reason: String,
    },
    /// The beatmap library was opened.
    AssetsAcquired,
    /// The beatmap library was released.
    AssetsReleased,
    /// The run produced its last result.
    Drained {
        /// Results produced.
        results: usize,
        /// Units skipped on errors.
        failures: usize,
    },
}

/// Receiver of run diagnostics.
pub trait DiagnosticSink: Send + Sync {
    /// Records one event. Must not block for long.
    fn record(&self, event: &Diagnostic);
}

/// Forwards diagnostics to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: &Diagnostic) {
        match event {
            Diagnostic::CheckLoaded { materialized } => {
                tracing::debug!("Check loaded ({} replays materialized)", materialized);
            }
            Diagnostic::RunStarted { primary, secondary, detectors } => {
                tracing::info!(
                    "Run started: primary={}, secondary={:?}, detectors={:?}",
                    primary,
                    secondary,
                    detectors
                );
            }
            Diagnostic::DetectorStarted { kind, units } => {
                tracing::debug!("Detector {} started ({} units)", kind, units);
            }
            Diagnostic::UnitEvaluated { kind, subjects, statistic, verdict } => {
                if *verdict {
                    tracing::info!("{} flagged {:?} (statistic={:?})", kind, subjects, statistic);
                } else {
                    tracing::trace!("{} evaluated {:?} (statistic={:?})", kind, subjects, statistic);
                }
            }
            Diagnostic::UnitFailed { kind, replay_id, reason } => {
                tracing::warn!("{} skipped replay {}: {}", kind, replay_id, reason);
            }
            Diagnostic::AssetsAcquired => tracing::debug!("Beatmap library acquired"),
            Diagnostic::AssetsReleased => tracing::debug!("Beatmap library released"),
            Diagnostic::Drained { results, failures } => {
                tracing::info!("Run drained: {} results, {} failures", results, failures);
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<Diagnostic> {
        self.events.lock().clone()
    }

    /// Removes and returns the events recorded so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, event: &Diagnostic) {
        self.events.lock().push(event.clone());
    }
}
