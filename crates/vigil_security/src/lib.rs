//! # VIGIL Security - Replay Cheat Detection
//!
//! Examines recorded rhythm-game replays for signs of cheating and reports
//! explainable statistics rather than bare accusations.
//!
//! ## Detectors
//!
//! - **Steal**: two replays trace the same cursor path
//! - **Relax**: hit timing too consistent to be human
//! - **Correction**: sharp cursor reversals left by aim correction tools
//!
//! ## Architecture
//!
//! ```text
//!  CALLER                          ENGINE                       COLLABORATORS
//!    │                               │                               │
//!    │── Check::builder() ──►Check   │                               │
//!    │── engine.run(check) ─────────►│── materialize(ref) ──────────►│ Loader
//!    │                               │◄── ReplayRecord ──────────────│
//!    │◄── ResultStream ──────────────│                               │
//!    │                               │                               │
//!    │── next() ────────────────────►│ steal pair (pure)             │
//!    │◄── Ok(Steal) ─────────────────│                               │
//!    │── next() ────────────────────►│── acquire() / get_timing() ──►│ BeatmapProvider
//!    │◄── Ok(Relax) / Err(Asset) ────│                               │
//!    │          ...                  │                               │
//!    │◄── None (Drained) ────────────│── library dropped ───────────►│
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let engine = Engine::new(DetectConfig::default(), loader, provider)?;
//! let check = Check::builder()
//!     .primary(references)
//!     .detect(Detector::steal(0.5))
//!     .detect(Detector::relax(50.0))
//!     .build()?;
//!
//! for item in engine.run(check)? {
//!     match item {
//!         Ok(result) if result.is_cheat() => report(&result),
//!         Ok(_) => {}
//!         Err(err) => tracing::warn!("skipped: {}", err),
//!     }
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod anti_cheat;
pub mod beatmap;
pub mod check;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod loader;
pub mod replay;
pub mod result;

pub use anti_cheat::{CorrectionDetector, Detector, DetectorKind, DeviationInvestigator, TrajectoryComparer};
pub use beatmap::{BeatmapLibrary, BeatmapProvider, BeatmapTiming, HitObject};
pub use check::{Check, CheckBuilder, CheckState};
pub use config::DetectConfig;
pub use diagnostics::{Diagnostic, DiagnosticSink, MemorySink, TracingSink};
pub use engine::{Engine, ResultStream, RunState};
pub use error::{AssetError, ConfigError, DetectError, DetectResult, LoadError};
pub use loader::Loader;
pub use replay::{
    CursorSample, Keys, MapId, Mods, NormalizedReplay, Normalizer, PlayerId, ReplayRecord, ReplayRef, SourceTrust,
    StandardNormalizer,
};
pub use result::{
    CorrectionResult, DetectionResult, Insufficiency, Outcome, RelaxResult, Snap, StealResult, Subjects,
};
