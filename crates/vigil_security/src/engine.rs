//! # Detection Engine
//!
//! The [`Engine`] owns the collaborators (loader, beatmap provider,
//! normalizer, diagnostic sink) and turns a [`Check`] into a lazy
//! [`ResultStream`].
//!
//! ## Run Lifecycle
//!
//! ```text
//! Check ──run()──► load (fails whole run) ──► ResultStream [Running]
//!                                                 │
//!             next() ─► detector 1 units ─► detector 2 units ─► ... ─► [Drained]
//!                       (declaration order, one item per unit)
//! ```
//!
//! Nothing is computed until the caller pulls. Every unit of work yields
//! exactly one item: a result, or an error naming the replay it concerns.
//!
//! ## Beatmap Assets
//!
//! The library handle is opened when the first relax unit is pulled and
//! dropped when the stream drains or is dropped, whichever comes first.
//! Runs without relax detection never open it.

use std::collections::HashMap;
use std::iter::FusedIterator;
use std::ops::Range;
use std::sync::Arc;

use crate::anti_cheat::{CorrectionDetector, Detector, DetectorKind, DeviationInvestigator, PairCursor, TrajectoryComparer};
use crate::beatmap::{BeatmapLibrary, BeatmapProvider, BeatmapTiming};
use crate::check::Check;
use crate::config::DetectConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::{AssetError, ConfigError, DetectError, DetectResult};
use crate::loader::Loader;
use crate::replay::{MapId, NormalizedReplay, Normalizer, ReplayRecord, StandardNormalizer};
use crate::result::DetectionResult;

// ============================================================================
// Engine
// ============================================================================

/// Runs checks against a fixed set of collaborators.
pub struct Engine {
    config: DetectConfig,
    loader: Box<dyn Loader>,
    provider: Box<dyn BeatmapProvider>,
    normalizer: Box<dyn Normalizer>,
    sink: Arc<dyn DiagnosticSink>,
}

impl Engine {
    /// Creates an engine with the standard normalizer and a tracing sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` does not validate.
    pub fn new(
        config: DetectConfig,
        loader: impl Loader + 'static,
        provider: impl BeatmapProvider + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            loader: Box::new(loader),
            provider: Box::new(provider),
            normalizer: Box::new(StandardNormalizer),
            sink: Arc::new(TracingSink),
        })
    }

    /// Replaces the modifier normalizer.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: impl Normalizer + 'static) -> Self {
        self.normalizer = Box::new(normalizer);
        self
    }

    /// Replaces the diagnostic sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &DetectConfig {
        &self.config
    }

    /// Materializes every reference of `check`. A no-op on a loaded check.
    ///
    /// # Errors
    ///
    /// [`DetectError::Load`] for the first reference the loader rejects.
    pub fn load(&self, check: &mut Check) -> DetectResult<()> {
        let materialized = check.load(self.loader.as_ref())?;
        self.sink.record(&Diagnostic::CheckLoaded { materialized });
        Ok(())
    }

    /// Consumes `check` and starts a run over it.
    ///
    /// The check is loaded first if needed; no detector starts unless every
    /// replay materialized.
    ///
    /// # Errors
    ///
    /// [`DetectError::Load`] if a reference cannot be materialized.
    pub fn run(&self, check: Check) -> DetectResult<ResultStream<'_>> {
        let (loaded, materialized) = check.into_loaded(self.loader.as_ref())?;
        self.sink.record(&Diagnostic::CheckLoaded { materialized });
        self.sink.record(&Diagnostic::RunStarted {
            primary: loaded.primary.len(),
            secondary: loaded.secondary.as_ref().map(Vec::len),
            detectors: loaded.detectors.iter().map(|d| d.kind).collect(),
        });

        let split = loaded.secondary.as_ref().map(|_| loaded.primary.len());
        let mut replays = loaded.primary;
        replays.extend(loaded.secondary.into_iter().flatten());

        Ok(ResultStream {
            engine: self,
            normalized: vec![None; replays.len()],
            replays,
            split,
            detectors: loaded.detectors.into_iter(),
            stage: None,
            library: Library::NotAcquired,
            timings: HashMap::new(),
            state: RunState::Running,
            results: 0,
            failures: 0,
        })
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("config", &self.config).finish_non_exhaustive()
    }
}

// ============================================================================
// Result Stream
// ============================================================================

/// Progress of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Units of work remain.
    Running,
    /// Every detector is exhausted. Terminal.
    Drained,
}

/// Detector currently producing units.
enum Stage {
    Steal { comparer: TrajectoryComparer, pairs: PairCursor, offset: usize },
    Relax { investigator: DeviationInvestigator, replays: Range<usize> },
    Correction { detector: CorrectionDetector, replays: Range<usize> },
}

/// One unit of work, with the detector that evaluates it.
enum Unit {
    Pair(TrajectoryComparer, usize, usize),
    Relax(DeviationInvestigator, usize),
    Correction(CorrectionDetector, usize),
}

impl Stage {
    fn next_unit(&mut self) -> Option<Unit> {
        match self {
            Self::Steal { comparer, pairs, offset } => pairs.next().map(|(i, j)| Unit::Pair(*comparer, i, j + *offset)),
            Self::Relax { investigator, replays } => replays.next().map(|i| Unit::Relax(*investigator, i)),
            Self::Correction { detector, replays } => replays.next().map(|i| Unit::Correction(*detector, i)),
        }
    }
}

/// Beatmap library handle held by a run.
enum Library<'e> {
    NotAcquired,
    Open(Box<dyn BeatmapLibrary + 'e>),
    Failed(AssetError),
    Released,
}

/// Lazy, one-shot sequence of detection results.
///
/// Yields `Ok` for every evaluated (or insufficient) unit and `Err` for
/// units a collaborator failed on. Once it returns `None` it stays drained.
pub struct ResultStream<'e> {
    engine: &'e Engine,
    /// Primary replays followed by secondary replays.
    replays: Vec<Arc<ReplayRecord>>,
    /// Index of the first secondary replay, if there is a secondary set.
    split: Option<usize>,
    normalized: Vec<Option<Arc<NormalizedReplay>>>,
    detectors: std::vec::IntoIter<Detector>,
    stage: Option<Stage>,
    library: Library<'e>,
    /// Per-run memo of map lookups, failures included.
    timings: HashMap<MapId, Result<Arc<BeatmapTiming>, AssetError>>,
    state: RunState,
    results: usize,
    failures: usize,
}

impl<'e> ResultStream<'e> {
    /// Current run state.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    fn start(&self, detector: Detector) -> Stage {
        let config = &self.engine.config;
        // per-replay detectors never look at the secondary set
        let primary = 0..self.split.unwrap_or(self.replays.len());
        match detector.kind {
            DetectorKind::Steal => {
                let (pairs, offset) = match self.split {
                    Some(split) => (PairCursor::cross(split, self.replays.len() - split), split),
                    None => (PairCursor::within(self.replays.len()), 0),
                };
                Stage::Steal { comparer: TrajectoryComparer::new(detector.threshold, config), pairs, offset }
            }
            DetectorKind::Relax => Stage::Relax {
                investigator: DeviationInvestigator::new(detector.threshold, config),
                replays: primary.clone(),
            },
            DetectorKind::Correction => Stage::Correction {
                detector: CorrectionDetector::new(detector.threshold, config),
                replays: primary,
            },
        }
    }

    fn units(stage: &Stage) -> usize {
        match stage {
            Stage::Steal { pairs, .. } => pairs.total(),
            Stage::Relax { replays, .. } | Stage::Correction { replays, .. } => replays.len(),
        }
    }

    fn normalized(&mut self, index: usize) -> Arc<NormalizedReplay> {
        let normalizer = self.engine.normalizer.as_ref();
        let replay = &self.replays[index];
        Arc::clone(
            self.normalized[index]
                .get_or_insert_with(|| Arc::new(NormalizedReplay::new(Arc::clone(replay), normalizer))),
        )
    }

    fn timing(&mut self, map_id: MapId) -> Result<Arc<BeatmapTiming>, AssetError> {
        if let Some(cached) = self.timings.get(&map_id) {
            return cached.clone();
        }

        if matches!(self.library, Library::NotAcquired) {
            let engine: &'e Engine = self.engine;
            self.library = match engine.provider.acquire() {
                Ok(handle) => {
                    engine.sink.record(&Diagnostic::AssetsAcquired);
                    Library::Open(handle)
                }
                Err(err) => Library::Failed(err),
            };
        }

        let fetched = match &mut self.library {
            Library::Open(handle) => handle.get_timing(map_id).map(Arc::new),
            // acquisition failures are not per map, so they are not memoized
            Library::Failed(err) => return Err(err.clone()),
            Library::NotAcquired | Library::Released => {
                return Err(AssetError::Unavailable("beatmap library released".into()))
            }
        };
        self.timings.insert(map_id, fetched.clone());
        fetched
    }

    fn evaluate(&mut self, unit: Unit) -> DetectResult<DetectionResult> {
        match unit {
            Unit::Pair(comparer, i, j) => {
                let (a, b) = (self.normalized(i), self.normalized(j));
                Ok(DetectionResult::Steal(comparer.compare(&a, &b)))
            }
            Unit::Relax(investigator, index) => {
                let replay = self.normalized(index);
                if let Some(refused) = investigator.refuse(&replay) {
                    return Ok(DetectionResult::Relax(refused));
                }
                let map_id = replay.replay.map_id();
                let timing = self.timing(map_id).map_err(|source| DetectError::Asset {
                    replay_id: replay.replay.replay_id(),
                    map_id,
                    source,
                })?;
                Ok(DetectionResult::Relax(investigator.investigate(&replay, &timing)))
            }
            Unit::Correction(detector, index) => {
                let replay = self.normalized(index);
                Ok(DetectionResult::Correction(detector.investigate(&replay)))
            }
        }
    }

    fn record(&mut self, kind: DetectorKind, item: &DetectResult<DetectionResult>) {
        let event = match item {
            Ok(result) => {
                self.results += 1;
                Diagnostic::UnitEvaluated {
                    kind,
                    subjects: result.subjects(),
                    statistic: result.statistic(),
                    verdict: result.is_cheat(),
                }
            }
            Err(err) => {
                self.failures += 1;
                let replay_id = match err {
                    DetectError::Asset { replay_id, .. } => *replay_id,
                    DetectError::Load { .. } | DetectError::Config(_) => 0,
                };
                Diagnostic::UnitFailed { kind, replay_id, reason: err.to_string() }
            }
        };
        self.engine.sink.record(&event);
    }

    fn release(&mut self) {
        if let Library::Open(_) = std::mem::replace(&mut self.library, Library::Released) {
            self.engine.sink.record(&Diagnostic::AssetsReleased);
        }
    }

    fn drain(&mut self) {
        self.release();
        self.stage = None;
        self.state = RunState::Drained;
        self.engine.sink.record(&Diagnostic::Drained { results: self.results, failures: self.failures });
    }
}

impl Iterator for ResultStream<'_> {
    type Item = DetectResult<DetectionResult>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.state == RunState::Running {
            if self.stage.is_none() {
                let Some(detector) = self.detectors.next() else {
                    self.drain();
                    return None;
                };
                let stage = self.start(detector);
                self.engine.sink.record(&Diagnostic::DetectorStarted {
                    kind: detector.kind,
                    units: Self::units(&stage),
                });
                self.stage = Some(stage);
            }

            let unit = self.stage.as_mut().and_then(Stage::next_unit);
            let Some(unit) = unit else {
                self.stage = None;
                continue;
            };
            let kind = match unit {
                Unit::Pair(..) => DetectorKind::Steal,
                Unit::Relax(..) => DetectorKind::Relax,
                Unit::Correction(..) => DetectorKind::Correction,
            };
            let item = self.evaluate(unit);
            self.record(kind, &item);
            return Some(item);
        }
        None
    }
}

impl FusedIterator for ResultStream<'_> {}

impl Drop for ResultStream<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ResultStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStream")
            .field("state", &self.state)
            .field("replays", &self.replays.len())
            .field("results", &self.results)
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}
