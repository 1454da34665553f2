//! # Checks
//!
//! A [`Check`] bundles the replays to examine with the detectors to run
//! over them. It is built once, loaded at most once, and consumed by
//! [`crate::engine::Engine::run`], so a check can never be run twice.
//!
//! ```text
//! CheckBuilder ──build()──► Check(Unloaded) ──load()──► Check(Loaded) ──run()──► ResultStream
//!                              │    ▲
//!                              └────┘ load failure leaves it Unloaded
//! ```
//!
//! Without a secondary set, steal detection compares every pair inside the
//! primary set. With one, it compares only across the two sets. Relax and
//! correction detection only ever investigate the primary set.

use std::collections::HashSet;
use std::sync::Arc;

use crate::anti_cheat::{Detector, DetectorKind};
use crate::error::{ConfigError, DetectError, DetectResult};
use crate::loader::Loader;
use crate::replay::{ReplayRecord, ReplayRef};

/// Load state of a [`Check`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckState {
    /// Some references are not materialized yet.
    Unloaded,
    /// Every reference holds a decoded replay.
    Loaded,
}

/// A reference and, once loaded, its replay.
#[derive(Clone, Debug)]
struct Slot {
    reference: ReplayRef,
    record: Option<Arc<ReplayRecord>>,
}

impl Slot {
    fn new(reference: ReplayRef) -> Self {
        let record = match &reference {
            ReplayRef::Loaded(record) => Some(Arc::clone(record)),
            ReplayRef::Online { .. } | ReplayRef::File(_) => None,
        };
        Self { reference, record }
    }
}

/// Replays plus the detectors to run over them.
#[derive(Clone, Debug)]
pub struct Check {
    primary: Vec<Slot>,
    secondary: Option<Vec<Slot>>,
    detectors: Vec<Detector>,
    state: CheckState,
}

impl Check {
    /// Starts building a check.
    #[must_use]
    pub fn builder() -> CheckBuilder {
        CheckBuilder::default()
    }

    /// Current load state.
    #[must_use]
    pub const fn state(&self) -> CheckState {
        self.state
    }

    /// Enabled detectors in declaration order.
    #[must_use]
    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    /// Number of primary references.
    #[must_use]
    pub fn primary_len(&self) -> usize {
        self.primary.len()
    }

    /// Number of secondary references, if a secondary set was given.
    #[must_use]
    pub fn secondary_len(&self) -> Option<usize> {
        self.secondary.as_ref().map(Vec::len)
    }

    /// Materializes every unresolved reference through `loader`.
    ///
    /// A loaded check is left untouched. On failure the replays loaded so
    /// far are kept, the check stays [`CheckState::Unloaded`], and a later
    /// call only retries what is still missing. Returns the number of
    /// loader calls that succeeded.
    ///
    /// # Errors
    ///
    /// [`DetectError::Load`] for the first reference that fails.
    pub fn load(&mut self, loader: &dyn Loader) -> DetectResult<usize> {
        if self.state == CheckState::Loaded {
            return Ok(0);
        }

        let mut materialized = 0;
        let slots = self.primary.iter_mut().chain(self.secondary.iter_mut().flatten());
        for slot in slots.filter(|slot| slot.record.is_none()) {
            let record = loader.materialize(&slot.reference).map_err(|source| DetectError::Load {
                reference: slot.reference.clone(),
                source,
            })?;
            slot.record = Some(Arc::new(record));
            materialized += 1;
        }

        self.state = CheckState::Loaded;
        Ok(materialized)
    }

    /// Loads the check if needed and splits it into replays and detectors.
    /// Also returns the number of loader calls made.
    pub(crate) fn into_loaded(mut self, loader: &dyn Loader) -> DetectResult<(LoadedCheck, usize)> {
        fn records(slots: Vec<Slot>) -> Vec<Arc<ReplayRecord>> {
            slots.into_iter().filter_map(|slot| slot.record).collect()
        }

        let materialized = self.load(loader)?;
        let loaded = LoadedCheck {
            primary: records(self.primary),
            secondary: self.secondary.map(records),
            detectors: self.detectors,
        };
        Ok((loaded, materialized))
    }
}

/// Replays and detectors of a loaded check.
#[derive(Debug)]
pub(crate) struct LoadedCheck {
    pub(crate) primary: Vec<Arc<ReplayRecord>>,
    pub(crate) secondary: Option<Vec<Arc<ReplayRecord>>>,
    pub(crate) detectors: Vec<Detector>,
}

/// Builder for [`Check`].
#[derive(Clone, Debug, Default)]
pub struct CheckBuilder {
    primary: Vec<ReplayRef>,
    secondary: Option<Vec<ReplayRef>>,
    detectors: Vec<Detector>,
    require_detectors: bool,
}

impl CheckBuilder {
    /// Adds primary references.
    #[must_use]
    pub fn primary(mut self, references: impl IntoIterator<Item = ReplayRef>) -> Self {
        self.primary.extend(references);
        self
    }

    /// Adds one primary reference.
    #[must_use]
    pub fn replay(mut self, reference: ReplayRef) -> Self {
        self.primary.push(reference);
        self
    }

    /// Adds secondary references, switching steal detection to cross-set
    /// comparison. An empty iterator still creates the (empty) secondary set.
    #[must_use]
    pub fn secondary(mut self, references: impl IntoIterator<Item = ReplayRef>) -> Self {
        self.secondary.get_or_insert_with(Vec::new).extend(references);
        self
    }

    /// Enables a detector. Declaration order is run order.
    #[must_use]
    pub fn detect(mut self, detector: Detector) -> Self {
        self.detectors.push(detector);
        self
    }

    /// Makes [`CheckBuilder::build`] fail when no detector is enabled.
    #[must_use]
    pub fn require_detectors(mut self) -> Self {
        self.require_detectors = true;
        self
    }

    /// Validates and builds the check.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidThreshold`] for a negative or NaN threshold
    /// - [`ConfigError::DuplicateDetector`] if a kind is enabled twice
    /// - [`ConfigError::NoDetectors`] if detectors were required but none given
    pub fn build(self) -> Result<Check, ConfigError> {
        let mut seen: HashSet<DetectorKind> = HashSet::new();
        for detector in &self.detectors {
            detector.validate()?;
            if !seen.insert(detector.kind) {
                return Err(ConfigError::DuplicateDetector(detector.kind));
            }
        }
        if self.require_detectors && self.detectors.is_empty() {
            return Err(ConfigError::NoDetectors);
        }

        let primary: Vec<Slot> = self.primary.into_iter().map(Slot::new).collect();
        let secondary: Option<Vec<Slot>> =
            self.secondary.map(|refs| refs.into_iter().map(Slot::new).collect());
        let resolved = primary.iter().chain(secondary.iter().flatten()).all(|slot| slot.record.is_some());

        Ok(Check {
            primary,
            secondary,
            detectors: self.detectors,
            state: if resolved { CheckState::Loaded } else { CheckState::Unloaded },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::LoadError;
    use crate::replay::{CursorSample, MapId, PlayerId};

    struct CountingLoader {
        calls: AtomicUsize,
        fail_player: Option<PlayerId>,
    }

    impl CountingLoader {
        fn new(fail_player: Option<PlayerId>) -> Self {
            Self { calls: AtomicUsize::new(0), fail_player }
        }
    }

    impl Loader for CountingLoader {
        fn materialize(&self, reference: &ReplayRef) -> Result<ReplayRecord, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let ReplayRef::Online { map_id, player } = reference else {
                return Err(LoadError::Decode("unsupported reference".into()));
            };
            if Some(*player) == self.fail_player {
                return Err(LoadError::UnavailableReplay { reason: "deleted".into() });
            }
            ReplayRecord::new(player.0, *player, *map_id, vec![CursorSample::new(0.0, 0.0, 0.0)])
        }
    }

    fn online(player: u64) -> ReplayRef {
        ReplayRef::online(MapId(1), PlayerId(player))
    }

    #[test]
    fn test_load_is_idempotent() {
        let loader = CountingLoader::new(None);
        let mut check = Check::builder().primary([online(1), online(2)]).build().unwrap();
        assert_eq!(check.state(), CheckState::Unloaded);

        assert_eq!(check.load(&loader).unwrap(), 2);
        assert_eq!(check.load(&loader).unwrap(), 0);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
        assert_eq!(check.state(), CheckState::Loaded);
    }

    #[test]
    fn test_load_failure_keeps_check_unloaded() {
        let loader = CountingLoader::new(Some(PlayerId(2)));
        let mut check = Check::builder().primary([online(1), online(2), online(3)]).build().unwrap();

        let err = check.load(&loader).unwrap_err();
        assert!(matches!(err, DetectError::Load { source: LoadError::UnavailableReplay { .. }, .. }));
        assert_eq!(check.state(), CheckState::Unloaded);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);

        // only the two missing replays are retried
        assert!(check.load(&loader).is_err());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_loaded_references_need_no_loader() {
        let loader = CountingLoader::new(None);
        let record = ReplayRecord::new(9, PlayerId(9), MapId(1), Vec::new()).unwrap();
        let check = Check::builder().replay(ReplayRef::loaded(record)).build().unwrap();
        assert_eq!(check.state(), CheckState::Loaded);

        let (loaded, materialized) = check.into_loaded(&loader).unwrap();
        assert_eq!(materialized, 0);
        assert_eq!(loaded.primary[0].replay_id(), 9);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_duplicate_detector_rejected() {
        let err = Check::builder()
            .detect(Detector::steal(0.5))
            .detect(Detector::steal(0.9))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateDetector(DetectorKind::Steal));
    }

    #[test]
    fn test_negative_threshold_rejected_at_build() {
        let err = Check::builder().detect(Detector::relax(-1.0)).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold { kind: DetectorKind::Relax, .. }));
    }

    #[test]
    fn test_required_detectors() {
        assert_eq!(
            Check::builder().primary([online(1)]).require_detectors().build().unwrap_err(),
            ConfigError::NoDetectors
        );
        assert!(Check::builder().primary([online(1)]).build().is_ok());
    }

    #[test]
    fn test_empty_secondary_set_is_kept() {
        let check = Check::builder().primary([online(1)]).secondary(Vec::<ReplayRef>::new()).build().unwrap();
        assert_eq!(check.secondary_len(), Some(0));
    }
}
