//! Modifier normalization.
//!
//! Detectors never look at raw recorded samples. They ask a [`Normalizer`]
//! for samples expressed in map time and nomod playfield orientation, so
//! two replays played with different modifiers become comparable.

use std::sync::Arc;

use vigil_shared::PLAYFIELD_HEIGHT;

use super::{CursorSample, Mods, ReplayRecord};

/// Converts a replay's samples to the common time base and playfield.
pub trait Normalizer: Send + Sync {
    /// Returns normalized samples. Must preserve sample order.
    fn normalize(&self, replay: &ReplayRecord) -> Vec<CursorSample>;

    /// Converts a recorded duration (ms) to map time.
    fn map_time(&self, mods: Mods, recorded_ms: f64) -> f64 {
        recorded_ms * mods.speed_rate()
    }
}

/// Linear default: scale time by the speed rate, flip hard rock vertically.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardNormalizer;

impl Normalizer for StandardNormalizer {
    fn normalize(&self, replay: &ReplayRecord) -> Vec<CursorSample> {
        let mods = replay.mods();
        let flip = mods.contains(Mods::HARD_ROCK);

        replay
            .samples()
            .iter()
            .map(|s| CursorSample {
                t: self.map_time(mods, s.t),
                pos: if flip { s.pos.flip_vertical(PLAYFIELD_HEIGHT) } else { s.pos },
                keys: s.keys,
            })
            .collect()
    }
}

/// A replay paired with its normalized samples.
///
/// Built once per replay per run and shared between detectors.
#[derive(Clone, Debug)]
pub struct NormalizedReplay {
    /// The source replay.
    pub replay: Arc<ReplayRecord>,
    /// Samples in map time and nomod orientation.
    pub samples: Vec<CursorSample>,
    /// Map-time milliseconds per recorded millisecond, as applied by the
    /// normalizer.
    pub time_scale: f64,
}

impl NormalizedReplay {
    /// Normalizes `replay` with `normalizer`.
    #[must_use]
    pub fn new(replay: Arc<ReplayRecord>, normalizer: &dyn Normalizer) -> Self {
        let samples = normalizer.normalize(&replay);
        let time_scale = normalizer.map_time(replay.mods(), 1.0);
        Self { replay, samples, time_scale }
    }
}
