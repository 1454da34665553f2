//! # Relax Detection
//!
//! Measures how consistently a player's presses land relative to the
//! map's hit timings. Human timing spreads; automated tapping does not.
//!
//! ## Steps
//!
//! 1. Presses are the rising edges of the hit buttons (smoke ignored),
//!    converted to map time.
//! 2. Each hit takes the nearest unused press inside its 50-window (and
//!    inside the circle when the hit has a position). Unmatched hits are
//!    misses and do not contribute.
//! 3. Unstable rate = `10 * stddev(press - hit) / time_scale`, reported in
//!    real time so that speed modifiers do not change the scale. The time
//!    scale is whatever the replay's normalizer applied.

use vigil_shared::constants::UNSTABLE_RATE_SCALE;
use vigil_shared::Vec2;

use crate::beatmap::BeatmapTiming;
use crate::config::DetectConfig;
use crate::replay::{Keys, NormalizedReplay, SourceTrust};
use crate::result::{Insufficiency, Outcome, RelaxResult};

/// Timing-deviation investigator.
#[derive(Clone, Copy, Debug)]
pub struct DeviationInvestigator {
    threshold: f64,
    min_hits: usize,
    trust_local_files: bool,
}

/// A registered press in map time.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Press {
    t: f64,
    pos: Vec2,
}

impl DeviationInvestigator {
    /// Creates an investigator flagging unstable rates `<= threshold`.
    #[must_use]
    pub fn new(threshold: f64, config: &DetectConfig) -> Self {
        Self {
            threshold,
            min_hits: config.relax_min_hits,
            trust_local_files: config.trust_local_files,
        }
    }

    /// The result for a replay this investigator will not evaluate, if
    /// `replay` is one. Needs no beatmap timing.
    #[must_use]
    pub fn refuse(&self, replay: &NormalizedReplay) -> Option<RelaxResult> {
        (!self.trust_local_files && replay.replay.trust() == SourceTrust::LocalFile).then(|| RelaxResult {
            replay: replay.replay.clone(),
            threshold: self.threshold,
            outcome: Outcome::Insufficient(Insufficiency::UntrustedSource),
            matched_hits: 0,
        })
    }

    /// Investigates one replay against its map's timing.
    #[must_use]
    pub fn investigate(&self, replay: &NormalizedReplay, timing: &BeatmapTiming) -> RelaxResult {
        if let Some(refused) = self.refuse(replay) {
            return refused;
        }

        let offsets = hit_offsets(replay, timing);
        let outcome = if offsets.len() < self.min_hits {
            Outcome::Insufficient(Insufficiency::TooFewHits { matched: offsets.len(), required: self.min_hits })
        } else {
            Outcome::at_most(UNSTABLE_RATE_SCALE * std_dev(&offsets) / replay.time_scale, self.threshold)
        };

        RelaxResult {
            replay: replay.replay.clone(),
            threshold: self.threshold,
            outcome,
            matched_hits: offsets.len(),
        }
    }
}

/// Signed offsets (press - hit, map time ms) of every matched hit.
#[must_use]
pub fn hit_offsets(replay: &NormalizedReplay, timing: &BeatmapTiming) -> Vec<f64> {
    let mods = replay.replay.mods();
    let window = timing.hit_window_50(mods);
    let radius = timing.circle_radius(mods);
    let presses = presses(replay);

    let mut used = vec![false; presses.len()];
    let mut lower = 0;
    let mut offsets = Vec::with_capacity(timing.hit_objects.len());

    for hit in &timing.hit_objects {
        while lower < presses.len() && presses[lower].t < hit.t - window {
            lower += 1;
        }

        let mut best: Option<(usize, f64)> = None;
        for (index, press) in presses.iter().enumerate().skip(lower) {
            let offset = press.t - hit.t;
            if offset > window {
                break;
            }
            if used[index] {
                continue;
            }
            if let Some(target) = hit.pos {
                if press.pos.distance(target) > radius {
                    continue;
                }
            }
            if best.map_or(true, |(_, b)| offset.abs() < b.abs()) {
                best = Some((index, offset));
            }
        }

        if let Some((index, offset)) = best {
            used[index] = true;
            offsets.push(offset);
        }
    }

    offsets
}

fn presses(replay: &NormalizedReplay) -> Vec<Press> {
    let mut previous = Keys::NONE;
    let mut presses = Vec::new();
    for sample in &replay.samples {
        if sample.keys.pressed_since(previous) {
            presses.push(Press { t: sample.t, pos: sample.pos });
        }
        previous = sample.keys;
    }
    presses
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    variance.sqrt()
}
