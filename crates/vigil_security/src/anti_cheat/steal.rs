//! # Steal Detection
//!
//! Compares the cursor paths of two replays. A copied replay traces the
//! original almost exactly, so the mean distance between the two cursors,
//! sampled over the time both replays cover, stays close to zero.
//!
//! ## Algorithm
//!
//! ```text
//! a: ──●────●──●─────●───●──        overlap = [max(start), min(end)]
//! b:     ──●───●────●───●────●──    grid    = overlap stepped by grid_step_ms
//!          |  |  |  |  |  |         d_k     = |a(t_k) - b(t_k)|  (interpolated)
//!
//! similarity = 1 / (1 + mean(d_k) / distance_scale)
//! ```
//!
//! The grid depends only on the overlap, and `|a - b| == |b - a|`, so the
//! statistic is exactly symmetric. The grid never exceeds
//! [`MAX_GRID_POINTS`]; longer overlaps are sampled more coarsely.

use vigil_shared::Vec2;

use crate::config::DetectConfig;
use crate::replay::{CursorSample, NormalizedReplay, SourceTrust};
use crate::result::{Insufficiency, Outcome, StealResult};

/// Pairwise trajectory comparer.
#[derive(Clone, Copy, Debug)]
pub struct TrajectoryComparer {
    threshold: f64,
    grid_step_ms: f64,
    distance_scale: f64,
    trust_local_files: bool,
}

impl TrajectoryComparer {
    /// Creates a comparer flagging pairs with similarity `>= threshold`.
    #[must_use]
    pub fn new(threshold: f64, config: &DetectConfig) -> Self {
        Self {
            threshold,
            grid_step_ms: config.grid_step_ms,
            distance_scale: config.distance_scale,
            trust_local_files: config.trust_local_files,
        }
    }

    /// Compares two normalized replays.
    #[must_use]
    pub fn compare(&self, a: &NormalizedReplay, b: &NormalizedReplay) -> StealResult {
        let untrusted = |r: &NormalizedReplay| r.replay.trust() == SourceTrust::LocalFile;
        let measured = if !self.trust_local_files && (untrusted(a) || untrusted(b)) {
            Err(Insufficiency::UntrustedSource)
        } else {
            mean_distance(&a.samples, &b.samples, self.grid_step_ms)
        };

        let (outcome, mean_distance) = match measured {
            Ok(distance) => (Outcome::at_least(self.similarity(distance), self.threshold), Some(distance)),
            Err(reason) => (Outcome::Insufficient(reason), None),
        };

        StealResult {
            replay1: a.replay.clone(),
            replay2: b.replay.clone(),
            threshold: self.threshold,
            outcome,
            mean_distance,
        }
    }

    /// Maps a mean distance onto `(0, 1]`; zero distance is 1.
    #[must_use]
    pub fn similarity(&self, mean_distance: f64) -> f64 {
        1.0 / (1.0 + mean_distance / self.distance_scale)
    }
}

/// Upper bound on grid points per comparison. Longer overlaps widen the
/// step instead of growing the grid.
pub const MAX_GRID_POINTS: usize = 1 << 20;

/// Mean cursor distance over the shared time grid.
///
/// An overlap shorter than one `step` is measured at its two endpoints.
///
/// # Errors
///
/// [`Insufficiency::TooFewSamples`] if either path has fewer than two
/// samples, [`Insufficiency::NoOverlap`] if either path has fewer than two
/// samples inside the overlap.
pub fn mean_distance(a: &[CursorSample], b: &[CursorSample], step: f64) -> Result<f64, Insufficiency> {
    if a.len() < 2 || b.len() < 2 {
        return Err(Insufficiency::TooFewSamples);
    }

    let start = a[0].t.max(b[0].t);
    let end = a[a.len() - 1].t.min(b[b.len() - 1].t);
    if end < start || samples_within(a, start, end) < 2 || samples_within(b, start, end) < 2 {
        return Err(Insufficiency::NoOverlap);
    }

    let span = end - start;
    #[allow(clippy::cast_precision_loss)]
    let step = step.max(span / MAX_GRID_POINTS as f64);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = ((span / step).floor() as usize).min(MAX_GRID_POINTS);

    let mut cursor_a = 0;
    let mut cursor_b = 0;
    let mut distance_at = |t: f64| {
        let pa = position_at(a, t, &mut cursor_a);
        let pb = position_at(b, t, &mut cursor_b);
        f64::from(pa.distance(pb))
    };

    if steps == 0 {
        return Ok((distance_at(start) + distance_at(end)) / 2.0);
    }

    let mut total = 0.0f64;
    for k in 0..=steps {
        #[allow(clippy::cast_precision_loss)]
        let t = start + k as f64 * step;
        total += distance_at(t);
    }

    #[allow(clippy::cast_precision_loss)]
    let points = (steps + 1) as f64;
    Ok(total / points)
}

/// Number of samples with `start <= t <= end`. Samples are sorted by `t`.
fn samples_within(samples: &[CursorSample], start: f64, end: f64) -> usize {
    let first = samples.partition_point(|s| s.t < start);
    let past = samples.partition_point(|s| s.t <= end);
    past.saturating_sub(first)
}

/// Interpolated position at `t`. `cursor` only moves forward, so calls must
/// come in non-decreasing `t`.
fn position_at(samples: &[CursorSample], t: f64, cursor: &mut usize) -> Vec2 {
    while *cursor + 1 < samples.len() && samples[*cursor + 1].t <= t {
        *cursor += 1;
    }
    let current = samples[*cursor];
    let Some(next) = samples.get(*cursor + 1) else {
        return current.pos;
    };
    if next.t <= current.t || t <= current.t {
        return current.pos;
    }
    #[allow(clippy::cast_possible_truncation)]
    let frac = ((t - current.t) / (next.t - current.t)) as f32;
    current.pos.lerp(next.pos, frac)
}

/// Deterministic enumeration of the pairs to compare.
///
/// - `within(n)`: every unordered pair `(i, j)`, `i < j`, once.
/// - `cross(m, n)`: every `(i, j)` with `i` in the primary set and `j` in
///   the secondary set, row-major.
#[derive(Clone, Debug)]
pub struct PairCursor {
    rows: usize,
    cols: usize,
    cross: bool,
    i: usize,
    j: usize,
}

impl PairCursor {
    /// All unordered pairs of one set of `n` replays.
    #[must_use]
    pub const fn within(n: usize) -> Self {
        Self { rows: n, cols: n, cross: false, i: 0, j: 1 }
    }

    /// All pairs between a set of `m` and a set of `n` replays.
    #[must_use]
    pub const fn cross(m: usize, n: usize) -> Self {
        Self { rows: m, cols: n, cross: true, i: 0, j: 0 }
    }

    /// Total number of pairs, independent of progress.
    #[must_use]
    pub const fn total(&self) -> usize {
        if self.cross {
            self.rows * self.cols
        } else if self.rows < 2 {
            0
        } else {
            self.rows * (self.rows - 1) / 2
        }
    }
}

impl Iterator for PairCursor {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<(usize, usize)> {
        while self.i < self.rows {
            if self.j < self.cols {
                let pair = (self.i, self.j);
                self.j += 1;
                return Some(pair);
            }
            self.i += 1;
            self.j = if self.cross { 0 } else { self.i + 1 };
        }
        None
    }
}
