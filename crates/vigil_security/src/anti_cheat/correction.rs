//! # Correction Detection
//!
//! Aim correction tools drag the cursor onto the target and back. In the
//! recorded path this shows up as a snap: a sample where the cursor leaves
//! along one direction and returns along nearly the same line.
//!
//! ```text
//!   a ●───────────────● b        angle(a - b, c - b) small
//!   c ●──────────────╯           |a - b| and |c - b| both long
//! ```

use crate::config::DetectConfig;
use crate::replay::{CursorSample, NormalizedReplay, SourceTrust};
use crate::result::{CorrectionResult, Insufficiency, Outcome, Snap};

/// Snap detector.
#[derive(Clone, Copy, Debug)]
pub struct CorrectionDetector {
    max_angle: f64,
    min_distance: f32,
    trust_local_files: bool,
}

impl CorrectionDetector {
    /// Creates a detector flagging turning angles `<= max_angle` degrees.
    #[must_use]
    pub fn new(max_angle: f64, config: &DetectConfig) -> Self {
        Self {
            max_angle,
            min_distance: config.correction_min_distance,
            trust_local_files: config.trust_local_files,
        }
    }

    /// Investigates one replay.
    #[must_use]
    pub fn investigate(&self, replay: &NormalizedReplay) -> CorrectionResult {
        let (outcome, snaps) = if !self.trust_local_files && replay.replay.trust() == SourceTrust::LocalFile {
            (Outcome::Insufficient(Insufficiency::UntrustedSource), Vec::new())
        } else {
            self.scan(&replay.samples)
        };

        CorrectionResult {
            replay: replay.replay.clone(),
            threshold: self.max_angle,
            outcome,
            snaps,
        }
    }

    fn scan(&self, samples: &[CursorSample]) -> (Outcome, Vec<Snap>) {
        let path = collapse_duplicates(samples);
        if path.len() < 3 {
            return (Outcome::Insufficient(Insufficiency::TooFewSamples), Vec::new());
        }

        let mut smallest: Option<f64> = None;
        let mut snaps = Vec::new();
        for window in path.windows(3) {
            let (a, b, c) = (window[0], window[1], window[2]);
            let out = a.pos - b.pos;
            let back = c.pos - b.pos;
            let (out_len, back_len) = (out.length(), back.length());
            if out_len <= self.min_distance || back_len <= self.min_distance {
                continue;
            }

            let cos = (f64::from(out.dot(back)) / (f64::from(out_len) * f64::from(back_len))).clamp(-1.0, 1.0);
            let angle = cos.acos().to_degrees();
            smallest = Some(smallest.map_or(angle, |s| s.min(angle)));
            if angle <= self.max_angle {
                snaps.push(Snap { t: b.t, angle, distance: out_len.min(back_len) });
            }
        }

        match smallest {
            Some(angle) => (Outcome::at_most(angle, self.max_angle), snaps),
            None => (Outcome::Insufficient(Insufficiency::NoQualifyingMotion), snaps),
        }
    }
}

/// Keeps the last sample of every run of equal timestamps.
fn collapse_duplicates(samples: &[CursorSample]) -> Vec<CursorSample> {
    let mut path: Vec<CursorSample> = Vec::with_capacity(samples.len());
    for sample in samples {
        match path.last_mut() {
            Some(last) if last.t == sample.t => *last = *sample,
            _ => path.push(*sample),
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::replay::{MapId, PlayerId, ReplayRecord, StandardNormalizer};

    fn normalized(samples: Vec<CursorSample>) -> NormalizedReplay {
        let replay = ReplayRecord::new(1, PlayerId(1), MapId(1), samples).unwrap();
        NormalizedReplay::new(Arc::new(replay), &StandardNormalizer)
    }

    fn detector() -> CorrectionDetector {
        CorrectionDetector::new(10.0, &DetectConfig::default())
    }

    #[test]
    fn test_straight_motion_is_clean() {
        let samples = (0..10u8)
            .map(|k| CursorSample::new(f64::from(k) * 16.0, f32::from(k) * 20.0, 100.0))
            .collect();
        let result = detector().investigate(&normalized(samples));
        assert!(!result.outcome.is_cheat());
        assert!(result.snaps.is_empty());
        assert!((result.outcome.statistic().unwrap() - 180.0).abs() < 1e-6);
    }

    #[test]
    fn test_sharp_reversal_is_a_snap() {
        let samples = vec![
            CursorSample::new(0.0, 100.0, 100.0),
            CursorSample::new(16.0, 200.0, 100.0),
            CursorSample::new(32.0, 100.0, 102.0),
            CursorSample::new(48.0, 100.0, 200.0),
        ];
        let result = detector().investigate(&normalized(samples));
        assert!(result.outcome.is_cheat());
        assert_eq!(result.snaps.len(), 1);
        assert_eq!(result.snaps[0].t, 16.0);
        assert!(result.snaps[0].angle < 2.0);
    }

    #[test]
    fn test_short_jitter_is_ignored() {
        let samples = vec![
            CursorSample::new(0.0, 100.0, 100.0),
            CursorSample::new(16.0, 103.0, 100.0),
            CursorSample::new(32.0, 100.0, 100.0),
        ];
        let result = detector().investigate(&normalized(samples));
        assert_eq!(result.outcome, Outcome::Insufficient(Insufficiency::NoQualifyingMotion));
    }

    #[test]
    fn test_duplicate_timestamps_collapse() {
        let samples = vec![
            CursorSample::new(0.0, 0.0, 0.0),
            CursorSample::new(0.0, 1.0, 0.0),
            CursorSample::new(16.0, 2.0, 0.0),
        ];
        let path = collapse_duplicates(&samples);
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].pos.x, 1.0);
    }

    #[test]
    fn test_too_few_samples() {
        let result = detector().investigate(&normalized(vec![CursorSample::new(0.0, 0.0, 0.0)]));
        assert_eq!(result.outcome, Outcome::Insufficient(Insufficiency::TooFewSamples));
    }
}
