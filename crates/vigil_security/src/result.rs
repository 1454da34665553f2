//! # Detection Results
//!
//! One result per unit of work: a pair of replays for steal detection, a
//! single replay for relax and correction detection.
//!
//! "Could not evaluate" is a first-class outcome, distinct from "evaluated
//! and clean":
//!
//! ```text
//! Outcome::Evaluated { verdict: false }  -> no evidence of cheating
//! Outcome::Insufficient(_)               -> nothing to judge
//! ```

use std::sync::Arc;

use crate::anti_cheat::DetectorKind;
use crate::replay::{ReplayRecord, SourceTrust};

/// Why a unit of work could not be evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insufficiency {
    /// A replay has fewer than the samples the detector needs.
    TooFewSamples,
    /// The two trajectories share fewer than two grid points in time.
    NoOverlap,
    /// Too few presses matched expected hits.
    TooFewHits {
        /// Hits that matched.
        matched: usize,
        /// Hits required.
        required: usize,
    },
    /// No cursor motion long enough to judge.
    NoQualifyingMotion,
    /// A replay came from an untrusted source and was not evaluated.
    UntrustedSource,
}

/// Evaluation outcome of one unit of work.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outcome {
    /// The statistic was computed.
    Evaluated {
        /// Raw statistic.
        statistic: f64,
        /// Whether the statistic crossed the threshold.
        verdict: bool,
    },
    /// The statistic could not be computed.
    Insufficient(Insufficiency),
}

impl Outcome {
    /// Verdict for "higher is more suspicious" statistics.
    #[must_use]
    pub fn at_least(statistic: f64, threshold: f64) -> Self {
        Self::Evaluated { statistic, verdict: statistic >= threshold }
    }

    /// Verdict for "lower is more suspicious" statistics.
    #[must_use]
    pub fn at_most(statistic: f64, threshold: f64) -> Self {
        Self::Evaluated { statistic, verdict: statistic <= threshold }
    }

    /// The computed statistic, if any.
    #[must_use]
    pub const fn statistic(&self) -> Option<f64> {
        match self {
            Self::Evaluated { statistic, .. } => Some(*statistic),
            Self::Insufficient(_) => None,
        }
    }

    /// Whether the unit was flagged. Always false when insufficient.
    #[must_use]
    pub const fn is_cheat(&self) -> bool {
        matches!(self, Self::Evaluated { verdict: true, .. })
    }

    /// Whether the unit could not be evaluated.
    #[must_use]
    pub const fn is_insufficient(&self) -> bool {
        matches!(self, Self::Insufficient(_))
    }
}

/// Replay ids a result is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Subjects {
    /// A compared pair.
    Pair(u64, u64),
    /// A single investigated replay.
    Single(u64),
}

/// Pairwise trajectory comparison.
#[derive(Clone, Debug)]
pub struct StealResult {
    /// First replay of the pair (enumeration order).
    pub replay1: Arc<ReplayRecord>,
    /// Second replay of the pair.
    pub replay2: Arc<ReplayRecord>,
    /// Similarity threshold used.
    pub threshold: f64,
    /// Similarity in `(0, 1]`.
    pub outcome: Outcome,
    /// Mean cursor distance (px) behind the similarity.
    pub mean_distance: Option<f64>,
}

impl StealResult {
    /// The replay that was played first, when both play times are known
    /// and trustworthy.
    #[must_use]
    pub fn earlier(&self) -> Option<&ReplayRecord> {
        self.ordered().map(|(first, _)| first)
    }

    /// The replay that was played later; see [`StealResult::earlier`].
    #[must_use]
    pub fn later(&self) -> Option<&ReplayRecord> {
        self.ordered().map(|(_, second)| second)
    }

    fn ordered(&self) -> Option<(&ReplayRecord, &ReplayRecord)> {
        let (first, second): (&ReplayRecord, &ReplayRecord) = (&self.replay1, &self.replay2);
        if first.trust() != SourceTrust::Online || second.trust() != SourceTrust::Online {
            return None;
        }
        if first.played_at()? <= second.played_at()? {
            Some((first, second))
        } else {
            Some((second, first))
        }
    }
}

/// Timing consistency investigation.
#[derive(Clone, Debug)]
pub struct RelaxResult {
    /// Investigated replay.
    pub replay: Arc<ReplayRecord>,
    /// Unstable-rate threshold used.
    pub threshold: f64,
    /// Unstable rate.
    pub outcome: Outcome,
    /// Presses matched to expected hits.
    pub matched_hits: usize,
}

/// A sharp reversal in the cursor path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Snap {
    /// Map time of the turning sample (ms).
    pub t: f64,
    /// Turning angle in degrees.
    pub angle: f64,
    /// Shorter of the two legs (px).
    pub distance: f32,
}

/// Cursor correction investigation.
#[derive(Clone, Debug)]
pub struct CorrectionResult {
    /// Investigated replay.
    pub replay: Arc<ReplayRecord>,
    /// Largest snap angle (degrees) used.
    pub threshold: f64,
    /// Smallest qualifying turning angle.
    pub outcome: Outcome,
    /// Every snap at or below the threshold, in time order.
    pub snaps: Vec<Snap>,
}

/// Verdict of one detector for one unit of work.
#[derive(Clone, Debug)]
pub enum DetectionResult {
    /// Steal comparison.
    Steal(StealResult),
    /// Relax investigation.
    Relax(RelaxResult),
    /// Correction investigation.
    Correction(CorrectionResult),
}

impl DetectionResult {
    /// Detector that produced the result.
    #[must_use]
    pub const fn kind(&self) -> DetectorKind {
        match self {
            Self::Steal(_) => DetectorKind::Steal,
            Self::Relax(_) => DetectorKind::Relax,
            Self::Correction(_) => DetectorKind::Correction,
        }
    }

    /// Replays involved.
    #[must_use]
    pub fn subjects(&self) -> Subjects {
        match self {
            Self::Steal(r) => Subjects::Pair(r.replay1.replay_id(), r.replay2.replay_id()),
            Self::Relax(r) => Subjects::Single(r.replay.replay_id()),
            Self::Correction(r) => Subjects::Single(r.replay.replay_id()),
        }
    }

    /// Evaluation outcome.
    #[must_use]
    pub const fn outcome(&self) -> &Outcome {
        match self {
            Self::Steal(r) => &r.outcome,
            Self::Relax(r) => &r.outcome,
            Self::Correction(r) => &r.outcome,
        }
    }

    /// Threshold the statistic was judged against.
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        match self {
            Self::Steal(r) => r.threshold,
            Self::Relax(r) => r.threshold,
            Self::Correction(r) => r.threshold,
        }
    }

    /// Raw statistic, `None` when insufficient.
    #[must_use]
    pub const fn statistic(&self) -> Option<f64> {
        self.outcome().statistic()
    }

    /// Whether the unit was flagged.
    #[must_use]
    pub const fn is_cheat(&self) -> bool {
        self.outcome().is_cheat()
    }

    /// Whether the unit could not be evaluated.
    #[must_use]
    pub const fn is_insufficient(&self) -> bool {
        self.outcome().is_insufficient()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::{CursorSample, MapId, PlayerId};

    fn replay(id: u64, played_at: u64, trust: SourceTrust) -> Arc<ReplayRecord> {
        Arc::new(
            ReplayRecord::new(id, PlayerId(id), MapId(1), vec![CursorSample::new(0.0, 0.0, 0.0)])
                .unwrap()
                .with_played_at(played_at)
                .with_trust(trust),
        )
    }

    fn steal(r1: Arc<ReplayRecord>, r2: Arc<ReplayRecord>) -> StealResult {
        StealResult {
            replay1: r1,
            replay2: r2,
            threshold: 0.5,
            outcome: Outcome::at_least(0.9, 0.5),
            mean_distance: Some(2.0),
        }
    }

    #[test]
    fn test_polarity() {
        assert!(Outcome::at_least(0.5, 0.5).is_cheat());
        assert!(!Outcome::at_least(0.4, 0.5).is_cheat());
        assert!(Outcome::at_most(0.0, 50.0).is_cheat());
        assert!(!Outcome::at_most(60.0, 50.0).is_cheat());
    }

    #[test]
    fn test_insufficient_is_not_a_verdict() {
        let outcome = Outcome::Insufficient(Insufficiency::NoOverlap);
        assert!(outcome.is_insufficient());
        assert!(!outcome.is_cheat());
        assert_eq!(outcome.statistic(), None);
    }

    #[test]
    fn test_earlier_later() {
        let result = steal(replay(1, 2_000, SourceTrust::Online), replay(2, 1_000, SourceTrust::Online));
        assert_eq!(result.earlier().map(ReplayRecord::replay_id), Some(2));
        assert_eq!(result.later().map(ReplayRecord::replay_id), Some(1));
    }

    #[test]
    fn test_local_files_have_no_ordering() {
        let result = steal(replay(1, 2_000, SourceTrust::LocalFile), replay(2, 1_000, SourceTrust::Online));
        assert!(result.earlier().is_none());
    }

    #[test]
    fn test_accessors() {
        let result = DetectionResult::Steal(steal(
            replay(3, 0, SourceTrust::Online),
            replay(4, 0, SourceTrust::Online),
        ));
        assert_eq!(result.kind(), DetectorKind::Steal);
        assert_eq!(result.subjects(), Subjects::Pair(3, 4));
        assert_eq!(result.statistic(), Some(0.9));
        assert_eq!(result.threshold(), 0.5);
        assert!(result.is_cheat());
    }
}
