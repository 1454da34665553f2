//! Property tests for the detectors.
//!
//! Symmetry, idempotence and insufficient-data precedence over a small
//! family of generated trajectories.

use std::sync::Arc;

use vigil_security::anti_cheat::steal::mean_distance;
use vigil_security::{
    BeatmapTiming, CorrectionDetector, CursorSample, DetectConfig, DeviationInvestigator, HitObject, Insufficiency,
    Keys, MapId, Mods, NormalizedReplay, Outcome, PlayerId, ReplayRecord, StandardNormalizer, TrajectoryComparer,
};

/// Wavy cursor path from `start` to `end` ms, sampled every 16ms.
fn wave(id: u64, start: f64, end: f64, amplitude: f32) -> NormalizedReplay {
    let mut samples = Vec::new();
    let mut t = start;
    while t <= end {
        #[allow(clippy::cast_possible_truncation)]
        let phase = (t / 300.0) as f32;
        samples.push(CursorSample::new(t, 256.0 + amplitude * phase.sin(), 192.0 + amplitude * phase.cos()));
        t += 16.0;
    }
    let record = ReplayRecord::new(id, PlayerId(id), MapId(1), samples).unwrap();
    NormalizedReplay::new(Arc::new(record), &StandardNormalizer)
}

fn family() -> Vec<NormalizedReplay> {
    vec![
        wave(1, 0.0, 5_000.0, 100.0),
        wave(2, 200.0, 4_000.0, 90.0),
        wave(3, 1_000.0, 9_000.0, 140.0),
        wave(4, 4_990.0, 6_000.0, 100.0),
        wave(5, 7_000.0, 8_000.0, 10.0),
    ]
}

#[test]
fn test_comparison_is_symmetric() {
    let comparer = TrajectoryComparer::new(0.5, &DetectConfig::default());
    let replays = family();
    for a in &replays {
        for b in &replays {
            let ab = comparer.compare(a, b).outcome;
            let ba = comparer.compare(b, a).outcome;
            assert_eq!(ab, ba, "replays {} and {}", a.replay.replay_id(), b.replay.replay_id());
        }
    }
}

#[test]
fn test_short_overlap_is_insufficient() {
    let comparer = TrajectoryComparer::new(0.0, &DetectConfig::default());
    let replays = family();

    // replays 1 and 4 overlap for 2ms with one sample each inside it
    let result = comparer.compare(&replays[0], &replays[3]);
    assert_eq!(result.outcome, Outcome::Insufficient(Insufficiency::NoOverlap));
    assert!(!result.outcome.is_cheat());
    assert_eq!(result.mean_distance, None);

    // disjoint
    let result = comparer.compare(&replays[0], &replays[4]);
    assert_eq!(result.outcome, Outcome::Insufficient(Insufficiency::NoOverlap));
}

#[test]
fn test_dense_overlap_shorter_than_a_step_is_evaluated() {
    let comparer = TrajectoryComparer::new(0.5, &DetectConfig::default());
    let burst = |id: u64| {
        let samples = (0..16u16).map(|k| CursorSample::new(f64::from(k), 200.0, 100.0 + f32::from(k))).collect();
        let record = ReplayRecord::new(id, PlayerId(id), MapId(1), samples).unwrap();
        NormalizedReplay::new(Arc::new(record), &StandardNormalizer)
    };

    let result = comparer.compare(&burst(1), &burst(2));
    assert!(!result.outcome.is_insufficient());
    assert_eq!(result.mean_distance, Some(0.0));
    assert!(result.outcome.is_cheat());
}

#[test]
fn test_mean_distance_of_parallel_paths() {
    let a = [CursorSample::new(0.0, 0.0, 0.0), CursorSample::new(100.0, 100.0, 0.0)];
    let b = [CursorSample::new(0.0, 0.0, 36.0), CursorSample::new(100.0, 100.0, 36.0)];
    let distance = mean_distance(&a, &b, 16.0).unwrap();
    assert!((distance - 36.0).abs() < 1e-4);

    let comparer = TrajectoryComparer::new(0.5, &DetectConfig::default());
    assert!((comparer.similarity(distance) - 1.0 / 3.0).abs() < 1e-4);
}

#[test]
fn test_hard_rock_copy_matches_original() {
    let original = wave(1, 0.0, 3_000.0, 100.0);
    let flipped: Vec<CursorSample> = original
        .replay
        .samples()
        .iter()
        .map(|s| CursorSample { pos: s.pos.flip_vertical(384.0), ..*s })
        .collect();
    let record = ReplayRecord::new(2, PlayerId(2), MapId(1), flipped).unwrap().with_mods(Mods::HARD_ROCK);
    let copy = NormalizedReplay::new(Arc::new(record), &StandardNormalizer);

    let comparer = TrajectoryComparer::new(0.99, &DetectConfig::default());
    let result = comparer.compare(&original, &copy);
    assert!(result.outcome.is_cheat());
    assert!(result.mean_distance.unwrap() < 1e-3);
}

#[test]
fn test_investigator_is_idempotent() {
    let hits: Vec<HitObject> = (1..=30u32).map(|k| HitObject::at(f64::from(k) * 400.0)).collect();
    let timing = BeatmapTiming::new(MapId(1), hits, 7.0, 4.0);

    let mut samples = vec![CursorSample::new(0.0, 0.0, 0.0)];
    for k in 1..=30u32 {
        let jitter = f64::from((k * 37) % 19) - 9.0;
        let t = f64::from(k) * 400.0 + jitter;
        samples.push(CursorSample::new(t, 0.0, 0.0).with_keys(Keys::M2));
        samples.push(CursorSample::new(t + 30.0, 0.0, 0.0));
    }
    let record = ReplayRecord::new(1, PlayerId(1), MapId(1), samples).unwrap();
    let replay = NormalizedReplay::new(Arc::new(record), &StandardNormalizer);

    let investigator = DeviationInvestigator::new(50.0, &DetectConfig::default());
    let first = investigator.investigate(&replay, &timing);
    let second = investigator.investigate(&replay, &timing);
    assert_eq!(first.outcome, second.outcome);
    assert_eq!(first.matched_hits, 30);
    assert!(first.outcome.statistic().unwrap() > 0.0);
}

#[test]
fn test_smooth_wave_has_no_snaps() {
    let detector = CorrectionDetector::new(10.0, &DetectConfig::default());
    let result = detector.investigate(&wave(1, 0.0, 5_000.0, 300.0));
    assert!(result.snaps.is_empty());
    assert!(!result.outcome.is_cheat());
}
