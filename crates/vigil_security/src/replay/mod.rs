//! # Replay Model
//!
//! Decoded replays as the engine consumes them. Decoding the binary replay
//! format happens in the loader; by the time a [`ReplayRecord`] exists its
//! samples are validated and it is never mutated again.
//!
//! ## Time Base
//!
//! ```text
//! recorded t (ms, wall clock) ──× speed_rate(mods)──► map time (ms)
//! recorded y                  ──HR: 384 - y──────────► nomod orientation
//! ```
//!
//! The conversion is done by a [`Normalizer`], see [`normalize`].

pub mod normalize;

pub use normalize::{NormalizedReplay, Normalizer, StandardNormalizer};

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use vigil_shared::{Vec2, RATE_DOUBLE_TIME, RATE_HALF_TIME};

use crate::error::LoadError;

/// Player identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rhythm map identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MapId(pub u64);

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Button state of one sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Keys(pub u8);

impl Keys {
    /// Left mouse button.
    pub const M1: Self = Self(1);
    /// Right mouse button.
    pub const M2: Self = Self(2);
    /// First keyboard key.
    pub const K1: Self = Self(4);
    /// Second keyboard key.
    pub const K2: Self = Self(8);
    /// Smoke key. Never counts as a hit input.
    pub const SMOKE: Self = Self(16);

    const HIT_MASK: u8 = Self::M1.0 | Self::M2.0 | Self::K1.0 | Self::K2.0;

    /// No buttons held.
    pub const NONE: Self = Self(0);

    /// Whether a hit button is held now that was not held in `previous`.
    #[must_use]
    pub const fn pressed_since(self, previous: Self) -> bool {
        self.0 & !previous.0 & Self::HIT_MASK != 0
    }
}

impl std::ops::BitOr for Keys {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Active game-mode modifiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Mods(pub u32);

impl Mods {
    /// No modifiers.
    pub const NONE: Self = Self(0);
    /// Smaller difficulty values.
    pub const EASY: Self = Self(1 << 1);
    /// Playfield flipped vertically, harder difficulty values.
    pub const HARD_ROCK: Self = Self(1 << 4);
    /// 1.5x playback.
    pub const DOUBLE_TIME: Self = Self(1 << 6);
    /// Automatic tapping.
    pub const RELAX: Self = Self(1 << 7);
    /// 0.75x playback.
    pub const HALF_TIME: Self = Self(1 << 8);
    /// 1.5x playback with pitch shift.
    pub const NIGHTCORE: Self = Self(1 << 9);
    /// Automatic cursor movement.
    pub const AUTOPILOT: Self = Self(1 << 13);

    /// Whether every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Playback speed relative to the map's own timing.
    #[must_use]
    pub const fn speed_rate(self) -> f64 {
        if self.contains(Self::DOUBLE_TIME) || self.contains(Self::NIGHTCORE) {
            RATE_DOUBLE_TIME
        } else if self.contains(Self::HALF_TIME) {
            RATE_HALF_TIME
        } else {
            1.0
        }
    }
}

impl std::ops::BitOr for Mods {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Where a replay came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SourceTrust {
    /// Live score fetched from the score service.
    #[default]
    Online,
    /// Replay file supplied by a user. Metadata may be edited.
    LocalFile,
}

/// One cursor sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CursorSample {
    /// Milliseconds since playback start.
    pub t: f64,
    /// Cursor position in osu!pixels.
    pub pos: Vec2,
    /// Buttons held at this instant.
    pub keys: Keys,
}

impl CursorSample {
    /// Creates a sample with no buttons held.
    #[must_use]
    pub const fn new(t: f64, x: f32, y: f32) -> Self {
        Self { t, pos: Vec2::new(x, y), keys: Keys::NONE }
    }

    /// Sets the held buttons.
    #[must_use]
    pub const fn with_keys(mut self, keys: Keys) -> Self {
        self.keys = keys;
        self
    }
}

/// A decoded replay.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayRecord {
    replay_id: u64,
    player: PlayerId,
    map_id: MapId,
    mods: Mods,
    trust: SourceTrust,
    played_at: Option<u64>,
    samples: Vec<CursorSample>,
}

impl ReplayRecord {
    /// Creates a replay from decoded samples.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Decode`] when a timestamp or position is not
    /// finite, or the timestamps decrease.
    pub fn new(
        replay_id: u64,
        player: PlayerId,
        map_id: MapId,
        samples: Vec<CursorSample>,
    ) -> Result<Self, LoadError> {
        if let Some(bad) = samples.iter().position(|s| !s.t.is_finite()) {
            return Err(LoadError::Decode(format!("sample {bad} has a non-finite timestamp")));
        }
        if let Some(bad) = samples.iter().position(|s| !(s.pos.x.is_finite() && s.pos.y.is_finite())) {
            return Err(LoadError::Decode(format!("sample {bad} has a non-finite position")));
        }
        if let Some(bad) = samples.windows(2).position(|w| w[1].t < w[0].t) {
            return Err(LoadError::Decode(format!(
                "timestamps decrease at sample {}",
                bad + 1
            )));
        }

        Ok(Self {
            replay_id,
            player,
            map_id,
            mods: Mods::NONE,
            trust: SourceTrust::Online,
            played_at: None,
            samples,
        })
    }

    /// Sets the active modifiers.
    #[must_use]
    pub fn with_mods(mut self, mods: Mods) -> Self {
        self.mods = mods;
        self
    }

    /// Sets the source trust tag.
    #[must_use]
    pub fn with_trust(mut self, trust: SourceTrust) -> Self {
        self.trust = trust;
        self
    }

    /// Sets when the replay was played (unix seconds).
    #[must_use]
    pub fn with_played_at(mut self, unix_secs: u64) -> Self {
        self.played_at = Some(unix_secs);
        self
    }

    /// Replay identifier.
    #[must_use]
    pub const fn replay_id(&self) -> u64 {
        self.replay_id
    }

    /// Player who set the replay.
    #[must_use]
    pub const fn player(&self) -> PlayerId {
        self.player
    }

    /// Map the replay was played on.
    #[must_use]
    pub const fn map_id(&self) -> MapId {
        self.map_id
    }

    /// Active modifiers.
    #[must_use]
    pub const fn mods(&self) -> Mods {
        self.mods
    }

    /// Source trust tag.
    #[must_use]
    pub const fn trust(&self) -> SourceTrust {
        self.trust
    }

    /// When the replay was played, if known.
    #[must_use]
    pub const fn played_at(&self) -> Option<u64> {
        self.played_at
    }

    /// Recorded samples, in recorded time.
    #[must_use]
    pub fn samples(&self) -> &[CursorSample] {
        &self.samples
    }
}

/// A loadable reference to a replay.
#[derive(Clone, Debug, PartialEq)]
pub enum ReplayRef {
    /// Live score of `player` on `map_id`.
    Online {
        /// Map the score was set on.
        map_id: MapId,
        /// Player who set it.
        player: PlayerId,
    },
    /// Replay file on disk.
    File(PathBuf),
    /// Already decoded; loading is a no-op.
    Loaded(Arc<ReplayRecord>),
}

impl ReplayRef {
    /// Reference to a live score.
    #[must_use]
    pub const fn online(map_id: MapId, player: PlayerId) -> Self {
        Self::Online { map_id, player }
    }

    /// Reference to a replay file.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Wraps an already decoded replay.
    #[must_use]
    pub fn loaded(record: ReplayRecord) -> Self {
        Self::Loaded(Arc::new(record))
    }
}

impl fmt::Display for ReplayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online { map_id, player } => write!(f, "score of player {player} on map {map_id}"),
            Self::File(path) => write!(f, "replay file {}", path.display()),
            Self::Loaded(record) => write!(f, "replay {}", record.replay_id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_decreasing_timestamps() {
        let samples = vec![
            CursorSample::new(0.0, 0.0, 0.0),
            CursorSample::new(10.0, 0.0, 0.0),
            CursorSample::new(5.0, 0.0, 0.0),
        ];
        let err = ReplayRecord::new(1, PlayerId(1), MapId(1), samples).unwrap_err();
        assert!(matches!(err, LoadError::Decode(_)));
    }

    #[test]
    fn test_accepts_duplicate_timestamps() {
        let samples = vec![
            CursorSample::new(0.0, 0.0, 0.0),
            CursorSample::new(0.0, 1.0, 1.0),
            CursorSample::new(16.0, 2.0, 2.0),
        ];
        let replay = ReplayRecord::new(1, PlayerId(1), MapId(1), samples).unwrap();
        assert_eq!(replay.samples().len(), 3);
    }

    #[test]
    fn test_rejects_nan_timestamp() {
        let samples = vec![CursorSample::new(f64::NAN, 0.0, 0.0)];
        assert!(ReplayRecord::new(1, PlayerId(1), MapId(1), samples).is_err());
    }

    #[test]
    fn test_rejects_non_finite_position() {
        for (x, y) in [(f32::NAN, 0.0), (0.0, f32::INFINITY), (f32::NEG_INFINITY, f32::NAN)] {
            let samples = vec![CursorSample::new(0.0, 0.0, 0.0), CursorSample::new(16.0, x, y)];
            let err = ReplayRecord::new(1, PlayerId(1), MapId(1), samples).unwrap_err();
            assert!(matches!(err, LoadError::Decode(ref message) if message.contains("sample 1")));
        }
    }

    #[test]
    fn test_speed_rate() {
        assert_eq!(Mods::NONE.speed_rate(), 1.0);
        assert_eq!(Mods::DOUBLE_TIME.speed_rate(), 1.5);
        assert_eq!((Mods::NIGHTCORE | Mods::HARD_ROCK).speed_rate(), 1.5);
        assert_eq!(Mods::HALF_TIME.speed_rate(), 0.75);
    }

    #[test]
    fn test_key_press_edges() {
        let held = Keys::K1 | Keys::M1;
        assert!(held.pressed_since(Keys::NONE));
        assert!(!held.pressed_since(held));
        assert!((held | Keys::K2).pressed_since(held));
        assert!(!Keys::SMOKE.pressed_since(Keys::NONE));
    }
}
