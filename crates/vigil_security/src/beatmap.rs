//! # Beatmap Timing
//!
//! Expected hit events of a map, and the collaborator traits that supply
//! them. Asset acquisition and storage live outside the engine; the engine
//! only holds a [`BeatmapLibrary`] handle for the duration of one run.

use vigil_shared::constants::{EASY_SCALE, HARD_ROCK_CS_SCALE, HARD_ROCK_OD_SCALE, MAX_DIFFICULTY};
use vigil_shared::Vec2;

use crate::error::AssetError;
use crate::replay::{MapId, Mods};

/// One expected hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitObject {
    /// Map time of the hit (ms).
    pub t: f64,
    /// Where the hit is expected, if the map defines positions.
    pub pos: Option<Vec2>,
}

impl HitObject {
    /// A hit with a timestamp only.
    #[must_use]
    pub const fn at(t: f64) -> Self {
        Self { t, pos: None }
    }

    /// A hit with timestamp and position.
    #[must_use]
    pub const fn at_pos(t: f64, pos: Vec2) -> Self {
        Self { t, pos: Some(pos) }
    }
}

/// Ordered hit timings of one map.
#[derive(Clone, Debug, PartialEq)]
pub struct BeatmapTiming {
    /// Map identifier.
    pub map_id: MapId,
    /// Hits in ascending time order.
    pub hit_objects: Vec<HitObject>,
    /// Overall difficulty (0-10); controls the hit window.
    pub overall_difficulty: f32,
    /// Circle size (0-10); controls the hit radius.
    pub circle_size: f32,
}

impl BeatmapTiming {
    /// Creates timing data, sorting hits by time.
    #[must_use]
    pub fn new(map_id: MapId, mut hit_objects: Vec<HitObject>, overall_difficulty: f32, circle_size: f32) -> Self {
        hit_objects.sort_by(|a, b| a.t.total_cmp(&b.t));
        Self { map_id, hit_objects, overall_difficulty, circle_size }
    }

    /// Half-width (ms) of the widest hit window, in map time.
    ///
    /// A press further than this from a hit cannot register on it.
    #[must_use]
    pub fn hit_window_50(&self, mods: Mods) -> f64 {
        let od = f64::from(scale_difficulty(self.overall_difficulty, mods, HARD_ROCK_OD_SCALE));
        150.0 + 50.0 * (5.0 - od) / 5.0
    }

    /// Radius (osu!pixels) of a hit circle.
    #[must_use]
    pub fn circle_radius(&self, mods: Mods) -> f32 {
        let cs = scale_difficulty(self.circle_size, mods, HARD_ROCK_CS_SCALE);
        54.4 - 4.48 * cs
    }
}

fn scale_difficulty(value: f32, mods: Mods, hard_rock_scale: f32) -> f32 {
    if mods.contains(Mods::HARD_ROCK) {
        (value * hard_rock_scale).min(MAX_DIFFICULTY)
    } else if mods.contains(Mods::EASY) {
        value * EASY_SCALE
    } else {
        value
    }
}

/// Open handle onto a beatmap store.
///
/// Acquired once per run and dropped when the run ends. Dropping the handle
/// must release whatever it holds.
pub trait BeatmapLibrary {
    /// Looks up the timing of `map_id`.
    ///
    /// # Errors
    ///
    /// [`AssetError::UnknownMap`] when the id cannot be resolved.
    fn get_timing(&mut self, map_id: MapId) -> Result<BeatmapTiming, AssetError>;
}

/// Source of [`BeatmapLibrary`] handles.
pub trait BeatmapProvider: Send + Sync {
    /// Opens a library handle.
    ///
    /// # Errors
    ///
    /// [`AssetError::Unavailable`] when the store cannot be opened.
    fn acquire(&self) -> Result<Box<dyn BeatmapLibrary + '_>, AssetError>;
}
