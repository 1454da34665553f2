//! # Playfield & Timing Constants
//!
//! Fixed geometry of the playfield and the speed rates of the timing
//! modifiers. Every replay is normalized against these values.

// =============================================================================
// PLAYFIELD
// =============================================================================

/// Playfield height in osu!pixels. Vertical flips mirror around this.
pub const PLAYFIELD_HEIGHT: f32 = 384.0;

// =============================================================================
// TIMING
// =============================================================================

/// Playback rate of double time and nightcore.
pub const RATE_DOUBLE_TIME: f64 = 1.5;

/// Playback rate of half time.
pub const RATE_HALF_TIME: f64 = 0.75;

/// Unstable rate is ten times the standard deviation of hit offsets.
pub const UNSTABLE_RATE_SCALE: f64 = 10.0;

// =============================================================================
// DIFFICULTY CAPS
// =============================================================================

/// Largest overall difficulty / circle size after modifier scaling.
pub const MAX_DIFFICULTY: f32 = 10.0;

/// Hard rock multiplier for overall difficulty.
pub const HARD_ROCK_OD_SCALE: f32 = 1.4;

/// Hard rock multiplier for circle size.
pub const HARD_ROCK_CS_SCALE: f32 = 1.3;

/// Easy multiplier for overall difficulty and circle size.
pub const EASY_SCALE: f32 = 0.5;
