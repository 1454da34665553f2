//! # VIGIL Shared
//!
//! Common types used by the detection engine and its collaborators.
//!
//! ## Rule
//!
//! This crate holds plain data only. Loaders and beatmap providers depend
//! on it without pulling in the engine.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;

pub use constants::{PLAYFIELD_HEIGHT, RATE_DOUBLE_TIME, RATE_HALF_TIME};
pub use math::Vec2;
