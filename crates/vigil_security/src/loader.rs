//! Replay materialization.
//!
//! Network access, authentication, rate limits and caching all belong to
//! the loader implementation. The engine calls [`Loader::materialize`] once
//! per unresolved reference and propagates failures unchanged.

use crate::error::LoadError;
use crate::replay::{ReplayRecord, ReplayRef};

/// Turns replay references into decoded replays.
pub trait Loader: Send + Sync {
    /// Loads and decodes the referenced replay.
    ///
    /// Never called with [`ReplayRef::Loaded`].
    ///
    /// # Errors
    ///
    /// [`LoadError::UnavailableReplay`] when the source no longer has the
    /// data, [`LoadError::RateLimited`] when the caller should retry later.
    fn materialize(&self, reference: &ReplayRef) -> Result<ReplayRecord, LoadError>;
}
