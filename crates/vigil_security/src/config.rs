//! # Engine Configuration
//!
//! Tunables for the detectors, loaded from TOML:
//!
//! ```toml
//! grid_step_ms = 16.0
//! distance_scale = 18.0
//! relax_min_hits = 10
//! steal_threshold = 0.5
//! relax_threshold = 50.0
//! ```
//!
//! Every key is optional. Missing keys take the defaults below.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Detector tunables and default thresholds.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectConfig {
    /// Spacing (ms, map time) of the comparer's resampling grid.
    pub grid_step_ms: f64,
    /// Mean distance (px) at which similarity drops to 0.5.
    pub distance_scale: f64,
    /// Fewest matched hits for an unstable rate to be reported.
    pub relax_min_hits: usize,
    /// Shortest leg (px) on both sides of a snap.
    pub correction_min_distance: f32,
    /// Evaluate replays that came from user-supplied files.
    pub trust_local_files: bool,
    /// Default steal threshold (similarity, 0-1).
    pub steal_threshold: f64,
    /// Default relax threshold (unstable rate).
    pub relax_threshold: f64,
    /// Default correction threshold (largest snap angle, degrees).
    pub correction_max_angle: f64,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            grid_step_ms: 16.0,
            distance_scale: 18.0,
            relax_min_hits: 10,
            correction_min_distance: 8.0,
            trust_local_files: true,
            steal_threshold: 0.5,
            relax_threshold: 50.0,
            correction_max_angle: 10.0,
        }
    }
}

impl DetectConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed TOML or unknown keys, or any
    /// error from [`DetectConfig::validate`].
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] when the file cannot be read, otherwise as
    /// [`DetectConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidSetting`] naming the first bad key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("grid_step_ms", self.grid_step_ms)?;
        positive("distance_scale", self.distance_scale)?;
        non_negative("correction_min_distance", f64::from(self.correction_min_distance))?;
        non_negative("steal_threshold", self.steal_threshold)?;
        non_negative("relax_threshold", self.relax_threshold)?;
        non_negative("correction_max_angle", self.correction_max_angle)?;
        if self.relax_min_hits < 2 {
            return Err(ConfigError::InvalidSetting {
                key: "relax_min_hits",
                reason: "a spread needs at least 2 hits".into(),
            });
        }
        Ok(())
    }
}

fn positive(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidSetting { key, reason: format!("must be > 0, got {value}") })
    }
}

fn non_negative(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidSetting { key, reason: format!("must be >= 0, got {value}") })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(DetectConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = DetectConfig::from_toml_str("grid_step_ms = 8.0\ntrust_local_files = false\n").unwrap();
        assert_eq!(config.grid_step_ms, 8.0);
        assert!(!config.trust_local_files);
        assert_eq!(config.distance_scale, DetectConfig::default().distance_scale);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = DetectConfig::from_toml_str("steal_thresh = 18\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = DetectConfig::from_toml_str("grid_step_ms = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { key: "grid_step_ms", .. }));

        let err = DetectConfig::from_toml_str("relax_min_hits = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { key: "relax_min_hits", .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = DetectConfig::from_toml_file("/nonexistent/vigil.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
