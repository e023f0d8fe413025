//! Player configuration
//!
//! Everything that would otherwise be process-wide playback state lives
//! here and is handed to [`crate::Player::new`] and the length estimator.
//! Stored as TOML; every field is optional.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a [`PlayerConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid player config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Playback and length-estimation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Output rate used for tick lengths and voice increments (default: 44100)
    #[serde(default = "default_mix_frequency")]
    pub mix_frequency: u32,
    /// Estimator stops when it reaches this order
    #[serde(default)]
    pub stop_at_order: Option<u32>,
    /// Row within `stop_at_order` at which the estimator stops
    #[serde(default)]
    pub stop_at_row: Option<u32>,
    /// Estimator stops once this many seconds have elapsed
    #[serde(default)]
    pub stop_at_time: Option<u32>,
    /// Position jumps to an earlier order only break the pattern
    #[serde(default)]
    pub no_backward_jumps: bool,
    /// Number of times the order list plays before stopping (0 = loop forever)
    #[serde(default = "default_repeat_count")]
    pub repeat_count: u32,
    /// Seed for random waveforms and volume/pan swing; random when absent
    #[serde(default)]
    pub random_seed: Option<u64>,
}

fn default_mix_frequency() -> u32 {
    44100
}

fn default_repeat_count() -> u32 {
    1
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            mix_frequency: default_mix_frequency(),
            stop_at_order: None,
            stop_at_row: None,
            stop_at_time: None,
            no_backward_jumps: false,
            repeat_count: default_repeat_count(),
            random_seed: None,
        }
    }
}

impl PlayerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Frames in one tick at `tempo` (BPM)
    pub fn samples_per_tick(&self, tempo: u32) -> u32 {
        if tempo == 0 {
            return self.mix_frequency;
        }
        self.mix_frequency * 5 / (tempo * 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.mix_frequency, 44100);
        assert_eq!(config.repeat_count, 1);
        assert!(!config.no_backward_jumps);
        assert_eq!(config.stop_at_time, None);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = PlayerConfig::from_toml_str("mix_frequency = 48000\nstop_at_time = 90\n")
            .unwrap();
        assert_eq!(config.mix_frequency, 48000);
        assert_eq!(config.stop_at_time, Some(90));
        assert_eq!(config.repeat_count, 1);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = PlayerConfig {
            no_backward_jumps: true,
            random_seed: Some(42),
            stop_at_order: Some(3),
            ..Default::default()
        };
        let text = toml::to_string(&config).unwrap();
        let parsed: PlayerConfig = toml::from_str(&text).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_invalid_toml() {
        let err = PlayerConfig::from_toml_str("mix_frequency = \"fast\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "repeat_count = 0\nrandom_seed = 7").unwrap();
        let config = PlayerConfig::load(file.path()).unwrap();
        assert_eq!(config.repeat_count, 0);
        assert_eq!(config.random_seed, Some(7));

        let missing = PlayerConfig::load(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_samples_per_tick() {
        let config = PlayerConfig::default();
        // 125 BPM at 44.1 kHz is 882 frames per tick
        assert_eq!(config.samples_per_tick(125), 882);
    }
}
