//! tracker.toml parsing
//!
//! ```toml
//! [player]
//! mix_frequency = 48000
//! repeat_count = 1
//!
//! [load]
//! samples = false
//! ```

use anyhow::{Context, Result};
use nether_it::LoadFlags;
use nether_player::PlayerConfig;
use serde::Deserialize;
use std::path::Path;

/// Default settings file looked up in the working directory
pub const DEFAULT_CONFIG: &str = "tracker.toml";

/// Whole settings file
#[derive(Debug, Default, Deserialize)]
pub struct ToolConfig {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub load: LoadSection,
}

/// What the decoder reads
#[derive(Debug, Deserialize)]
pub struct LoadSection {
    /// Decode instruments, sample headers and PCM
    #[serde(default = "default_true")]
    pub samples: bool,
    /// Decode pattern data
    #[serde(default = "default_true")]
    pub patterns: bool,
}

fn default_true() -> bool {
    true
}

impl Default for LoadSection {
    fn default() -> Self {
        Self {
            samples: true,
            patterns: true,
        }
    }
}

impl LoadSection {
    pub fn flags(&self) -> LoadFlags {
        let mut flags = LoadFlags::empty();
        if !self.samples {
            flags = flags | LoadFlags::NO_SAMPLES;
        }
        if !self.patterns {
            flags = flags | LoadFlags::NO_PATTERNS;
        }
        flags
    }
}

impl ToolConfig {
    /// Load `path`, or `tracker.toml` if present, or fall back to defaults.
    /// An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p, true),
            None => (Path::new(DEFAULT_CONFIG), false),
        };
        if !required && !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let config: ToolConfig = toml::from_str("").unwrap();
        assert_eq!(config.player, PlayerConfig::default());
        assert_eq!(config.load.flags(), LoadFlags::empty());
    }

    #[test]
    fn test_sections() {
        let config: ToolConfig = toml::from_str(
            "[player]\nmix_frequency = 22050\nrepeat_count = 0\n\n[load]\npatterns = false\n",
        )
        .unwrap();
        assert_eq!(config.player.mix_frequency, 22050);
        assert_eq!(config.player.repeat_count, 0);
        assert!(config.load.samples);
        assert_eq!(config.load.flags(), LoadFlags::NO_PATTERNS);
    }

    #[test]
    fn test_missing_named_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(ToolConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.toml");
        std::fs::write(&path, "[load]\nsamples = false\n").unwrap();
        let config = ToolConfig::load(Some(&path)).unwrap();
        assert_eq!(config.load.flags(), LoadFlags::NO_SAMPLES);
    }
}
