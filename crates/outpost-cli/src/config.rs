// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Loads a [`WorldConfig`] from an optional TOML file, falling back to
//! `WorldConfig::default()` when no path is given or the file is absent.

use std::path::Path;

use anyhow::{Context, Result};
use outpost_core::WorldConfig;

/// Resolves the [`WorldConfig`] a command should run with.
pub struct ConfigSource;

impl ConfigSource {
    /// Loads `path` as TOML and deserializes it into a [`WorldConfig`]. When
    /// `path` is `None`, returns `WorldConfig::default()` without touching
    /// the filesystem.
    pub fn load(path: Option<&Path>) -> Result<WorldConfig> {
        let Some(path) = path else {
            return Ok(WorldConfig::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {} as TOML", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_falls_back_to_defaults() {
        let config = ConfigSource::load(None).unwrap();
        let default = WorldConfig::default();
        assert_eq!(config.tick_rate_hz, default.tick_rate_hz);
        assert_eq!(config.map_width_tiles, default.map_width_tiles);
    }

    #[test]
    fn overrides_in_the_file_take_effect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outpost.toml");
        std::fs::write(&path, "tick_rate_hz = 60\nmap_width_tiles = 200\n").unwrap();

        let config = ConfigSource::load(Some(&path)).unwrap();
        assert_eq!(config.tick_rate_hz, 60);
        assert_eq!(config.map_width_tiles, 200);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.toml");
        assert!(ConfigSource::load(Some(&path)).is_err());
    }
}
