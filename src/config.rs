//! Optional TOML configuration loading for the CLI (ambient, feature-gated
//! behind `config`).
//!
//! File discovery follows the same user-config convention as the pack's
//! `hooteconf`: an XDG config directory (via `directories`) holding
//! `tunescribe/config.toml`, overridden by a `./tunescribe.toml` in the
//! current directory if present.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Res;

/// User-tunable defaults for the CLI. Every field mirrors a stage parameter
/// documented in its own module; absence in the file keeps that stage's
/// built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub processing_rate_hz: Option<f32>,
    #[serde(default)]
    pub buffer_duration_s: Option<f32>,
    #[serde(default)]
    pub min_noise_power: Option<f32>,
    #[serde(default)]
    pub min_sound_duration_s: Option<f32>,
    #[serde(default)]
    pub bpm: Option<f32>,
}

/// Finds the first config file that exists: `./tunescribe.toml`, then the
/// user config directory's `tunescribe/config.toml`.
pub fn discover_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("tunescribe.toml");
    if local.exists() {
        return Some(local);
    }

    let user = directories::BaseDirs::new()?.config_dir().join("tunescribe").join("config.toml");
    user.exists().then_some(user)
}

/// Loads and parses a config file. Returns `Config::default()` if `path` is
/// `None` (no config found is not an error: every field has a stage-level
/// default).
pub fn load(path: Option<&Path>) -> Res<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_path_yields_defaults() {
        let config = load(None).unwrap();
        assert_eq!(config.bpm, None);
    }

    #[test]
    fn parses_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tunescribe.toml");
        std::fs::write(&path, "bpm = 90.0\nmin_noise_power = 0.02\n").unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.bpm, Some(90.0));
        assert_eq!(config.min_noise_power, Some(0.02));
        assert_eq!(config.buffer_duration_s, None);
    }
}
