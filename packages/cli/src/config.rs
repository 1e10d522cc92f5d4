//! TOML configuration for the `covid_map` tool.
//!
//! Every key is optional. A missing file is the same as an empty one.
//!
//! ```toml
//! [decode]
//! max_marker_radius = 150.0
//!
//! [display]
//! default_metric = "casesPer100k"
//! show_text_labels = true
//! show_counties = true
//! retain_circle_size = true
//! circle_scale = 4000.0
//! ```

use std::path::{Path, PathBuf};

use covid_map_decoder::DecodeOptions;
use covid_map_decoder::composer::DEFAULT_MAX_MARKER_RADIUS;
use covid_map_metrics::MetricKey;
use covid_map_scene::SceneOptions;
use serde::Deserialize;
use thiserror::Error;

/// Errors loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub decode: DecodeConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Radius of the county marker with the most cases.
    pub max_marker_radius: f64,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_marker_radius: DEFAULT_MAX_MARKER_RADIUS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct DisplayConfig {
    /// Metric used when none is given on the command line.
    pub default_metric: MetricKey,
    pub show_text_labels: bool,
    pub show_counties: bool,
    pub retain_circle_size: bool,
    pub circle_scale: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let scene = SceneOptions::default();
        Self {
            default_metric: MetricKey::Cases,
            show_text_labels: scene.show_text_labels,
            show_counties: scene.show_counties,
            retain_circle_size: scene.retain_circle_size,
            circle_scale: scene.circle_scale,
        }
    }
}

impl Config {
    /// Loads `path`, falling back to defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses configuration text.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the text is not a valid configuration.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::de::from_str(text)
    }

    #[must_use]
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            max_marker_radius: self.decode.max_marker_radius,
            ..DecodeOptions::default()
        }
    }

    /// Scene options at the given zoom, relative to an initial zoom of 0.
    #[must_use]
    pub fn scene_options(&self, zoom: f64) -> SceneOptions {
        SceneOptions {
            show_text_labels: self.display.show_text_labels,
            show_counties: self.display.show_counties,
            retain_circle_size: self.display.retain_circle_size,
            circle_scale: self.display.circle_scale,
            zoom,
            ..SceneOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_default() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.display.default_metric, MetricKey::Cases);
        assert!((config.decode.max_marker_radius - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            [display]
            default_metric = "newCasesWeekPer100k"
            show_counties = false
            "#,
        )
        .unwrap();

        assert_eq!(config.display.default_metric, MetricKey::NewCasesWeekPer100k);
        assert!(!config.display.show_counties);
        assert!(config.display.show_text_labels);
        assert!((config.display.circle_scale - 4000.0).abs() < f64::EPSILON);
        assert_eq!(config.decode, DecodeConfig::default());
    }

    #[test]
    fn unknown_metric_is_rejected() {
        assert!(Config::parse("[display]\ndefault_metric = \"bogus\"\n").is_err());
    }

    #[test]
    fn options_carry_config_values() {
        let config = Config::parse(
            "[decode]\nmax_marker_radius = 80.0\n[display]\ncircle_scale = 100.0\nretain_circle_size = false\n",
        )
        .unwrap();

        assert!((config.decode_options().max_marker_radius - 80.0).abs() < f64::EPSILON);
        let scene = config.scene_options(2.0);
        assert!((scene.circle_scale - 100.0).abs() < f64::EPSILON);
        assert!(!scene.retain_circle_size);
        assert!((scene.zoom - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_file_is_default() {
        let config = Config::load(Path::new("definitely/not/here/covid_map.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
