//! Configuration management for `SlopeFinder`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::SlopeFinderError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for `SlopeFinder`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlopeFinderConfig {
    /// Filter defaults and thresholds
    #[serde(default)]
    pub filters: FilterConfig,
    /// Map camera and overlay settings
    #[serde(default)]
    pub map: MapConfig,
    /// Geocoding service configuration
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Filter defaults and thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Upper end of the price slider in dollars
    #[serde(default = "default_price_max")]
    pub price_max: f64,
    /// Minimum run percentage for a tier to count as offered
    #[serde(default = "default_difficulty_threshold")]
    pub difficulty_threshold: f64,
    /// Radius used when the distance filter is reset, in miles
    #[serde(default = "default_radius_miles")]
    pub default_radius_miles: f64,
}

/// Map camera and overlay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    /// Camera fly-to duration in milliseconds
    #[serde(default = "default_transition_ms")]
    pub transition_ms: u64,
    /// Camera padding in pixels applied to region transitions
    #[serde(default = "default_padding")]
    pub padding_px: u32,
    /// Number of points used to approximate the radius circle
    #[serde(default = "default_circle_steps")]
    pub circle_steps: usize,
    /// Delay before a briefly shown region panel is closed again, in milliseconds
    #[serde(default = "default_panel_dismiss_ms")]
    pub panel_dismiss_ms: u64,
}

/// Geocoding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Base URL of the Open-Meteo geocoding API
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_geocoding_timeout")]
    pub timeout_seconds: u32,
    /// Cache directory location
    #[serde(default = "default_cache_location")]
    pub cache_location: String,
    /// Cache TTL in hours
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_hours: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_price_max() -> f64 {
    400.0
}

fn default_difficulty_threshold() -> f64 {
    30.0
}

fn default_radius_miles() -> f64 {
    100.0
}

fn default_transition_ms() -> u64 {
    1500
}

fn default_padding() -> u32 {
    50
}

fn default_circle_steps() -> usize {
    64
}

fn default_panel_dismiss_ms() -> u64 {
    1500
}

fn default_geocoding_base_url() -> String {
    "https://geocoding-api.open-meteo.com/v1".to_string()
}

fn default_geocoding_timeout() -> u32 {
    10
}

fn default_cache_location() -> String {
    "~/.cache/slopefinder".to_string()
}

fn default_cache_ttl() -> u32 {
    24 * 7
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            price_max: default_price_max(),
            difficulty_threshold: default_difficulty_threshold(),
            default_radius_miles: default_radius_miles(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            transition_ms: default_transition_ms(),
            padding_px: default_padding(),
            circle_steps: default_circle_steps(),
            panel_dismiss_ms: default_panel_dismiss_ms(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            timeout_seconds: default_geocoding_timeout(),
            cache_location: default_cache_location(),
            cache_ttl_hours: default_cache_ttl(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl MapConfig {
    #[must_use]
    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }

    #[must_use]
    pub fn panel_dismiss_delay(&self) -> Duration {
        Duration::from_millis(self.panel_dismiss_ms)
    }
}

impl GeocodingConfig {
    /// Cache directory with a leading `~` expanded to the home directory
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        match self.cache_location.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(rest)),
            None => PathBuf::from(&self.cache_location),
        }
    }
}

impl SlopeFinderConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // SLOPEFINDER_MAP__TRANSITION_MS=800 style overrides
        builder = builder.add_source(
            Environment::with_prefix("SLOPEFINDER")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: SlopeFinderConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("slopefinder").join("config.toml"))
    }

    /// Apply default values to fields left empty or zeroed
    pub fn apply_defaults(&mut self) {
        if self.filters.price_max <= 0.0 {
            self.filters.price_max = default_price_max();
        }
        if self.filters.default_radius_miles <= 0.0 {
            self.filters.default_radius_miles = default_radius_miles();
        }
        if self.map.circle_steps == 0 {
            self.map.circle_steps = default_circle_steps();
        }
        if self.geocoding.base_url.is_empty() {
            self.geocoding.base_url = default_geocoding_base_url();
        }
        if self.geocoding.timeout_seconds == 0 {
            self.geocoding.timeout_seconds = default_geocoding_timeout();
        }
        if self.geocoding.cache_location.is_empty() {
            self.geocoding.cache_location = default_cache_location();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.filters.difficulty_threshold) {
            return Err(SlopeFinderError::config(
                "Difficulty threshold must be a percentage between 0 and 100",
            )
            .into());
        }

        if self.filters.price_max > 10_000.0 {
            return Err(SlopeFinderError::config("Price slider maximum cannot exceed 10000").into());
        }

        if self.map.circle_steps < 3 || self.map.circle_steps > 1024 {
            return Err(SlopeFinderError::config(
                "Radius circle steps must be between 3 and 1024",
            )
            .into());
        }

        if self.map.transition_ms > 10_000 {
            return Err(SlopeFinderError::config(
                "Camera transition cannot exceed 10000 ms",
            )
            .into());
        }

        if self.geocoding.timeout_seconds > 300 {
            return Err(SlopeFinderError::config(
                "Geocoding timeout cannot exceed 300 seconds",
            )
            .into());
        }

        if self.geocoding.cache_ttl_hours > 24 * 365 {
            return Err(SlopeFinderError::config("Cache TTL cannot exceed one year").into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(SlopeFinderError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(SlopeFinderError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.geocoding.base_url.starts_with("http://")
            && !self.geocoding.base_url.starts_with("https://")
        {
            return Err(SlopeFinderError::config(
                "Geocoding base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        Ok(())
    }
}
