//! Configuration management for guestbook.
//!
//! This module provides configuration loading and validation using figment.
//! There is no configuration file: values come from defaults, overridden by
//! `GUESTBOOK_`-prefixed environment variables.

use std::time::Duration;

use figment::{
    providers::{Env, Serialized},
    Figment,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "GUESTBOOK_";

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.apps.bmuconnect.id/api";

/// Path of the submission endpoint, relative to the base URL.
pub const SUBMIT_PATH: &str = "public/guestbook";

/// Largest accepted signature width or height, in display pixels.
pub const MAX_SIGNATURE_SIDE: u32 = 4096;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `GUESTBOOK_`, `__` between
///    section and key, e.g. `GUESTBOOK_API__BASE_URL`)
/// 2. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend API configuration.
    pub api: ApiConfig,
    /// Signature surface configuration.
    pub signature: SignatureConfig,
}

/// Backend API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL the submission path is joined onto.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Signature surface configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// Display width in CSS pixels.
    pub width: u32,
    /// Display height in CSS pixels.
    pub height: u32,
    /// Stroke width in CSS pixels.
    pub stroke_width: f32,
    /// Ink color, RGB.
    pub stroke_color: [u8; 3],
    /// Paper color, RGB.
    pub background_color: [u8; 3],
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            width: 480,
            height: 240,
            stroke_width: 2.5,
            stroke_color: [0x00, 0x00, 0x00],
            background_color: [0xff, 0xff, 0xff],
        }
    }
}

impl Config {
    /// Load configuration from defaults and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an override cannot be parsed or the result fails
    /// validation.
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    /// The figment used by [`Config::load`], exposed so callers can layer
    /// extra providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extract and validate a configuration from `figment`.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction or validation fails.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        self.endpoint()?;

        if self.api.timeout_secs == 0 {
            return Err(Error::config_validation(
                "timeout_secs must be greater than 0",
            ));
        }

        let (width, height) = (self.signature.width, self.signature.height);
        if width == 0 || height == 0 {
            return Err(Error::config_validation(format!(
                "signature size must be non-zero, got {width}x{height}"
            )));
        }
        if width > MAX_SIGNATURE_SIDE || height > MAX_SIGNATURE_SIDE {
            return Err(Error::config_validation(format!(
                "signature size must not exceed {MAX_SIGNATURE_SIDE}x{MAX_SIGNATURE_SIDE}, got {width}x{height}"
            )));
        }

        if !self.signature.stroke_width.is_finite() || self.signature.stroke_width <= 0.0 {
            return Err(Error::config_validation(format!(
                "stroke_width must be a positive number, got {}",
                self.signature.stroke_width
            )));
        }

        Ok(())
    }

    /// The absolute submission URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an absolute http(s) URL.
    pub fn endpoint(&self) -> Result<Url> {
        let mut base = self.api.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        let base = Url::parse(&base).map_err(|e| {
            Error::config_validation(format!("invalid base_url {:?}: {e}", self.api.base_url))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::config_validation(format!(
                "base_url must use http or https, got {}",
                base.scheme()
            )));
        }

        base.join(SUBMIT_PATH)
            .map_err(|e| Error::config_validation(format!("invalid submission URL: {e}")))
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}
