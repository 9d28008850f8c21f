//! TOML Configuration File Support
//!
//! Centralized configuration for the poster pipeline, loaded from
//! `~/.config/poster-stormer/config.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [backend]
//! url = "http://127.0.0.1:8000/api"
//! credential = "..."
//!
//! [images]
//! model = "fal-ai/flux/dev"
//! image_size = "portrait_4_3"
//! num_images = 3
//! poll_interval_ms = 500
//!
//! [progress]
//! step = 10
//! ceiling = 90
//! tick_ms = 300
//! label_spacing_ms = 500
//!
//! [typing]
//! typing_ms = 100
//! pause_after_typing_ms = 1000
//! delay_between_sentences_ms = 1500
//!
//! [cache]
//! path = "/tmp/poster-stormer/local_state.json"
//! genre_ttl_secs = 86400
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::ImageServiceConfig;
use crate::cache::{default_store_path, DEFAULT_GENRE_TTL};
use crate::labels::DEFAULT_LABEL_SPACING;
use crate::pipeline::PipelineConfig;
use crate::progress::SimulatorConfig;
use crate::typing::TypingConfig;

/// Default prompt backend URL
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000/api";

/// Upper bound on images per run
pub const MAX_IMAGES: u8 = 4;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Backend section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendToml {
    /// Prompt backend base URL
    pub url: Option<String>,

    /// API credential
    pub credential: Option<String>,
}

/// Images section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesToml {
    /// Queue endpoint
    pub queue_url: Option<String>,

    /// Model path
    pub model: Option<String>,

    /// Aspect ratio preset
    pub image_size: Option<String>,

    /// Images per run
    pub num_images: Option<u8>,

    /// Status poll period in milliseconds
    pub poll_interval_ms: Option<u64>,
}

/// Progress section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressToml {
    /// Percent added per simulated tick
    pub step: Option<u8>,

    /// Highest simulated percent
    pub ceiling: Option<u8>,

    /// Simulated tick period in milliseconds
    pub tick_ms: Option<u64>,

    /// Spacing between staged labels in milliseconds
    pub label_spacing_ms: Option<u64>,
}

/// Typing section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingToml {
    /// Per-character delay in milliseconds
    pub typing_ms: Option<u64>,

    /// Hold after a full sentence in milliseconds
    pub pause_after_typing_ms: Option<u64>,

    /// Blank time between sentences in milliseconds
    pub delay_between_sentences_ms: Option<u64>,
}

/// Cache section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheToml {
    /// Local state file
    pub path: Option<PathBuf>,

    /// Genre cache freshness in seconds
    pub genre_ttl_secs: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PosterToml {
    /// Backend section
    pub backend: BackendToml,

    /// Images section
    pub images: ImagesToml,

    /// Progress section
    pub progress: ProgressToml,

    /// Typing section
    pub typing: TypingToml,

    /// Cache section
    pub cache: CacheToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Centralized configuration for the poster pipeline
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct PosterConfig {
    /// Prompt backend base URL
    pub backend_url: String,

    /// API credential shared by the prompt and image services
    pub credential: Option<String>,

    /// Image service settings
    pub images: ImageServiceConfig,

    /// Images requested per run
    pub num_images: u8,

    /// Progress simulator settings
    pub simulator: SimulatorConfig,

    /// Spacing between staged labels
    pub label_spacing: Duration,

    /// Typing animation settings
    pub typing: TypingConfig,

    /// Local state file (genre cache)
    pub cache_path: Option<PathBuf>,

    /// Genre cache freshness window
    pub genre_ttl: Duration,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            credential: None,
            images: ImageServiceConfig::default(),
            num_images: 3,
            simulator: SimulatorConfig::default(),
            label_spacing: DEFAULT_LABEL_SPACING,
            typing: TypingConfig::default(),
            cache_path: default_store_path(),
            genre_ttl: DEFAULT_GENRE_TTL,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl PosterConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Whether a credential is configured
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.credential
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    }

    /// Controller settings derived from this configuration
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            num_images: self.num_images,
            simulator: self.simulator,
            label_spacing: self.label_spacing,
            typing: self.typing.clone(),
        }
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

        if self.backend_url.trim().is_empty() {
            return invalid("backend url cannot be empty".to_string());
        }
        if !(1..=MAX_IMAGES).contains(&self.num_images) {
            return invalid(format!(
                "num_images must be between 1 and {MAX_IMAGES}, got {}",
                self.num_images
            ));
        }
        if self.simulator.step == 0 {
            return invalid("progress step must be greater than 0".to_string());
        }
        if self.simulator.ceiling > 100 {
            return invalid(format!(
                "progress ceiling must be at most 100, got {}",
                self.simulator.ceiling
            ));
        }

        let periods = [
            ("progress tick", self.simulator.tick),
            ("label spacing", self.label_spacing),
            ("image poll interval", self.images.poll_interval),
            ("typing interval", self.typing.typing),
            ("typing pause", self.typing.pause_after_typing),
            ("sentence delay", self.typing.delay_between_sentences),
        ];
        for (name, period) in periods {
            if period.is_zero() {
                return invalid(format!("{name} must be greater than 0"));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/poster-stormer/config.toml` or
/// `~/.config/poster-stormer/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("poster-stormer").join("config.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if the
/// merged values are out of range. A missing config file is not an error.
pub fn load_config() -> Result<PosterConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed, or
/// if the merged values are out of range.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<PosterConfig, ConfigError> {
    let mut config = PosterConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: PosterToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config)?;
    config.validate()?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut PosterConfig, toml: &PosterToml) {
    // Backend
    if let Some(ref url) = toml.backend.url {
        config.backend_url.clone_from(url);
    }
    if toml.backend.credential.is_some() {
        config.credential.clone_from(&toml.backend.credential);
    }

    // Images
    if let Some(ref url) = toml.images.queue_url {
        config.images.queue_url.clone_from(url);
    }
    if let Some(ref model) = toml.images.model {
        config.images.model.clone_from(model);
    }
    if let Some(ref size) = toml.images.image_size {
        config.images.image_size.clone_from(size);
    }
    if let Some(count) = toml.images.num_images {
        config.num_images = count;
    }
    if let Some(ms) = toml.images.poll_interval_ms {
        config.images.poll_interval = Duration::from_millis(ms);
    }

    // Progress
    if let Some(step) = toml.progress.step {
        config.simulator.step = step;
    }
    if let Some(ceiling) = toml.progress.ceiling {
        config.simulator.ceiling = ceiling;
    }
    if let Some(ms) = toml.progress.tick_ms {
        config.simulator.tick = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.progress.label_spacing_ms {
        config.label_spacing = Duration::from_millis(ms);
    }

    // Typing
    if let Some(ms) = toml.typing.typing_ms {
        config.typing.typing = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.typing.pause_after_typing_ms {
        config.typing.pause_after_typing = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.typing.delay_between_sentences_ms {
        config.typing.delay_between_sentences = Duration::from_millis(ms);
    }

    // Cache
    if toml.cache.path.is_some() {
        config.cache_path.clone_from(&toml.cache.path);
    }
    if let Some(secs) = toml.cache.genre_ttl_secs {
        config.genre_ttl = Duration::from_secs(secs);
    }
}

/// Apply environment variable overrides to the config
///
/// A `POSTER_NUM_IMAGES` that is not a number is an error, not a silent default.
fn apply_env_config(config: &mut PosterConfig) -> Result<(), ConfigError> {
    if let Ok(url) = std::env::var("BACKEND_URL") {
        if !url.trim().is_empty() {
            config.backend_url = url;
            config.source = ConfigSource::Env;
        }
    }
    if let Ok(credential) =
        std::env::var("API_CREDENTIAL").or_else(|_| std::env::var("FAL_KEY"))
    {
        config.credential = Some(credential);
        config.source = ConfigSource::Env;
    }
    if let Ok(model) = std::env::var("POSTER_IMAGE_MODEL") {
        config.images.model = model;
        config.source = ConfigSource::Env;
    }
    if let Ok(count) = std::env::var("POSTER_NUM_IMAGES") {
        config.num_images = count.trim().parse::<u8>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "POSTER_NUM_IMAGES must be a number, got {count:?}"
            ))
        })?;
        config.source = ConfigSource::Env;
    }
    Ok(())
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides,
/// then call [`PosterConfig::validate`] again.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Backend URL override
    pub backend_url: Option<String>,

    /// Credential override
    pub credential: Option<String>,

    /// Image count override
    pub num_images: Option<u8>,

    /// Cache path override
    pub cache_path: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set backend URL override
    #[must_use]
    pub fn with_backend_url(mut self, url: String) -> Self {
        self.backend_url = Some(url);
        self
    }

    /// Set credential override
    #[must_use]
    pub fn with_credential(mut self, credential: String) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Set image count override
    #[must_use]
    pub fn with_num_images(mut self, count: u8) -> Self {
        self.num_images = Some(count);
        self
    }

    /// Set cache path override
    #[must_use]
    pub fn with_cache_path(mut self, path: PathBuf) -> Self {
        self.cache_path = Some(path);
        self
    }

    /// Whether any override is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backend_url.is_none()
            && self.credential.is_none()
            && self.num_images.is_none()
            && self.cache_path.is_none()
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut PosterConfig) {
        if !self.is_empty() {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref url) = self.backend_url {
            config.backend_url.clone_from(url);
        }
        if self.credential.is_some() {
            config.credential.clone_from(&self.credential);
        }
        if let Some(count) = self.num_images {
            config.num_images = count;
        }
        if self.cache_path.is_some() {
            config.cache_path.clone_from(&self.cache_path);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
