//! Configuration management for intentbox
//!
//! Settings are layered from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use intentbox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Sniffing {} per resource", config.sniff.max_bytes);
//! ```
//!
//! # Environment Variables
//!
//! Scalars can be overridden with `INTENTBOX__<section>__<key>`:
//! - `INTENTBOX__FETCH__MAX_RETRIES=5`
//! - `INTENTBOX__SNIFF__MAX_BYTES=8KB`
//! - `INTENTBOX__EXECUTION__HANDLER_TIMEOUT_MS=30000`
//!
//! # Configuration File
//!
//! By default the file is `config/intentbox.toml`; set `INTENTBOX_CONFIG`
//! to point elsewhere. Locators, filters and handler options are declared
//! there as lists of records:
//!
//! ```toml
//! [[locators]]
//! name = "catalog"
//! kind = "prefix"
//! priority = 10
//! prefix = "catalog:"
//! replacement = "https://catalog.example.org/"
//!
//! [[filters]]
//! name = "kml"
//! priority = 10
//! content_types = ["application/vnd.google-earth.kml+xml"]
//! handler = "layer"
//! ```

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{
    Config, ExecutionConfig, FetchConfig, FilterConfig, HandlerConfig, LocatorConfig,
    LocatorKind, ResolverKind, SniffConfig,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }

    /// Options block for `handler`, or `Null` when none is configured
    pub fn handler_options(&self, handler: &str) -> serde_json::Value {
        self.handlers
            .get(handler)
            .map(|h| h.options.clone())
            .unwrap_or(serde_json::Value::Null)
    }
}
