//! Configuration types for ObjectIO
//!
//! This module defines the configuration of the unique identifier registry
//! and of the tools that drive it. Every field has a default, so an empty
//! TOML document is a valid configuration.

use crate::error::{Error, Result};
use crate::{UNIQUE_BITS, mask_for_bits};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identifier registry configuration
    pub unique: UniqueConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse a configuration from TOML text and validate it
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<()> {
        self.unique.validate()
    }
}

/// Identifier registry configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniqueConfig {
    /// Width of the identifier space in bits (1..=64)
    pub bits: u32,
    /// Rejected draws tolerated by bounded insertion before it reports
    /// exhaustion (`None` = retry forever)
    pub max_attempts: Option<u64>,
}

impl Default for UniqueConfig {
    fn default() -> Self {
        Self {
            bits: UNIQUE_BITS,
            max_attempts: None,
        }
    }
}

impl UniqueConfig {
    /// Configuration with a custom identifier width
    #[must_use]
    pub fn with_bits(bits: u32) -> Self {
        Self {
            bits,
            ..Self::default()
        }
    }

    /// Set the bounded-insertion attempt limit
    #[must_use]
    pub const fn max_attempts(mut self, attempts: u64) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Mask of valid identifier bits
    #[must_use]
    pub const fn mask(&self) -> u64 {
        mask_for_bits(self.bits)
    }

    /// Check the configuration for values the registry cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(1..=64).contains(&self.bits) {
            return Err(Error::configuration(format!(
                "unique.bits must be in 1..=64, got {}",
                self.bits
            )));
        }
        if self.max_attempts == Some(0) {
            return Err(Error::configuration(
                "unique.max_attempts must be positive when set",
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log filter when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UNIQUE_MASK;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.unique.bits, UNIQUE_BITS);
        assert_eq!(config.unique.mask(), UNIQUE_MASK);
        assert_eq!(config.unique.max_attempts, None);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            [unique]
            bits = 12
            max_attempts = 500

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.unique.bits, 12);
        assert_eq!(config.unique.mask(), 0xfff);
        assert_eq!(config.unique.max_attempts, Some(500));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_bits() {
        assert!(matches!(
            UniqueConfig::with_bits(0).validate(),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            UniqueConfig::with_bits(65).validate(),
            Err(Error::Configuration(_))
        ));
        assert!(UniqueConfig::with_bits(64).validate().is_ok());
        assert!(matches!(
            Config::from_toml_str("[unique]\nbits = 100\n"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_zero_max_attempts_rejected() {
        let config = UniqueConfig::default().max_attempts(0);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            Config::from_toml_str("[unique\nbits = 3"),
            Err(Error::Deserialization(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[unique]\nbits = 20").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.unique.bits, 20);

        assert!(matches!(
            Config::load(file.path().with_extension("missing")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip_keeps_limit() {
        let config = Config {
            unique: UniqueConfig::with_bits(16).max_attempts(64),
            logging: LoggingConfig::default(),
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), config);
    }
}
