//! Pool configuration parameters.
//!
//! `PoolConfig` is an embeddable, serializable parameter struct with
//! runtime validation. There is no file or environment loading here; the
//! pool itself has no persisted state.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

/// Fixed-block pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = validate_footprint))]
pub struct PoolConfig {
    /// Size of each block in bytes.
    #[serde(default = "default_block_size")]
    #[validate(range(min = 1))]
    pub block_size: usize,

    /// Number of blocks pre-allocated at construction. Zero is legal and
    /// yields an immediately-exhausted pool.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_block_size() -> usize {
    64
}

fn default_capacity() -> usize {
    128
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
            capacity: default_capacity(),
        }
    }
}

impl PoolConfig {
    /// Validates the configuration, returning it on success.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }
}

/// Validate that the pool's total footprint is representable as a layout.
fn validate_footprint(config: &PoolConfig) -> Result<(), ValidationError> {
    let fits = config
        .block_size
        .checked_mul(config.capacity)
        .map_or(false, |total| total <= isize::MAX as usize);
    if fits {
        Ok(())
    } else {
        Err(ValidationError::new("footprint_overflow"))
    }
}

/// Unified configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation error.
    #[error("invalid pool configuration:\n{}", format_validation_errors(.0))]
    Validation(#[source] ValidationErrors),
}

fn format_validation_errors(errors: &ValidationErrors) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    for (field, errors) in errors.field_errors() {
        let _ = writeln!(output, "Field '{}':", field);
        for error in errors {
            let message = match &error.message {
                Some(msg) => msg.to_string(),
                None => error.code.to_string(),
            };
            let _ = writeln!(output, "  - {}", message);
        }
    }
    output
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PoolConfig::default().validated().unwrap();
        assert_eq!(config.block_size, 64);
        assert_eq!(config.capacity, 128);
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let config = PoolConfig {
            block_size: 0,
            capacity: 4,
        };
        assert!(config.validated().is_err());
    }

    #[test]
    fn zero_capacity_is_accepted() {
        let config = PoolConfig {
            block_size: 64,
            capacity: 0,
        };
        assert!(config.validated().is_ok());
    }

    #[test]
    fn overflowing_footprint_is_rejected() {
        let config = PoolConfig {
            block_size: usize::MAX / 2,
            capacity: 3,
        };
        assert!(config.validated().is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: PoolConfig = serde_yaml::from_str("block_size: 256\n").unwrap();
        assert_eq!(config.block_size, 256);
        assert_eq!(config.capacity, 128);
    }

    #[test]
    fn config_roundtrips_through_serde() {
        let config = PoolConfig {
            block_size: 32,
            capacity: 16,
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: PoolConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
