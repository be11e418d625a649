//! Pool configuration

use std::path::Path;

use ark_ff::Zero;
use serde::{Deserialize, Serialize};

use crate::crypto::field::decimal;
use crate::crypto::Field;
use crate::error::{PoolError, PoolResult};
use crate::merkle::MAX_SUPPORTED_DEPTH;

/// Pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Accumulator depth bound; proofs carry this many siblings
    pub max_depth: usize,

    /// Inputs and outputs per spend (K)
    pub arity: usize,

    /// Pool domain, published as a public signal
    #[serde(with = "decimal")]
    pub scope: Field,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            arity: 2,
            scope: Field::zero(),
        }
    }
}

impl PoolConfig {
    /// Parse and validate a JSON config; missing fields take their defaults
    pub fn from_json_str(json: &str) -> PoolResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PoolError::Serialization(format!("invalid pool config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> PoolResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            PoolError::Serialization(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> PoolResult<()> {
        if self.max_depth == 0 || self.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(PoolError::InvalidInput(format!(
                "max_depth must be in 1..={}, got {}",
                MAX_SUPPORTED_DEPTH, self.max_depth
            )));
        }
        if self.arity == 0 {
            return Err(PoolError::InvalidInput("arity must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.max_depth, 32);
        assert_eq!(config.arity, 2);
        assert_eq!(config.scope, Field::zero());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = PoolConfig::from_json_str(r#"{"max_depth": 20, "scope": "12345"}"#).unwrap();
        assert_eq!(config.max_depth, 20);
        assert_eq!(config.arity, 2);
        assert_eq!(config.scope, Field::from(12345u64));
    }

    #[test]
    fn test_validation() {
        assert!(PoolConfig::from_json_str(r#"{"max_depth": 0}"#).is_err());
        assert!(PoolConfig::from_json_str(r#"{"max_depth": 33}"#).is_err());
        assert!(PoolConfig::from_json_str(r#"{"arity": 0}"#).is_err());
        assert!(PoolConfig::from_json_str(r#"{"scope": "abc"}"#).is_err());
        assert!(PoolConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_depth": 16, "arity": 3}}"#).unwrap();

        let config = PoolConfig::from_path(file.path()).unwrap();
        assert_eq!(config.max_depth, 16);
        assert_eq!(config.arity, 3);

        assert!(PoolConfig::from_path("/nonexistent/pool.json").is_err());
    }
}
