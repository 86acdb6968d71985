//! Cascade configuration.

use std::path::Path;
use std::time::Duration;

use canopy_core::ValidationError;
use canopy_store::{ItemTreeProvider, TreeCache};
use serde::{Deserialize, Serialize};

/// Configuration shared by both cascades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CascadeConfig {
    /// Maximum per-item writes in flight.
    pub write_concurrency: usize,
    /// Request a cache refresh once a cascade has written.
    pub refresh_after_write: bool,
    /// Freshness window for a [`TreeCache`] snapshot. Zero always re-reads.
    pub cache_max_age_ms: u64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            write_concurrency: 5,
            refresh_after_write: true,
            cache_max_age_ms: 0,
        }
    }
}

impl CascadeConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ValidationError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::InvalidConfig(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.write_concurrency == 0 {
            return Err(ValidationError::InvalidConfig(
                "write_concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn cache_max_age(&self) -> Duration {
        Duration::from_millis(self.cache_max_age_ms)
    }

    /// Wrap `provider` in a cache coordinator using this freshness window.
    pub fn cached<P: ItemTreeProvider>(&self, provider: P) -> TreeCache<P> {
        TreeCache::new(provider, self.cache_max_age())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CascadeConfig::default();
        assert_eq!(config.write_concurrency, 5);
        assert!(config.refresh_after_write);
        assert_eq!(config.cache_max_age(), Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = CascadeConfig::from_json_str(r#"{ "write_concurrency": 2 }"#).unwrap();
        assert_eq!(config.write_concurrency, 2);
        assert!(config.refresh_after_write);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = CascadeConfig::from_json_str(r#"{ "write_concurrency": 0 }"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidConfig(_)));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(CascadeConfig::from_json_str(r#"{ "concurrency": 3 }"#).is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "write_concurrency": 8, "refresh_after_write": false, "cache_max_age_ms": 250 }}"#
        )
        .unwrap();

        let config = CascadeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.write_concurrency, 8);
        assert!(!config.refresh_after_write);
        assert_eq!(config.cache_max_age(), Duration::from_millis(250));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CascadeConfig::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidConfig(_)));
    }
}
