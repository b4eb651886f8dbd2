use std::path::Path;

use blobdoc_index::IndexConfig;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Store-wide configuration, loadable from TOML:
///
/// ```toml
/// encrypt_at_rest = true
///
/// [index]
/// maintenance_workers = 4
/// fanout_parallelism = 8
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Request server-side encryption for every blob the store writes.
    pub encrypt_at_rest: bool,
    pub index: IndexConfig,
}

impl StoreConfig {
    pub fn from_toml_str(raw: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> StoreResult<()> {
        self.index.validate()?;
        Ok(())
    }

    /// See [`IndexConfig::max_backend_concurrency`]; the store's own document
    /// reads and writes run on the caller's task and are not counted.
    pub fn max_backend_concurrency(&self) -> usize {
        self.index.max_backend_concurrency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert!(!c.encrypt_at_rest);
        assert_eq!(c.index, IndexConfig::default());
        c.validate().unwrap();
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let c = StoreConfig::from_toml_str(
            r#"
            encrypt_at_rest = true

            [index]
            maintenance_workers = 4
            "#,
        )
        .unwrap();
        assert!(c.encrypt_at_rest);
        assert_eq!(c.index.maintenance_workers, 4);
        assert_eq!(c.index.fanout_parallelism, 10);
        assert_eq!(c.index.namespace, "::db::");
        assert_eq!(c.max_backend_concurrency(), 14);
    }

    #[test]
    fn invalid_values_rejected() {
        let err = StoreConfig::from_toml_str("[index]\nmaintenance_workers = 0\n").unwrap_err();
        assert!(matches!(err, StoreError::Index(_)));
        let err = StoreConfig::from_toml_str("encrypt_at_rest = \"yes\"").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blobdoc.toml");
        std::fs::write(&path, "[index]\nnamespace = \"_sys\"\n").unwrap();
        assert_eq!(StoreConfig::load(&path).unwrap().index.namespace, "_sys");
    }
}
