//! Reader configuration that front-ends can serialize/deserialize.
//!
//! A configuration document looks like:
//! ```yaml
//! store: "file:///data/points"
//! dimensions:
//!   X: "/points/x"
//!   Y: "/points/y"
//!   Intensity: "/points/intensity"
//! fallback_chunk_size: 1024
//! batch_size: 65536
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::SchemaMapping;

/// Elements per refill for columns stored without chunking metadata.
pub const DEFAULT_FALLBACK_CHUNK_SIZE: u64 = 1024;

/// Rows per batch for `read_all` style draining.
pub const DEFAULT_BATCH_SIZE: u64 = 65_536;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Store location: a bare path or a `file://` URI.
    #[serde(default)]
    pub store: Option<String>,

    /// Logical field name → physical column identifier.
    pub dimensions: SchemaMapping,

    /// Chunk size adopted for contiguous (unchunked) columns.
    #[serde(default = "default_fallback_chunk_size")]
    pub fallback_chunk_size: u64,

    /// Rows per batch when draining a stream into batches.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
}

fn default_fallback_chunk_size() -> u64 {
    DEFAULT_FALLBACK_CHUNK_SIZE
}

fn default_batch_size() -> u64 {
    DEFAULT_BATCH_SIZE
}

impl ReaderConfig {
    pub fn new(dimensions: SchemaMapping) -> Self {
        Self {
            store: None,
            dimensions,
            fallback_chunk_size: DEFAULT_FALLBACK_CHUNK_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_store(mut self, store: impl Into<String>) -> Self {
        self.store = Some(store.into());
        self
    }

    /// Parse a YAML (or JSON, which is valid YAML) configuration document.
    pub fn from_yaml_str(doc: &str) -> Result<Self> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(doc)?;
        // Route through JSON so the mapping goes through one validator.
        Self::from_json_value(serde_json::to_value(&yaml)?)
    }

    pub fn from_json_str(doc: &str) -> Result<Self> {
        Self::from_json_value(serde_json::from_str(doc)?)
    }

    fn from_json_value(json: serde_json::Value) -> Result<Self> {
        if !json.is_object() {
            return Err(Error::Config(
                "configuration document must be a mapping".into(),
            ));
        }
        let dims = json
            .get("dimensions")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        // Surface mapping problems with their own message before serde's.
        SchemaMapping::from_json_value(&dims)?;
        let cfg: ReaderConfig = serde_json::from_value(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fallback_chunk_size == 0 {
            return Err(Error::Config("fallback_chunk_size must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be > 0".into()));
        }
        Ok(())
    }

    /// Apply environment overrides on top of this configuration.
    ///
    /// Environment variables:
    /// - `COLSTREAM_STORE`: store location
    /// - `COLSTREAM_FALLBACK_CHUNK_SIZE`: fallback chunk size (elements)
    /// - `COLSTREAM_BATCH_SIZE`: rows per drained batch
    ///
    /// A size that is not a positive integer is ignored with a warning.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(s) = var("COLSTREAM_STORE") {
            self.store = Some(s);
        }

        if let Some(v) = size_override(&var, "COLSTREAM_FALLBACK_CHUNK_SIZE") {
            self.fallback_chunk_size = v;
        }

        if let Some(v) = size_override(&var, "COLSTREAM_BATCH_SIZE") {
            self.batch_size = v;
        }

        self
    }

    /// The configured store location, or a configuration error.
    pub fn store_location(&self) -> Result<&str> {
        self.store
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::Config("Required option 'store' was not set".into()))
    }
}

fn size_override(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = var(key)?;
    match raw.trim().parse::<u64>() {
        Ok(v) if v > 0 => Some(v),
        _ => {
            tracing::warn!(
                variable = key,
                value = %raw,
                "ignoring override: expected a positive integer"
            );
            None
        }
    }
}
