//! Indexer configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use metaboard_store::{IdScheme, StoreConfig};

use crate::error::{IndexerError, Result};

/// What to do with events that produce no decoded content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NonContentPolicy {
    /// Persist a bare Meta with provenance and the raw payload.
    #[default]
    ProvenanceOnly,
    /// Persist nothing; only the board counter advances.
    Skip,
}

/// Configuration for the [`Indexer`](crate::Indexer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Handling of events without content.
    pub non_content: NonContentPolicy,
    /// Store settings, used when the indexer opens its own store.
    pub store: StoreConfig,
    /// SQLite database path. `None` opens an in-memory database.
    pub database_path: Option<PathBuf>,
    /// Upper bound on one origin hash call, in milliseconds.
    pub hash_timeout_ms: Option<u64>,
    /// How many raw payload bytes to include in warnings.
    pub log_payload_bytes: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            non_content: NonContentPolicy::default(),
            store: StoreConfig::default(),
            database_path: None,
            hash_timeout_ms: Some(5_000),
            log_payload_bytes: 128,
        }
    }
}

impl IndexerConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate(config.store.id_scheme)?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn hash_timeout(&self) -> Option<Duration> {
        self.hash_timeout_ms.map(Duration::from_millis)
    }

    /// Check this configuration against the scheme of the store it will drive.
    ///
    /// Skipping non-content events under sequence ids would leave gaps in
    /// `0..sequence_counter`.
    pub fn validate(&self, scheme: IdScheme) -> Result<()> {
        if self.non_content == NonContentPolicy::Skip && scheme == IdScheme::Sequence {
            return Err(IndexerError::Config(
                "non_content = skip cannot be used with the sequence id scheme".into(),
            ));
        }
        if self.hash_timeout_ms == Some(0) {
            return Err(IndexerError::Config("hash_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}
