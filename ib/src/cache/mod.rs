//! Content-addressed roadmap cache
//!
//! The cache is a pure memo: callers treat every error as a miss and every
//! failed write as a no-op.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

mod file;
mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

use crate::config::{CacheConfig, CacheKind};

const ROADMAP_KEY_PREFIX: &str = "ai:roadmap:";

/// Errors from a cache store
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cache entry: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Key/value store with per-entry expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a live value; expired entries are misses
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value for `ttl`, replacing any previous value
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// Cache that never stores anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

#[async_trait]
impl CacheStore for NullCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Lowercase hex SHA-256 of the given bytes
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Cache key for an idea: prefix plus the hash of its exact bytes
pub fn roadmap_cache_key(idea: &str) -> String {
    format!("{}{}", ROADMAP_KEY_PREFIX, sha256_hex(idea.as_bytes()))
}

/// Build the store selected by configuration
pub fn create_store(config: &CacheConfig) -> Arc<dyn CacheStore> {
    debug!(kind = ?config.kind, "create_store: called");
    match config.kind {
        CacheKind::Memory => Arc::new(MemoryCache::new()),
        CacheKind::File => Arc::new(FileCache::new(&config.dir)),
        CacheKind::None => Arc::new(NullCache),
    }
}
