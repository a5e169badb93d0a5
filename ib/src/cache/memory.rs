//! Process-local cache store

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{CacheError, CacheStore};

/// Size at which `set` sweeps out expired entries
const SWEEP_THRESHOLD: usize = 256;

/// `None` never expires
type Expiry = Option<Instant>;

fn is_live(expires_at: Expiry, now: Instant) -> bool {
    expires_at.is_none_or(|at| now < at)
}

/// In-memory map with per-entry expiry
///
/// Expired entries are evicted when read, and swept on write once the map
/// reaches `SWEEP_THRESHOLD` entries.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Expiry, String)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, live or not yet evicted
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((expires_at, value)) if is_live(*expires_at, Instant::now()) => Ok(Some(value.clone())),
            Some(_) => {
                debug!(%key, "MemoryCache::get: expired, evicting");
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if entries.len() >= SWEEP_THRESHOLD {
            let before = entries.len();
            entries.retain(|_, (expires_at, _)| is_live(*expires_at, now));
            debug!(swept = before - entries.len(), "MemoryCache::set: swept expired entries");
        }
        entries.insert(key.to_string(), (now.checked_add(ttl), value.to_string()));
        Ok(())
    }
}
