//! C6 — TextRef Cache
//!
//! SHA-256-keyed LRU with optional TTL and single-flight coalescing of
//! concurrent misses for the same key.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::{FutureExt, Shared};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::types::{TextRefError, ToIpaOutput};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_size: usize,
    pub ttl_seconds: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            ttl_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub max_size: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Entry {
    result: ToIpaOutput,
    created_at: Instant,
}

type ComputeResult = Result<ToIpaOutput, Arc<TextRefError>>;
type InFlight = Shared<Pin<Box<dyn Future<Output = ComputeResult> + Send>>>;

/// LRU eviction order is tracked by insertion order in a `Vec` of keys;
/// for the sizes this cache is specified at (hundreds to low thousands of
/// entries), this keeps the implementation simple without pulling in an
/// external LRU crate the teacher doesn't already carry.
pub struct TextRefCache {
    config: CacheConfig,
    entries: Mutex<HashMap<String, Entry>>,
    order: Mutex<Vec<String>>,
    in_flight: Mutex<HashMap<String, InFlight>>,
    stats: Mutex<CacheStats>,
}

impl TextRefCache {
    pub fn new(config: CacheConfig) -> Self {
        let max_size = config.max_size;
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
            order: Mutex::new(Vec::new()),
            in_flight: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats {
                max_size,
                ..Default::default()
            }),
        }
    }

    /// `sha256(provider || ':' || lang || ':' || text)[:32]`.
    fn make_key(text: &str, lang: &str, provider: &str) -> String {
        let raw = format!("{provider}:{lang}:{text}");
        let digest = Sha256::digest(raw.as_bytes());
        let hex = hex_encode(&digest);
        hex[..32].to_string()
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        match self.config.ttl_seconds {
            None => false,
            Some(ttl) => entry.created_at.elapsed() > Duration::from_secs(ttl),
        }
    }

    pub async fn get(&self, text: &str, lang: &str, provider: &str) -> Option<ToIpaOutput> {
        let key = Self::make_key(text, lang, provider);
        let mut entries = self.entries.lock().await;

        let expired = match entries.get(&key) {
            Some(entry) => self.is_expired(entry),
            None => {
                self.stats.lock().await.misses += 1;
                return None;
            }
        };

        if expired {
            entries.remove(&key);
            drop(entries);
            self.remove_from_order(&key).await;
            self.stats.lock().await.misses += 1;
            return None;
        }

        let hit = entries.get(&key).map(|e| e.result.clone());
        drop(entries);

        self.touch(&key).await;
        self.stats.lock().await.hits += 1;
        hit
    }

    pub async fn set(&self, text: &str, lang: &str, provider: &str, result: ToIpaOutput) {
        let key = Self::make_key(text, lang, provider);
        let mut entries = self.entries.lock().await;

        let is_new = !entries.contains_key(&key);
        entries.insert(
            key.clone(),
            Entry {
                result,
                created_at: Instant::now(),
            },
        );
        drop(entries);

        self.touch(&key).await;

        if is_new {
            let mut stats = self.stats.lock().await;
            stats.size += 1;
            let over_capacity = stats.size > self.config.max_size;
            drop(stats);
            if over_capacity {
                self.evict_oldest().await;
            }
        }
    }

    async fn touch(&self, key: &str) {
        let mut order = self.order.lock().await;
        order.retain(|k| k != key);
        order.push(key.to_string());
    }

    async fn remove_from_order(&self, key: &str) {
        let mut order = self.order.lock().await;
        order.retain(|k| k != key);
    }

    /// `set` calls this at most once per insert (size only ever grows by
    /// one entry per call), so evicting a single oldest key is sufficient.
    async fn evict_oldest(&self) {
        let mut order = self.order.lock().await;
        if order.is_empty() {
            return;
        }
        let oldest = order.remove(0);
        drop(order);

        self.entries.lock().await.remove(&oldest);
        {
            let mut stats = self.stats.lock().await;
            stats.size = stats.size.saturating_sub(1);
        }
        debug!(key = %oldest, "evicted LRU entry");
    }

    /// On miss, coalesces concurrent callers with the same key into one
    /// `compute` invocation via a `Shared` future. The in-flight entry is
    /// removed whether `compute` succeeds or fails, so a failure is never
    /// cached and the next caller retries cleanly.
    pub async fn get_or_compute<F, Fut>(
        &self,
        text: &str,
        lang: &str,
        provider: &str,
        compute: F,
    ) -> Result<ToIpaOutput, TextRefError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ToIpaOutput, TextRefError>> + Send + 'static,
    {
        if let Some(cached) = self.get(text, lang, provider).await {
            return Ok(cached);
        }

        let key = Self::make_key(text, lang, provider);

        let shared = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(existing) = in_flight.get(&key) {
                debug!(key = %key, "coalescing into in-flight compute");
                existing.clone()
            } else {
                let fut: Pin<Box<dyn Future<Output = ComputeResult> + Send>> =
                    Box::pin(async move { compute().await.map_err(Arc::new) });
                let shared = fut.shared();
                in_flight.insert(key.clone(), shared.clone());
                shared
            }
        };

        let result = shared.await;

        self.in_flight.lock().await.remove(&key);

        match result {
            Ok(output) => {
                self.set(text, lang, provider, output.clone()).await;
                Ok(output)
            }
            Err(err) => {
                warn!(key = %key, error = %err, "textref compute failed, not caching");
                Err(TextRefError::G2pFailed {
                    message: err.to_string(),
                })
            }
        }
    }

    pub async fn invalidate(&self, text: &str, lang: &str, provider: &str) -> bool {
        let key = Self::make_key(text, lang, provider);
        let mut entries = self.entries.lock().await;
        let existed = entries.remove(&key).is_some();
        drop(entries);
        if existed {
            self.remove_from_order(&key).await;
            let mut stats = self.stats.lock().await;
            stats.size = stats.size.saturating_sub(1);
        }
        existed
    }

    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let count = entries.len();
        entries.clear();
        drop(entries);
        self.order.lock().await.clear();
        let mut stats = self.stats.lock().await;
        stats.size = 0;
        count
    }

    pub async fn stats(&self) -> CacheStats {
        let size = self.entries.lock().await.len();
        let mut stats = self.stats.lock().await;
        stats.size = size;
        stats.clone()
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
