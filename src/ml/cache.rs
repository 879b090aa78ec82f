use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::CacheSettings;

/// Build the cache key for a model/feature pair.
///
/// Object keys are sorted recursively before serializing, so two logically
/// identical feature sets always map to the same key regardless of field order.
pub fn cache_key<F: Serialize + ?Sized>(model_name: &str, features: &F) -> serde_json::Result<String> {
    let canonical = canonicalize(serde_json::to_value(features)?);
    Ok(format!("{}:{}", model_name, serde_json::to_string(&canonical)?))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<(String, Value)> = map.into_iter().collect();
            fields.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, field) in fields {
                sorted.insert(key, canonicalize(field));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
    /// Insertion order, breaks ties between entries stored at the same instant
    seq: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) > self.ttl
    }
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    next_seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// Bounded TTL cache for prediction results.
///
/// When a new key arrives at capacity the oldest 10% of entries *by insertion
/// time* are evicted. This is FIFO, not LRU: reading an entry does not
/// protect it from eviction.
pub struct ResultCache<V> {
    state: Mutex<CacheState<V>>,
    max_size: usize,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone + Send> ResultCache<V> {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                next_seq: 0,
            }),
            max_size: settings.max_size.max(1),
            default_ttl: settings.default_ttl(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Cached value, if present and not older than its TTL. Expired entries
    /// are removed on the way out.
    pub async fn get<F: Serialize + ?Sized>(&self, model_name: &str, features: &F) -> Option<V> {
        let key = match cache_key(model_name, features) {
            Ok(key) => key,
            Err(e) => {
                warn!(model = %model_name, error = %e, "Cache key derivation failed, treating as miss");
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        let mut state = self.state.lock().await;
        let now = Instant::now();

        let expired = match state.entries.get(&key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if expired {
            state.entries.remove(&key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(model = %model_name, "Cache entry expired");
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        state.entries.get(&key).map(|entry| entry.value.clone())
    }

    /// Store a value under the model/feature key. `ttl` falls back to the
    /// cache's default.
    pub async fn set<F: Serialize + ?Sized>(
        &self,
        model_name: &str,
        features: &F,
        value: V,
        ttl: Option<Duration>,
    ) {
        let key = match cache_key(model_name, features) {
            Ok(key) => key,
            Err(e) => {
                warn!(model = %model_name, error = %e, "Cache key derivation failed, not caching");
                return;
            }
        };

        let mut state = self.state.lock().await;

        if !state.entries.contains_key(&key) && state.entries.len() >= self.max_size {
            let evicted = evict_oldest(&mut state.entries);
            debug!(evicted, size = state.entries.len(), "Cache full, evicted oldest entries");
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl: ttl.unwrap_or(self.default_ttl),
                seq,
            },
        );
    }

    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        let dropped = state.entries.len();
        state.entries.clear();
        debug!(dropped, "Cache cleared");
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> CacheStats {
        let size = self.len().await;
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        CacheStats {
            size,
            max_size: self.max_size,
            hits,
            misses,
            hit_rate: if lookups == 0 { 0.0 } else { hits as f64 / lookups as f64 },
        }
    }
}

/// Remove the oldest ceil(10%) of entries by insertion time
fn evict_oldest<V>(entries: &mut HashMap<String, CacheEntry<V>>) -> usize {
    let mut by_age: Vec<(Instant, u64, String)> = entries
        .iter()
        .map(|(key, entry)| (entry.stored_at, entry.seq, key.clone()))
        .collect();
    by_age.sort();

    let to_remove = (entries.len() + 9) / 10;
    for (_, _, key) in by_age.into_iter().take(to_remove) {
        entries.remove(&key);
    }
    to_remove
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache(max_size: usize) -> ResultCache<u32> {
        ResultCache::new(&CacheSettings {
            max_size,
            default_ttl_secs: 3600,
        })
    }

    #[test]
    fn test_key_ignores_field_order() {
        let a = json!({ "income": 60000, "loanAmount": 50000, "nested": { "b": 1, "a": 2 } });
        let b = json!({ "nested": { "a": 2, "b": 1 }, "loanAmount": 50000, "income": 60000 });
        assert_eq!(cache_key("loan-predictor", &a).unwrap(), cache_key("loan-predictor", &b).unwrap());
    }

    #[test]
    fn test_key_depends_on_model_and_values() {
        let a = json!({ "income": 60000 });
        let b = json!({ "income": 60001 });
        assert_ne!(cache_key("m", &a).unwrap(), cache_key("m", &b).unwrap());
        assert_ne!(cache_key("m", &a).unwrap(), cache_key("n", &a).unwrap());
        assert!(cache_key("m", &a).unwrap().starts_with("m:"));
    }

    #[tokio::test]
    async fn test_get_after_set() {
        let cache = cache(10);
        cache.set("m", &json!({ "x": 1 }), 7, None).await;

        assert_eq!(cache.get("m", &json!({ "x": 1 })).await, Some(7));
        assert_eq!(cache.get("m", &json!({ "x": 2 })).await, None);
        assert_eq!(cache.get("other", &json!({ "x": 1 })).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = cache(10);
        let features = json!({ "x": 1 });
        cache.set("m", &features, 1, Some(Duration::from_secs(60))).await;

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(cache.get("m", &features).await, Some(1));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("m", &features).await, None);
        // Removed lazily on the expired read
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_applies() {
        let cache = ResultCache::new(&CacheSettings {
            max_size: 10,
            default_ttl_secs: 5,
        });
        cache.set("m", &json!({ "x": 1 }), 1u32, None).await;

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.get("m", &json!({ "x": 1 })).await, None);
    }

    #[tokio::test]
    async fn test_capacity_never_exceeded() {
        let cache = cache(20);
        for i in 0..100u32 {
            cache.set("m", &json!({ "i": i }), i, None).await;
            assert!(cache.len().await <= 20);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_drops_oldest_inserted_even_if_read() {
        let cache = cache(10);
        for i in 0..10u32 {
            cache.set("m", &json!({ "i": i }), i, None).await;
            tokio::time::advance(Duration::from_millis(1)).await;
        }

        // Frequent reads give no protection
        for _ in 0..5 {
            assert_eq!(cache.get("m", &json!({ "i": 0 })).await, Some(0));
        }

        cache.set("m", &json!({ "i": 10 }), 10, None).await;

        assert_eq!(cache.len().await, 10);
        assert_eq!(cache.get("m", &json!({ "i": 0 })).await, None);
        assert_eq!(cache.get("m", &json!({ "i": 1 })).await, Some(1));
        assert_eq!(cache.get("m", &json!({ "i": 10 })).await, Some(10));
    }

    #[tokio::test]
    async fn test_eviction_uses_insertion_order_within_same_instant() {
        let cache = cache(20);
        for i in 0..20u32 {
            cache.set("m", &json!({ "i": i }), i, None).await;
        }
        cache.set("m", &json!({ "i": 20 }), 20, None).await;

        // ceil(20 * 10%) = 2 oldest gone
        assert_eq!(cache.get("m", &json!({ "i": 0 })).await, None);
        assert_eq!(cache.get("m", &json!({ "i": 1 })).await, None);
        assert_eq!(cache.get("m", &json!({ "i": 2 })).await, Some(2));
        assert_eq!(cache.len().await, 19);
    }

    #[tokio::test]
    async fn test_overwrite_at_capacity_does_not_evict() {
        let cache = cache(3);
        for i in 0..3u32 {
            cache.set("m", &json!({ "i": i }), i, None).await;
        }
        cache.set("m", &json!({ "i": 1 }), 100, None).await;

        assert_eq!(cache.len().await, 3);
        assert_eq!(cache.get("m", &json!({ "i": 0 })).await, Some(0));
        assert_eq!(cache.get("m", &json!({ "i": 1 })).await, Some(100));
    }

    #[tokio::test]
    async fn test_clear_and_stats() {
        let cache = cache(10);
        cache.set("m", &json!({ "x": 1 }), 1, None).await;
        assert_eq!(cache.get("m", &json!({ "x": 1 })).await, Some(1));
        assert_eq!(cache.get("m", &json!({ "x": 2 })).await, None);

        let stats = cache.stats().await;
        assert_eq!(stats.size, 1);
        assert_eq!(stats.max_size, 10);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 0.5);

        cache.clear().await;
        assert!(cache.is_empty().await);
        assert_eq!(cache.get("m", &json!({ "x": 1 })).await, None);
    }
}
