//! Versioned cache layer.
//!
//! Every cache entry in the engine lives under a `{prefix}:{version}:{key}`
//! namespace assembled by [`VersionedCache`]. Bumping `cache.version` in the
//! configuration is a zero-downtime invalidation: new reads miss the old
//! namespace and stale keys expire naturally by TTL. Callers never assemble
//! keys themselves and never use a [`CacheClient`] directly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Raw key/value cache transport.
///
/// Implementations store opaque strings with an optional TTL. The engine
/// only uses this through [`VersionedCache`], which owns key assembly.
pub trait CacheClient: Send + Sync {
    /// Returns the raw value for a key, or `None` on miss/expiry.
    fn get_raw(&self, key: &str) -> Option<String>;
    /// Upserts a raw value with an optional TTL.
    fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>);
    /// Deletes an exact key; returns true if it existed.
    fn delete_raw(&self, key: &str) -> bool;
    /// Best-effort prefix delete; returns the number of keys removed.
    ///
    /// Implementations must not block on this; a partial delete is
    /// acceptable because versioned keys expire by TTL anyway.
    fn delete_prefix_raw(&self, prefix: &str) -> usize;
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Process-local in-memory cache client.
///
/// Used in tests and single-process deployments; production deployments
/// substitute a client backed by a shared cache service.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheClient for InMemoryCache {
    fn get_raw(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    fn set_raw(&self, key: &str, value: String, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .lock()
            .insert(key.to_string(), Entry { value, expires_at });
    }

    fn delete_raw(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    fn delete_prefix_raw(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock();
        let keys: Vec<String> = entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in &keys {
            entries.remove(key);
        }
        keys.len()
    }
}

/// Namespaced, versioned cache used by every cached value in the engine.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use worktime_engine::cache::{InMemoryCache, VersionedCache};
///
/// let cache = VersionedCache::new(Arc::new(InMemoryCache::new()), 1);
/// cache.set("greeting", &"hello".to_string(), None);
/// assert_eq!(cache.get::<String>("greeting"), Some("hello".to_string()));
///
/// // A new version sees none of the old keys.
/// let bumped = VersionedCache::new(cache.client(), 2);
/// assert_eq!(bumped.get::<String>("greeting"), None);
/// ```
pub struct VersionedCache {
    client: Arc<dyn CacheClient>,
    version: u32,
}

/// Application prefix for every engine cache key.
const APP_PREFIX: &str = "worktime";

impl VersionedCache {
    /// Creates a cache wrapper for the given client and version.
    ///
    /// The version comes from configuration at startup; changing it
    /// requires a process restart.
    pub fn new(client: Arc<dyn CacheClient>, version: u32) -> Self {
        Self { client, version }
    }

    /// The configured version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The underlying client, for constructing a wrapper at another
    /// version (tests) or sharing the client across wrappers.
    pub fn client(&self) -> Arc<dyn CacheClient> {
        Arc::clone(&self.client)
    }

    fn full_key(&self, key: &str) -> String {
        format!("{APP_PREFIX}:{}:{key}", self.version)
    }

    /// Fetches and deserializes a value; any parse failure self-heals to
    /// a miss and drops the corrupt entry.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full = self.full_key(key);
        let raw = self.client.get_raw(&full)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(key = %full, error = %err, "dropping undeserializable cache entry");
                self.client.delete_raw(&full);
                None
            }
        }
    }

    /// Serializes and upserts a value with an optional TTL.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        match serde_json::to_string(value) {
            Ok(raw) => self.client.set_raw(&self.full_key(key), raw, ttl),
            Err(err) => debug!(key, error = %err, "failed to serialize cache value"),
        }
    }

    /// Deletes an exact key; returns true if it existed.
    pub fn delete(&self, key: &str) -> bool {
        self.client.delete_raw(&self.full_key(key))
    }

    /// Best-effort delete of every key under a logical prefix.
    pub fn delete_prefix(&self, key_prefix: &str) -> usize {
        self.client.delete_prefix_raw(&self.full_key(key_prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versioned(version: u32) -> VersionedCache {
        VersionedCache::new(Arc::new(InMemoryCache::new()), version)
    }

    #[test]
    fn test_set_get_round_trip() {
        let cache = versioned(1);
        cache.set("answer", &42u32, None);
        assert_eq!(cache.get::<u32>("answer"), Some(42));
    }

    #[test]
    fn test_miss_on_absent_key() {
        let cache = versioned(1);
        assert_eq!(cache.get::<u32>("absent"), None);
    }

    /// VC-001: version bump invalidates all old-version entries
    #[test]
    fn test_version_bump_invalidates() {
        let cache = versioned(1);
        cache.set("holidays:2025", &vec!["passover".to_string()], None);

        let bumped = VersionedCache::new(cache.client(), 2);
        assert_eq!(bumped.get::<Vec<String>>("holidays:2025"), None);

        // The old version still sees its own entry until TTL expiry.
        assert!(cache.get::<Vec<String>>("holidays:2025").is_some());
    }

    /// VC-002: parse failure self-heals to a miss
    #[test]
    fn test_undeserializable_entry_self_heals() {
        let client: Arc<dyn CacheClient> = Arc::new(InMemoryCache::new());
        let cache = VersionedCache::new(Arc::clone(&client), 1);
        client.set_raw("worktime:1:corrupt", "{not json".to_string(), None);

        assert_eq!(cache.get::<u32>("corrupt"), None);
        // The corrupt entry was dropped, not left to fail again.
        assert_eq!(client.get_raw("worktime:1:corrupt"), None);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = versioned(1);
        cache.set("ephemeral", &1u32, Some(Duration::ZERO));
        assert_eq!(cache.get::<u32>("ephemeral"), None);
    }

    #[test]
    fn test_entry_without_ttl_does_not_expire() {
        let cache = versioned(1);
        cache.set("stable", &1u32, None);
        assert_eq!(cache.get::<u32>("stable"), Some(1));
    }

    #[test]
    fn test_delete_exact_key() {
        let cache = versioned(1);
        cache.set("gone", &1u32, None);
        assert!(cache.delete("gone"));
        assert!(!cache.delete("gone"));
        assert_eq!(cache.get::<u32>("gone"), None);
    }

    #[test]
    fn test_delete_prefix_removes_matching_keys() {
        let cache = versioned(1);
        cache.set("monthly_summary:a:2025:3", &1u32, None);
        cache.set("monthly_summary:b:2025:3", &2u32, None);
        cache.set("holidays:2025", &3u32, None);

        let removed = cache.delete_prefix("monthly_summary:");
        assert_eq!(removed, 2);
        assert_eq!(cache.get::<u32>("holidays:2025"), Some(3));
    }

    #[test]
    fn test_key_namespace_format() {
        let client: Arc<dyn CacheClient> = Arc::new(InMemoryCache::new());
        let cache = VersionedCache::new(Arc::clone(&client), 5);
        cache.set("sun:2025-03-10", &1u32, None);
        assert!(client.get_raw("worktime:5:sun:2025-03-10").is_some());
    }

    #[test]
    fn test_overwrite_updates_value() {
        let cache = versioned(1);
        cache.set("counter", &1u32, None);
        cache.set("counter", &2u32, None);
        assert_eq!(cache.get::<u32>("counter"), Some(2));
    }
}
