use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// One cached record. This is also the persisted on-disk layout:
/// `{ "value": ..., "expiresAt": ... }` under `<prefix>_<key>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub value: T,
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, ttl_minutes: i64) -> Self {
        Self {
            value,
            expires_at: Utc::now() + Duration::minutes(ttl_minutes),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Key/value store with per-entry TTL and explicit invalidation.
///
/// `get`/`set` are atomic with respect to each other (internal mutex), but
/// there is no read-through coalescing: two callers missing the same key
/// will each issue their own fetch. Callers needing single-fetch semantics
/// add their own coordination.
pub struct ResponseCache {
    prefix: String,
    dir: Option<PathBuf>,
    entries: Mutex<HashMap<String, CacheEntry<Value>>>,
}

impl ResponseCache {
    /// In-memory cache namespaced under `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            dir: None,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cache that additionally persists entries to `dir`, surviving
    /// restarts. Persistence failures degrade to in-memory behavior.
    pub fn with_dir(prefix: impl Into<String>, dir: PathBuf) -> Self {
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!(error = %e, dir = %dir.display(), "Failed to create cache directory");
            return Self::new(prefix);
        }
        Self {
            prefix: prefix.into(),
            dir: Some(dir),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}_{}", self.prefix, key)
    }

    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|d| d.join(format!("{}.json", self.namespaced(key))))
    }

    /// Store `value` under `key` for `ttl_minutes`. Unconditionally
    /// overwrites any existing entry (last write wins).
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl_minutes: i64) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode cache value, skipping");
                return;
            }
        };
        let entry = CacheEntry::new(value, ttl_minutes);

        if let Some(path) = self.entry_path(key) {
            match serde_json::to_string_pretty(&entry) {
                Ok(contents) => {
                    if let Err(e) = std::fs::write(&path, contents) {
                        warn!(key, error = %e, "Failed to persist cache entry");
                    }
                }
                Err(e) => warn!(key, error = %e, "Failed to encode cache entry"),
            }
        }

        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        entries.insert(key.to_string(), entry);
    }

    /// Fetch the value under `key`, or `None` if absent or expired.
    /// Expired entries are evicted on read and never returned.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        enum Lookup {
            Hit(CacheEntry<Value>),
            Expired,
            Miss,
        }

        let lookup = {
            let Ok(mut entries) = self.entries.lock() else {
                return None;
            };
            let expired = entries.get(key).map(CacheEntry::is_expired);
            match expired {
                Some(true) => {
                    entries.remove(key);
                    Lookup::Expired
                }
                Some(false) => match entries.get(key) {
                    Some(entry) => Lookup::Hit(entry.clone()),
                    None => Lookup::Miss,
                },
                None => Lookup::Miss,
            }
        };

        let entry = match lookup {
            Lookup::Expired => {
                self.remove_file(key);
                return None;
            }
            Lookup::Hit(entry) => entry,
            Lookup::Miss => self.load_from_disk(key)?,
        };

        match serde_json::from_value(entry.value) {
            Ok(value) => Some(value),
            Err(e) => {
                // Stored shape no longer matches the requested type: treat
                // as a miss so the caller refetches.
                debug!(key, error = %e, "Cached value failed to decode");
                None
            }
        }
    }

    /// Memory miss fallback: load a persisted record, honoring its TTL.
    fn load_from_disk(&self, key: &str) -> Option<CacheEntry<Value>> {
        let path = self.entry_path(key)?;
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(&path).ok()?;
        let entry: CacheEntry<Value> = match serde_json::from_str(&contents) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key, error = %e, "Corrupt cache file, removing");
                self.remove_file(key);
                return None;
            }
        };
        if entry.is_expired() {
            self.remove_file(key);
            return None;
        }
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), entry.clone());
        }
        Some(entry)
    }

    fn remove_file(&self, key: &str) {
        if let Some(path) = self.entry_path(key) {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!(key, error = %e, "Failed to remove cache file");
                }
            }
        }
    }

    /// Explicitly invalidate one key.
    pub fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
        self.remove_file(key);
    }

    /// Invalidate every key in a logical family, e.g.
    /// `remove_by_prefix("enrollment")` after an enrollment mutation.
    pub fn remove_by_prefix(&self, logical_prefix: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|key, _| !key.starts_with(logical_prefix));
        }

        let Some(ref dir) = self.dir else {
            return;
        };
        let file_prefix = self.namespaced(logical_prefix);
        let Ok(listing) = std::fs::read_dir(dir) else {
            return;
        };
        for item in listing.flatten() {
            let name = item.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(&file_prefix) {
                if let Err(e) = std::fs::remove_file(item.path()) {
                    warn!(file = name, error = %e, "Failed to remove cache file");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_then_get_returns_value() {
        let cache = ResponseCache::new("learnhub");
        cache.set("enrollments", &vec![1, 2, 3], 5);
        assert_eq!(cache.get::<Vec<i32>>("enrollments"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_expired_entry_is_absent_and_evicted() {
        let cache = ResponseCache::new("learnhub");
        cache.set("enrollments", &vec![1, 2, 3], 5);

        // Age the entry past its TTL.
        {
            let mut entries = cache.entries.lock().unwrap();
            entries.get_mut("enrollments").unwrap().expires_at =
                Utc::now() - Duration::minutes(1);
        }

        assert_eq!(cache.get::<Vec<i32>>("enrollments"), None);
        // Evicted, not merely hidden.
        assert!(cache.entries.lock().unwrap().is_empty());
    }

    #[test]
    fn test_set_overwrites_unconditionally() {
        let cache = ResponseCache::new("learnhub");
        cache.set("course_9", &"first", 5);
        cache.set("course_9", &"second", 5);
        assert_eq!(cache.get::<String>("course_9"), Some("second".to_string()));
    }

    #[test]
    fn test_remove_invalidates_before_expiry() {
        let cache = ResponseCache::new("learnhub");
        cache.set("course_9", &"v", 5);
        cache.remove("course_9");
        assert_eq!(cache.get::<String>("course_9"), None);
    }

    #[test]
    fn test_remove_by_prefix_clears_key_family() {
        let cache = ResponseCache::new("learnhub");
        cache.set("enrollments", &"all", 5);
        cache.set("enrollment_9", &"nine", 5);
        cache.set("course_9", &"course", 5);

        cache.remove_by_prefix("enrollment");

        assert_eq!(cache.get::<String>("enrollments"), None);
        assert_eq!(cache.get::<String>("enrollment_9"), None);
        assert_eq!(cache.get::<String>("course_9"), Some("course".to_string()));
    }

    #[test]
    fn test_persisted_entry_survives_reconstruction() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::with_dir("learnhub", dir.path().to_path_buf());
        cache.set("enrollments", &vec!["rust-101"], 5);

        let reopened = ResponseCache::with_dir("learnhub", dir.path().to_path_buf());
        assert_eq!(
            reopened.get::<Vec<String>>("enrollments"),
            Some(vec!["rust-101".to_string()])
        );
    }

    #[test]
    fn test_persisted_entry_honors_ttl() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::with_dir("learnhub", dir.path().to_path_buf());
        cache.set("enrollments", &vec!["rust-101"], -1);

        let reopened = ResponseCache::with_dir("learnhub", dir.path().to_path_buf());
        assert_eq!(reopened.get::<Vec<String>>("enrollments"), None);
    }

    #[test]
    fn test_remove_by_prefix_sweeps_disk_records() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::with_dir("learnhub", dir.path().to_path_buf());
        cache.set("enrollment_9", &"nine", 5);
        cache.set("course_9", &"course", 5);

        cache.remove_by_prefix("enrollment");

        let reopened = ResponseCache::with_dir("learnhub", dir.path().to_path_buf());
        assert_eq!(reopened.get::<String>("enrollment_9"), None);
        assert_eq!(reopened.get::<String>("course_9"), Some("course".to_string()));
    }

    #[test]
    fn test_decode_mismatch_is_a_miss() {
        let cache = ResponseCache::new("learnhub");
        cache.set("enrollments", &"not a list", 5);
        assert_eq!(cache.get::<Vec<i32>>("enrollments"), None);
    }
}
