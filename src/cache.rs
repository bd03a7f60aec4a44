use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    stored_at: Instant,
    value: V,
}

/// In-process key/value store whose entries stop being served once they are
/// older than the configured TTL.
///
/// Expired entries are left in place and overwritten by the next `set` for the
/// same key. Clones share the same storage.
#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<String, CacheEntry<V>>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        if self.ttl.is_zero() {
            return None;
        }
        let entries = self.entries.lock();
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        if self.ttl.is_zero() {
            return;
        }
        let entry = CacheEntry {
            stored_at: Instant::now(),
            value,
        };
        self.entries.lock().insert(key.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[allow(dead_code)]
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
