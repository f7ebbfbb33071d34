use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use crate::cache::ResolutionCache;

struct Entry {
    url: String,
    deadline: Option<Instant>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.deadline.is_none_or(|d| Instant::now() < d)
    }
}

/// In-process implementation with per-entry deadlines, checked lazily on
/// read. Suitable for single-node deployments and tests; shared-state
/// deployments use [`RedisResolutionCache`](super::RedisResolutionCache).
pub struct MemoryResolutionCache {
    urls: DashMap<String, Entry>,
    tombstones: DashMap<String, Instant>,
    default_ttl: u64,
    tombstone_ttl: u64,
}

impl MemoryResolutionCache {
    pub fn new(default_ttl: u64, tombstone_ttl: u64) -> Self {
        Self {
            urls: DashMap::new(),
            tombstones: DashMap::new(),
            default_ttl,
            tombstone_ttl,
        }
    }
}

#[async_trait]
impl ResolutionCache for MemoryResolutionCache {
    async fn cache_url(&self, code: &str, url: &str, expire_at_ts: Option<i64>) {
        let deadline = match expire_at_ts {
            Some(ts) => {
                let remaining = ts - chrono::Utc::now().timestamp();
                if remaining <= 0 {
                    trace!("Skipping cache write for expired link: {}", code);
                    return;
                }
                Some(Instant::now() + Duration::from_secs(remaining as u64))
            }
            None if self.default_ttl > 0 => {
                Some(Instant::now() + Duration::from_secs(self.default_ttl))
            }
            None => None,
        };

        self.urls.insert(
            code.to_string(),
            Entry {
                url: url.to_string(),
                deadline,
            },
        );
    }

    async fn get_cached_url(&self, code: &str) -> Option<String> {
        // guard must be released before the remove below
        let stale = match self.urls.get(code) {
            Some(entry) if entry.is_live() => return Some(entry.url.clone()),
            Some(_) => true,
            None => false,
        };
        if stale {
            self.urls.remove(code);
        }
        None
    }

    async fn mark_expired(&self, code: &str) {
        let ttl = self.tombstone_ttl.max(1);
        self.tombstones.insert(
            code.to_string(),
            Instant::now() + Duration::from_secs(ttl),
        );
    }

    async fn is_tombstoned(&self, code: &str) -> bool {
        let stale = match self.tombstones.get(code) {
            Some(deadline) if Instant::now() < *deadline => return true,
            Some(_) => true,
            None => false,
        };
        if stale {
            self.tombstones.remove(code);
        }
        false
    }

    async fn uncache_url(&self, code: &str) {
        self.urls.remove(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_and_get() {
        let cache = MemoryResolutionCache::new(60, 5);
        cache.cache_url("abc", "https://example.com", None).await;
        assert_eq!(
            cache.get_cached_url("abc").await.as_deref(),
            Some("https://example.com")
        );
        assert_eq!(cache.get_cached_url("other").await, None);
    }

    #[tokio::test]
    async fn test_expired_link_is_not_cached() {
        let cache = MemoryResolutionCache::new(60, 5);
        let past = chrono::Utc::now().timestamp() - 10;
        cache.cache_url("abc", "https://example.com", Some(past)).await;
        assert_eq!(cache.get_cached_url("abc").await, None);
    }

    #[tokio::test]
    async fn test_expire_at_equal_to_now_is_not_cached() {
        let cache = MemoryResolutionCache::new(60, 5);
        let now = chrono::Utc::now().timestamp();
        cache.cache_url("abc", "https://example.com", Some(now)).await;
        assert_eq!(cache.get_cached_url("abc").await, None);
    }

    #[tokio::test]
    async fn test_ttl_bounded_by_remaining_lifetime() {
        let cache = MemoryResolutionCache::new(3600, 5);
        // epoch seconds truncate, so leave a two-second margin
        let soon = chrono::Utc::now().timestamp() + 2;
        cache.cache_url("abc", "https://example.com", Some(soon)).await;
        assert!(cache.get_cached_url("abc").await.is_some());

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(cache.get_cached_url("abc").await, None);
    }

    #[tokio::test]
    async fn test_zero_default_ttl_means_no_expiry() {
        let cache = MemoryResolutionCache::new(0, 5);
        cache.cache_url("abc", "https://example.com", None).await;
        assert!(cache.get_cached_url("abc").await.is_some());
    }

    #[tokio::test]
    async fn test_tombstone_lifecycle() {
        let cache = MemoryResolutionCache::new(60, 1);
        assert!(!cache.is_tombstoned("abc").await);

        cache.mark_expired("abc").await;
        assert!(cache.is_tombstoned("abc").await);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(!cache.is_tombstoned("abc").await);
    }

    #[tokio::test]
    async fn test_tombstone_ttl_clamped_to_one() {
        // tombstone_ttl of 0 still yields a visible tombstone
        let cache = MemoryResolutionCache::new(60, 0);
        cache.mark_expired("abc").await;
        assert!(cache.is_tombstoned("abc").await);
    }

    #[tokio::test]
    async fn test_tombstone_independent_of_positive_entry() {
        let cache = MemoryResolutionCache::new(60, 5);
        cache.cache_url("abc", "https://example.com", None).await;
        cache.mark_expired("abc").await;

        // both namespaces hold their own entry
        assert!(cache.is_tombstoned("abc").await);
        assert!(cache.get_cached_url("abc").await.is_some());
    }

    #[tokio::test]
    async fn test_uncache() {
        let cache = MemoryResolutionCache::new(60, 5);
        cache.cache_url("abc", "https://example.com", None).await;
        cache.uncache_url("abc").await;
        assert_eq!(cache.get_cached_url("abc").await, None);

        // removing an absent entry is a no-op
        cache.uncache_url("missing").await;
    }
}
