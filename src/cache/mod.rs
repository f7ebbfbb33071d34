//! Resolution cache
//!
//! Cache-aside layer in front of the durable registry, keyed by short
//! code, with a separate tombstone namespace for known-expired codes.
//! Implementations must degrade on store failure: a read error is a
//! miss, a write error is a dropped hint. The registry stays the source
//! of truth, so a cache outage must never become a resolution failure.

use async_trait::async_trait;

pub mod memory;
pub mod redis;

pub use self::memory::MemoryResolutionCache;
pub use self::redis::RedisResolutionCache;

#[async_trait]
pub trait ResolutionCache: Send + Sync {
    /// Writes a positive `code -> url` entry.
    ///
    /// When an absolute expiry is given the TTL is the remaining
    /// lifetime; entries for already-expired links are not written.
    /// Without an expiry the configured default TTL applies (0 means no
    /// TTL at all).
    async fn cache_url(&self, code: &str, url: &str, expire_at_ts: Option<i64>);

    /// Point lookup. Absence means "unknown", not "invalid".
    async fn get_cached_url(&self, code: &str) -> Option<String>;

    /// Writes a tombstone for a known-expired code. Tombstone TTL is
    /// independent of the positive entry's TTL and clamped to >= 1s.
    async fn mark_expired(&self, code: &str);

    async fn is_tombstoned(&self, code: &str) -> bool;

    /// Best-effort invalidation hint; store errors are swallowed.
    async fn uncache_url(&self, code: &str);
}
