use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, trace};

use crate::cache::ResolutionCache;
use crate::config::{CacheConfig, RedisConfig};
use crate::errors::{LinkforgeError, Result};

#[derive(Debug)]
pub struct RedisResolutionCache {
    client: redis::Client,
    /// 持久化连接，使用 RwLock 保护
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    key_prefix: String,
    default_ttl: u64,
    tombstone_ttl: u64,
}

impl RedisResolutionCache {
    pub fn new(redis: &RedisConfig, cache: &CacheConfig) -> Result<Self> {
        debug!(
            "RedisResolutionCache created with prefix: '{}', default TTL: {}s, tombstone TTL: {}s",
            redis.key_prefix, cache.default_ttl, cache.tombstone_ttl
        );

        let client = redis::Client::open(redis.url.clone()).map_err(|e| {
            LinkforgeError::cache_connection(format!(
                "Failed to create Redis client: {e}. Check REDIS_URL."
            ))
        })?;

        Ok(Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            key_prefix: redis.key_prefix.clone(),
            default_ttl: cache.default_ttl,
            tombstone_ttl: cache.tombstone_ttl,
        })
    }

    /// 获取或建立持久连接
    async fn get_connection(&self) -> std::result::Result<MultiplexedConnection, redis::RedisError> {
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let mut conn_guard = self.connection.write().await;

        // 双重检查，避免竞态条件
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let new_conn = self.client.get_multiplexed_async_connection().await?;
        *conn_guard = Some(new_conn.clone());
        debug!("Redis connection established and cached");

        Ok(new_conn)
    }

    /// 重置连接（在连接错误时调用）
    async fn reset_connection(&self) {
        let mut conn_guard = self.connection.write().await;
        *conn_guard = None;
        debug!("Redis connection reset due to error");
    }

    fn key_url(&self, code: &str) -> String {
        format!("{}:{}:url", self.key_prefix, code)
    }

    fn key_tombstone(&self, code: &str) -> String {
        format!("{}:{}:expired", self.key_prefix, code)
    }
}

#[async_trait]
impl ResolutionCache for RedisResolutionCache {
    async fn cache_url(&self, code: &str, url: &str, expire_at_ts: Option<i64>) {
        let key = self.key_url(code);

        let ttl = match expire_at_ts {
            Some(ts) => {
                let remaining = ts - chrono::Utc::now().timestamp();
                if remaining <= 0 {
                    // Already expired; don't cache.
                    trace!("Skipping cache write for expired link: {}", code);
                    return;
                }
                Some(remaining as u64)
            }
            None if self.default_ttl > 0 => Some(self.default_ttl),
            None => None,
        };

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return;
            }
        };

        let result = match ttl {
            Some(secs) => conn.set_ex::<_, _, ()>(&key, url, secs).await,
            None => conn.set::<_, _, ()>(&key, url).await,
        };

        match result {
            Ok(_) => trace!("Cached url for code: {}", code),
            Err(e) => {
                error!("Failed to cache url for code '{}': {}", code, e);
                self.reset_connection().await;
            }
        }
    }

    async fn get_cached_url(&self, code: &str) -> Option<String> {
        let key = self.key_url(code);

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return None;
            }
        };

        match conn.get::<_, Option<String>>(&key).await {
            Ok(val) => val,
            Err(e) => {
                // 连接可能已断开，重置连接；按未命中处理
                error!("Failed to get cached url for code '{}': {}", code, e);
                self.reset_connection().await;
                None
            }
        }
    }

    async fn mark_expired(&self, code: &str) {
        let key = self.key_tombstone(code);
        let ttl = self.tombstone_ttl.max(1);

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return;
            }
        };

        match conn.set_ex::<_, _, ()>(&key, 1u8, ttl).await {
            Ok(_) => trace!("Tombstoned code: {}", code),
            Err(e) => {
                error!("Failed to tombstone code '{}': {}", code, e);
                self.reset_connection().await;
            }
        }
    }

    async fn is_tombstoned(&self, code: &str) -> bool {
        let key = self.key_tombstone(code);

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return false;
            }
        };

        match conn.exists::<_, bool>(&key).await {
            Ok(found) => {
                if found {
                    trace!("Tombstone hit for code: {}", code);
                }
                found
            }
            Err(e) => {
                error!("Failed to check tombstone for code '{}': {}", code, e);
                self.reset_connection().await;
                false
            }
        }
    }

    async fn uncache_url(&self, code: &str) {
        let key = self.key_url(code);

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                debug!("Skipping uncache for '{}', no connection: {}", code, e);
                self.reset_connection().await;
                return;
            }
        };

        // Invalidation hint only; errors are swallowed.
        if let Err(e) = conn.del::<_, i64>(&key).await {
            debug!("Failed to uncache code '{}': {}", code, e);
            self.reset_connection().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_url_is_a_cache_connection_error() {
        let redis_config = RedisConfig {
            url: "not-a-redis-url".to_string(),
            key_prefix: "link".to_string(),
        };
        let err = RedisResolutionCache::new(&redis_config, &CacheConfig::default()).unwrap_err();
        assert!(matches!(err, LinkforgeError::CacheConnection(_)));
        assert_eq!(err.code(), "E001");
    }
}
