use async_trait::async_trait;
use chrono::Utc;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, trace};

use crate::analytics::{DailyVisits, VisitCounts, VisitRecorder, bucket_range, day_bucket, fingerprint};
use crate::config::{AnalyticsConfig, RedisConfig};
use crate::errors::{LinkforgeError, Result};

/// Redis-backed recorder. The distinct-visitor estimate rides on the
/// native HyperLogLog commands (PFADD/PFCOUNT), so adds are idempotent
/// and memory per code stays fixed regardless of traffic.
#[derive(Debug)]
pub struct RedisVisitRecorder {
    client: redis::Client,
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    key_prefix: String,
    daily_bucket_ttl: u64,
}

impl RedisVisitRecorder {
    pub fn new(redis: &RedisConfig, analytics: &AnalyticsConfig) -> Result<Self> {
        debug!(
            "RedisVisitRecorder created with prefix: '{}', daily bucket TTL: {}s",
            redis.key_prefix, analytics.daily_bucket_ttl
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
            daily_bucket_ttl: analytics.daily_bucket_ttl,
        })
    }

    async fn get_connection(&self) -> std::result::Result<MultiplexedConnection, redis::RedisError> {
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let mut conn_guard = self.connection.write().await;

        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let new_conn = self.client.get_multiplexed_async_connection().await?;
        *conn_guard = Some(new_conn.clone());
        debug!("Redis connection established and cached");

        Ok(new_conn)
    }

    async fn reset_connection(&self) {
        let mut conn_guard = self.connection.write().await;
        *conn_guard = None;
        debug!("Redis connection reset due to error");
    }

    fn key_visits(&self, code: &str) -> String {
        format!("{}:{}:visits", self.key_prefix, code)
    }

    fn key_uv(&self, code: &str) -> String {
        format!("{}:{}:uv", self.key_prefix, code)
    }

    fn key_daily(&self, code: &str, bucket: &str) -> String {
        format!("{}:{}:visits:{}", self.key_prefix, code, bucket)
    }
}

#[async_trait]
impl VisitRecorder for RedisVisitRecorder {
    async fn record_visit(&self, code: &str, ip: Option<&str>, ua: Option<&str>) {
        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return;
            }
        };

        let daily_key = self.key_daily(code, &day_bucket(Utc::now()));
        let ttl = self.daily_bucket_ttl.max(1);

        // INCR + PFADD + INCR/EXPIRE in one round trip. Increment and TTL
        // refresh are not one atomic unit; an expiry landing between them
        // loses at most a few seconds of one day's count.
        let result = redis::pipe()
            .incr(self.key_visits(code), 1u64)
            .ignore()
            .cmd("PFADD")
            .arg(self.key_uv(code))
            .arg(fingerprint(ip, ua))
            .ignore()
            .incr(&daily_key, 1u64)
            .ignore()
            .expire(&daily_key, ttl as i64)
            .ignore()
            .query_async::<()>(&mut conn)
            .await;

        match result {
            Ok(_) => trace!("Recorded visit for code: {}", code),
            Err(e) => {
                error!("Failed to record visit for code '{}': {}", code, e);
                self.reset_connection().await;
            }
        }
    }

    async fn get_counts(&self, code: &str) -> VisitCounts {
        let zero = VisitCounts {
            visits: 0,
            unique_visitors: 0,
        };

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return zero;
            }
        };

        let visits = match conn.get::<_, Option<u64>>(self.key_visits(code)).await {
            Ok(v) => v.unwrap_or(0),
            Err(e) => {
                error!("Failed to read visits for code '{}': {}", code, e);
                self.reset_connection().await;
                return zero;
            }
        };

        let unique_visitors = match redis::cmd("PFCOUNT")
            .arg(self.key_uv(code))
            .query_async::<u64>(&mut conn)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to read unique visitors for code '{}': {}", code, e);
                self.reset_connection().await;
                0
            }
        };

        VisitCounts {
            visits,
            unique_visitors,
        }
    }

    async fn get_daily(&self, code: &str, days: u32) -> Vec<DailyVisits> {
        let buckets = bucket_range(days);

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return buckets
                    .into_iter()
                    .map(|date| DailyVisits { date, visits: 0 })
                    .collect();
            }
        };

        let keys: Vec<String> = buckets
            .iter()
            .map(|bucket| self.key_daily(code, bucket))
            .collect();

        let values = match conn.mget::<_, Vec<Option<u64>>>(&keys).await {
            Ok(v) if v.len() == buckets.len() => v,
            Ok(_) | Err(_) => {
                debug!("Daily bucket read degraded for code '{}'", code);
                self.reset_connection().await;
                vec![None; buckets.len()]
            }
        };

        buckets
            .into_iter()
            .zip(values)
            .map(|(date, visits)| DailyVisits {
                date,
                visits: visits.unwrap_or(0),
            })
            .collect()
    }
}
