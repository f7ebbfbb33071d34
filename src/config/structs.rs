use serde::Deserialize;

use crate::codec::DEFAULT_ALPHABET;

/// Top-level configuration, loaded from TOML with env-var overrides.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub cache: CacheConfig,
    pub analytics: AnalyticsConfig,
    pub reaper: ReaperConfig,
    pub codec: CodecConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlite | mysql | postgres | mariadb
    pub backend: String,
    pub database_url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            database_url: "sqlite://linkforge.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    /// Namespace for every cache/analytics key, e.g. `link:{code}:url`.
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            key_prefix: "link".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for positive entries of links without an expiry, in seconds.
    /// 0 disables the TTL (entries persist until evicted).
    pub default_ttl: u64,
    /// TTL for tombstone entries, in seconds. Clamped to at least 1.
    pub tombstone_ttl: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: 604_800,  // 7d
            tombstone_ttl: 21_600, // 6h
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// TTL for per-day visit buckets, refreshed on every increment.
    pub daily_bucket_ttl: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            daily_bucket_ttl: 7_776_000, // 90d
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReaperConfig {
    pub batch_size: u64,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_retries: 3,
            retry_delay_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub alphabet: String,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            alphabet: DEFAULT_ALPHABET.to_string(),
        }
    }
}
