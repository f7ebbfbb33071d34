use std::env;
use std::fs;
use std::path::Path;

use tracing::{debug, error, warn};

use super::AppConfig;

impl AppConfig {
    /// Load configuration from TOML file with environment variable fallback
    pub fn load() -> Self {
        let mut config = Self::load_from_file();
        config.override_with_env();
        config
    }

    /// Load configuration from TOML file
    fn load_from_file() -> Self {
        let config_paths = [
            "config.toml",
            "linkforge.toml",
            "config/config.toml",
            "/etc/linkforge/config.toml",
        ];

        for path in &config_paths {
            if Path::new(path).exists() {
                debug!("Loading config from: {}", path);
                match fs::read_to_string(path) {
                    Ok(content) => match toml::from_str::<AppConfig>(&content) {
                        Ok(config) => {
                            debug!("Successfully loaded config from: {}", path);
                            return config;
                        }
                        Err(e) => {
                            warn!("Failed to parse config file {}: {}", path, e);
                        }
                    },
                    Err(e) => {
                        warn!("Failed to read config file {}: {}", path, e);
                    }
                }
            }
        }

        debug!("No config file found, using defaults");
        Self::default()
    }

    /// Override configuration with environment variables
    fn override_with_env(&mut self) {
        // Database config
        if let Ok(backend) = env::var("DATABASE_BACKEND") {
            self.database.backend = backend;
        }
        if let Ok(database_url) = env::var("DATABASE_URL") {
            self.database.database_url = database_url;
        }

        // Redis config
        if let Ok(redis_url) = env::var("REDIS_URL") {
            self.redis.url = redis_url;
        }
        if let Ok(key_prefix) = env::var("REDIS_KEY_PREFIX") {
            self.redis.key_prefix = key_prefix;
        }

        // Cache config
        if let Ok(default_ttl) = env::var("CACHE_DEFAULT_TTL") {
            if let Ok(ttl) = default_ttl.parse() {
                self.cache.default_ttl = ttl;
            } else {
                error!("Invalid CACHE_DEFAULT_TTL: {}", default_ttl);
            }
        }
        if let Ok(tombstone_ttl) = env::var("EXPIRED_TOMBSTONE_TTL") {
            if let Ok(ttl) = tombstone_ttl.parse() {
                self.cache.tombstone_ttl = ttl;
            } else {
                error!("Invalid EXPIRED_TOMBSTONE_TTL: {}", tombstone_ttl);
            }
        }

        // Analytics config
        if let Ok(daily_ttl) = env::var("DAILY_BUCKET_TTL") {
            if let Ok(ttl) = daily_ttl.parse() {
                self.analytics.daily_bucket_ttl = ttl;
            } else {
                error!("Invalid DAILY_BUCKET_TTL: {}", daily_ttl);
            }
        }

        // Reaper config
        if let Ok(batch_size) = env::var("REAPER_BATCH_SIZE") {
            if let Ok(size) = batch_size.parse() {
                self.reaper.batch_size = size;
            } else {
                error!("Invalid REAPER_BATCH_SIZE: {}", batch_size);
            }
        }
        if let Ok(max_retries) = env::var("REAPER_MAX_RETRIES") {
            if let Ok(retries) = max_retries.parse() {
                self.reaper.max_retries = retries;
            } else {
                error!("Invalid REAPER_MAX_RETRIES: {}", max_retries);
            }
        }
        if let Ok(delay) = env::var("REAPER_RETRY_DELAY") {
            if let Ok(d) = delay.parse() {
                self.reaper.retry_delay_secs = d;
            } else {
                error!("Invalid REAPER_RETRY_DELAY: {}", delay);
            }
        }

        // Codec config
        if let Ok(alphabet) = env::var("CODEC_ALPHABET") {
            self.codec.alphabet = alphabet;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.redis.key_prefix, "link");
        assert_eq!(config.cache.default_ttl, 604_800);
        assert_eq!(config.cache.tombstone_ttl, 21_600);
        assert_eq!(config.analytics.daily_bucket_ttl, 7_776_000);
        assert_eq!(config.reaper.batch_size, 1000);
        assert_eq!(config.reaper.max_retries, 3);
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [cache]
            default_ttl = 3600

            [reaper]
            batch_size = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.default_ttl, 3600);
        assert_eq!(config.reaper.batch_size, 50);
        // untouched sections keep their defaults
        assert_eq!(config.cache.tombstone_ttl, 21_600);
        assert_eq!(config.database.backend, "sqlite");
    }
}
