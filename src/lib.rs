//! Linkforge - short-code resolution core
//!
//! Resolves short codes to destination URLs at high read volume,
//! tracks visit analytics, and reclaims expired records.
//!
//! # Architecture
//! - `codec`: reversible, collision-free id <-> code conversion
//! - `cache`: cache-aside resolution layer with tombstoning
//! - `analytics`: exact, approximate-distinct and day-bucketed counters
//! - `repository`: durable link registry (SeaORM backends)
//! - `services`: the redirect resolver and the expiry reaper
//! - `config`: configuration management (TOML + environment)
//!
//! Construct the pieces once at startup and inject them; nothing here
//! keeps process-wide singletons:
//!
//! ```no_run
//! use std::sync::Arc;
//! use linkforge::analytics::RedisVisitRecorder;
//! use linkforge::cache::RedisResolutionCache;
//! use linkforge::codec::CodeCodec;
//! use linkforge::config::AppConfig;
//! use linkforge::repository::RegistryFactory;
//! use linkforge::services::{ExpiryReaper, RedirectResolver};
//!
//! # async fn wire() -> linkforge::errors::Result<()> {
//! let config = AppConfig::load();
//! let codec = Arc::new(CodeCodec::new(&config.codec.alphabet)?);
//! let registry = RegistryFactory::create(&config.database, codec.clone()).await?;
//! let cache = Arc::new(RedisResolutionCache::new(&config.redis, &config.cache).unwrap());
//! let analytics = Arc::new(RedisVisitRecorder::new(&config.redis, &config.analytics).unwrap());
//!
//! let resolver = RedirectResolver::new(cache, analytics, registry.clone(), codec);
//! let reaper = ExpiryReaper::new(registry, &config.reaper);
//! # Ok(())
//! # }
//! ```

pub mod analytics;
pub mod cache;
pub mod codec;
pub mod config;
pub mod errors;
pub mod repository;
pub mod services;
pub mod utils;
