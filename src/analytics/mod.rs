//! Visit analytics
//!
//! Per-code counters: an exact visit count, an approximate
//! distinct-visitor estimate fed by request fingerprints, and
//! day-bucketed counts in UTC. Exact distinct tracking would mean
//! storing every fingerprint forever; the estimator keeps a fixed
//! footprint per code at the cost of a small relative error, which is
//! fine for analytics display and wrong for billing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use xxhash_rust::xxh64::xxh64;

pub mod hll;
pub mod memory;
pub mod redis;

pub use self::memory::MemoryVisitRecorder;
pub use self::redis::RedisVisitRecorder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitCounts {
    /// Exact, monotonically incremented per visit.
    pub visits: u64,
    /// Bounded-error estimate; non-decreasing as distinct visitors arrive.
    pub unique_visitors: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyVisits {
    /// UTC calendar day, formatted `YYYYMMDD`.
    pub date: String,
    pub visits: u64,
}

#[async_trait]
pub trait VisitRecorder: Send + Sync {
    /// Records one visit: increments the exact counter, feeds the
    /// visitor fingerprint into the distinct estimator (idempotent for
    /// a repeated fingerprint), and bumps today's bucket, refreshing
    /// its TTL.
    async fn record_visit(&self, code: &str, ip: Option<&str>, ua: Option<&str>);

    /// Zeroes when the code has never been visited.
    async fn get_counts(&self, code: &str) -> VisitCounts;

    /// Exactly `days` entries, oldest to newest, zero-filled, with
    /// today as the last element.
    async fn get_daily(&self, code: &str, days: u32) -> Vec<DailyVisits>;
}

/// Pseudo-identity token for distinct-visitor counting. One-way hash of
/// `ip|ua`; missing parts collapse to empty strings, matching visitors
/// that send neither.
pub(crate) fn fingerprint(ip: Option<&str>, ua: Option<&str>) -> String {
    let base = format!("{}|{}", ip.unwrap_or(""), ua.unwrap_or(""));
    format!("{:016x}", xxh64(base.as_bytes(), 0))
}

/// `YYYYMMDD` bucket label for a UTC instant.
pub(crate) fn day_bucket(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d").to_string()
}

/// The `days` bucket labels ending at "today", oldest first.
pub(crate) fn bucket_range(days: u32) -> Vec<String> {
    let now = Utc::now();
    (0..days)
        .rev()
        .map(|i| day_bucket(now - chrono::Duration::days(i as i64)))
        .collect()
}
