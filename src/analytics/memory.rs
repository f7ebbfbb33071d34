use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::analytics::hll::HyperLogLog;
use crate::analytics::{DailyVisits, VisitCounts, VisitRecorder, bucket_range, day_bucket, fingerprint};

/// In-process recorder: DashMap counters plus one HyperLogLog per code.
/// Daily buckets carry a deadline refreshed on every increment, checked
/// lazily on read, mirroring the TTL semantics of the Redis recorder.
pub struct MemoryVisitRecorder {
    visits: DashMap<String, u64>,
    unique: DashMap<String, HyperLogLog>,
    /// keyed `{code}:{YYYYMMDD}`
    daily: DashMap<String, (u64, Instant)>,
    daily_bucket_ttl: u64,
}

impl MemoryVisitRecorder {
    pub fn new(daily_bucket_ttl: u64) -> Self {
        Self {
            visits: DashMap::new(),
            unique: DashMap::new(),
            daily: DashMap::new(),
            daily_bucket_ttl,
        }
    }

    fn daily_key(code: &str, bucket: &str) -> String {
        format!("{code}:{bucket}")
    }
}

#[async_trait]
impl VisitRecorder for MemoryVisitRecorder {
    async fn record_visit(&self, code: &str, ip: Option<&str>, ua: Option<&str>) {
        *self.visits.entry(code.to_string()).or_insert(0) += 1;

        self.unique
            .entry(code.to_string())
            .or_default()
            .insert(&fingerprint(ip, ua));

        let key = Self::daily_key(code, &day_bucket(Utc::now()));
        let deadline = Instant::now() + Duration::from_secs(self.daily_bucket_ttl.max(1));
        self.daily
            .entry(key)
            .and_modify(|(count, dl)| {
                *count += 1;
                *dl = deadline;
            })
            .or_insert((1, deadline));
    }

    async fn get_counts(&self, code: &str) -> VisitCounts {
        let visits = self.visits.get(code).map(|v| *v).unwrap_or(0);
        let unique_visitors = self
            .unique
            .get(code)
            .map(|hll| hll.estimate())
            .unwrap_or(0);
        VisitCounts {
            visits,
            unique_visitors,
        }
    }

    async fn get_daily(&self, code: &str, days: u32) -> Vec<DailyVisits> {
        bucket_range(days)
            .into_iter()
            .map(|bucket| {
                let visits = self
                    .daily
                    .get(&Self::daily_key(code, &bucket))
                    .and_then(|entry| {
                        let (count, deadline) = *entry.value();
                        (Instant::now() < deadline).then_some(count)
                    })
                    .unwrap_or(0);
                DailyVisits {
                    date: bucket,
                    visits,
                }
            })
            .collect()
    }
}
