//! Expiry reaper
//!
//! Background job that hard-deletes expired rows from the registry in
//! batches. Meant to run as a single active instance; concurrent runs
//! would not corrupt anything (deletes are idempotent) but would fight
//! over the same rows.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::ReaperConfig;
use crate::errors::{LinkforgeError, Result};
use crate::repository::LinkRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PurgeReport {
    /// Expired ids pulled from the registry.
    pub processed: u64,
    /// Rows actually removed.
    pub deleted: u64,
}

pub struct ExpiryReaper {
    registry: Arc<dyn LinkRegistry>,
    batch_size: u64,
    max_retries: u32,
    retry_delay: Duration,
}

impl ExpiryReaper {
    pub fn new(registry: Arc<dyn LinkRegistry>, config: &ReaperConfig) -> Self {
        Self {
            registry,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        }
    }

    /// Purges all currently-expired records, batch by batch.
    ///
    /// Idempotent: a run over a caught-up registry reports `{0, 0}`.
    /// On a storage error the whole job is retried with a fixed delay;
    /// batches committed before the error stay deleted and are not
    /// recounted by the retry. Lingering positive cache entries are left
    /// to their own TTLs, which are bounded by each link's remaining
    /// lifetime at write time.
    pub async fn purge_expired(&self) -> Result<PurgeReport> {
        let mut attempt = 0u32;
        loop {
            match self.purge_once().await {
                Ok(report) => {
                    if report.processed > 0 {
                        info!(
                            "Purge complete: processed={} deleted={}",
                            report.processed, report.deleted
                        );
                    }
                    return Ok(report);
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        "Purge attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, self.max_retries, e, self.retry_delay
                    );
                    sleep(self.retry_delay).await;
                }
                Err(e) => {
                    error!("Purge failed after {} retries: {}", self.max_retries, e);
                    return Err(LinkforgeError::purge_failed(format!(
                        "gave up after {} retries: {e}",
                        self.max_retries
                    )));
                }
            }
        }
    }

    async fn purge_once(&self) -> Result<PurgeReport> {
        let mut report = PurgeReport::default();

        loop {
            let ids = self.registry.list_expired_ids(self.batch_size).await?;
            if ids.is_empty() {
                break;
            }

            let deleted = self.registry.delete_by_ids(&ids).await?;
            report.processed += ids.len() as u64;
            report.deleted += deleted;

            // A short batch means the registry is caught up.
            if (ids.len() as u64) < self.batch_size {
                break;
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::codec::CodeCodec;
    use crate::repository::LinkRecord;
    use crate::repository::backends::memory::MemoryRegistry;

    fn reaper_config(batch_size: u64) -> ReaperConfig {
        ReaperConfig {
            batch_size,
            max_retries: 3,
            retry_delay_secs: 0,
        }
    }

    #[tokio::test]
    async fn test_purge_deletes_only_expired() {
        let registry = Arc::new(MemoryRegistry::new(Arc::new(CodeCodec::default())));
        let hour = chrono::Duration::hours(1);
        registry
            .insert_with_id(1, "https://a.example", Some(Utc::now() - hour))
            .await;
        registry
            .insert_with_id(2, "https://b.example", Some(Utc::now() + hour))
            .await;
        registry.insert_with_id(3, "https://c.example", None).await;

        let reaper = ExpiryReaper::new(registry.clone(), &reaper_config(10));

        let report = reaper.purge_expired().await.unwrap();
        assert_eq!(report, PurgeReport { processed: 1, deleted: 1 });

        // second run is a no-op
        let report = reaper.purge_expired().await.unwrap();
        assert_eq!(report, PurgeReport { processed: 0, deleted: 0 });

        assert!(registry.find_by_id(1).await.unwrap().is_none());
        assert!(registry.find_by_id(2).await.unwrap().is_some());
        assert!(registry.find_by_id(3).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_pages_through_batches() {
        let registry = Arc::new(MemoryRegistry::new(Arc::new(CodeCodec::default())));
        let past = Utc::now() - chrono::Duration::minutes(5);
        for id in 1..=25 {
            registry
                .insert_with_id(id, "https://example.com", Some(past))
                .await;
        }
        assert_eq!(registry.len().await, 25);

        let reaper = ExpiryReaper::new(registry.clone(), &reaper_config(10));
        let report = reaper.purge_expired().await.unwrap();

        assert_eq!(report, PurgeReport { processed: 25, deleted: 25 });
        assert!(registry.is_empty().await);
    }

    /// Registry that fails a fixed number of list calls before recovering.
    struct FlakyRegistry {
        inner: MemoryRegistry,
        failures_left: AtomicU32,
    }

    #[async_trait]
    impl crate::repository::LinkRegistry for FlakyRegistry {
        async fn create(
            &self,
            original_url: &str,
            expire_at: Option<DateTime<Utc>>,
            created_by: Option<i64>,
        ) -> crate::errors::Result<LinkRecord> {
            self.inner.create(original_url, expire_at, created_by).await
        }

        async fn find_by_id(&self, id: i64) -> crate::errors::Result<Option<LinkRecord>> {
            self.inner.find_by_id(id).await
        }

        async fn list_expired_ids(&self, limit: u64) -> crate::errors::Result<Vec<i64>> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(LinkforgeError::database_operation("connection lost"));
            }
            self.inner.list_expired_ids(limit).await
        }

        async fn delete_by_ids(&self, ids: &[i64]) -> crate::errors::Result<u64> {
            self.inner.delete_by_ids(ids).await
        }
    }

    #[tokio::test]
    async fn test_purge_retries_transient_failures() {
        let registry = FlakyRegistry {
            inner: MemoryRegistry::new(Arc::new(CodeCodec::default())),
            failures_left: AtomicU32::new(2),
        };
        let past = Utc::now() - chrono::Duration::minutes(5);
        registry
            .inner
            .insert_with_id(1, "https://example.com", Some(past))
            .await;

        let reaper = ExpiryReaper::new(Arc::new(registry), &reaper_config(10));
        let report = reaper.purge_expired().await.unwrap();
        assert_eq!(report, PurgeReport { processed: 1, deleted: 1 });
    }

    #[tokio::test]
    async fn test_purge_escalates_after_retries_exhausted() {
        let registry = FlakyRegistry {
            inner: MemoryRegistry::new(Arc::new(CodeCodec::default())),
            failures_left: AtomicU32::new(10),
        };

        let reaper = ExpiryReaper::new(Arc::new(registry), &reaper_config(10));
        let err = reaper.purge_expired().await.unwrap_err();
        assert!(matches!(err, LinkforgeError::PurgeFailed(_)));
    }
}
