use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::codec::CodeCodec;
use crate::errors::Result;
use crate::repository::{LinkRecord, LinkRegistry};

/// In-memory registry used by tests and throwaway setups.
pub struct MemoryRegistry {
    records: RwLock<HashMap<i64, LinkRecord>>,
    next_id: AtomicI64,
    codec: Arc<CodeCodec>,
}

impl MemoryRegistry {
    pub fn new(codec: Arc<CodeCodec>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            codec,
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Test helper: insert a record under a chosen id, like a row
    /// restored from a dump.
    pub async fn insert_with_id(
        &self,
        id: i64,
        original_url: &str,
        expire_at: Option<DateTime<Utc>>,
    ) -> LinkRecord {
        let record = LinkRecord {
            id,
            code: self.codec.encode(id as u64),
            original_url: original_url.to_string(),
            expire_at,
            created_at: Utc::now(),
            created_by: None,
        };
        self.records.write().await.insert(id, record.clone());
        self.next_id.fetch_max(id + 1, Ordering::SeqCst);
        record
    }
}

#[async_trait]
impl LinkRegistry for MemoryRegistry {
    async fn create(
        &self,
        original_url: &str,
        expire_at: Option<DateTime<Utc>>,
        created_by: Option<i64>,
    ) -> Result<LinkRecord> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = LinkRecord {
            id,
            code: self.codec.encode(id as u64),
            original_url: original_url.to_string(),
            expire_at,
            created_at: Utc::now(),
            created_by,
        };
        self.records.write().await.insert(id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<LinkRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list_expired_ids(&self, limit: u64) -> Result<Vec<i64>> {
        let now = Utc::now();
        let records = self.records.read().await;
        let mut ids: Vec<i64> = records
            .values()
            .filter(|r| r.expire_at.is_some_and(|at| at <= now))
            .map(|r| r.id)
            .collect();
        ids.sort_unstable();
        ids.truncate(limit as usize);
        Ok(ids)
    }

    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64> {
        let mut records = self.records.write().await;
        let mut deleted = 0;
        for id in ids {
            if records.remove(id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
