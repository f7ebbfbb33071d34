//! Durable link registry
//!
//! The registry owns link records and assigns their integer ids. Codes
//! are derived from the id, so creation is a two-phase sequence inside
//! one transaction: insert, obtain the id, encode it, persist the code.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::error;

use crate::codec::CodeCodec;
use crate::config::DatabaseConfig;
use crate::errors::{LinkforgeError, Result};

pub mod backends;

#[derive(Debug, Clone)]
pub struct LinkRecord {
    pub id: i64,
    /// `codec.encode(id)`, persisted once the id is durably assigned.
    pub code: String,
    pub original_url: String,
    pub expire_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<i64>,
}

impl LinkRecord {
    pub fn is_expired(&self) -> bool {
        self.expire_at.is_some_and(|at| at <= Utc::now())
    }
}

#[async_trait::async_trait]
pub trait LinkRegistry: Send + Sync {
    /// Creates a record and derives its code from the assigned id, both
    /// inside one transaction.
    async fn create(
        &self,
        original_url: &str,
        expire_at: Option<DateTime<Utc>>,
        created_by: Option<i64>,
    ) -> Result<LinkRecord>;

    async fn find_by_id(&self, id: i64) -> Result<Option<LinkRecord>>;

    /// Ids of records whose `expire_at` is at or before now, ascending,
    /// at most `limit` of them.
    async fn list_expired_ids(&self, limit: u64) -> Result<Vec<i64>>;

    /// Deletes the given ids in one transaction, returning the number
    /// of rows actually removed.
    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64>;
}

pub struct RegistryFactory;

impl RegistryFactory {
    pub async fn create(
        config: &DatabaseConfig,
        codec: Arc<CodeCodec>,
    ) -> Result<Arc<dyn LinkRegistry>> {
        match config.backend.as_str() {
            "sqlite" | "mysql" | "postgres" | "mariadb" => {
                let registry = backends::sea_orm::SeaOrmRegistry::new(
                    &config.database_url,
                    &config.backend,
                    codec,
                )
                .await?;
                Ok(Arc::new(registry) as Arc<dyn LinkRegistry>)
            }
            "memory" => Ok(Arc::new(backends::memory::MemoryRegistry::new(codec))
                as Arc<dyn LinkRegistry>),
            _ => {
                error!("Unknown registry backend: {}", config.backend);
                Err(LinkforgeError::database_config(format!(
                    "Unknown registry backend: {}. Supported: sqlite, mysql, postgres, mariadb, memory",
                    config.backend
                )))
            }
        }
    }
}
