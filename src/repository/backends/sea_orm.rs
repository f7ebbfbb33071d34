use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::{info, trace, warn};

use crate::codec::CodeCodec;
use crate::errors::{LinkforgeError, Result};
use crate::repository::{LinkRecord, LinkRegistry};

use migration::{Migrator, MigratorTrait, entities::link};

#[derive(Clone)]
pub struct SeaOrmRegistry {
    db: DatabaseConnection,
    codec: Arc<CodeCodec>,
    backend_name: String,
}

impl SeaOrmRegistry {
    pub async fn new(database_url: &str, backend_name: &str, codec: Arc<CodeCodec>) -> Result<Self> {
        if database_url.is_empty() {
            return Err(LinkforgeError::database_config("DATABASE_URL is not set"));
        }

        let db = if backend_name == "sqlite" {
            Self::connect_sqlite(database_url).await?
        } else {
            Self::connect_generic(database_url, backend_name).await?
        };

        let registry = SeaOrmRegistry {
            db,
            codec,
            backend_name: backend_name.to_string(),
        };

        registry.run_migrations().await?;

        warn!(
            "{} Registry initialized.",
            registry.backend_name.to_uppercase()
        );
        Ok(registry)
    }

    /// SQLite with auto-create and WAL; the reaper's delete batches sit
    /// well with WAL journaling.
    async fn connect_sqlite(database_url: &str) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::SqlitePool;
        use sea_orm::sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
        use std::str::FromStr;

        let opt = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| LinkforgeError::database_config(format!("Bad SQLite URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePool::connect_with(opt).await.map_err(|e| {
            LinkforgeError::database_connection(format!("Cannot connect to SQLite: {e}"))
        })?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    async fn connect_generic(database_url: &str, backend_name: &str) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(database_url.to_owned());
        opt.max_connections(100)
            .min_connections(5)
            .connect_timeout(std::time::Duration::from_secs(8))
            .acquire_timeout(std::time::Duration::from_secs(8))
            .idle_timeout(std::time::Duration::from_secs(8))
            .sqlx_logging(false);

        Database::connect(opt).await.map_err(|e| {
            LinkforgeError::database_connection(format!(
                "Cannot connect to {} database: {}",
                backend_name.to_uppercase(),
                e
            ))
        })
    }

    async fn run_migrations(&self) -> Result<()> {
        Migrator::up(&self.db, None)
            .await
            .map_err(|e| LinkforgeError::database_operation(format!("Migration failed: {e}")))?;

        info!("Database migrations completed");
        Ok(())
    }

    fn model_to_record(model: link::Model) -> LinkRecord {
        LinkRecord {
            id: model.id,
            code: model.code,
            original_url: model.original_url,
            expire_at: model.expire_at,
            created_at: model.created_at,
            created_by: model.created_by,
        }
    }
}

#[async_trait]
impl LinkRegistry for SeaOrmRegistry {
    async fn create(
        &self,
        original_url: &str,
        expire_at: Option<DateTime<Utc>>,
        created_by: Option<i64>,
    ) -> Result<LinkRecord> {
        let txn = self.db.begin().await?;

        // Phase one: insert to obtain the id.
        let inserted = link::ActiveModel {
            code: Set(String::new()),
            original_url: Set(original_url.to_string()),
            expire_at: Set(expire_at),
            created_at: Set(Utc::now()),
            created_by: Set(created_by),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        // Phase two: derive the code from the assigned id.
        let code = self.codec.encode(inserted.id as u64);
        let mut active: link::ActiveModel = inserted.into();
        active.code = Set(code);
        let model = active.update(&txn).await?;

        txn.commit().await?;

        trace!("Created link id={} code={}", model.id, model.code);
        Ok(Self::model_to_record(model))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<LinkRecord>> {
        let model = link::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Self::model_to_record))
    }

    async fn list_expired_ids(&self, limit: u64) -> Result<Vec<i64>> {
        let ids = link::Entity::find()
            .select_only()
            .column(link::Column::Id)
            .filter(link::Column::ExpireAt.is_not_null())
            .filter(link::Column::ExpireAt.lte(Utc::now()))
            .order_by_asc(link::Column::Id)
            .limit(limit)
            .into_tuple::<i64>()
            .all(&self.db)
            .await?;
        Ok(ids)
    }

    async fn delete_by_ids(&self, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin().await?;
        let result = link::Entity::delete_many()
            .filter(link::Column::Id.is_in(ids.iter().copied()))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        Ok(result.rows_affected)
    }
}
