//! Redirect resolver
//!
//! One call per incoming lookup, no shared in-process mutable state:
//! everything shared lives in the cache/analytics store and the durable
//! registry. Two concurrent misses for the same code both hit the
//! registry and both write back the same value, which needs no
//! coordination.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::analytics::VisitRecorder;
use crate::cache::ResolutionCache;
use crate::codec::CodeCodec;
use crate::errors::Result;
use crate::repository::LinkRegistry;
use crate::utils::ip::preferred_client_ip;

/// Request metadata handed over by the HTTP/routing collaborator.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub forwarded_for: Option<String>,
    pub remote_addr: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    pub fn client_ip(&self) -> Option<String> {
        preferred_client_ip(self.forwarded_for.as_deref(), self.remote_addr.as_deref())
    }
}

/// The entire observable surface of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// Issue a redirect to the url.
    Found(String),
    /// The link existed but has expired.
    Gone,
    /// Unknown or syntactically invalid code.
    NotFound,
}

pub struct RedirectResolver {
    cache: Arc<dyn ResolutionCache>,
    analytics: Arc<dyn VisitRecorder>,
    registry: Arc<dyn LinkRegistry>,
    codec: Arc<CodeCodec>,
}

impl RedirectResolver {
    pub fn new(
        cache: Arc<dyn ResolutionCache>,
        analytics: Arc<dyn VisitRecorder>,
        registry: Arc<dyn LinkRegistry>,
        codec: Arc<CodeCodec>,
    ) -> Self {
        Self {
            cache,
            analytics,
            registry,
            codec,
        }
    }

    /// Resolves one code: tombstone check, positive cache, then the
    /// registry with cache backfill.
    ///
    /// Expiry is evaluated only on the registry-lookup path. A positive
    /// cache entry's existence already implies the link was unexpired at
    /// write time, and its TTL never exceeds the remaining lifetime.
    ///
    /// Errors surface only for registry faults; cache and analytics
    /// failures degrade inside their layers.
    #[instrument(skip(self, meta), fields(code = %code))]
    pub async fn resolve(&self, code: &str, meta: &RequestMeta) -> Result<ResolveOutcome> {
        if self.cache.is_tombstoned(code).await {
            debug!("Tombstone hit, short-circuiting");
            return Ok(ResolveOutcome::Gone);
        }

        if let Some(url) = self.cache.get_cached_url(code).await {
            self.record_visit(code, meta).await;
            return Ok(ResolveOutcome::Found(url));
        }

        // Cache miss: the code itself tells us which row to fetch.
        let id = match self.codec.decode(code) {
            Ok(id) => id,
            Err(e) => {
                // Untrusted input guessing codes; not a fault.
                debug!("Invalid code: {}", e.message());
                return Ok(ResolveOutcome::NotFound);
            }
        };

        let Ok(id) = i64::try_from(id) else {
            return Ok(ResolveOutcome::NotFound);
        };

        let Some(record) = self.registry.find_by_id(id).await? else {
            debug!("No record for id {}", id);
            return Ok(ResolveOutcome::NotFound);
        };

        if record.is_expired() {
            self.cache.mark_expired(code).await;
            return Ok(ResolveOutcome::Gone);
        }

        self.cache
            .cache_url(
                code,
                &record.original_url,
                record.expire_at.map(|at| at.timestamp()),
            )
            .await;

        self.record_visit(code, meta).await;
        Ok(ResolveOutcome::Found(record.original_url))
    }

    async fn record_visit(&self, code: &str, meta: &RequestMeta) {
        let ip = meta.client_ip();
        self.analytics
            .record_visit(code, ip.as_deref(), meta.user_agent.as_deref())
            .await;
    }
}
