//! End-to-end flow over the in-memory backends: register links, resolve
//! them, read analytics, then reap the expired ones.

use std::sync::Arc;

use chrono::{Duration, Utc};

use linkforge::analytics::{MemoryVisitRecorder, VisitRecorder};
use linkforge::cache::MemoryResolutionCache;
use linkforge::codec::CodeCodec;
use linkforge::config::ReaperConfig;
use linkforge::repository::LinkRegistry;
use linkforge::repository::backends::memory::MemoryRegistry;
use linkforge::services::{ExpiryReaper, PurgeReport, RedirectResolver, RequestMeta, ResolveOutcome};

fn visitor(ip: &str) -> RequestMeta {
    RequestMeta {
        forwarded_for: None,
        remote_addr: Some(ip.to_string()),
        user_agent: Some("integration-test".to_string()),
    }
}

#[tokio::test]
async fn test_full_lifecycle() {
    let codec = Arc::new(CodeCodec::default());
    let cache = Arc::new(MemoryResolutionCache::new(3600, 60));
    let analytics = Arc::new(MemoryVisitRecorder::new(3600));
    let registry = Arc::new(MemoryRegistry::new(codec.clone()));
    let resolver = RedirectResolver::new(
        cache.clone(),
        analytics.clone(),
        registry.clone(),
        codec.clone(),
    );

    // register: id assigned first, code derived from it
    let permanent = registry
        .create("https://example.com/docs", None, None)
        .await
        .unwrap();
    let ephemeral = registry
        .create(
            "https://example.com/sale",
            Some(Utc::now() + Duration::hours(1)),
            None,
        )
        .await
        .unwrap();
    assert_eq!(permanent.code, codec.encode(permanent.id as u64));
    assert_ne!(permanent.code, ephemeral.code);

    // resolve both, from three distinct visitors
    for ip in ["10.0.0.1", "10.0.0.2", "10.0.0.3"] {
        let outcome = resolver
            .resolve(&permanent.code, &visitor(ip))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ResolveOutcome::Found("https://example.com/docs".to_string())
        );
    }
    resolver
        .resolve(&ephemeral.code, &visitor("10.0.0.1"))
        .await
        .unwrap();

    let counts = analytics.get_counts(&permanent.code).await;
    assert_eq!(counts.visits, 3);
    assert_eq!(counts.unique_visitors, 3);

    let daily = analytics.get_daily(&permanent.code, 7).await;
    assert_eq!(daily.len(), 7);
    assert_eq!(daily.last().unwrap().visits, 3);

    // nothing has expired yet
    let reaper = ExpiryReaper::new(
        registry.clone(),
        &ReaperConfig {
            batch_size: 10,
            max_retries: 3,
            retry_delay_secs: 0,
        },
    );
    assert_eq!(
        reaper.purge_expired().await.unwrap(),
        PurgeReport { processed: 0, deleted: 0 }
    );

    // age one link out and reap it
    let expired = registry
        .insert_with_id(100, "https://example.com/old", Some(Utc::now() - Duration::hours(2)))
        .await;
    assert_eq!(
        reaper.purge_expired().await.unwrap(),
        PurgeReport { processed: 1, deleted: 1 }
    );
    assert!(registry.find_by_id(expired.id).await.unwrap().is_none());
    assert!(registry.find_by_id(permanent.id).await.unwrap().is_some());

    // the reaped row is simply gone from the registry, so its code no
    // longer resolves
    let outcome = resolver
        .resolve(&expired.code, &visitor("10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(outcome, ResolveOutcome::NotFound);
}

#[tokio::test]
async fn test_daily_series_is_zero_filled_for_quiet_codes() {
    let analytics = MemoryVisitRecorder::new(3600);
    let series = analytics.get_daily("never-visited", 30).await;
    assert_eq!(series.len(), 30);
    assert!(series.iter().all(|d| d.visits == 0));
    for pair in series.windows(2) {
        assert!(pair[0].date < pair[1].date);
    }
}
