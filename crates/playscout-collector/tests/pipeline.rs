//! End-to-end collection runs against the scripted store.

use playscout_collector::{CollectOrchestrator, ProxyPool};
use playscout_core::{ProxyEndpoint, RotationStrategy, ScraperConfig, SeedQuery};
use playscout_playstore::testing::ScriptedPlayStore;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn config(max_attempts: u32) -> ScraperConfig {
    let mut config = ScraperConfig::default();
    config.retry.max_attempts = max_attempts;
    config.retry.initial_backoff_secs = 0;
    config.retry.jitter_min_ms = 0;
    config.retry.jitter_max_ms = 0;
    config.search.delay_between_terms_ms = 0;
    config.dispatch.max_workers = 3;
    config
}

fn loan_store() -> ScriptedPlayStore {
    ScriptedPlayStore::new()
        .with_suggestions(&["loan app", "fast loan", "instant credit"])
        .with_results("loan app", &["a.1", "a.2", "a.3", "a.4", "a.5"])
        .with_results("fast loan", &["a.4", "b.1", "b.2", "b.3", "b.4"])
        .with_results("instant credit", &["c.1", "c.2", "c.3", "c.4", "c.5"])
        .with_details(&["a.1", "a.2", "a.3", "a.5", "b.1", "b.2", "b.3", "b.4", "c.1"])
}

#[tokio::test]
async fn test_loan_app_scenario() {
    let store = Arc::new(loan_store());
    let orchestrator =
        CollectOrchestrator::new(store.clone(), Arc::new(ProxyPool::direct()), &config(2));

    let outcome = orchestrator
        .run(&[SeedQuery::new("loan app")], 5, 8)
        .await
        .expect("run");

    // "fast loan" repeats a.4; the duplicate is dropped and the target is
    // reached partway through the second term.
    assert!(store.searched_terms().len() <= 3);
    assert_eq!(store.searched_terms(), vec!["loan app", "fast loan"]);
    assert_eq!(outcome.items.len(), 8);
    let ids: Vec<&str> = outcome.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["a.1", "a.2", "a.3", "a.4", "a.5", "b.1", "b.2", "b.3"]
    );

    // a.4 has no detail record and stays at search-stage fidelity.
    let a4 = &outcome.items[3];
    assert!(!a4.is_enriched());
    assert_eq!(a4.source_term.as_deref(), Some("loan app"));
    assert!(outcome.items[0].is_enriched());
    assert_eq!(outcome.report.ids_unresolved, 1);
}

#[tokio::test]
async fn test_target_reached_after_second_term_stops_search() {
    let store = Arc::new(
        ScriptedPlayStore::new()
            .with_suggestions(&["fast loan", "instant credit", "loan app"])
            .with_results("fast loan", &["b.1", "b.2", "b.3", "b.4", "b.5"])
            .with_results("instant credit", &["c.1", "c.2", "c.3", "c.4", "c.5"])
            .with_results("loan app", &["a.1"]),
    );
    let orchestrator =
        CollectOrchestrator::new(store.clone(), Arc::new(ProxyPool::direct()), &config(1));

    let outcome = orchestrator
        .run(&[SeedQuery::new("loan app")], 5, 8)
        .await
        .expect("run");

    assert_eq!(outcome.items.len(), 8);
    // The seed is only searched when the service suggests it.
    assert_eq!(store.searched_terms(), vec!["fast loan", "instant credit"]);
    assert_eq!(store.suggest_calls(), 1);
}

#[tokio::test]
async fn test_output_is_bounded_and_unique_for_any_target() {
    for target in [0, 1, 3, 7, 8, 15, 100] {
        let store = Arc::new(loan_store());
        let orchestrator =
            CollectOrchestrator::new(store, Arc::new(ProxyPool::direct()), &config(1));

        let outcome = orchestrator
            .run(&[SeedQuery::new("loan app")], 5, target)
            .await
            .expect("run");

        assert!(outcome.items.len() <= target, "target {target}");
        let unique: HashSet<_> = outcome.items.iter().map(|i| i.id.clone()).collect();
        assert_eq!(unique.len(), outcome.items.len(), "target {target}");
    }
}

#[tokio::test]
async fn test_failing_proxies_leave_stub_after_two_attempts() {
    let a: ProxyEndpoint = "10.0.0.1:3128".parse().expect("endpoint");
    let b: ProxyEndpoint = "10.0.0.2:3128".parse().expect("endpoint");
    let pool = Arc::new(ProxyPool::new(
        vec![a.clone(), b.clone()],
        RotationStrategy::RoundRobin,
        0,
    ));
    let store = Arc::new(
        ScriptedPlayStore::new()
            .with_suggestions(&["solo"])
            .with_results("solo", &["x.1"])
            .with_failing_detail("x.1"),
    );
    let orchestrator = CollectOrchestrator::new(store.clone(), pool, &config(2));

    let outcome = orchestrator
        .run(&[SeedQuery::new("solo")], 5, 10)
        .await
        .expect("run");

    assert_eq!(outcome.items.len(), 1);
    assert!(!outcome.items[0].is_enriched());
    let calls = store.detail_calls_for("x.1");
    assert_eq!(calls.len(), 2);
    let used: HashSet<_> = calls.into_iter().filter_map(|c| c.proxy).collect();
    assert_eq!(used, HashSet::from([a, b]));
}

#[tokio::test]
async fn test_cancelled_run_returns_partial_results() {
    let store = Arc::new(loan_store());
    let cancel = CancellationToken::new();
    cancel.cancel();
    let orchestrator = CollectOrchestrator::with_cancellation(
        store.clone(),
        Arc::new(ProxyPool::direct()),
        &config(1),
        cancel,
    );

    let outcome = orchestrator
        .run(&[SeedQuery::new("loan app")], 5, 8)
        .await
        .expect("run");

    assert!(outcome.report.cancelled);
    assert!(outcome.items.is_empty());
    assert!(store.searched_terms().is_empty());
}

#[tokio::test]
async fn test_enrichment_content_is_stable_across_runs() {
    let mut snapshots = Vec::new();
    for _ in 0..3 {
        let store = Arc::new(loan_store());
        let orchestrator =
            CollectOrchestrator::new(store, Arc::new(ProxyPool::direct()), &config(1));
        let outcome = orchestrator
            .run(&[SeedQuery::new("loan app")], 5, 12)
            .await
            .expect("run");

        let enriched: Vec<String> = outcome
            .items
            .iter()
            .filter(|i| i.is_enriched())
            .map(|i| i.id.to_string())
            .collect();
        snapshots.push(enriched);
    }

    assert!(snapshots.windows(2).all(|w| w[0] == w[1]));
}
