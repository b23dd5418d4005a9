mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{route_all, ScriptedProvider};
use scout_core::api::{LlmRequest, LlmRouter, RouteTarget, TaskType};
use scout_core::llm::AttemptOutcome;

#[tokio::test]
async fn falls_back_past_provider_without_credentials() {
    let p1 = Arc::new(ScriptedProvider::new("p1").without_credentials());
    let p2 = Arc::new(ScriptedProvider::new("p2"));
    let router = LlmRouter::builder(route_all(vec![
        RouteTarget::new("p1", "m1"),
        RouteTarget::new("p2", "m2"),
    ]))
    .provider(p1.clone())
    .provider(p2.clone())
    .build();

    let response = router
        .invoke(TaskType::Summarize, &LlmRequest::new("summarize this"))
        .await
        .unwrap();

    assert_eq!(response.provider, "p2");
    assert_eq!(response.model, "m2");
    assert_eq!(response.attempts.len(), 1);
    assert!(matches!(
        response.attempts[0].outcome,
        AttemptOutcome::Unavailable(_)
    ));
    assert_eq!(p1.call_count(), 0, "no call without credentials");
    assert_eq!(p2.call_count(), 1);
}

#[tokio::test]
async fn slow_provider_times_out_and_falls_back() {
    let slow = Arc::new(ScriptedProvider::new("slow").with_delay(Duration::from_secs(5)));
    let fast = Arc::new(ScriptedProvider::new("fast"));
    let router = LlmRouter::builder(route_all(vec![
        RouteTarget::new("slow", "m1"),
        RouteTarget::new("fast", "m2"),
    ]))
    .provider(slow)
    .provider(fast)
    .timeout(Duration::from_millis(30))
    .build();

    let response = router
        .invoke(TaskType::Compare, &LlmRequest::new("compare"))
        .await
        .unwrap();

    assert_eq!(response.provider, "fast");
    assert!(matches!(
        response.attempts[0].outcome,
        AttemptOutcome::Transient(_)
    ));
}

#[tokio::test]
async fn exhausted_candidates_are_permanent() {
    let router = LlmRouter::builder(route_all(vec![RouteTarget::new("p1", "m1")]))
        .provider(Arc::new(ScriptedProvider::new("p1").without_credentials()))
        .build();

    let err = router
        .invoke(TaskType::Sentiment, &LlmRequest::new("x"))
        .await
        .unwrap_err();
    assert!(!err.is_transient());
    assert_eq!(err.code(), "llm_permanent");
}
