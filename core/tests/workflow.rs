mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use pretty_assertions::assert_eq;

use common::{workflow, MockScrape, MockSearch, ScriptedProvider, CYCLIC_PLAN};
use scout_core::api::{
    finalize, CancelToken, EventSink, EventStep, PlanSource, PlannerConfig, PlannerStrategy,
    ReportTopic, RunError, TaskKind, TaskPayload, TaskStatus, WorkflowUpdate,
};
use scout_core::nodes::SentimentLabel;

fn fixed() -> PlannerConfig {
    PlannerConfig::default()
}

#[tokio::test]
async fn airpods_fixed_pipeline_succeeds_end_to_end() {
    let provider = Arc::new(ScriptedProvider::new("gemini"));
    let wf = workflow(MockSearch::airpods(), Arc::new(MockScrape::ok()), provider, fixed());

    let report = wf.run("Apple AirPods 4").await.unwrap();

    let kinds: Vec<_> = report.task_results.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TaskKind::DetectUrl,
            TaskKind::Search,
            TaskKind::Scrape,
            TaskKind::Summarize,
            TaskKind::Sentiment,
            TaskKind::Compare,
        ]
    );
    assert!(report
        .task_results
        .iter()
        .all(|r| r.status() == TaskStatus::Succeeded));

    let summary = report.section(ReportTopic::Summary).unwrap();
    assert!(summary.available);
    assert!(!summary.entries[0].body.is_empty());

    let sentiment = report
        .task_results
        .iter()
        .find_map(|r| match r.payload() {
            Some(TaskPayload::Sentiment(s)) => Some(s.clone()),
            _ => None,
        })
        .unwrap();
    assert!(matches!(
        sentiment.label,
        SentimentLabel::Positive | SentimentLabel::Neutral | SentimentLabel::Negative
    ));
    assert!((-1.0..=1.0).contains(&sentiment.score));

    let comparison = report
        .task_results
        .iter()
        .find_map(|r| match r.payload() {
            Some(TaskPayload::Comparison(c)) => Some(c.clone()),
            _ => None,
        })
        .unwrap();
    assert!(!comparison.alternatives.is_empty());
}

#[tokio::test]
async fn scrape_failure_skips_dependents_and_still_reports() {
    let provider = Arc::new(ScriptedProvider::new("gemini"));
    let wf = workflow(
        MockSearch::airpods(),
        Arc::new(MockScrape::failing()),
        provider.clone(),
        fixed(),
    );

    let report = wf.run("Apple AirPods 4").await.unwrap();
    let status = |id: &str| {
        report
            .task_results
            .iter()
            .find(|r| r.task_id == id)
            .map(|r| r.status())
    };

    assert_eq!(status("search"), Some(TaskStatus::Succeeded));
    assert_eq!(status("scrape"), Some(TaskStatus::Failed));
    for id in ["summarize", "sentiment", "compare"] {
        assert_eq!(status(id), Some(TaskStatus::Skipped), "{id}");
    }
    for topic in [ReportTopic::Summary, ReportTopic::Sentiment, ReportTopic::Comparison] {
        assert!(!report.section(topic).unwrap().available, "{topic:?}");
    }
    // Nothing downstream of the failed scrape reached the model.
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn cyclic_dynamic_plan_falls_back_to_fixed_pipeline() {
    let provider = Arc::new(ScriptedProvider::new("gemini").with_planning(vec![CYCLIC_PLAN, CYCLIC_PLAN]));
    let wf = workflow(
        MockSearch::airpods(),
        Arc::new(MockScrape::ok()),
        provider,
        PlannerConfig {
            strategy: PlannerStrategy::Dynamic,
            ..PlannerConfig::default()
        },
    );

    let report = wf.run("Apple AirPods 4").await.unwrap();
    assert_eq!(report.plan_source, PlanSource::FixedFallback);
    assert_eq!(report.summary.succeeded, 6);
}

#[tokio::test]
async fn empty_query_is_a_planning_error() {
    let provider = Arc::new(ScriptedProvider::new("gemini"));
    let wf = workflow(MockSearch::airpods(), Arc::new(MockScrape::ok()), provider, fixed());

    let err = wf.run("   ").await.unwrap_err();
    assert_eq!(err.code(), "empty_query");
}

#[tokio::test]
async fn stream_yields_events_then_report() {
    let provider = Arc::new(ScriptedProvider::new("gemini"));
    let wf = Arc::new(workflow(
        MockSearch::airpods(),
        Arc::new(MockScrape::ok()),
        provider,
        fixed(),
    ));

    let updates: Vec<_> = wf
        .run_stream("Apple AirPods 4".into(), None, CancelToken::new())
        .collect()
        .await;

    let (last, events) = updates.split_last().unwrap();
    assert!(matches!(last, WorkflowUpdate::Completed(_)));

    let steps: Vec<_> = events
        .iter()
        .map(|u| match u {
            WorkflowUpdate::Event(e) => e.step,
            other => panic!("unexpected update before the end: {other:?}"),
        })
        .collect();
    assert_eq!(steps.first(), Some(&EventStep::Planner));
    assert_eq!(steps.last(), Some(&EventStep::Finalize));
    // One start and one finish per task.
    assert_eq!(steps.iter().filter(|s| **s == EventStep::TaskStarted).count(), 6);
    assert_eq!(steps.iter().filter(|s| **s == EventStep::TaskFinished).count(), 6);

    let seqs: Vec<u64> = events
        .iter()
        .filter_map(|u| match u {
            WorkflowUpdate::Event(e) => Some(e.seq),
            _ => None,
        })
        .collect();
    assert_eq!(seqs, (0..seqs.len() as u64).collect::<Vec<_>>());
}

#[tokio::test]
async fn finalize_is_byte_identical_for_the_same_results() {
    let provider = Arc::new(ScriptedProvider::new("gemini"));
    let wf = workflow(MockSearch::airpods(), Arc::new(MockScrape::ok()), provider, fixed());

    let plan = Arc::new(wf.plan("Apple AirPods 4", None).await.unwrap());
    let state = wf
        .executor()
        .execute("run-x", plan.clone(), &EventSink::noop(), &CancelToken::new())
        .await
        .unwrap();
    let results = state.results();

    let first = serde_json::to_string(&finalize("run-x", &plan, &results)).unwrap();
    let second = serde_json::to_string(&finalize("run-x", &plan, &results)).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        finalize("run-x", &plan, &results).to_markdown(),
        finalize("run-x", &plan, &results).to_markdown()
    );
}

#[tokio::test]
async fn cancel_during_dynamic_planning_stops_the_run() {
    let provider = Arc::new(ScriptedProvider::new("gemini").with_delay(Duration::from_secs(3)));
    let wf = workflow(
        MockSearch::airpods(),
        Arc::new(MockScrape::ok()),
        provider.clone(),
        PlannerConfig {
            strategy: PlannerStrategy::Dynamic,
            ..PlannerConfig::default()
        },
    );

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = wf
        .run_with("Apple AirPods 4", None, &EventSink::noop(), &cancel)
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(1));
    match err {
        RunError::Cancelled(cancelled) => assert!(cancelled.abandoned.is_empty()),
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert_eq!(provider.call_count(), 1);
}
