//! Report assembly.
//!
//! [`finalize`] is a pure function of the plan and the recorded results: it
//! walks tasks in declaration order, so the same inputs always produce the
//! same report regardless of completion order. It never fails; anything that
//! did not succeed becomes a placeholder entry explaining why.

mod report;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::executor::{TaskOutcome, TaskResult};
use crate::nodes::{ComparisonPayload, SentimentPayload, SummaryPayload, TaskPayload};
use crate::plan::{Plan, Task, TaskKind, TaskStatus, INTENT_PRODUCT_COMPARISON};

pub use report::{Report, ReportSection, ReportTopic, RunSummary, SectionEntry};

/// Source links kept in the report.
pub const MAX_SOURCES: usize = 10;

pub fn finalize(run_id: &str, plan: &Plan, results: &[Arc<TaskResult>]) -> Report {
    let by_id: HashMap<&str, &TaskResult> = results
        .iter()
        .map(|r| (r.task_id.as_str(), r.as_ref()))
        .collect();

    let sections = ReportTopic::ORDER
        .iter()
        .map(|topic| build_section(*topic, plan, &by_id))
        .collect();

    let task_results: Vec<TaskResult> = plan
        .tasks()
        .iter()
        .filter_map(|t| by_id.get(t.id()).map(|r| (*r).clone()))
        .collect();

    let summary = summarize_run(plan, &task_results);
    tracing::debug!(
        target: "scout.finalize",
        run_id = %run_id,
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        "report assembled"
    );

    Report {
        run_id: run_id.to_string(),
        query: plan.original_query().to_string(),
        intent: plan.intent().to_string(),
        plan_source: plan.source(),
        sections,
        summary,
        task_results,
    }
}

fn summarize_run(plan: &Plan, results: &[TaskResult]) -> RunSummary {
    let count = |status: TaskStatus| results.iter().filter(|r| r.status() == status).count();
    RunSummary {
        total: plan.len(),
        succeeded: count(TaskStatus::Succeeded),
        failed: count(TaskStatus::Failed),
        skipped: count(TaskStatus::Skipped),
    }
}

fn build_section(
    topic: ReportTopic,
    plan: &Plan,
    results: &HashMap<&str, &TaskResult>,
) -> ReportSection {
    match topic {
        ReportTopic::Summary => per_task_section(topic, plan, results, TaskKind::Summarize, |p| match p {
            TaskPayload::Summary(s) => Some(summary_entry(s)),
            _ => None,
        }),
        ReportTopic::Sentiment => per_task_section(topic, plan, results, TaskKind::Sentiment, |p| match p {
            TaskPayload::Sentiment(s) => Some(sentiment_entry(s)),
            _ => None,
        }),
        ReportTopic::Comparison => comparison_section(plan, results),
        ReportTopic::Recommendation => recommendation_section(plan, results),
        ReportTopic::Sources => sources_section(plan, results),
    }
}

/// One entry per task of `kind`, placeholders for those that did not succeed.
fn per_task_section(
    topic: ReportTopic,
    plan: &Plan,
    results: &HashMap<&str, &TaskResult>,
    kind: TaskKind,
    render: impl Fn(&TaskPayload) -> Option<(String, String)>,
) -> ReportSection {
    let mut section = ReportSection::new(topic);
    let tasks: Vec<&Task> = plan.tasks().iter().filter(|t| t.kind() == kind).collect();

    if tasks.is_empty() {
        section.note = Some(format!("No {kind} task was part of this plan."));
        return section;
    }

    for task in tasks {
        let rendered = results
            .get(task.id())
            .and_then(|r| r.payload())
            .and_then(&render);
        let (heading, body) = match rendered {
            Some(entry) => {
                section.available = true;
                entry
            }
            None => (task.id().to_string(), placeholder(task, results)),
        };
        section.entries.push(SectionEntry {
            task_id: task.id().to_string(),
            heading,
            body,
        });
    }

    if !section.available {
        section.note = Some(format!("{} is unavailable for this run.", topic.title()));
    }
    section
}

fn placeholder(task: &Task, results: &HashMap<&str, &TaskResult>) -> String {
    match results.get(task.id()).map(|r| &r.outcome) {
        Some(TaskOutcome::Failed { failure }) => format!(
            "Unavailable: task '{}' failed ({}): {}",
            task.id(),
            failure.code,
            failure.message
        ),
        Some(TaskOutcome::Skipped {
            blocked_by: Some(dep),
        }) => format!(
            "Unavailable: task '{}' was skipped because '{dep}' did not succeed.",
            task.id()
        ),
        Some(TaskOutcome::Skipped { blocked_by: None }) => {
            format!("Unavailable: task '{}' was skipped before it could run.", task.id())
        }
        Some(TaskOutcome::Succeeded { .. }) => format!(
            "Unavailable: task '{}' returned an unexpected payload.",
            task.id()
        ),
        None => format!("Unavailable: no result was recorded for task '{}'.", task.id()),
    }
}

fn product_heading(title: Option<&str>, url: &str) -> String {
    title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(url)
        .to_string()
}

fn summary_entry(summary: &SummaryPayload) -> (String, String) {
    let mut body = summary.text.clone();
    if !summary.highlights.is_empty() {
        body.push_str("\n\nHighlights:");
        for h in &summary.highlights {
            body.push_str("\n- ");
            body.push_str(h);
        }
    }
    (
        product_heading(summary.product_title.as_deref(), &summary.product_url),
        body,
    )
}

fn sentiment_entry(sentiment: &SentimentPayload) -> (String, String) {
    let mut body = format!("Overall: {} (score {:+.2}", sentiment.label, sentiment.score);
    if let Some(confidence) = sentiment.confidence {
        body.push_str(&format!(", confidence {confidence:.2}"));
    }
    body.push_str(")\n\n");
    if let Some(b) = sentiment.breakdown {
        body.push_str(&format!(
            "{}% positive, {}% neutral, {}% negative\n\n",
            b.positive, b.neutral, b.negative
        ));
    }
    body.push_str(&sentiment.rationale);
    if !sentiment.positive_themes.is_empty() {
        body.push_str(&format!("\n\nPositive: {}", sentiment.positive_themes.join(", ")));
    }
    if !sentiment.negative_themes.is_empty() {
        body.push_str(&format!("\n\nNegative: {}", sentiment.negative_themes.join(", ")));
    }
    (
        product_heading(sentiment.product_title.as_deref(), &sentiment.product_url),
        body,
    )
}

fn comparison_entry(cmp: &ComparisonPayload) -> (String, String) {
    let mut body = String::new();
    for alt in &cmp.alternatives {
        body.push_str("- ");
        body.push_str(&alt.name);
        if let Some(price) = &alt.price {
            body.push_str(&format!(" ({price})"));
        }
        if let Some(verdict) = &alt.verdict {
            body.push_str(&format!(": {verdict}"));
        }
        if !alt.attributes.is_empty() {
            let attrs: Vec<String> = alt
                .attributes
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect();
            body.push_str(&format!(" [{}]", attrs.join("; ")));
        }
        body.push('\n');
    }
    (
        format!("{} vs. alternatives", cmp.products.join(", ")),
        body.trim_end().to_string(),
    )
}

fn scraped_products(plan: &Plan, results: &HashMap<&str, &TaskResult>) -> usize {
    plan.tasks()
        .iter()
        .filter(|t| t.kind() == TaskKind::Scrape)
        .filter(|t| {
            matches!(
                results.get(t.id()).and_then(|r| r.payload()),
                Some(TaskPayload::Product(_))
            )
        })
        .count()
}

fn comparison_section(plan: &Plan, results: &HashMap<&str, &TaskResult>) -> ReportSection {
    let mut section = per_task_section(
        ReportTopic::Comparison,
        plan,
        results,
        TaskKind::Compare,
        |p| match p {
            TaskPayload::Comparison(c) => Some(comparison_entry(c)),
            _ => None,
        },
    );

    if plan.intent() == INTENT_PRODUCT_COMPARISON {
        let scraped = scraped_products(plan, results);
        if scraped < 2 {
            section.available = false;
            section.note = Some(format!(
                "Insufficient product data: {scraped} product(s) scraped, a comparison needs at least 2."
            ));
        }
    }
    section
}

fn recommendation_section(plan: &Plan, results: &HashMap<&str, &TaskResult>) -> ReportSection {
    let mut section = ReportSection::new(ReportTopic::Recommendation);
    for task in plan.tasks().iter().filter(|t| t.kind() == TaskKind::Compare) {
        if let Some(TaskPayload::Comparison(cmp)) = results.get(task.id()).and_then(|r| r.payload()) {
            if cmp.recommendation.is_empty() {
                continue;
            }
            section.available = true;
            section.entries.push(SectionEntry {
                task_id: task.id().to_string(),
                heading: cmp.products.join(", "),
                body: cmp.recommendation.clone(),
            });
        }
    }
    if !section.available {
        section.note = Some("No recommendation could be made without a completed comparison.".into());
    }
    section
}

fn sources_section(plan: &Plan, results: &HashMap<&str, &TaskResult>) -> ReportSection {
    let mut section = ReportSection::new(ReportTopic::Sources);
    let mut seen = HashSet::new();
    let mut scraped = Vec::new();
    let mut searched = Vec::new();

    for task in plan.tasks() {
        match results.get(task.id()).and_then(|r| r.payload()) {
            Some(TaskPayload::Product(product)) => {
                scraped.push((task.id(), product.display_name().to_string(), product.url.clone()))
            }
            Some(TaskPayload::SearchHits { hits, .. }) => {
                for hit in hits {
                    let heading = hit.title.clone().unwrap_or_else(|| hit.url.clone());
                    searched.push((task.id(), heading, hit.url.clone()));
                }
            }
            _ => {}
        }
    }

    for (task_id, heading, url) in scraped.into_iter().chain(searched) {
        if section.entries.len() == MAX_SOURCES {
            break;
        }
        if seen.insert(url.clone()) {
            section.entries.push(SectionEntry {
                task_id: task_id.to_string(),
                heading,
                body: url,
            });
        }
    }

    section.available = !section.entries.is_empty();
    if !section.available {
        section.note = Some("No sources were collected.".into());
    }
    section
}
