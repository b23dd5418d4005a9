//! The fixed research pipeline.

use crate::error::PlanningError;
use crate::nodes::find_url;
use crate::plan::{
    Plan, PlanSource, Task, TaskInput, INTENT_PRODUCT_ANALYSIS, INTENT_PRODUCT_COMPARISON,
    INTENT_PRODUCT_RESEARCH,
};

pub const DETECT_URL: &str = "detect_url";
pub const SEARCH: &str = "search";
pub const SCRAPE: &str = "scrape";
pub const SUMMARIZE: &str = "summarize";
pub const SENTIMENT: &str = "sentiment";
pub const COMPARE: &str = "compare";

pub fn is_comparison_query(query: &str) -> bool {
    let q = query.trim().to_ascii_lowercase();
    q.starts_with("compare") || q.contains(" vs ") || q.contains(" vs. ") || q.contains(" versus ")
}

/// Intent of a query, judged the same way the fixed pipeline branches.
pub fn classify_intent(query: &str) -> &'static str {
    if is_comparison_query(query) {
        INTENT_PRODUCT_COMPARISON
    } else if find_url(query).is_some() {
        INTENT_PRODUCT_ANALYSIS
    } else {
        INTENT_PRODUCT_RESEARCH
    }
}

/// Linear plan: detect_url, then search when the query has no URL, then
/// scrape, summarize, sentiment and compare, each depending on the previous.
pub fn build(
    query: &str,
    source: PlanSource,
    search_results: usize,
    max_tasks: usize,
) -> Result<Plan, PlanningError> {
    let has_url = find_url(query).is_some();
    let mut tasks = Vec::with_capacity(6);

    tasks.push(Task::new(
        DETECT_URL,
        vec![],
        TaskInput::DetectUrl {
            query: query.to_string(),
        },
    ));

    let scrape_source = if has_url {
        DETECT_URL
    } else {
        tasks.push(Task::new(
            SEARCH,
            vec![DETECT_URL.to_string()],
            TaskInput::Search {
                query: query.to_string(),
                limit: Some(search_results.max(1)),
            },
        ));
        SEARCH
    };

    tasks.push(Task::new(
        SCRAPE,
        vec![scrape_source.to_string()],
        TaskInput::Scrape {
            url: None,
            source: Some(scrape_source.to_string()),
            url_index: 0,
        },
    ));
    tasks.push(Task::new(
        SUMMARIZE,
        vec![SCRAPE.to_string()],
        TaskInput::Summarize {
            source: SCRAPE.to_string(),
        },
    ));
    tasks.push(Task::new(
        SENTIMENT,
        vec![SUMMARIZE.to_string()],
        TaskInput::Sentiment {
            source: SCRAPE.to_string(),
        },
    ));
    tasks.push(Task::new(
        COMPARE,
        vec![SENTIMENT.to_string()],
        TaskInput::Compare {
            sources: vec![SCRAPE.to_string()],
            alternatives_from: (!has_url).then(|| SEARCH.to_string()),
        },
    ));

    // The fixed pipeline always fits; never let a low limit reject it.
    let limit = max_tasks.max(tasks.len());
    Plan::new(classify_intent(query), query, source, tasks, limit)
}
