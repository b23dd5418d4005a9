pub const PLANNER_SYSTEM: &str = r#"You are an expert research planner for e-commerce product analysis.
Turn the user's query into a task graph.

Task kinds and their input:
- "detect_url": {"query": "..."}  extracts a product URL from the query
- "search":     {"query": "...", "limit": 5}  finds candidate product pages
- "scrape":     {"url": "..."} or {"source": "<task id>", "url_index": 0}
                source is a detect_url or search task; url_index picks a search hit
- "summarize":  {"source": "<scrape task id>"}
- "sentiment":  {"source": "<scrape task id>"}
- "compare":    {"sources": ["<scrape task id>", ...], "alternatives_from": "<search task id>"}

Rules:
1. Every task has a unique "id" and lists the ids it needs in "depends_on".
2. Any task id used in an input must also be a (transitive) dependency.
3. No cycles. Independent tasks should not depend on each other so they can run in parallel.
4. If the query contains a URL, scrape it directly. Otherwise search first and
   scrape one or more hits using different url_index values.
5. For comparisons, search and scrape each product, then compare the scraped tasks.

Respond ONLY with a JSON object:
{"intent": "product_research" | "product_analysis" | "product_comparison",
 "reasoning": "why this plan",
 "tasks": [{"id": "...", "kind": "...", "depends_on": [...], "input": {...}}]}"#;

pub fn plan_request(query: &str) -> String {
    format!(
        r#"Create a research plan for this query:

Query: {query}

Example for "Compare Apple AirPods 4 vs Samsung Galaxy Buds3":
{{"intent": "product_comparison", "reasoning": "scrape one page per product, then compare",
 "tasks": [
  {{"id": "search_a", "kind": "search", "depends_on": [], "input": {{"query": "Apple AirPods 4"}}}},
  {{"id": "search_b", "kind": "search", "depends_on": [], "input": {{"query": "Samsung Galaxy Buds3"}}}},
  {{"id": "scrape_a", "kind": "scrape", "depends_on": ["search_a"], "input": {{"source": "search_a", "url_index": 0}}}},
  {{"id": "scrape_b", "kind": "scrape", "depends_on": ["search_b"], "input": {{"source": "search_b", "url_index": 0}}}},
  {{"id": "compare", "kind": "compare", "depends_on": ["scrape_a", "scrape_b"], "input": {{"sources": ["scrape_a", "scrape_b"]}}}}
 ]}}"#
    )
}

pub fn corrective_request(query: &str, previous: &str, problem: &str) -> String {
    format!(
        r#"Your previous plan for the query below was rejected.

Query: {query}

Problem: {problem}

Previous output:
{previous}

Return a corrected plan as a single JSON object that follows every rule."#
    )
}
