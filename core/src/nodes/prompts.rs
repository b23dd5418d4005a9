//! Prompt templates for the LLM-backed nodes.

use crate::backend::{ProductData, SearchHit};

pub const SUMMARIZE_SYSTEM: &str = "You are an expert product analyst. Create concise, \
informative summaries that highlight key features, value proposition and target audience. \
Be objective and factual.";

pub const SENTIMENT_SYSTEM: &str = "You are a sentiment analysis expert. Analyze product \
reviews and data to determine overall sentiment and identify key themes. \
Be data-driven and specific.";

pub const COMPARE_SYSTEM: &str = "You are a product comparison expert. Compare products \
objectively across features, price, quality and value. Provide clear recommendations.";

fn product_json(product: &ProductData) -> String {
    serde_json::to_string_pretty(product).unwrap_or_else(|_| product.url.clone())
}

pub fn summarize(product: &ProductData) -> String {
    format!(
        r#"Analyze this product and write a summary.

Product information:
{product}

Cover the overview, the 3-5 most important features, the value proposition,
the target audience, and a balanced view of pros and cons. Keep it to 300-400 words.

Respond with a single JSON object:
{{"summary": "<markdown summary>", "highlights": ["<short highlight>", ...]}}"#,
        product = product_json(product)
    )
}

pub fn sentiment(product: &ProductData) -> String {
    format!(
        r#"Analyze the sentiment for this product based on all available information.

Product data:
{product}

Consider the rating and review count, features and description, price positioning,
availability and overall value proposition.

Respond with a single JSON object:
{{
  "overall": "positive" | "neutral" | "negative",
  "score": <number from -1.0 (most negative) to 1.0 (most positive)>,
  "key_positive_themes": ["..."],
  "key_negative_themes": ["..."],
  "confidence": <number from 0.0 to 1.0>,
  "positive_percentage": <integer 0-100>,
  "neutral_percentage": <integer 0-100>,
  "negative_percentage": <integer 0-100>,
  "analysis_summary": "<two or three sentences>"
}}"#,
        product = product_json(product)
    )
}

pub fn compare(products: &[&ProductData], candidates: &[SearchHit]) -> String {
    let products = products
        .iter()
        .map(|p| product_json(p))
        .collect::<Vec<_>>()
        .join(",\n");
    let candidates = if candidates.is_empty() {
        "(none found; suggest well-known alternatives)".to_string()
    } else {
        candidates
            .iter()
            .map(|h| match &h.title {
                Some(title) => format!("- {title} ({})", h.url),
                None => format!("- {}", h.url),
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"Compare the following product(s) against their alternatives.

Products:
[{products}]

Candidate alternatives from search:
{candidates}

Compare features, price, quality and value, and name the best option for
different buyers.

Respond with a single JSON object:
{{
  "alternatives": [
    {{"name": "...", "url": "..." | null, "price": "..." | null,
      "attributes": {{"<attribute>": "<value>"}}, "verdict": "..."}}
  ],
  "recommendation": "<one or two sentence final verdict>"
}}"#
    )
}
