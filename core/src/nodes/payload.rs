use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::backend::{ProductData, SearchHit};

/// Kind-specific output of a successful task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskPayload {
    DetectedUrl {
        url: Option<String>,
    },
    SearchHits {
        query: String,
        hits: Vec<SearchHit>,
    },
    Product(ProductData),
    Summary(SummaryPayload),
    Sentiment(SentimentPayload),
    Comparison(ComparisonPayload),
    Custom {
        name: String,
        value: serde_json::Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryPayload {
    pub product_url: String,
    pub product_title: Option<String>,
    pub text: String,
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "neutral" | "mixed" => Some(Self::Neutral),
            "negative" => Some(Self::Negative),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentPayload {
    pub product_url: String,
    pub product_title: Option<String>,
    pub label: SentimentLabel,
    /// In [-1, 1]; negative is unfavourable.
    pub score: f64,
    pub rationale: String,
    #[serde(default)]
    pub positive_themes: Vec<String>,
    #[serde(default)]
    pub negative_themes: Vec<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<SentimentBreakdown>,
}

/// Share of reviews per polarity, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    pub positive: u8,
    pub neutral: u8,
    pub negative: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub verdict: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonPayload {
    /// Display names of the compared products, in source order.
    pub products: Vec<String>,
    pub alternatives: Vec<Alternative>,
    pub recommendation: String,
}
