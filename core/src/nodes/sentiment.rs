use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::NodeError;
use crate::executor::PriorResults;
use crate::llm::{LlmRequest, LlmRouter, TaskType};
use crate::plan::{TaskInput, TaskKind};

use super::parse::parse_json;
use super::{
    prompts, wrong_input, SentimentBreakdown, SentimentLabel, SentimentPayload, TaskNode,
    TaskPayload,
};

#[derive(Deserialize)]
struct SentimentReply {
    #[serde(alias = "overall")]
    label: String,
    score: f64,
    #[serde(default, alias = "analysis_summary")]
    rationale: String,
    #[serde(default, alias = "key_positive_themes")]
    positive_themes: Vec<String>,
    #[serde(default, alias = "key_negative_themes")]
    negative_themes: Vec<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    positive_percentage: Option<f64>,
    #[serde(default)]
    neutral_percentage: Option<f64>,
    #[serde(default)]
    negative_percentage: Option<f64>,
}

struct Verdict {
    label: SentimentLabel,
    score: f64,
    rationale: String,
    positive_themes: Vec<String>,
    negative_themes: Vec<String>,
    confidence: Option<f64>,
    breakdown: Option<SentimentBreakdown>,
}

/// All three shares must be present and within [0, 100]; anything else is dropped.
fn breakdown(reply: &SentimentReply) -> Option<SentimentBreakdown> {
    let pct = |v: Option<f64>| {
        v.filter(|p| p.is_finite() && (0.0..=100.0).contains(p))
            .map(|p| p.round() as u8)
    };
    Some(SentimentBreakdown {
        positive: pct(reply.positive_percentage)?,
        neutral: pct(reply.neutral_percentage)?,
        negative: pct(reply.negative_percentage)?,
    })
}

fn parse_sentiment(text: &str) -> Result<Verdict, NodeError> {
    let reply: SentimentReply = parse_json(text)?;

    let label = SentimentLabel::parse(&reply.label).ok_or_else(|| {
        NodeError::MalformedOutput(format!("unknown sentiment label '{}'", reply.label))
    })?;
    if !reply.score.is_finite() || !(-1.0..=1.0).contains(&reply.score) {
        return Err(NodeError::MalformedOutput(format!(
            "sentiment score {} outside [-1, 1]",
            reply.score
        )));
    }
    let rationale = reply.rationale.trim().to_string();
    if rationale.is_empty() {
        return Err(NodeError::MalformedOutput("sentiment has no rationale".into()));
    }

    let breakdown = breakdown(&reply);
    Ok(Verdict {
        label,
        score: reply.score,
        rationale,
        positive_themes: reply.positive_themes,
        negative_themes: reply.negative_themes,
        confidence: reply
            .confidence
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0)),
        breakdown,
    })
}

pub struct SentimentNode {
    router: Arc<LlmRouter>,
}

impl SentimentNode {
    pub fn new(router: Arc<LlmRouter>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl TaskNode for SentimentNode {
    fn kind(&self) -> TaskKind {
        TaskKind::Sentiment
    }

    async fn execute(
        &self,
        input: &TaskInput,
        prior: &PriorResults,
    ) -> Result<TaskPayload, NodeError> {
        let TaskInput::Sentiment { source } = input else {
            return Err(wrong_input(TaskKind::Sentiment, input));
        };
        let product = prior.product(source)?;

        let request = LlmRequest::new(prompts::sentiment(product))
            .with_system(prompts::SENTIMENT_SYSTEM)
            .with_temperature(0.5)
            .json();
        let response = self.router.invoke(TaskType::Sentiment, &request).await?;

        let verdict = parse_sentiment(&response.text)?;
        tracing::debug!(
            provider = %response.provider,
            label = %verdict.label,
            score = verdict.score,
            "sentiment analysed"
        );

        Ok(TaskPayload::Sentiment(SentimentPayload {
            product_url: product.url.clone(),
            product_title: product.title.clone(),
            label: verdict.label,
            score: verdict.score,
            rationale: verdict.rationale,
            positive_themes: verdict.positive_themes,
            negative_themes: verdict.negative_themes,
            confidence: verdict.confidence,
            breakdown: verdict.breakdown,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model_field_names() {
        let verdict = parse_sentiment(
            r#"{"overall": "Mixed", "score": 0.1, "analysis_summary": "Fine.",
                "key_positive_themes": ["fit"], "confidence": 1.4}"#,
        )
        .unwrap();
        assert_eq!(verdict.label, SentimentLabel::Neutral);
        assert_eq!(verdict.rationale, "Fine.");
        assert_eq!(verdict.positive_themes, vec!["fit".to_string()]);
        assert_eq!(verdict.confidence, Some(1.0));
    }

    #[test]
    fn test_percentage_breakdown() {
        let verdict = parse_sentiment(
            r#"{"overall": "positive", "score": 0.6, "analysis_summary": "Liked.",
                "positive_percentage": 70, "neutral_percentage": 20, "negative_percentage": 10}"#,
        )
        .unwrap();
        assert_eq!(
            verdict.breakdown,
            Some(SentimentBreakdown {
                positive: 70,
                neutral: 20,
                negative: 10
            })
        );

        let partial = parse_sentiment(
            r#"{"overall": "positive", "score": 0.6, "analysis_summary": "Liked.",
                "positive_percentage": 70, "neutral_percentage": 140, "negative_percentage": 10}"#,
        )
        .unwrap();
        assert_eq!(partial.breakdown, None);
    }

    #[test]
    fn test_out_of_range_score_is_malformed() {
        let err = parse_sentiment(r#"{"label": "positive", "score": 4.5, "rationale": "x"}"#)
            .err()
            .unwrap();
        assert_eq!(err.code(), "malformed_output");
    }

    #[test]
    fn test_unknown_label_is_malformed() {
        assert!(parse_sentiment(r#"{"label": "ecstatic", "score": 0.9, "rationale": "x"}"#).is_err());
        assert!(parse_sentiment(r#"{"label": "positive", "score": 0.9}"#).is_err());
    }
}
