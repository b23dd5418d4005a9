use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::NodeError;
use crate::executor::PriorResults;
use crate::plan::{TaskInput, TaskKind};

use super::{wrong_input, TaskNode, TaskPayload};

static URL_REGEX: OnceLock<Regex> = OnceLock::new();

/// First `http(s)://` token in `text`, without trailing punctuation.
pub fn find_url(text: &str) -> Option<String> {
    let re = URL_REGEX.get_or_init(|| Regex::new(r"https?://[^\s<>]+").expect("URL_REGEX is valid"));
    re.find(text)
        .map(|m| {
            m.as_str()
                .trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']', '"', '\''])
                .to_string()
        })
        .filter(|url| url.len() > "https://".len())
}

/// Pulls a product URL out of the user query. Never fails; no URL is a
/// valid outcome.
pub struct DetectUrlNode;

#[async_trait]
impl TaskNode for DetectUrlNode {
    fn kind(&self) -> TaskKind {
        TaskKind::DetectUrl
    }

    async fn execute(
        &self,
        input: &TaskInput,
        _prior: &PriorResults,
    ) -> Result<TaskPayload, NodeError> {
        let TaskInput::DetectUrl { query } = input else {
            return Err(wrong_input(TaskKind::DetectUrl, input));
        };
        let url = find_url(query);
        tracing::debug!(found = url.is_some(), "url detection");
        Ok(TaskPayload::DetectedUrl { url })
    }
}
