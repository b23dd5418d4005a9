use serde::de::DeserializeOwned;

use crate::error::NodeError;

/// Locate the JSON object in a model reply.
///
/// Markdown code fences are stripped first; the object then spans from the
/// first `{` to the last `}`.
pub fn extract_json(text: &str) -> Option<&str> {
    let mut body = text.trim();

    if let Some(start) = body.find("```") {
        let after = &body[start + 3..];
        // Skip the info string (`json`, `JSON`, ...) up to the end of the line.
        let after = after.find('\n').map(|i| &after[i + 1..]).unwrap_or(after);
        body = match after.find("```") {
            Some(end) => &after[..end],
            None => after,
        };
    }

    let open = body.find('{')?;
    let close = body.rfind('}')?;
    (close > open).then(|| &body[open..=close])
}

pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, NodeError> {
    let json = extract_json(text)
        .ok_or_else(|| NodeError::MalformedOutput(format!("no JSON object in reply: {}", preview(text))))?;
    serde_json::from_str(json).map_err(|e| NodeError::MalformedOutput(e.to_string()))
}

pub(crate) fn preview(text: &str) -> String {
    const MAX: usize = 120;
    let text = text.trim();
    if text.chars().count() <= MAX {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX).collect();
    format!("{cut}...")
}
