//! Tolerant extraction of a roadmap from provider text
//!
//! This is lossy best-effort extraction, not JSON repair: the reply is
//! parsed strictly, and failing that the single greedy span from the first
//! `{` to the last `}` is parsed. Anything else is rejected.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::types::{MAX_TASKS, RoadmapResult};

/// Why a provider reply was rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no JSON object found in reply")]
    NoJson,

    #[error("reply is not a JSON object")]
    NotAnObject,

    #[error("description is missing or blank")]
    MissingDescription,

    #[error("no usable tasks")]
    NoTasks,
}

/// Find a JSON value in `text`
pub fn extract_json(text: &str) -> Result<Value, ParseError> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find('{').ok_or(ParseError::NoJson)?;
    let end = trimmed.rfind('}').ok_or(ParseError::NoJson)?;
    if end < start {
        return Err(ParseError::NoJson);
    }

    debug!(start, end, "extract_json: falling back to brace span");
    serde_json::from_str::<Value>(&trimmed[start..=end]).map_err(|_| ParseError::NoJson)
}

/// Check shape and normalize into a `RoadmapResult`
pub fn validate(value: Value) -> Result<RoadmapResult, ParseError> {
    let Value::Object(map) = value else {
        return Err(ParseError::NotAnObject);
    };

    let description = map
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or(ParseError::MissingDescription)?
        .to_string();

    let tasks: Vec<String> = match map.get("tasks") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(task_text)
            .filter(|t| !t.is_empty())
            .take(MAX_TASKS)
            .collect(),
        _ => Vec::new(),
    };

    if tasks.is_empty() {
        return Err(ParseError::NoTasks);
    }

    Ok(RoadmapResult { description, tasks })
}

/// Parse a raw provider reply end to end
pub fn parse_roadmap(text: &str) -> Result<RoadmapResult, ParseError> {
    validate(extract_json(text)?)
}

// Strings are trimmed, scalars stringified, other kinds dropped
fn task_text(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
