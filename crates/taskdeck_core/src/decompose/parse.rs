//! Defensive parsing of decomposition output.
//!
//! Accepted shapes, tried in order:
//! 1. a JSON array of strings, optionally fenced or surrounded by prose;
//! 2. a JSON object holding that array under `subtasks`, `tasks` or `steps`;
//! 3. a Markdown bullet or numbered list.
//!
//! Anything else is `Malformed`.

use crate::decompose::{DecompositionError, UnavailableReason};
use crate::model::task::TITLE_MAX_CHARS;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const ARRAY_KEYS: &[&str] = &["subtasks", "tasks", "steps"];

static CODE_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[A-Za-z0-9_-]*").expect("valid code fence regex"));
static LIST_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:[-*+•]|\d{1,3}[.)])[ \t]+(.+?)[ \t]*$").expect("valid list regex")
});

/// Extracts raw subtask candidates from free-form service output.
pub fn parse_subtasks(raw: &str) -> Result<Vec<String>, UnavailableReason> {
    let text = CODE_FENCE_RE.replace_all(raw, "");

    if let Some(items) = parse_json_items(&text) {
        return Ok(items);
    }

    let listed: Vec<String> = LIST_ITEM_RE
        .captures_iter(&text)
        .filter_map(|caps| caps.get(1).map(|item| item.as_str().to_string()))
        .collect();
    if !listed.is_empty() {
        return Ok(listed);
    }

    Err(UnavailableReason::Malformed(
        "expected a JSON array or a list of subtasks".to_string(),
    ))
}

/// Trims, drops blanks, shortens over-long titles and caps the count.
pub fn normalize_subtasks(
    items: Vec<String>,
    max_subtasks: usize,
) -> Result<Vec<String>, DecompositionError> {
    let mut subtasks: Vec<String> = items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(shorten_title)
        .collect();

    if subtasks.len() > max_subtasks {
        warn!(
            "event=decompose_truncate module=decompose status=ok received={} kept={}",
            subtasks.len(),
            max_subtasks
        );
        subtasks.truncate(max_subtasks);
    }

    if subtasks.is_empty() {
        return Err(DecompositionError::Empty);
    }
    Ok(subtasks)
}

fn parse_json_items(text: &str) -> Option<Vec<String>> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        if let Some(items) = items_from_value(&value) {
            return Some(items);
        }
    }

    // Prose may carry its own brackets: take the first `[` that starts a
    // complete array with at least one string.
    text.match_indices('[').find_map(|(start, _)| {
        let value = serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Value>()
            .next()?
            .ok()?;
        items_from_value(&value).filter(|items| !items.is_empty())
    })
}

fn items_from_value(value: &Value) -> Option<Vec<String>> {
    let array = match value {
        Value::Array(array) => array,
        Value::Object(map) => ARRAY_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))?,
        _ => return None,
    };
    Some(
        array
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}

fn shorten_title(item: &str) -> String {
    if item.chars().count() <= TITLE_MAX_CHARS {
        return item.to_string();
    }
    item.chars()
        .take(TITLE_MAX_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}
