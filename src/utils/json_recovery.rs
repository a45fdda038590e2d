//! Best-effort structured-output recovery.
//!
//! Model replies are expected to be JSON but frequently arrive wrapped in
//! prose or code fences. [`recover_json`] tries a strict parse first, then
//! exactly one extraction attempt: the first bracket-balanced `{...}` or
//! `[...]` span. Nothing beyond that is guessed; callers substitute their own
//! documented default on error.

use crate::types::{AppError, Result};
use serde::de::DeserializeOwned;

/// Parse `text` as `T`, falling back to the first balanced JSON span.
pub fn recover_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    let span = extract_balanced(trimmed)
        .ok_or_else(|| AppError::ModelOutput("no JSON object or array found".to_string()))?;

    serde_json::from_str(span)
        .map_err(|e| AppError::ModelOutput(format!("extracted JSON is invalid: {}", e)))
}

/// Return the first balanced `{...}` or `[...]` span in `text`.
///
/// Brackets inside JSON string literals are ignored.
pub fn extract_balanced(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' | '[' => stack.push(ch),
            '}' | ']' => {
                let expected = if ch == '}' { '{' } else { '[' };
                if stack.pop() != Some(expected) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Agent {
        #[serde(rename = "agentType")]
        agent_type: String,
    }

    #[test]
    fn test_strict_parse() {
        let queries: Vec<String> = recover_json(r#"["a", "b"]"#).unwrap();
        assert_eq!(queries, vec!["a", "b"]);
    }

    #[test]
    fn test_extracts_from_prose() {
        let reply = "Sure! Here is the agent:\n```json\n{\"agentType\": \"News Agent\"}\n```\nGood luck.";
        let agent: Agent = recover_json(reply).unwrap();
        assert_eq!(agent.agent_type, "News Agent");
    }

    #[test]
    fn test_ignores_brackets_in_strings() {
        let reply = r#"Result: {"agentType": "A {weird} [name]"} trailing }"#;
        assert_eq!(
            extract_balanced(reply),
            Some(r#"{"agentType": "A {weird} [name]"}"#)
        );
    }

    #[test]
    fn test_nested_array_in_object() {
        let reply = r#"ok {"subtopics": [{"task": "x"}]} done"#;
        assert_eq!(
            extract_balanced(reply),
            Some(r#"{"subtopics": [{"task": "x"}]}"#)
        );
    }

    #[test]
    fn test_unbalanced_fails() {
        assert!(extract_balanced("{\"a\": [1, 2}").is_none());
        assert!(extract_balanced("no json here").is_none());
        let result: Result<Vec<String>> = recover_json("{\"a\": 1");
        assert!(matches!(result, Err(AppError::ModelOutput(_))));
    }

    #[test]
    fn test_wrong_shape_fails() {
        let result: Result<Vec<String>> = recover_json(r#"{"queries": ["a"]}"#);
        assert!(result.is_err());
    }
}
