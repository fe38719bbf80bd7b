//! Analysis response parsing.
//!
//! These functions extract structured feedback and suggestions from
//! free-form model replies. They are pure domain logic with no I/O, only
//! text inspection.
//!
//! # Supported Formats
//!
//! 1. **JSON** (preferred): an object anywhere in the reply, including inside
//!    a fenced code block
//! 2. **Plain text**: the whole reply becomes the summary / suggestion

use super::entities::{FeedbackResult, SuggestionResult};
use crate::core::error::DomainError;
use serde_json::Value;

/// Parse a feedback reply.
///
/// # Examples
///
/// ```
/// use parley_domain::parse_feedback_response;
///
/// let fb = parse_feedback_response(r#"{"summary": "Warm opener", "score": 8}"#).unwrap();
/// assert_eq!(fb.summary, "Warm opener");
/// assert_eq!(fb.score, Some(8));
///
/// let fb = parse_feedback_response("Try asking a question back.").unwrap();
/// assert_eq!(fb.summary, "Try asking a question back.");
/// ```
pub fn parse_feedback_response(response: &str) -> Result<FeedbackResult, DomainError> {
    let trimmed = non_empty(response)?;

    if let Some(Value::Object(map)) = extract_json_object(trimmed) {
        let summary = string_field(&map, &["summary", "feedback"]);
        let strengths = string_list(map.get("strengths"));
        let improvements = string_list(map.get("improvements").or_else(|| map.get("tips")));
        let score = map.get("score").and_then(parse_score);

        if summary.is_some() || !strengths.is_empty() || !improvements.is_empty() {
            return Ok(FeedbackResult {
                summary: summary.unwrap_or_default(),
                strengths,
                improvements,
                score,
            });
        }
    }

    Ok(FeedbackResult::from_summary(trimmed))
}

/// Parse a coaching suggestion reply.
pub fn parse_suggestion_response(response: &str) -> Result<SuggestionResult, DomainError> {
    let trimmed = non_empty(response)?;

    if let Some(Value::Object(map)) = extract_json_object(trimmed)
        && let Some(suggestion) = string_field(&map, &["suggestion", "message"])
    {
        let mut result = SuggestionResult::new(suggestion);
        if let Some(rationale) = string_field(&map, &["rationale", "reason"]) {
            result = result.with_rationale(rationale);
        }
        return Ok(result);
    }

    Ok(SuggestionResult::new(trimmed))
}

fn non_empty(response: &str) -> Result<&str, DomainError> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        Err(DomainError::EmptyReply)
    } else {
        Ok(trimmed)
    }
}

/// Locate the outermost `{ ... }` span and parse it.
fn extract_json_object(response: &str) -> Option<Value> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}

fn string_field(map: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Scores are clamped to 1-10.
fn parse_score(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.split('/').next()?.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Some(raw.round().clamp(1.0, 10.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_from_fenced_json() {
        let reply = r#"Here you go:
```json
{"summary": "Friendly and clear.", "strengths": ["greeting"], "improvements": ["ask a follow-up"], "score": 7}
```"#;
        let fb = parse_feedback_response(reply).unwrap();
        assert_eq!(fb.summary, "Friendly and clear.");
        assert_eq!(fb.strengths, vec!["greeting"]);
        assert_eq!(fb.improvements, vec!["ask a follow-up"]);
        assert_eq!(fb.score, Some(7));
    }

    #[test]
    fn feedback_score_is_clamped_and_accepts_fractions() {
        let fb = parse_feedback_response(r#"{"summary": "ok", "score": 42}"#).unwrap();
        assert_eq!(fb.score, Some(10));

        let fb = parse_feedback_response(r#"{"summary": "ok", "score": "6/10"}"#).unwrap();
        assert_eq!(fb.score, Some(6));
    }

    #[test]
    fn feedback_falls_back_to_plain_text() {
        let fb = parse_feedback_response("  Nice use of humor.  ").unwrap();
        assert_eq!(fb.summary, "Nice use of humor.");
        assert!(fb.strengths.is_empty());
        assert_eq!(fb.score, None);
    }

    #[test]
    fn unrelated_json_is_treated_as_text() {
        let fb = parse_feedback_response(r#"{"foo": 1}"#).unwrap();
        assert_eq!(fb.summary, r#"{"foo": 1}"#);
    }

    #[test]
    fn empty_reply_is_an_error() {
        assert_eq!(parse_feedback_response("   "), Err(DomainError::EmptyReply));
        assert_eq!(parse_suggestion_response(""), Err(DomainError::EmptyReply));
    }

    #[test]
    fn suggestion_with_rationale() {
        let s = parse_suggestion_response(
            r#"{"suggestion": "Ask what they recommend.", "rationale": "Keeps the barista talking."}"#,
        )
        .unwrap();
        assert_eq!(s.suggestion, "Ask what they recommend.");
        assert_eq!(s.rationale.as_deref(), Some("Keeps the barista talking."));
    }

    #[test]
    fn suggestion_plain_text() {
        let s = parse_suggestion_response("Say thank you.").unwrap();
        assert_eq!(s, SuggestionResult::new("Say thank you."));
    }
}
