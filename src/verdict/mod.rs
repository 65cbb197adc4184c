//! Parse free-text assistant replies into structured verdicts.
//!
//! Replies are asked for in a fixed JSON shape, but the assistant is not
//! deterministic: it wraps JSON in markdown fences, adds prose around it, or
//! drops the JSON entirely. Extraction therefore degrades in stages:
//!
//! 1. the first `{` through the last `}` in the reply, parsed as JSON;
//! 2. regex fallback for `confidence: <float>` and `explanation: "..."`;
//! 3. a parse-error verdict carrying the raw reply.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

/// Flag set when a reply contained JSON that could not be parsed.
pub const FLAG_PARSING_ERROR: &str = "PARSING_ERROR";

/// Flag set when the assistant interaction itself failed.
pub const FLAG_VALIDATION_ERROR: &str = "VALIDATION_ERROR";

/// Confidence assigned when only the regex fallback matched nothing.
const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Confidence assigned when reply JSON was present but unparseable.
const PARSE_ERROR_CONFIDENCE: f64 = 0.4;

/// A structured judgment extracted from one assistant reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Assistant's confidence in the datapoint, clamped to `[0.0, 1.0]`.
    pub confidence: f64,
    /// Free-text reasoning.
    pub explanation: String,
    /// Issue flags raised by the assistant (or by parsing itself).
    pub flags: Vec<String>,
    /// The unmodified reply, kept for later review.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl Verdict {
    /// Verdict recorded when the assistant interaction failed outright.
    pub fn transport_error(message: &str) -> Self {
        Self {
            confidence: 0.0,
            explanation: format!("Error: {message}"),
            flags: vec![FLAG_VALIDATION_ERROR.to_string()],
            raw_response: None,
        }
    }

    /// Verdict recorded when a reply arrived but could not be parsed.
    pub fn parse_error(message: &str) -> Self {
        Self {
            confidence: PARSE_ERROR_CONFIDENCE,
            explanation: format!("Error extracting validation: {message}"),
            flags: vec![FLAG_PARSING_ERROR.to_string()],
            raw_response: None,
        }
    }
}

/// Batch replies that lack the expected structure.
#[derive(Debug, Error)]
pub enum BatchParseError {
    #[error("no JSON object found in batch reply")]
    NoJson,
    #[error("invalid JSON in batch reply: {0}")]
    InvalidJson(String),
    #[error("batch reply has no data_points object")]
    MissingDataPoints,
}

/// Parse a single-datapoint reply. Never fails: degraded replies produce
/// degraded verdicts instead.
pub fn parse_verdict(reply: &str) -> Verdict {
    match extract_json(reply) {
        Some(json_str) => match serde_json::from_str::<serde_json::Value>(json_str) {
            Ok(value) => {
                let mut verdict = verdict_from_value(&value);
                verdict.raw_response = Some(reply.to_string());
                verdict
            }
            Err(e) => {
                let mut verdict = Verdict::parse_error(&e.to_string());
                verdict.raw_response = Some(reply.to_string());
                verdict
            }
        },
        None => regex_fallback(reply),
    }
}

/// Parse a batched reply into a map of datapoint name to verdict.
pub fn parse_batch(reply: &str) -> Result<BTreeMap<String, Verdict>, BatchParseError> {
    let json_str = extract_json(reply).ok_or(BatchParseError::NoJson)?;
    let value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| BatchParseError::InvalidJson(e.to_string()))?;

    let points = value
        .get("data_points")
        .and_then(|v| v.as_object())
        .ok_or(BatchParseError::MissingDataPoints)?;

    Ok(points
        .iter()
        .map(|(name, v)| (name.clone(), verdict_from_value(v)))
        .collect())
}

/// Slice from the first `{` to the last `}`, which also covers JSON inside
/// markdown fences.
fn extract_json(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

fn verdict_from_value(value: &serde_json::Value) -> Verdict {
    let confidence = value
        .get("confidence")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);

    let explanation = value
        .get("explanation")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let flags = value
        .get("flags")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|f| f.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Verdict {
        confidence,
        explanation,
        flags,
        raw_response: None,
    }
}

fn confidence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"confidence"?\s*:?\s*(?:is\s+)?([0-9]*\.?[0-9]+)"#)
            .expect("confidence regex is valid")
    })
}

fn explanation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"explanation"?\s*:\s*"([^"]+)""#).expect("explanation regex is valid")
    })
}

/// Best-effort extraction for prose replies without any JSON object.
fn regex_fallback(reply: &str) -> Verdict {
    let confidence = confidence_re()
        .captures(reply)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(FALLBACK_CONFIDENCE)
        .clamp(0.0, 1.0);

    let explanation = explanation_re()
        .captures(reply)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "Could not extract explanation".to_string());

    Verdict {
        confidence,
        explanation,
        flags: Vec::new(),
        raw_response: Some(reply.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let reply = r#"{"confidence": 0.85, "explanation": "Plausible for the sector", "flags": []}"#;
        let v = parse_verdict(reply);
        assert!((v.confidence - 0.85).abs() < 1e-9);
        assert_eq!(v.explanation, "Plausible for the sector");
        assert!(v.flags.is_empty());
        assert_eq!(v.raw_response.as_deref(), Some(reply));
    }

    #[test]
    fn test_parse_fenced_json_with_prose() {
        let reply = "Here is my assessment:\n```json\n{\"confidence\": 0.6, \"explanation\": \"Revenue seems high\", \"flags\": [\"REVENUE_OUTLIER\"]}\n```\nLet me know if you need more.";
        let v = parse_verdict(reply);
        assert!((v.confidence - 0.6).abs() < 1e-9);
        assert_eq!(v.flags, vec!["REVENUE_OUTLIER"]);
    }

    #[test]
    fn test_parse_confidence_clamped() {
        let v = parse_verdict(r#"{"confidence": 1.7, "explanation": "x", "flags": []}"#);
        assert!((v.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_regex_fallback_on_prose() {
        let reply = r#"My confidence is 0.7 and my explanation: "The employee count fits the revenue band.""#;
        let v = parse_verdict(reply);
        assert!((v.confidence - 0.7).abs() < 1e-9);
        assert_eq!(v.explanation, "The employee count fits the revenue band.");
        assert!(v.flags.is_empty());
    }

    #[test]
    fn test_fallback_defaults_when_nothing_matches() {
        let v = parse_verdict("I cannot judge this.");
        assert!((v.confidence - FALLBACK_CONFIDENCE).abs() < 1e-9);
        assert_eq!(v.explanation, "Could not extract explanation");
    }

    #[test]
    fn test_broken_json_flags_parsing_error() {
        let v = parse_verdict(r#"{"confidence": 0.9, "explanation": "unterminated"#);
        // No closing brace at all -> fallback path, not parse error.
        assert!(v.flags.is_empty());

        let v = parse_verdict(r#"{"confidence": 0.9, oops}"#);
        assert!((v.confidence - PARSE_ERROR_CONFIDENCE).abs() < 1e-9);
        assert_eq!(v.flags, vec![FLAG_PARSING_ERROR]);
        assert!(v.raw_response.is_some());
    }

    #[test]
    fn test_parse_batch() {
        let reply = r#"
        {
          "data_points": {
            "revenue": {"confidence": 0.8, "explanation": "ok", "flags": []},
            "employee_count": {"confidence": 0.3, "explanation": "low", "flags": ["STALE_DATA"]}
          }
        }"#;
        let map = parse_batch(reply).unwrap();
        assert_eq!(map.len(), 2);
        assert!((map["revenue"].confidence - 0.8).abs() < 1e-9);
        assert_eq!(map["employee_count"].flags, vec!["STALE_DATA"]);
    }

    #[test]
    fn test_parse_batch_missing_data_points() {
        let err = parse_batch(r#"{"error": "rate limited"}"#).unwrap_err();
        assert!(matches!(err, BatchParseError::MissingDataPoints));

        let err = parse_batch("no json here").unwrap_err();
        assert!(matches!(err, BatchParseError::NoJson));
    }

    #[test]
    fn test_transport_error_verdict() {
        let v = Verdict::transport_error("browser closed");
        assert_eq!(v.confidence, 0.0);
        assert_eq!(v.flags, vec![FLAG_VALIDATION_ERROR]);
        assert!(v.explanation.contains("browser closed"));
    }
}
