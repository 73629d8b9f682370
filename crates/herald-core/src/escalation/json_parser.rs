//! Parsing of inference responses into decisions.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ErrorCode, HeraldError, HeraldResult};
use crate::types::{notification_text, NotificationDecision, Priority};

static CODE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").unwrap());
static THINK_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

/// Strip reasoning tags and code fences, returning the JSON candidate.
pub fn extract_json(text: &str) -> String {
    let without_think = THINK_TAGS.replace_all(text, "");
    let text = without_think.trim();

    if let Some(content) = CODE_BLOCK.captures(text).and_then(|c| c.get(1)) {
        return content.as_str().trim().to_string();
    }

    // Some models wrap the object in prose; take the outermost braces.
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => text[start..=end].to_string(),
        _ => text.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(alias = "shouldNotify", alias = "notify")]
    should_notify: bool,
    #[serde(default)]
    reason: String,
    #[serde(default, alias = "notificationText")]
    notification_text: Option<String>,
    #[serde(default)]
    priority: Option<String>,
}

/// Parse a decision, normalizing it for the given message.
///
/// A skip never carries text; a notify without text gets the standard
/// `"{sender}: {preview}"` text.
pub fn parse_decision(
    response: &str,
    sender_name: &str,
    message_text: &str,
) -> HeraldResult<NotificationDecision> {
    let json_str = extract_json(response);
    if json_str.is_empty() {
        return Err(HeraldError::Parse {
            message: "Empty inference response".to_string(),
            code: ErrorCode::ParseInvalidJson,
        });
    }

    let raw: RawDecision = serde_json::from_str(&json_str).map_err(|e| HeraldError::Parse {
        message: format!("Failed to parse decision JSON: {}", e),
        code: ErrorCode::ParseInvalidJson,
    })?;

    let reason = raw.reason.trim();
    if reason.is_empty() {
        return Err(HeraldError::Parse {
            message: "Decision is missing a reason".to_string(),
            code: ErrorCode::ParseMissingField,
        });
    }

    if !raw.should_notify {
        return Ok(NotificationDecision::skip(reason));
    }

    let priority = match raw.priority.as_deref().map(str::trim) {
        None | Some("") => Priority::Medium,
        Some(p) => p.parse().unwrap_or_else(|_| {
            debug!(priority = p, "Unknown priority from inference, using medium");
            Priority::Medium
        }),
    };
    let text = match raw.notification_text.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => notification_text(sender_name, message_text),
    };

    Ok(NotificationDecision::notify(reason, text, priority))
}
