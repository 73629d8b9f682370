//! Prompt templates for notification escalation.

use crate::types::{format_transcript, ConversationMessage, UserNotificationProfile};

pub const NOTIFICATION_DECISION_PROMPT: &str = r#"You decide whether a chat participant should receive a push notification for a new message.

Notify when the message needs the recipient's attention soon: it addresses them, asks them something, changes plans they are part of, or carries news they would regret missing. Do not notify for chatter, reactions, or messages that only matter to others.

Take the recipient's preferences into account:
- preferred rate "low" means only notify when clearly relevant
- preferred rate "high" means notify whenever the message plausibly concerns them
- learned keywords are topics they found notifications helpful for
- suppressed topics are topics they found notifications unhelpful for

Respond with a single JSON object and nothing else:
{
  "shouldNotify": true or false,
  "reason": "short explanation",
  "notificationText": "text for the notification, empty when shouldNotify is false",
  "priority": "high" | "medium" | "low"
}"#;

/// Render the recipient's learned preferences for the prompt.
pub fn profile_context(profile: Option<&UserNotificationProfile>) -> String {
    match profile {
        Some(p) => {
            let list = |terms: &[String]| {
                if terms.is_empty() {
                    "none".to_string()
                } else {
                    terms.join(", ")
                }
            };
            format!(
                "Preferred notification rate: {}\nLearned keywords: {}\nSuppressed topics: {}",
                p.preferred_notification_rate,
                list(&p.learned_keywords),
                list(&p.suppressed_topics),
            )
        }
        None => "No learned preferences yet.".to_string(),
    }
}

/// User message describing one decision to make.
pub fn build_decision_prompt(
    recipient_name: &str,
    sender_name: &str,
    message_text: &str,
    transcript: &[ConversationMessage],
    profile: Option<&UserNotificationProfile>,
) -> String {
    let history = if transcript.is_empty() {
        "(no earlier messages)".to_string()
    } else {
        format_transcript(transcript)
    };
    format!(
        "Recipient: {recipient}\n{profile}\n\nRecent conversation:\n{history}\n\nNew message from {sender}:\n{text}",
        recipient = recipient_name,
        profile = profile_context(profile),
        history = history,
        sender = sender_name,
        text = message_text,
    )
}
