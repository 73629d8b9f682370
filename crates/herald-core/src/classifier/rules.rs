//! Patterns and text predicates used by the heuristic rules.

use once_cell::sync::Lazy;
use regex::Regex;

pub(crate) static URGENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(urgent|urgently|asap|blocker|blocking|critical|p0|emergency|immediately)\b")
        .unwrap()
});

pub(crate) static REQUEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(can you|could you|would you|will you|please)\b").unwrap());

pub(crate) static TASK_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(assigned to|your task|action item for you|assigning (this |it )?to you|you are assigned|you're assigned)\b",
    )
    .unwrap()
});

pub(crate) static AUTO_REPLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(out of (the )?office|ooo|afk|brb|auto-?reply|automatic reply)\b").unwrap()
});

/// Closed list of messages that carry no information for the recipient.
const ACKNOWLEDGEMENTS: &[&str] = &[
    "ok", "okay", "k", "kk", "thanks", "thank you", "thx", "ty", "lol", "lmao", "haha", "hahaha",
    "nice", "sure", "got it", "cool", "great", "yes", "yep", "yeah", "no", "nope", "np",
    "sounds good", "will do", "noted", "awesome", "perfect", "+1", "done", "ack", "👍", "👌",
    "🙏", "😂", "❤️", "🎉", "🔥", "✅",
];

/// Whole-word, case-insensitive match of a name or phrase.
///
/// Built per call because the needle is user data. Boundaries are any
/// non-word character so names ending in punctuation still match.
pub(crate) fn contains_word(text: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }
    Regex::new(&format!(r"(?i)(?:^|\W){}(?:$|\W)", regex::escape(needle)))
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

/// `@name` addressed at the recipient.
pub(crate) fn contains_mention(text: &str, name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() {
        return false;
    }
    Regex::new(&format!(r"(?i)@{}(?:$|\W)", regex::escape(name)))
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

/// Name variants a recipient answers to: full display name and first name.
pub(crate) fn name_variants(display_name: &str) -> Vec<&str> {
    let full = display_name.trim();
    let mut variants = Vec::new();
    if full.chars().count() >= 2 {
        variants.push(full);
    }
    if let Some(first) = full.split_whitespace().next() {
        if first != full && first.chars().count() >= 2 {
            variants.push(first);
        }
    }
    variants
}

pub(crate) fn is_acknowledgement(text: &str) -> bool {
    let normalized = text
        .trim()
        .trim_end_matches(|c: char| matches!(c, '!' | '.' | '?' | ',' | '~'))
        .to_lowercase();
    ACKNOWLEDGEMENTS.contains(&normalized.as_str())
}

/// Non-empty text made only of whitespace and pictographic characters.
pub(crate) fn is_emoji_only(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_whitespace() || (!c.is_ascii() && !c.is_alphanumeric()))
}

pub(crate) fn is_automated_sender(sender_name: &str) -> bool {
    let lower = sender_name.to_lowercase();
    lower.contains("bot") || lower.contains("notification")
}
