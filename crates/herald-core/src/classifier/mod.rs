//! Heuristic classifier.
//!
//! A rule engine that resolves obvious cases without external inference.
//! Rules are evaluated in a fixed order and the first match wins. Every rule
//! that notifies comes before every rule that skips, so explicit addressing
//! beats brevity: "hi Ann" notifies Ann even though it is tiny.

mod rules;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, IntoEnumIterator};

use crate::types::{notification_text, NotificationDecision, Priority};

/// Which rule produced a classification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Rule {
    DirectMention,
    NameMentioned,
    Urgent,
    DirectRequest,
    TaskAssignment,
    LearnedKeyword,
    TooShort,
    Acknowledgement,
    EmojiOnly,
    AutomatedSender,
    AutoReply,
    Ambiguous,
}

impl Rule {
    /// Fixed human-readable reason. Learned-keyword reasons also name the
    /// keyword; see [`HeuristicClassifier::classify`].
    pub fn reason(&self) -> &'static str {
        match self {
            Rule::DirectMention => "Direct @mention",
            Rule::NameMentioned => "Recipient mentioned by name",
            Rule::Urgent => "Urgent message",
            Rule::DirectRequest => "Direct question/request",
            Rule::TaskAssignment => "Task assignment",
            Rule::LearnedKeyword => "Matches learned keyword",
            Rule::TooShort => "Message too short",
            Rule::Acknowledgement => "Common acknowledgment/reaction",
            Rule::EmojiOnly => "Emoji-only message",
            Rule::AutomatedSender => "Automated/bot message",
            Rule::AutoReply => "Auto-reply message",
            Rule::Ambiguous => "Requires contextual analysis",
        }
    }

    /// Whether `reason` was written by a rule rather than by inference,
    /// including the keyword-naming form of [`Rule::LearnedKeyword`].
    pub fn is_rule_reason(reason: &str) -> bool {
        Rule::iter().any(|rule| {
            reason
                .strip_prefix(rule.reason())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(':'))
        })
    }
}

/// Rule-engine verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    DefinitelyNotify { priority: Priority },
    DefinitelySkip,
    NeedEscalation,
}

/// Verdict with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub verdict: Verdict,
    pub rule: Rule,
    pub reason: String,
}

impl Classification {
    fn new(verdict: Verdict, rule: Rule) -> Self {
        Self {
            verdict,
            rule,
            reason: rule.reason().to_string(),
        }
    }

    fn notify(rule: Rule, priority: Priority) -> Self {
        Self::new(Verdict::DefinitelyNotify { priority }, rule)
    }

    fn skip(rule: Rule) -> Self {
        Self::new(Verdict::DefinitelySkip, rule)
    }

    /// Turn a definite verdict into a decision. `None` when escalation is
    /// needed.
    pub fn to_decision(&self, sender_name: &str, text: &str) -> Option<NotificationDecision> {
        match self.verdict {
            Verdict::DefinitelyNotify { priority } => Some(NotificationDecision::notify(
                self.reason.clone(),
                notification_text(sender_name, text),
                priority,
            )),
            Verdict::DefinitelySkip => Some(NotificationDecision::skip(self.reason.clone())),
            Verdict::NeedEscalation => None,
        }
    }
}

/// What the classifier looks at.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput<'a> {
    pub text: &'a str,
    pub sender_name: &'a str,
    pub recipient_name: &'a str,
    /// Learned keywords of the recipient in ranked order.
    pub learned_keywords: &'a [String],
}

/// Minimum trimmed length, in characters, of a message worth a look.
const MIN_CHARS: usize = 5;

/// Zero-latency notification rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, input: &ClassifierInput<'_>) -> Classification {
        let text = input.text;
        let names = rules::name_variants(input.recipient_name);

        if names.iter().any(|n| rules::contains_mention(text, n)) {
            return Classification::notify(Rule::DirectMention, Priority::High);
        }
        if names.iter().any(|n| rules::contains_word(text, n)) {
            return Classification::notify(Rule::NameMentioned, Priority::High);
        }
        if rules::URGENCY.is_match(text) {
            return Classification::notify(Rule::Urgent, Priority::High);
        }
        if rules::REQUEST.is_match(text) && text.contains('?') {
            return Classification::notify(Rule::DirectRequest, Priority::Medium);
        }
        if rules::TASK_ASSIGNMENT.is_match(text) {
            return Classification::notify(Rule::TaskAssignment, Priority::High);
        }
        if let Some(keyword) = input
            .learned_keywords
            .iter()
            .find(|k| rules::contains_word(text, k))
        {
            let mut c = Classification::notify(Rule::LearnedKeyword, Priority::Medium);
            c.reason = format!("{}: {}", Rule::LearnedKeyword.reason(), keyword);
            return c;
        }

        if text.trim().chars().count() < MIN_CHARS {
            return Classification::skip(Rule::TooShort);
        }
        if rules::is_acknowledgement(text) {
            return Classification::skip(Rule::Acknowledgement);
        }
        if rules::is_emoji_only(text) {
            return Classification::skip(Rule::EmojiOnly);
        }
        if rules::is_automated_sender(input.sender_name) {
            return Classification::skip(Rule::AutomatedSender);
        }
        if rules::AUTO_REPLY.is_match(text) {
            return Classification::skip(Rule::AutoReply);
        }

        Classification::new(Verdict::NeedEscalation, Rule::Ambiguous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Classification {
        classify_with(text, "Bob", &[])
    }

    fn classify_with(text: &str, sender: &str, keywords: &[String]) -> Classification {
        HeuristicClassifier::new().classify(&ClassifierInput {
            text,
            sender_name: sender,
            recipient_name: "Alice Smith",
            learned_keywords: keywords,
        })
    }

    #[test]
    fn test_mention_wins_over_everything() {
        let c = classify("@alice can you review this ASAP?");
        assert_eq!(c.rule, Rule::DirectMention);
        assert_eq!(c.reason, "Direct @mention");
        assert_eq!(
            c.verdict,
            Verdict::DefinitelyNotify {
                priority: Priority::High
            }
        );
    }

    #[test]
    fn test_name_beats_too_short() {
        let c = classify("hi alice");
        assert_eq!(c.rule, Rule::NameMentioned);
        let tiny = HeuristicClassifier::new().classify(&ClassifierInput {
            text: "Al?",
            sender_name: "Bob",
            recipient_name: "Al",
            learned_keywords: &[],
        });
        assert_eq!(tiny.rule, Rule::NameMentioned);
    }

    #[test]
    fn test_notify_rules_in_order() {
        assert_eq!(classify("prod is down, this is a blocker").rule, Rule::Urgent);
        assert_eq!(
            classify("could you send the deck?").verdict,
            Verdict::DefinitelyNotify {
                priority: Priority::Medium
            }
        );
        // request phrasing without a question mark does not qualify
        assert_ne!(classify("please send the deck").rule, Rule::DirectRequest);
        assert_eq!(classify("the migration is your task this sprint").rule, Rule::TaskAssignment);
    }

    #[test]
    fn test_learned_keyword_names_the_keyword() {
        let keywords = vec!["invoice".to_string(), "deploy".to_string()];
        let c = classify_with("the deploy window moved to friday", "Bob", &keywords);
        assert_eq!(c.rule, Rule::LearnedKeyword);
        assert_eq!(c.reason, "Matches learned keyword: deploy");
    }

    #[test]
    fn test_skip_rules() {
        assert_eq!(classify("ok").rule, Rule::TooShort);
        assert_eq!(classify("thanks!").reason, "Common acknowledgment/reaction");
        assert_eq!(classify("🎉🎉🎉🎉🎉").rule, Rule::EmojiOnly);
        assert_eq!(
            classify_with("Build #42 finished successfully", "CI Bot", &[]).rule,
            Rule::AutomatedSender
        );
        assert_eq!(classify("I'm out of office until Monday").rule, Rule::AutoReply);
        for text in ["ok", "thanks!", "🎉🎉🎉🎉🎉"] {
            assert_eq!(classify(text).verdict, Verdict::DefinitelySkip);
        }
    }

    #[test]
    fn test_ambiguous_needs_escalation() {
        let c = classify("I think we should revisit the roadmap sometime");
        assert_eq!(c.verdict, Verdict::NeedEscalation);
        assert_eq!(c.reason, "Requires contextual analysis");
        assert!(c.to_decision("Bob", "x").is_none());
    }

    #[test]
    fn test_to_decision_builds_text() {
        let c = classify("@alice lunch?");
        let d = c.to_decision("Bob", "@alice lunch?").unwrap();
        assert!(d.should_notify);
        assert_eq!(d.notification_text, "Bob: @alice lunch?");

        let skip = classify("thanks!").to_decision("Bob", "thanks!").unwrap();
        assert!(!skip.should_notify);
        assert!(skip.notification_text.is_empty());
    }

    #[test]
    fn test_rule_reasons_are_recognised() {
        assert!(Rule::is_rule_reason("Urgent message"));
        assert!(Rule::is_rule_reason("Matches learned keyword: invoice"));
        assert!(!Rule::is_rule_reason("Urgent messages from finance matter"));
        assert!(!Rule::is_rule_reason("Deploy is blocked on your review"));
    }
}
