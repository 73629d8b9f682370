//! Frequency-weighted keyword extraction from rated decisions.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::types::ScoredTerm;

/// Maximum number of terms kept per list.
pub const MAX_TERMS: usize = 15;

/// Weight of terms from helpful feedback.
pub const HELPFUL_WEIGHT: f64 = 2.0;
/// Weight of terms from unhelpful feedback.
pub const NOT_HELPFUL_WEIGHT: f64 = 1.0;

const DOMAIN_MULTIPLIER: f64 = 3.0;
const BIGRAM_MULTIPLIER: f64 = 1.5;
const BIGRAM_MIN_COUNT: u64 = 2;
const BIGRAM_MIN_CHARS: usize = 8;

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // common English
        "about", "above", "after", "again", "also", "been", "before", "being", "below", "between",
        "both", "but", "cant", "could", "dont", "does", "doing", "down", "during", "each", "from",
        "further", "have", "having", "here", "hers", "herself", "himself", "into", "its", "itself",
        "just", "more", "most", "much", "myself", "only", "other", "ours", "over", "same", "should",
        "some", "such", "than", "that", "thats", "their", "theirs", "them", "then", "there",
        "these", "they", "this", "those", "through", "under", "until", "very", "want", "were",
        "what", "when", "where", "which", "while", "whom", "will", "with", "would", "your",
        "yours", "yourself", "really", "think", "thing", "things", "know", "like", "going", "good",
        "well", "still", "even", "make", "made", "maybe", "something", "anything", "everyone",
        "today", "tomorrow", "yesterday", "thanks", "please", "okay", "yeah", "sure", "hello",
        // vocabulary of decision reasons
        "direct", "mention", "mentioned", "recipient", "name", "question", "request", "assignment",
        "matches", "learned", "keyword", "common", "acknowledgment", "reaction", "message",
        "emoji", "short", "automated", "auto", "reply", "requires", "contextual", "analysis",
        "fallback", "unavailable", "notification", "notify",
    ]
    .into_iter()
    .collect()
});

/// Words of the classifier's rule reasons. Kept out of reason text only, so a
/// message that says "urgent" still counts.
static REASON_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "urgent", "task", "assigned", "bot", "office", "sender", "priority", "high", "medium",
        "low", "heuristic", "inference", "relevant", "chatter",
    ]
    .into_iter()
    .collect()
});

static DOMAIN_TERMS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "urgent", "deadline", "meeting", "review", "deploy", "release", "incident", "outage",
        "approval", "approve", "invoice", "budget", "contract", "launch", "customer", "client",
        "production", "security", "blocker", "critical", "schedule", "interview", "payment",
        "asap", "escalation", "hotfix",
    ]
    .into_iter()
    .collect()
});

/// Lowercase, strip punctuation, drop stop words and words of three
/// characters or fewer.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .filter(|w| w.chars().count() > 3 && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// [`tokenize`] plus the rule-reason vocabulary.
pub fn tokenize_reason(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|w| !REASON_WORDS.contains(w.as_str()))
        .collect()
}

fn is_domain_term(term: &str) -> bool {
    term.split(' ').any(|w| DOMAIN_TERMS.contains(w))
}

/// Accumulates term counts over a set of texts sharing one base weight.
#[derive(Debug, Clone)]
pub struct TermCounter {
    base_weight: f64,
    unigrams: HashMap<String, u64>,
    bigrams: HashMap<String, u64>,
}

impl TermCounter {
    pub fn new(base_weight: f64) -> Self {
        Self {
            base_weight,
            unigrams: HashMap::new(),
            bigrams: HashMap::new(),
        }
    }

    /// Count the terms of one text. Bigrams never span two texts.
    pub fn add_text(&mut self, text: &str) {
        self.add_tokens(tokenize(text));
    }

    /// Count the terms of a decision reason.
    pub fn add_reason(&mut self, reason: &str) {
        self.add_tokens(tokenize_reason(reason));
    }

    fn add_tokens(&mut self, tokens: Vec<String>) {
        for token in &tokens {
            *self.unigrams.entry(token.clone()).or_default() += 1;
        }
        for pair in tokens.windows(2) {
            *self
                .bigrams
                .entry(format!("{} {}", pair[0], pair[1]))
                .or_default() += 1;
        }
    }

    /// `ln(count + 1) * count * weight`.
    fn score(count: u64, weight: f64) -> f64 {
        let c = count as f64;
        (c + 1.0).ln() * c * weight
    }

    fn weight(&self, term: &str, bigram: bool) -> f64 {
        let mut weight = self.base_weight;
        if is_domain_term(term) {
            weight *= DOMAIN_MULTIPLIER;
        }
        if bigram {
            weight *= BIGRAM_MULTIPLIER;
        }
        weight
    }

    /// All scored terms, best first. Ties break alphabetically.
    pub fn scored(&self) -> Vec<ScoredTerm> {
        let unigrams = self.unigrams.iter().map(|(term, &count)| ScoredTerm {
            term: term.clone(),
            score: Self::score(count, self.weight(term, false)),
        });
        let bigrams = self
            .bigrams
            .iter()
            .filter(|(term, count)| {
                **count >= BIGRAM_MIN_COUNT && term.chars().count() >= BIGRAM_MIN_CHARS
            })
            .map(|(term, &count)| ScoredTerm {
                term: term.clone(),
                score: Self::score(count, self.weight(term, true)),
            });

        let mut terms: Vec<ScoredTerm> = unigrams.chain(bigrams).collect();
        terms.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.term.cmp(&b.term))
        });
        terms
    }

    /// The best [`MAX_TERMS`] terms.
    pub fn top_terms(&self) -> Vec<String> {
        self.scored()
            .into_iter()
            .take(MAX_TERMS)
            .map(|t| t.term)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_filters() {
        let tokens = tokenize("Hey, the DEPLOY is blocked!! Can we fix it?");
        assert_eq!(tokens, vec!["deploy", "blocked"]);
    }

    #[test]
    fn test_reason_vocabulary_is_ignored() {
        assert!(tokenize("Direct @mention").is_empty());
        assert!(tokenize("Requires contextual analysis").is_empty());
    }

    #[test]
    fn test_reason_drops_rule_words_but_text_keeps_them() {
        assert!(tokenize_reason("Urgent message").is_empty());
        assert!(tokenize_reason("Task assignment").is_empty());
        assert_eq!(tokenize_reason("Urgent payroll question"), vec!["payroll"]);
        assert_eq!(tokenize("urgent payroll"), vec!["urgent", "payroll"]);
    }

    #[test]
    fn test_single_occurrence_bigram_is_dropped() {
        let mut counter = TermCounter::new(HELPFUL_WEIGHT);
        counter.add_text("quarterly forecast spreadsheet");
        assert!(counter.top_terms().iter().all(|t| !t.contains(' ')));
    }

    #[test]
    fn test_score_formula() {
        let mut counter = TermCounter::new(HELPFUL_WEIGHT);
        counter.add_text("lunch lunch lunch");
        let scored = counter.scored();
        assert_eq!(scored[0].term, "lunch");
        let expected = (4.0f64).ln() * 3.0 * 2.0;
        assert!((scored[0].score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_domain_terms_outrank_plain_terms() {
        let mut counter = TermCounter::new(NOT_HELPFUL_WEIGHT);
        counter.add_text("lunch lunch");
        counter.add_text("invoice");
        // ln(3)*2*1 = 2.19 vs ln(2)*1*3 = 2.08
        assert_eq!(counter.top_terms(), vec!["lunch", "invoice"]);
        counter.add_text("invoice");
        assert_eq!(counter.top_terms()[0], "invoice");
    }

    #[test]
    fn test_bigrams_need_repetition_and_length() {
        let mut counter = TermCounter::new(HELPFUL_WEIGHT);
        counter.add_text("release notes ready");
        assert!(!counter.top_terms().contains(&"release notes".to_string()));
        counter.add_text("release notes updated");
        assert!(counter.top_terms().contains(&"release notes".to_string()));
    }

    #[test]
    fn test_bigrams_do_not_span_texts() {
        let mut counter = TermCounter::new(HELPFUL_WEIGHT);
        counter.add_text("alpha");
        counter.add_text("bravo");
        counter.add_text("alpha");
        counter.add_text("bravo");
        assert!(counter.scored().iter().all(|t| !t.term.contains(' ')));
    }

    #[test]
    fn test_top_terms_capped_and_ordered() {
        let mut counter = TermCounter::new(HELPFUL_WEIGHT);
        let words: Vec<String> = (0..20).map(|i| format!("word{:02}", i)).collect();
        counter.add_text(&words.join(" "));
        let top = counter.top_terms();
        assert_eq!(top.len(), MAX_TERMS);
        // equal scores fall back to alphabetical order
        assert_eq!(top[0], "word00");
        assert_eq!(top[14], "word14");
    }
}
