//! Decision orchestrator.
//!
//! Per (message, recipient) pair: quota gate, cache lookup, heuristic rules,
//! and only when the rules cannot decide, escalation to inference. Every
//! decision is logged with the path that produced it.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use crate::cache::{fingerprint, CacheLookup, CacheStore};
use crate::classifier::{ClassifierInput, HeuristicClassifier};
use crate::config::{EscalationConfig, FallbackPolicy, HeraldConfig};
use crate::error::{HeraldError, HeraldResult};
use crate::escalation::{EscalationClient, EscalationOutcome, EscalationRequest, UpstreamKind};
use crate::rate_limit::RateLimiter;
use crate::traits::{ConversationDirectory, KvStore, Llm, ProfileStore};
use crate::types::{
    notification_text, CachePolicy, EvaluatedDecision, FeatureType, MessageEvent,
    NotificationDecision, Participant, Priority, RecipientOutcome, ResolutionPath,
};

/// Reason carried by decisions made without a usable inference answer.
pub const FALLBACK_REASON: &str = "Fallback: analysis unavailable";

/// The safe default used when inference fails transiently.
pub fn fallback_decision(
    policy: FallbackPolicy,
    sender_name: &str,
    text: &str,
) -> NotificationDecision {
    match policy {
        FallbackPolicy::Notify => NotificationDecision::notify(
            FALLBACK_REASON,
            notification_text(sender_name, text),
            Priority::Low,
        ),
        FallbackPolicy::Skip => NotificationDecision::skip(FALLBACK_REASON),
    }
}

/// Composes quota, cache, rules and escalation into one decision per recipient.
pub struct DecisionEngine {
    directory: Arc<dyn ConversationDirectory>,
    profiles: Arc<dyn ProfileStore>,
    cache: CacheStore,
    rate_limiter: RateLimiter,
    classifier: HeuristicClassifier,
    escalation: EscalationClient,
    escalation_config: EscalationConfig,
    cache_policy: CachePolicy,
    daily_limit: u64,
    max_concurrent: usize,
}

impl DecisionEngine {
    pub fn new(
        config: &HeraldConfig,
        kv: Arc<dyn KvStore>,
        profiles: Arc<dyn ProfileStore>,
        directory: Arc<dyn ConversationDirectory>,
        llm: Arc<dyn Llm>,
    ) -> Self {
        Self {
            directory,
            profiles,
            cache: CacheStore::new(kv.clone()),
            rate_limiter: RateLimiter::new(kv),
            classifier: HeuristicClassifier::new(),
            escalation: EscalationClient::new(llm),
            escalation_config: config.escalation.clone(),
            cache_policy: config.cache_policy(FeatureType::NotificationDecision),
            daily_limit: config.daily_limit(FeatureType::NotificationDecision),
            max_concurrent: config.max_concurrent_evaluations.max(1),
        }
    }

    /// Name of the model used for escalations.
    pub fn model_name(&self) -> &str {
        self.escalation.model_name()
    }

    /// Evaluate every eligible recipient of a message.
    ///
    /// Eligible means a participant other than the sender and not in
    /// `excluded` (recipients currently viewing the conversation). Recipients
    /// are evaluated in parallel; one failure does not affect the others.
    #[instrument(skip(self, event, excluded), fields(conversation_id = %event.conversation_id, message_id = %event.message_id))]
    pub async fn fan_out(
        &self,
        event: &MessageEvent,
        excluded: &[String],
    ) -> HeraldResult<Vec<RecipientOutcome>> {
        event.validate()?;

        let participants = self.directory.participants(&event.conversation_id).await?;
        let recipients: Vec<Participant> = participants
            .into_iter()
            .filter(|p| p.user_id != event.sender_id && !excluded.contains(&p.user_id))
            .collect();
        debug!(recipients = recipients.len(), "Fanning out message");

        let sender_name = self.sender_name(event).await?;
        let sender_name = sender_name.as_str();

        let outcomes = stream::iter(recipients)
            .map(|recipient| async move {
                let result = self.evaluate_for(event, &recipient, sender_name).await;
                RecipientOutcome {
                    recipient_id: recipient.user_id,
                    result,
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect::<Vec<_>>()
            .await;

        Ok(outcomes)
    }

    /// Evaluate one recipient.
    pub async fn evaluate(
        &self,
        event: &MessageEvent,
        recipient: &Participant,
    ) -> HeraldResult<EvaluatedDecision> {
        event.validate()?;
        let sender_name = self.sender_name(event).await?;
        self.evaluate_for(event, recipient, &sender_name).await
    }

    async fn sender_name(&self, event: &MessageEvent) -> HeraldResult<String> {
        Ok(self
            .directory
            .display_name(&event.sender_id)
            .await?
            .unwrap_or_else(|| event.sender_id.clone()))
    }

    async fn evaluate_for(
        &self,
        event: &MessageEvent,
        recipient: &Participant,
        sender_name: &str,
    ) -> HeraldResult<EvaluatedDecision> {
        let recipient_id = recipient.user_id.as_str();

        // Quota is checked before anything that could reach inference.
        self.rate_limiter.check_and_increment(
            recipient_id,
            FeatureType::NotificationDecision,
            self.daily_limit,
        )?;

        // A profile is rebuilt from feedback, so an unreadable one is a miss.
        let profile = match self.profiles.get(recipient_id) {
            Ok(profile) => profile,
            Err(e @ HeraldError::Parse { .. }) => {
                warn!(recipient_id, error = %e, "Ignoring unreadable profile");
                None
            }
            Err(e) => return Err(e),
        };
        let version = profile.as_ref().map_or(0, |p| p.version).to_string();
        let key = fingerprint(
            FeatureType::NotificationDecision,
            &[&event.conversation_id, &event.message_id, recipient_id, &version],
        );
        let item_count = self.directory.message_count(&event.conversation_id).await?;

        if let CacheLookup::Hit(hit) =
            self.cache
                .get::<NotificationDecision>(&key, item_count, &self.cache_policy)?
        {
            let evaluated = EvaluatedDecision {
                decision: hit.value,
                path: ResolutionPath::Cache,
                cached: true,
                items_since_cache: Some(hit.new_items_since),
            };
            log_decision(event, recipient_id, &evaluated);
            return Ok(evaluated);
        }

        let learned: &[String] = profile
            .as_ref()
            .map(|p| p.learned_keywords.as_slice())
            .unwrap_or(&[]);
        let classification = self.classifier.classify(&ClassifierInput {
            text: &event.text,
            sender_name,
            recipient_name: &recipient.display_name,
            learned_keywords: learned,
        });
        debug!(recipient_id, rule = %classification.rule, "Heuristic classification");

        let (decision, path) = match classification.to_decision(sender_name, &event.text) {
            Some(decision) => (decision, ResolutionPath::Heuristic),
            None => {
                let transcript: Vec<_> = self
                    .directory
                    .recent_messages(&event.conversation_id, self.escalation_config.context_messages)
                    .await?
                    .into_iter()
                    .filter(|m| m.message_id != event.message_id)
                    .collect();
                let request = EscalationRequest {
                    recipient_name: &recipient.display_name,
                    sender_name,
                    message_text: &event.text,
                    transcript: &transcript,
                    profile: profile.as_ref(),
                };

                match self.escalate(&request).await {
                    EscalationOutcome::Decision(decision) => (decision, ResolutionPath::Inference),
                    EscalationOutcome::ParseError { message, .. } => {
                        warn!(recipient_id, error = %message, "Falling back after unparsable inference response");
                        (self.fallback(sender_name, &event.text), ResolutionPath::Fallback)
                    }
                    EscalationOutcome::UpstreamError {
                        kind: UpstreamKind::Transient,
                        error,
                    } => {
                        warn!(recipient_id, error = %error, "Falling back after transient inference failure");
                        (self.fallback(sender_name, &event.text), ResolutionPath::Fallback)
                    }
                    EscalationOutcome::UpstreamError {
                        kind: UpstreamKind::Fatal,
                        error,
                    } => {
                        error!(recipient_id, error = %error, code = error.code().as_str(), "Inference unavailable, operator action required");
                        return Err(error);
                    }
                }
            }
        };

        // Fallbacks are not cached so the next evaluation retries inference.
        if path != ResolutionPath::Fallback {
            self.cache.put(
                &key,
                FeatureType::NotificationDecision,
                &event.conversation_id,
                item_count,
                &self.cache_policy,
                &decision,
            )?;
        }

        let evaluated = EvaluatedDecision {
            decision,
            path,
            cached: false,
            items_since_cache: None,
        };
        log_decision(event, recipient_id, &evaluated);
        Ok(evaluated)
    }

    async fn escalate(&self, request: &EscalationRequest<'_>) -> EscalationOutcome {
        let limit = Duration::from_secs(self.escalation_config.timeout_secs);
        match tokio::time::timeout(limit, self.escalation.evaluate(request)).await {
            Ok(outcome) => outcome,
            Err(_) => EscalationOutcome::UpstreamError {
                kind: UpstreamKind::Transient,
                error: HeraldError::timeout(format!(
                    "Inference did not answer within {}s",
                    limit.as_secs()
                )),
            },
        }
    }

    fn fallback(&self, sender_name: &str, text: &str) -> NotificationDecision {
        fallback_decision(self.escalation_config.fallback, sender_name, text)
    }
}

fn log_decision(event: &MessageEvent, recipient_id: &str, evaluated: &EvaluatedDecision) {
    info!(
        conversation_id = %event.conversation_id,
        message_id = %event.message_id,
        recipient_id,
        path = %evaluated.path,
        should_notify = evaluated.decision.should_notify,
        priority = %evaluated.decision.priority,
        reason = %evaluated.decision.reason,
        "Notification decision"
    );
}
