//! Configuration system for herald.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::error::{HeraldError, HeraldResult};
use crate::traits::LlmConfig;
use crate::types::{CachePolicy, FeatureType};

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAI,
    Anthropic,
    Ollama,
}

impl std::str::FromStr for LlmProvider {
    type Err = HeraldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(HeraldError::UnsupportedProvider {
                provider: other.to_string(),
            }),
        }
    }
}

/// Provider configuration with type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Provider type.
    pub provider: LlmProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: LlmConfig,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            config: LlmConfig {
                model: "gpt-4o-mini".to_string(),
                ..Default::default()
            },
        }
    }
}

/// What to decide when inference is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Notify at low priority so nothing important is silently dropped.
    #[default]
    Notify,
    /// Stay silent.
    Skip,
}

/// Escalation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Upper bound on a single inference call.
    pub timeout_secs: u64,
    /// Number of recent conversation messages sent as context.
    pub context_messages: usize,
    /// Decision used when inference fails transiently or returns garbage.
    pub fallback: FallbackPolicy,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            context_messages: 10,
            fallback: FallbackPolicy::Notify,
        }
    }
}

/// Profile learner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Trailing window of feedback considered.
    pub window_days: i64,
    /// Days between scheduled batch runs.
    pub interval_days: u64,
    /// Run a batch as soon as the scheduler starts.
    pub run_on_start: bool,
    /// Users recomputed in parallel during a batch.
    pub max_concurrent_users: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            interval_days: 7,
            run_on_start: false,
            max_concurrent_users: 4,
        }
    }
}

/// Main herald configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeraldConfig {
    /// LLM configuration.
    pub llm: LlmProviderConfig,
    /// Path to the SQLite database.
    pub db_path: PathBuf,
    /// Cache policy overrides per feature.
    pub cache: HashMap<FeatureType, CachePolicy>,
    /// Daily limit overrides per feature.
    pub rate_limits: HashMap<FeatureType, u64>,
    /// Escalation settings.
    pub escalation: EscalationConfig,
    /// Learner settings.
    pub learning: LearningConfig,
    /// Trailing window for analytics reports.
    pub analytics_window_days: i64,
    /// Recipients evaluated in parallel for one message.
    pub max_concurrent_evaluations: usize,
}

impl Default for HeraldConfig {
    fn default() -> Self {
        let herald_dir = dirs::home_dir()
            .map(|h| h.join(".herald"))
            .unwrap_or_else(|| PathBuf::from(".herald"));

        Self {
            llm: LlmProviderConfig::default(),
            db_path: herald_dir.join("herald.db"),
            cache: HashMap::new(),
            rate_limits: HashMap::new(),
            escalation: EscalationConfig::default(),
            learning: LearningConfig::default(),
            analytics_window_days: 30,
            max_concurrent_evaluations: 8,
        }
    }
}

impl HeraldConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> HeraldResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| HeraldError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| HeraldError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| HeraldError::Configuration(e.to_string())),
            _ => Err(HeraldError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Unparsable numeric values are ignored and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(provider) = std::env::var("HERALD_LLM_PROVIDER") {
            if let Ok(provider) = provider.parse() {
                config.llm.provider = provider;
            }
        }
        if let Ok(model) = std::env::var("HERALD_LLM_MODEL") {
            config.llm.config.model = model;
        }
        if let Ok(base_url) = std::env::var("HERALD_LLM_BASE_URL") {
            config.llm.config.base_url = Some(base_url);
        }
        let key_var = match config.llm.provider {
            LlmProvider::OpenAI => Some("OPENAI_API_KEY"),
            LlmProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
            LlmProvider::Ollama => None,
        };
        if let Some(api_key) = std::env::var("HERALD_LLM_API_KEY")
            .ok()
            .or_else(|| key_var.and_then(|v| std::env::var(v).ok()))
        {
            config.llm.config.api_key = Some(api_key);
        }

        if let Ok(path) = std::env::var("HERALD_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(secs) = env_parse("HERALD_ESCALATION_TIMEOUT_SECS") {
            config.escalation.timeout_secs = secs;
        }
        if let Ok(policy) = std::env::var("HERALD_ESCALATION_FALLBACK") {
            match policy.to_lowercase().as_str() {
                "notify" => config.escalation.fallback = FallbackPolicy::Notify,
                "skip" => config.escalation.fallback = FallbackPolicy::Skip,
                _ => {}
            }
        }
        if let Some(days) = env_parse("HERALD_LEARNING_WINDOW_DAYS") {
            config.learning.window_days = days;
        }
        if let Some(days) = env_parse("HERALD_ANALYTICS_WINDOW_DAYS") {
            config.analytics_window_days = days;
        }
        if let Some(n) = env_parse("HERALD_MAX_CONCURRENT_EVALUATIONS") {
            config.max_concurrent_evaluations = n;
        }

        config
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> HeraldConfigBuilder {
        HeraldConfigBuilder::default()
    }

    /// Effective cache policy for a feature.
    pub fn cache_policy(&self, feature: FeatureType) -> CachePolicy {
        self.cache
            .get(&feature)
            .copied()
            .unwrap_or_else(|| feature.default_cache_policy())
    }

    /// Effective daily limit for a feature.
    pub fn daily_limit(&self, feature: FeatureType) -> u64 {
        self.rate_limits
            .get(&feature)
            .copied()
            .unwrap_or_else(|| feature.default_daily_limit())
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> HeraldResult<()> {
        if self.escalation.timeout_secs == 0 {
            return Err(HeraldError::Configuration(
                "escalation.timeout_secs must be positive".to_string(),
            ));
        }
        if self.max_concurrent_evaluations == 0 || self.learning.max_concurrent_users == 0 {
            return Err(HeraldError::Configuration(
                "concurrency limits must be positive".to_string(),
            ));
        }
        if self.learning.window_days <= 0 || self.analytics_window_days <= 0 {
            return Err(HeraldError::Configuration(
                "window lengths must be positive".to_string(),
            ));
        }
        for feature in FeatureType::iter() {
            if self.cache_policy(feature).ttl_secs == 0 {
                return Err(HeraldError::Configuration(format!(
                    "cache ttl for {} must be positive",
                    feature
                )));
            }
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|v| v.parse().ok())
}

/// Builder for HeraldConfig.
#[derive(Default)]
pub struct HeraldConfigBuilder {
    config: HeraldConfig,
}

impl HeraldConfigBuilder {
    /// Set LLM configuration.
    pub fn llm(mut self, config: LlmProviderConfig) -> Self {
        self.config.llm = config;
        self
    }

    /// Set database path.
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.db_path = path.into();
        self
    }

    /// Override the cache policy of one feature.
    pub fn cache_policy(mut self, feature: FeatureType, policy: CachePolicy) -> Self {
        self.config.cache.insert(feature, policy);
        self
    }

    /// Override the daily limit of one feature.
    pub fn daily_limit(mut self, feature: FeatureType, limit: u64) -> Self {
        self.config.rate_limits.insert(feature, limit);
        self
    }

    /// Set escalation settings.
    pub fn escalation(mut self, config: EscalationConfig) -> Self {
        self.config.escalation = config;
        self
    }

    /// Set learner settings.
    pub fn learning(mut self, config: LearningConfig) -> Self {
        self.config.learning = config;
        self
    }

    /// Set the analytics window.
    pub fn analytics_window_days(mut self, days: i64) -> Self {
        self.config.analytics_window_days = days;
        self
    }

    /// Set per-message evaluation parallelism.
    pub fn max_concurrent_evaluations(mut self, n: usize) -> Self {
        self.config.max_concurrent_evaluations = n;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> HeraldConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = HeraldConfig::default();
        assert_eq!(config.escalation.timeout_secs, 10);
        assert_eq!(config.escalation.fallback, FallbackPolicy::Notify);
        assert_eq!(config.learning.window_days, 30);
        assert_eq!(config.daily_limit(FeatureType::NotificationDecision), 500);
        assert!(config.db_path.ends_with("herald.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = HeraldConfig::builder()
            .daily_limit(FeatureType::NotificationDecision, 3)
            .cache_policy(
                FeatureType::SmartReply,
                CachePolicy {
                    ttl_secs: 30,
                    stale_item_threshold: Some(2),
                    stale_time_secs: None,
                },
            )
            .build();
        assert_eq!(config.daily_limit(FeatureType::NotificationDecision), 3);
        assert_eq!(config.cache_policy(FeatureType::SmartReply).ttl_secs, 30);
        assert_eq!(config.daily_limit(FeatureType::SmartReply), 100);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
db_path = "/tmp/herald-test.db"
max_concurrent_evaluations = 2

[llm]
provider = "anthropic"
model = "claude-3-5-haiku-latest"

[escalation]
fallback = "skip"

[rate_limits]
notification_decision = 42
"#
        )
        .unwrap();

        let config = HeraldConfig::from_file(file.path()).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::Anthropic);
        assert_eq!(config.escalation.fallback, FallbackPolicy::Skip);
        assert_eq!(config.escalation.timeout_secs, 10);
        assert_eq!(config.daily_limit(FeatureType::NotificationDecision), 42);
        assert_eq!(config.max_concurrent_evaluations, 2);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            HeraldConfig::from_file(file.path()),
            Err(HeraldError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = HeraldConfig::default();
        config.escalation.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("Ollama".parse::<LlmProvider>().unwrap(), LlmProvider::Ollama);
        assert!("bedrock".parse::<LlmProvider>().is_err());
    }
}
