use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scoring::prompts::{SCORING_PROMPT_TEMPLATE, SCORING_SYSTEM};
use crate::summarization::prompts::{
    ABSTRACT_PROMPT_TEMPLATE, INTERMEDIATE_REDUCE_PROMPT_TEMPLATE, MAP_PROMPT_TEMPLATE,
    REDUCE_PROMPT_TEMPLATE, REDUCE_SYSTEM,
};

const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Process configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub pipeline_config_path: PathBuf,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            pipeline_config_path: std::env::var("PIPELINE_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config/pipeline.yaml")),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Configuration errors. All of these are fatal to a run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read pipeline config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse pipeline config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid pipeline config: {0}")]
    Invalid(String),

    #[error("API key not found. Set the {0} environment variable.")]
    MissingApiKey(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline configuration
// ────────────────────────────────────────────────────────────────────────────

/// Everything a run needs besides the papers themselves. Loaded once at
/// startup and shared read-only by every work item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub pipeline: RunSettings,
    #[serde(default)]
    pub prompts: PromptTemplates,
}

/// Provider-wide settings shared by every stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_key_env: String,
    pub base_url: String,
    /// First same-model retry waits this long; each further retry doubles it.
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key_env: "GROQ_API_KEY".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            backoff_base_ms: 2_000,
            backoff_max_ms: 60_000,
        }
    }
}

impl LlmSettings {
    /// Reads the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey(self.api_key_env.clone()))
    }

    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.saturating_sub(1).min(16);
        Duration::from_millis(
            self.backoff_base_ms
                .saturating_mul(factor)
                .min(self.backoff_max_ms),
        )
    }
}

/// Model selection and sampling parameters for one stage (scoring, map or reduce).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageModelConfig {
    pub model: String,
    #[serde(default)]
    pub fallback_models: Vec<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Same-model retries after a transient failure. Attempts per model = 1 + max_retries.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Minimum gap between two calls of this stage, to stay under
    /// tokens-per-minute limits. 0 = no pacing.
    #[serde(default)]
    pub min_call_interval_ms: u64,
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_retries() -> u32 {
    2
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for StageModelConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

impl StageModelConfig {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            fallback_models: Vec::new(),
            temperature: default_temperature(),
            max_tokens: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            min_call_interval_ms: 0,
        }
    }

    /// Primary model followed by the fallbacks in listed order.
    /// A model named twice is only tried at its first position.
    pub fn model_sequence(&self) -> Vec<&str> {
        let mut sequence: Vec<&str> = Vec::with_capacity(1 + self.fallback_models.len());
        for model in std::iter::once(&self.model).chain(self.fallback_models.iter()) {
            let model = model.as_str();
            if !sequence.contains(&model) {
                sequence.push(model);
            }
        }
        sequence
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn min_call_interval(&self) -> Duration {
        Duration::from_millis(self.min_call_interval_ms)
    }
}

/// Keyword table, interest profile and final-score weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Lowercase phrase → positive weight.
    pub keyword_weights: BTreeMap<String, u32>,
    /// Papers scoring below this never reach the LLM stage and get no verdict.
    pub min_keyword_score: u32,
    /// Max papers sent to the LLM stage per run. 0 = unlimited.
    pub processing_limit: usize,
    pub llm_enabled: bool,
    pub interests: String,
    pub keyword_weight: f64,
    pub llm_weight: f64,
    pub scoring: StageModelConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            keyword_weights: BTreeMap::new(),
            min_keyword_score: 1,
            processing_limit: 20,
            llm_enabled: true,
            interests: String::new(),
            keyword_weight: 1.0,
            llm_weight: 3.0,
            scoring: StageModelConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub enabled: bool,
    /// Chunk size and overlap, in chars.
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Max chars handed to a single reduce call.
    pub payload_limit: usize,
    /// Full texts longer than this are summarised from the abstract instead.
    pub max_text_length_for_full_summary: usize,
    pub max_compaction_rounds: u32,
    pub schema_fields: Vec<String>,
    pub map: StageModelConfig,
    pub reduce: StageModelConfig,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chunk_size: 4_000,
            chunk_overlap: 400,
            payload_limit: 12_000,
            max_text_length_for_full_summary: 100_000,
            max_compaction_rounds: 3,
            schema_fields: ["task", "approach", "result", "gap", "evaluation", "takeaway"]
                .into_iter()
                .map(String::from)
                .collect(),
            map: StageModelConfig::default(),
            reduce: StageModelConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub top_n: usize,
    /// Papers processed at once. 1 = sequential.
    pub concurrency: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            top_n: 5,
            concurrency: 1,
        }
    }
}

/// Prompt templates. Treated as opaque strings with `{placeholder}` slots.
///
/// - scoring: `{interests}`, `{title}`, `{abstract}`
/// - map / abstract: `{input}`
/// - intermediate / reduce: `{chunk_summaries}`, `{fields}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplates {
    pub scoring_system: String,
    pub scoring: String,
    pub map: String,
    #[serde(rename = "abstract")]
    pub abstract_only: String,
    pub intermediate_reduce: String,
    pub reduce_system: String,
    pub reduce: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            scoring_system: SCORING_SYSTEM.to_string(),
            scoring: SCORING_PROMPT_TEMPLATE.to_string(),
            map: MAP_PROMPT_TEMPLATE.to_string(),
            abstract_only: ABSTRACT_PROMPT_TEMPLATE.to_string(),
            intermediate_reduce: INTERMEDIATE_REDUCE_PROMPT_TEMPLATE.to_string(),
            reduce_system: REDUCE_SYSTEM.to_string(),
            reduce: REDUCE_PROMPT_TEMPLATE.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let mut config: PipelineConfig = serde_yaml::from_str(raw)?;
        let mut lowered = BTreeMap::new();
        for (phrase, weight) in std::mem::take(&mut config.classifier.keyword_weights) {
            let key = phrase.to_lowercase();
            if lowered.insert(key.clone(), weight).is_some() {
                return Err(ConfigError::Invalid(format!(
                    "keyword '{phrase}' is listed twice (keywords are case-insensitive)"
                )));
            }
        }
        config.classifier.keyword_weights = lowered;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        let classifier = &self.classifier;

        if classifier.keyword_weights.is_empty() {
            return invalid("classifier.keyword_weights must not be empty");
        }
        if let Some((phrase, _)) = classifier
            .keyword_weights
            .iter()
            .find(|(phrase, weight)| phrase.trim().is_empty() || **weight == 0)
        {
            return Err(ConfigError::Invalid(format!(
                "keyword '{phrase}' must be non-empty with a positive weight"
            )));
        }
        for (name, weight) in [
            ("keyword_weight", classifier.keyword_weight),
            ("llm_weight", classifier.llm_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "classifier.{name} must be a finite number >= 0"
                )));
            }
        }
        if classifier.llm_enabled && classifier.interests.trim().is_empty() {
            return invalid("classifier.interests must be set when the LLM stage is enabled");
        }

        let summarizer = &self.summarizer;
        if summarizer.chunk_size <= summarizer.chunk_overlap {
            return invalid("summarizer.chunk_size must be greater than chunk_overlap");
        }
        if summarizer.payload_limit == 0 {
            return invalid("summarizer.payload_limit must be positive");
        }
        if summarizer.schema_fields.is_empty() {
            return invalid("summarizer.schema_fields must not be empty");
        }

        for (stage, model) in [
            ("scoring", &classifier.scoring),
            ("map", &summarizer.map),
            ("reduce", &summarizer.reduce),
        ] {
            if model.model.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{stage} stage has no model")));
            }
            if model.timeout_secs == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{stage} stage timeout_secs must be positive"
                )));
            }
        }
        Ok(())
    }

    /// Combined final score. Monotonic in both inputs since both weights are >= 0.
    pub fn final_score(&self, keyword_score: u32, llm_score: f64) -> f64 {
        self.classifier.keyword_weight * keyword_score as f64
            + self.classifier.llm_weight * llm_score
    }
}
