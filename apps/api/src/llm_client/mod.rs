/// LLM Client: the single point of entry for all model calls in the pipeline.
///
/// ARCHITECTURAL RULE: scoring and summarization never talk to a provider
/// directly. Every call goes through `LlmClient::invoke`, which owns retry,
/// timeout and model fallback.
///
/// An invocation walks a small state machine over the stage's model list:
///
/// ```text
/// Trying(i, n) --ok--------------------------------> Succeeded
/// Trying(i, n) --transient, n < max_retries--------> Trying(i, n+1)   (after backoff)
/// Trying(i, n) --permanent | retries spent---------> Trying(i+1, 0)
/// Trying(last, _) --permanent | retries spent------> Exhausted
/// ```
///
/// Exhaustion is a normal return value, never an error: callers decide how
/// to degrade.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{LlmSettings, StageModelConfig};

pub mod prompts;
pub mod provider;

pub use provider::{ChatProvider, ChatRequest, ErrorKind, OpenAiCompatProvider, ProviderError};

/// A rendered prompt ready to send.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: Option<String>,
    pub user: String,
    /// Request a JSON object response.
    pub json: bool,
}

impl Prompt {
    pub fn text(user: String) -> Self {
        Self {
            system: None,
            user,
            json: false,
        }
    }

    pub fn json(system: &str, user: String) -> Self {
        Self {
            system: Some(system.to_string()),
            user,
            json: true,
        }
    }
}

/// Record of a single attempt against one model. Lives only as long as
/// the `Invocation` that produced it.
#[derive(Debug, Clone)]
pub struct ModelCallOutcome {
    pub model_name: String,
    pub success: bool,
    pub latency: Duration,
    pub error_kind: Option<ErrorKind>,
    pub raw_text: Option<String>,
}

/// States of one invocation's walk over the model list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackState {
    Trying { index: usize, retry: u32 },
    Succeeded,
    Exhausted,
}

impl FallbackState {
    /// Transition after an attempt in state `Trying { index, retry }`.
    /// `error` is `None` when the attempt succeeded.
    pub fn next(
        index: usize,
        retry: u32,
        error: Option<&ProviderError>,
        max_retries: u32,
        model_count: usize,
    ) -> FallbackState {
        match error {
            None => FallbackState::Succeeded,
            Some(err) if err.is_transient() && retry < max_retries => FallbackState::Trying {
                index,
                retry: retry + 1,
            },
            Some(_) if index + 1 < model_count => FallbackState::Trying {
                index: index + 1,
                retry: 0,
            },
            Some(_) => FallbackState::Exhausted,
        }
    }
}

/// Every attempt made for one prompt, in order. The last attempt is the
/// successful one when the invocation succeeded.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub attempts: Vec<ModelCallOutcome>,
}

impl Invocation {
    /// The generated text, or `None` if every model was exhausted.
    pub fn text(&self) -> Option<&str> {
        self.attempts
            .last()
            .filter(|a| a.success)
            .and_then(|a| a.raw_text.as_deref())
    }

    pub fn into_text(self) -> Option<String> {
        self.attempts
            .into_iter()
            .last()
            .filter(|a| a.success)
            .and_then(|a| a.raw_text)
    }

    /// The model that produced the text.
    pub fn model(&self) -> Option<&str> {
        self.attempts
            .last()
            .filter(|a| a.success)
            .map(|a| a.model_name.as_str())
    }

    /// Failure kinds of every unsuccessful attempt, in attempt order.
    pub fn failures(&self) -> Vec<ErrorKind> {
        self.attempts.iter().filter_map(|a| a.error_kind).collect()
    }

    pub fn total_latency(&self) -> Duration {
        self.attempts.iter().map(|a| a.latency).sum()
    }
}

#[cfg(test)]
impl Invocation {
    pub fn succeeded(&self) -> bool {
        self.attempts.last().map(|a| a.success).unwrap_or(false)
    }

    pub fn failures_on(&self, model: &str) -> Vec<ErrorKind> {
        self.attempts
            .iter()
            .filter(|a| a.model_name == model && !a.success)
            .filter_map(|a| a.error_kind)
            .collect()
    }
}

#[derive(Clone)]
pub struct LlmClient {
    provider: Arc<dyn ChatProvider>,
    settings: LlmSettings,
    /// Earliest instant the next call of each stage may start.
    next_call: Arc<Mutex<HashMap<String, Instant>>>,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn ChatProvider>, settings: LlmSettings) -> Self {
        Self {
            provider,
            settings,
            next_call: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Holds a call back until `interval` has passed since the previous
    /// call of the same stage. Slots are reserved under the lock, so
    /// concurrent callers queue up one interval apart.
    async fn pace(&self, stage_name: &str, interval: Duration) {
        if interval.is_zero() {
            return;
        }
        let wait = {
            let mut next_call = self.next_call.lock().await;
            let now = Instant::now();
            let slot = next_call
                .get(stage_name)
                .copied()
                .filter(|slot| *slot > now)
                .unwrap_or(now);
            next_call.insert(stage_name.to_string(), slot + interval);
            slot.saturating_duration_since(now)
        };
        if !wait.is_zero() {
            debug!("[{stage_name}] pacing: waiting {}ms", wait.as_millis());
            tokio::time::sleep(wait).await;
        }
    }

    /// Sends `prompt` to the stage's primary model, retrying transient
    /// failures and falling back through the configured models in order.
    pub async fn invoke(
        &self,
        stage_name: &str,
        prompt: &Prompt,
        stage: &StageModelConfig,
    ) -> Invocation {
        let models = stage.model_sequence();
        let request = ChatRequest {
            system: prompt.system.as_deref(),
            user: &prompt.user,
            temperature: stage.temperature,
            max_tokens: stage.max_tokens,
            json: prompt.json,
        };

        let mut invocation = Invocation::default();
        let mut state = FallbackState::Trying { index: 0, retry: 0 };

        while let FallbackState::Trying { index, retry } = state {
            let model = models[index];
            if retry > 0 {
                let delay = self.settings.backoff_for(retry);
                warn!(
                    "[{stage_name}] retrying model {model} after {}ms (retry {retry}/{})",
                    delay.as_millis(),
                    stage.max_retries
                );
                tokio::time::sleep(delay).await;
            }

            self.pace(stage_name, stage.min_call_interval()).await;
            info!("[{stage_name}] attempting model {model}");
            let started = Instant::now();
            let result = match tokio::time::timeout(
                stage.timeout(),
                self.provider.complete(model, &request),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout),
            };
            let latency = started.elapsed();

            state = FallbackState::next(
                index,
                retry,
                result.as_ref().err(),
                stage.max_retries,
                models.len(),
            );

            let outcome = match result {
                Ok(text) => {
                    info!(
                        "[{stage_name}] model {model} succeeded in {}ms",
                        latency.as_millis()
                    );
                    ModelCallOutcome {
                        model_name: model.to_string(),
                        success: true,
                        latency,
                        error_kind: None,
                        raw_text: Some(text),
                    }
                }
                Err(err) => {
                    warn!(
                        "[{stage_name}] model {model} failed in {}ms ({}): {err}",
                        latency.as_millis(),
                        if err.is_transient() { "transient" } else { "permanent" }
                    );
                    if matches!(state, FallbackState::Trying { index: next, .. } if next != index)
                    {
                        info!("[{stage_name}] falling back from {model} to {}", models[index + 1]);
                    }
                    ModelCallOutcome {
                        model_name: model.to_string(),
                        success: false,
                        latency,
                        error_kind: Some(err.kind()),
                        raw_text: None,
                    }
                }
            };
            invocation.attempts.push(outcome);
        }

        if state == FallbackState::Exhausted {
            warn!(
                "[{stage_name}] all {} models exhausted after {} attempts",
                models.len(),
                invocation.attempts.len()
            );
        } else {
            debug!(
                "[{stage_name}] invocation finished after {} attempts",
                invocation.attempts.len()
            );
        }

        invocation
    }
}

/// Deserializes model output as JSON, tolerating markdown code fences.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(strip_json_fences(text))
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
