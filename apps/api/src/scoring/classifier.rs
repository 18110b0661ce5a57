//! Relevance Classifier: keyword stage plus LLM judgment against the
//! reader's interest profile.
//!
//! Flow for a batch:
//! 1. Keyword-score every paper; drop those under `min_keyword_score`
//! 2. Order survivors by keyword score (fetch order on ties)
//! 3. Send the first `processing_limit` of them to the LLM stage
//! 4. Everything past the limit keeps a keyword-only verdict
//!
//! The LLM stage never fails a paper: exhaustion and unparseable output
//! both become a zero LLM score with a rationale saying which one happened.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::llm_client::prompts::render;
use crate::llm_client::{parse_json, ErrorKind, Invocation, LlmClient, Prompt};
use crate::models::paper::Paper;
use crate::scoring::keyword::{score, KeywordScore};

/// Upper bound of the LLM relevance scale.
pub const MAX_LLM_SCORE: f64 = 10.0;

/// How the LLM half of a verdict came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmJudgment {
    Scored,
    /// The model answered but the answer could not be parsed.
    Unparseable,
    /// Every configured model failed.
    Exhausted,
    /// Not sent to the LLM: beyond the processing limit.
    OverLimit,
    /// LLM stage switched off in config.
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceVerdict {
    pub paper_id: String,
    pub title: String,
    pub keyword_score: u32,
    pub keyword_reasons: Vec<String>,
    /// 0.0 – 10.0
    pub llm_score: f64,
    pub rationale: String,
    pub llm_judgment: LlmJudgment,
    pub llm_model: Option<String>,
    /// Model calls made for this verdict, failed ones included.
    pub llm_attempts: usize,
    /// Failure kinds of the unsuccessful attempts, in order.
    pub llm_failures: Vec<ErrorKind>,
    pub final_score: f64,
}

#[derive(Debug, Error)]
pub enum JudgmentParseError {
    #[error("response is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response has no score")]
    MissingScore,

    #[error("score is not a number: {0}")]
    InvalidScore(String),
}

#[derive(Debug, Deserialize)]
struct RawJudgment {
    score: Option<Value>,
    #[serde(default, alias = "reason", alias = "rationale")]
    reasons: Option<Value>,
}

/// Parses the scoring model's answer into `(score, rationale)`.
/// Scores are clamped into 0–10.
pub fn parse_judgment(text: &str) -> Result<(f64, String), JudgmentParseError> {
    let raw: RawJudgment = parse_json(text)?;

    let score = match raw.score.ok_or(JudgmentParseError::MissingScore)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| JudgmentParseError::InvalidScore(n.to_string()))?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| JudgmentParseError::InvalidScore(s.clone()))?,
        other => return Err(JudgmentParseError::InvalidScore(other.to_string())),
    };
    if !score.is_finite() {
        return Err(JudgmentParseError::InvalidScore(score.to_string()));
    }

    let rationale = match raw.reasons {
        Some(Value::String(s)) => s,
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(String::from).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join("; "),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    Ok((score.clamp(0.0, MAX_LLM_SCORE), rationale))
}

pub struct RelevanceClassifier<'a> {
    config: &'a PipelineConfig,
    llm: &'a LlmClient,
}

impl<'a> RelevanceClassifier<'a> {
    pub fn new(config: &'a PipelineConfig, llm: &'a LlmClient) -> Self {
        Self { config, llm }
    }

    pub fn keyword_stage(&self, paper: &Paper) -> KeywordScore {
        score(&paper.search_text(), &self.config.classifier.keyword_weights)
    }

    /// Classifies one paper through both stages.
    pub async fn classify(&self, paper: &Paper) -> RelevanceVerdict {
        let keyword = self.keyword_stage(paper);
        if self.config.classifier.llm_enabled {
            self.classify_with_llm(paper, keyword).await
        } else {
            self.keyword_only(paper, keyword, LlmJudgment::Disabled)
        }
    }

    /// Classifies a batch. Verdicts come back in fetch order; papers that
    /// fail the keyword pre-filter get none.
    pub async fn classify_batch(&self, papers: &[Paper]) -> Vec<RelevanceVerdict> {
        let classifier = &self.config.classifier;

        let candidates: Vec<(&Paper, KeywordScore)> = papers
            .iter()
            .map(|paper| (paper, self.keyword_stage(paper)))
            .filter(|(_, keyword)| keyword.score >= classifier.min_keyword_score)
            .collect();

        info!(
            "{} of {} papers passed the keyword pre-filter (min score {})",
            candidates.len(),
            papers.len(),
            classifier.min_keyword_score
        );

        let llm_slots = self.llm_slots(&candidates);
        if classifier.llm_enabled && llm_slots.len() < candidates.len() {
            info!(
                "Processing limit {}: {} papers keep keyword-only verdicts",
                classifier.processing_limit,
                candidates.len() - llm_slots.len()
            );
        }

        // Futures are built up front so the stream holds no borrowing closure.
        let work: Vec<_> = candidates
            .into_iter()
            .enumerate()
            .map(|(position, (paper, keyword))| {
                let in_limit = !classifier.llm_enabled || llm_slots.contains(&position);
                async move {
                    if in_limit {
                        self.classify(paper).await
                    } else {
                        self.keyword_only(paper, keyword, LlmJudgment::OverLimit)
                    }
                }
            })
            .collect();

        stream::iter(work)
            .buffered(self.config.pipeline.concurrency.max(1))
            .collect()
            .await
    }

    /// Positions (into `candidates`) of the papers allowed an LLM call:
    /// the top `processing_limit` by keyword score, fetch order on ties.
    fn llm_slots(&self, candidates: &[(&Paper, KeywordScore)]) -> HashSet<usize> {
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        // stable sort keeps fetch order among equal keyword scores
        order.sort_by(|&a, &b| candidates[b].1.score.cmp(&candidates[a].1.score));

        let limit = match self.config.classifier.processing_limit {
            0 => candidates.len(),
            n => n.min(candidates.len()),
        };
        order.into_iter().take(limit).collect()
    }

    async fn classify_with_llm(&self, paper: &Paper, keyword: KeywordScore) -> RelevanceVerdict {
        let prompts = &self.config.prompts;
        let user = render(
            &prompts.scoring,
            &[
                ("interests", self.config.classifier.interests.as_str()),
                ("title", paper.title.as_str()),
                ("abstract", paper.abstract_text.as_str()),
            ],
        );
        let prompt = Prompt::json(&prompts.scoring_system, user);

        info!(
            "LLM scoring paper (keyword score {}): \"{}\"",
            keyword.score,
            paper.short_title(50)
        );
        let invocation = self
            .llm
            .invoke("scoring", &prompt, &self.config.classifier.scoring)
            .await;
        debug!(
            "Scoring paper {} took {} attempts, {}ms",
            paper.id,
            invocation.attempts.len(),
            invocation.total_latency().as_millis()
        );

        let (llm_score, rationale, judgment) = match invocation.text() {
            None => {
                warn!(
                    "LLM scoring failed for paper {} after trying all fallback models",
                    paper.id
                );
                (
                    0.0,
                    "LLM scoring failed: all models exhausted".to_string(),
                    LlmJudgment::Exhausted,
                )
            }
            Some(text) => match parse_judgment(text) {
                Ok((score, rationale)) => (score, rationale, LlmJudgment::Scored),
                Err(e) => {
                    warn!("Unparseable LLM score for paper {}: {e}", paper.id);
                    (
                        0.0,
                        format!("unparseable LLM response: {e}"),
                        LlmJudgment::Unparseable,
                    )
                }
            },
        };

        self.verdict(paper, keyword, llm_score, rationale, judgment, Some(&invocation))
    }

    fn keyword_only(
        &self,
        paper: &Paper,
        keyword: KeywordScore,
        judgment: LlmJudgment,
    ) -> RelevanceVerdict {
        let rationale = match judgment {
            LlmJudgment::OverLimit => "not LLM-scored: beyond processing limit",
            _ => "not LLM-scored: LLM stage disabled",
        };
        self.verdict(paper, keyword, 0.0, rationale.to_string(), judgment, None)
    }

    fn verdict(
        &self,
        paper: &Paper,
        keyword: KeywordScore,
        llm_score: f64,
        rationale: String,
        llm_judgment: LlmJudgment,
        invocation: Option<&Invocation>,
    ) -> RelevanceVerdict {
        RelevanceVerdict {
            paper_id: paper.id.clone(),
            title: paper.title.clone(),
            keyword_reasons: keyword.reasons(),
            keyword_score: keyword.score,
            llm_score,
            rationale,
            llm_judgment,
            llm_model: invocation.and_then(|i| i.model()).map(String::from),
            llm_attempts: invocation.map(|i| i.attempts.len()).unwrap_or(0),
            llm_failures: invocation.map(Invocation::failures).unwrap_or_default(),
            final_score: self.config.final_score(keyword.score, llm_score),
        }
    }
}
