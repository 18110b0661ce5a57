//! Pipeline Orchestrator: drives one batch of papers end to end.
//!
//! Flow: dedupe by id → classify (keyword + LLM) → rank → select top-N
//!       → summarize the selected papers only.
//!
//! Ranking: final_score descending, ties broken by fetch order (earlier
//! first). The same key orders the returned verdicts, so the first
//! `top_n` verdicts are exactly the selected papers.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::llm_client::LlmClient;
use crate::models::paper::Paper;
use crate::scoring::classifier::{LlmJudgment, RelevanceClassifier, RelevanceVerdict};
use crate::summarization::summarizer::{ChunkedSummarizer, SummaryResult, SummaryStatus};

/// Everything a run hands to the reporting side.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub papers_received: usize,
    /// Every classified paper, in rank order.
    pub verdicts: Vec<RelevanceVerdict>,
    /// Ids of the top-N papers, in rank order.
    pub selected: Vec<String>,
    /// One per selected paper, in `selected` order. Empty when the
    /// summarizer is disabled.
    pub summaries: Vec<SummaryResult>,
}

/// Indices of the `n` best verdicts: final_score descending, position
/// ascending on ties.
pub fn select_top_n(verdicts: &[RelevanceVerdict], n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..verdicts.len()).collect();
    order.sort_by(|&a, &b| {
        verdicts[b]
            .final_score
            .total_cmp(&verdicts[a].final_score)
            .then(a.cmp(&b))
    });
    order.truncate(n);
    order
}

/// Drops papers whose id was already seen, keeping the first.
fn dedupe(papers: &[Paper]) -> Vec<&Paper> {
    let mut seen = HashSet::new();
    papers
        .iter()
        .filter(|paper| {
            let fresh = seen.insert(paper.id.as_str());
            if !fresh {
                warn!("Duplicate paper id {} ignored", paper.id);
            }
            fresh
        })
        .collect()
}

/// Classifies every paper and returns the verdicts in rank order.
pub async fn classify_and_rank(
    papers: &[Paper],
    config: &PipelineConfig,
    llm: &LlmClient,
) -> Vec<RelevanceVerdict> {
    let unique: Vec<Paper> = dedupe(papers).into_iter().cloned().collect();
    let verdicts = RelevanceClassifier::new(config, llm)
        .classify_batch(&unique)
        .await;
    rank(verdicts)
}

fn rank(verdicts: Vec<RelevanceVerdict>) -> Vec<RelevanceVerdict> {
    let order = select_top_n(&verdicts, verdicts.len());
    let mut slots: Vec<Option<RelevanceVerdict>> = verdicts.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

/// Runs the whole pipeline over one batch.
pub async fn run(papers: &[Paper], config: &PipelineConfig, llm: &LlmClient) -> RunOutput {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!("Starting run {run_id} with {} papers", papers.len());

    // Step 1: classify + rank
    let verdicts = classify_and_rank(papers, config, llm).await;
    if verdicts.is_empty() {
        info!("Run {run_id}: no relevant papers after keyword filtering");
    }
    log_degraded_verdicts(&verdicts);

    // Step 2: top-N selection (verdicts are already in rank order)
    let top_n = config.pipeline.top_n.min(verdicts.len());
    let selected: Vec<String> = verdicts[..top_n]
        .iter()
        .map(|v| v.paper_id.clone())
        .collect();
    info!("Run {run_id}: selected top {} papers for summarization", selected.len());

    // Step 3: summarize the selection only
    let summaries = if config.summarizer.enabled {
        summarize_selected(papers, &selected, config, llm).await
    } else {
        info!("Summarizer is disabled");
        Vec::new()
    };

    let failed = summaries
        .iter()
        .filter(|s| s.status != SummaryStatus::Complete)
        .count();
    if failed > 0 {
        warn!("Run {run_id}: {failed} of {} summaries are degraded", summaries.len());
    }
    info!("Run {run_id} finished");

    RunOutput {
        run_id,
        started_at,
        papers_received: papers.len(),
        verdicts,
        selected,
        summaries,
    }
}

async fn summarize_selected(
    papers: &[Paper],
    selected: &[String],
    config: &PipelineConfig,
    llm: &LlmClient,
) -> Vec<SummaryResult> {
    let by_id: HashMap<&str, &Paper> = dedupe(papers)
        .into_iter()
        .map(|paper| (paper.id.as_str(), paper))
        .collect();
    let summarizer = ChunkedSummarizer::new(config, llm);
    let total = selected.len();

    let summarizer = &summarizer;
    let work: Vec<_> = selected
        .iter()
        .enumerate()
        .filter_map(|(i, id)| by_id.get(id.as_str()).map(|paper| (i, *paper)))
        .map(|(i, paper)| async move {
            info!(
                "Summarizing paper {}/{}: \"{}\"",
                i + 1,
                total,
                paper.short_title(50)
            );
            summarizer.summarize(paper).await
        })
        .collect();

    stream::iter(work)
        .buffered(config.pipeline.concurrency.max(1))
        .collect()
        .await
}

fn log_degraded_verdicts(verdicts: &[RelevanceVerdict]) {
    let exhausted = verdicts
        .iter()
        .filter(|v| v.llm_judgment == LlmJudgment::Exhausted)
        .count();
    let unparseable = verdicts
        .iter()
        .filter(|v| v.llm_judgment == LlmJudgment::Unparseable)
        .count();
    if exhausted > 0 {
        warn!("{exhausted} papers lost their LLM score: all models exhausted");
    }
    if unparseable > 0 {
        warn!("{unparseable} papers got unparseable LLM scores");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm_client::testing::ScriptedProvider;
    use crate::llm_client::{ErrorKind, ProviderError};

    fn verdict(id: &str, final_score: f64) -> RelevanceVerdict {
        RelevanceVerdict {
            paper_id: id.to_string(),
            title: id.to_string(),
            keyword_score: 0,
            keyword_reasons: vec![],
            llm_score: 0.0,
            rationale: String::new(),
            llm_judgment: LlmJudgment::Disabled,
            llm_model: None,
            llm_attempts: 0,
            llm_failures: vec![],
            final_score,
        }
    }

    fn paper(id: &str, title: &str) -> Paper {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": title,
            "abstract": "We study something.",
        }))
        .unwrap()
    }

    fn config(top_n: usize) -> PipelineConfig {
        let mut config = PipelineConfig::from_yaml_str(
            r#"
classifier:
  interests: "Search ranking"
  keyword_weights:
    ranking: 1
  scoring:
    model: scorer
    max_retries: 0
summarizer:
  map:
    model: mapper
    max_retries: 0
  reduce:
    model: reducer
    max_retries: 0
prompts:
  scoring: "SCORE {title}"
  abstract: "ABSTRACT {input}"
  reduce: "REDUCE {chunk_summaries}"
"#,
        )
        .unwrap();
        config.pipeline.top_n = top_n;
        config.llm.backoff_base_ms = 1;
        config
    }

    /// Scores each title by the number it ends with; summaries always succeed.
    fn provider() -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider::with_responder(|model, user| match model {
            "scorer" => {
                let score: u32 = user
                    .rsplit(' ')
                    .next()
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(0);
                Ok(format!(r#"{{"score": {score}, "reasons": "r"}}"#))
            }
            "mapper" => Ok("partial".to_string()),
            _ => Ok(r#"{"task": "t", "approach": "a", "result": "r",
                        "gap": "g", "evaluation": "e", "takeaway": "k"}"#
                .to_string()),
        }))
    }

    #[test]
    fn test_top_n_breaks_ties_by_original_order() {
        let verdicts: Vec<RelevanceVerdict> = [5.0, 9.0, 2.0, 9.0, 1.0]
            .iter()
            .enumerate()
            .map(|(i, s)| verdict(&format!("p{i}"), *s))
            .collect();
        assert_eq!(select_top_n(&verdicts, 2), vec![1, 3]);
        assert_eq!(select_top_n(&verdicts, 3), vec![1, 3, 0]);
    }

    #[test]
    fn test_top_n_larger_than_input_returns_all() {
        let verdicts = vec![verdict("a", 1.0), verdict("b", 2.0)];
        assert_eq!(select_top_n(&verdicts, 10), vec![1, 0]);
        assert!(select_top_n(&[], 3).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_summarizes_only_top_n() {
        let provider = provider();
        let llm = LlmClient::new(provider.clone(), config(2).llm);
        let papers = vec![
            paper("a", "ranking 5"),
            paper("b", "ranking 9"),
            paper("c", "ranking 2"),
            paper("d", "ranking 9"),
            paper("e", "ranking 1"),
        ];

        let output = run(&papers, &config(2), &llm).await;

        assert_eq!(output.papers_received, 5);
        assert_eq!(output.verdicts.len(), 5);
        assert_eq!(output.selected, vec!["b", "d"]);
        let summarized: Vec<&str> = output.summaries.iter().map(|s| s.paper_id.as_str()).collect();
        assert_eq!(summarized, vec!["b", "d"]);
        assert!(output
            .summaries
            .iter()
            .all(|s| s.status == SummaryStatus::Complete));
        // 5 scoring calls + 2 × (abstract + reduce)
        assert_eq!(provider.calls().len(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verdicts_come_back_in_rank_order() {
        let provider = provider();
        let llm = LlmClient::new(provider, config(1).llm);
        let papers = vec![paper("a", "ranking 3"), paper("b", "ranking 7"), paper("c", "ranking 3")];

        let verdicts = classify_and_rank(&papers, &config(1), &llm).await;

        let ids: Vec<&str> = verdicts.iter().map(|v| v.paper_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_provider_outage_still_produces_results() {
        let provider = Arc::new(ScriptedProvider::with_responder(|_, _| {
            Err(ProviderError::Server {
                status: 503,
                message: "unavailable".into(),
            })
        }));
        let llm = LlmClient::new(provider, config(2).llm);
        let papers = vec![paper("a", "ranking 1"), paper("b", "ranking 2")];

        let output = run(&papers, &config(2), &llm).await;

        assert_eq!(output.verdicts.len(), 2);
        assert!(output
            .verdicts
            .iter()
            .all(|v| v.llm_judgment == LlmJudgment::Exhausted));
        assert!(output
            .verdicts
            .iter()
            .all(|v| v.llm_attempts == 1 && v.llm_failures == vec![ErrorKind::Server]));
        assert_eq!(output.summaries.len(), 2);
        assert!(output
            .summaries
            .iter()
            .all(|s| s.status == SummaryStatus::Failed));
        // equal final scores: fetch order wins
        assert_eq!(output.selected, vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_summarizer_returns_verdicts_only() {
        let provider = provider();
        let llm = LlmClient::new(provider.clone(), config(2).llm);
        let mut config = config(2);
        config.summarizer.enabled = false;

        let output = run(&[paper("a", "ranking 4")], &config, &llm).await;

        assert_eq!(output.selected, vec!["a"]);
        assert!(output.summaries.is_empty());
        assert_eq!(provider.calls().len(), 1);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_run_future_is_send() {
        let config = config(2);
        let llm = LlmClient::new(provider(), config.llm.clone());
        let papers = vec![paper("a", "ranking 1")];

        // axum handlers require Send futures
        let future = run(&papers, &config, &llm);
        assert_send(&future);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_ids_are_processed_once() {
        let provider = provider();
        let llm = LlmClient::new(provider.clone(), config(5).llm);
        let papers = vec![paper("a", "ranking 4"), paper("a", "ranking 8")];

        let output = run(&papers, &config(5), &llm).await;

        assert_eq!(output.verdicts.len(), 1);
        assert_eq!(output.verdicts[0].llm_score, 4.0);
        assert_eq!(output.summaries.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rerun_with_same_responses_is_identical() {
        let papers = vec![
            paper("a", "ranking 6"),
            paper("b", "ranking 6"),
            paper("c", "ranking 8"),
            paper("d", "unrelated 10"),
        ];
        let mut config = config(2);
        config.pipeline.concurrency = 4;

        let first = run(&papers, &config, &LlmClient::new(provider(), config.llm.clone())).await;
        let second = run(&papers, &config, &LlmClient::new(provider(), config.llm.clone())).await;

        assert_eq!(first.verdicts, second.verdicts);
        assert_eq!(first.selected, second.selected);
        assert_eq!(first.selected, vec!["c", "a"]);
        assert_eq!(first.summaries, second.summaries);
    }
}
