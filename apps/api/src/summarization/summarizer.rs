//! Chunked Summarizer: map-reduce summarization into a fixed field schema.
//!
//! Flow: route (full text vs abstract) → map (one call per chunk, in order)
//!       → compact (only if the joined partials exceed the payload limit)
//!       → reduce (one JSON call producing the schema fields).
//!
//! Compaction groups consecutive partial summaries into batches under the
//! payload limit and merges each batch with the intermediate template. It
//! repeats for at most `max_compaction_rounds`; whatever is still too long
//! after that is cut at the payload limit, keeping the earliest text.
//!
//! A stage that exhausts every model fails the paper's summary, not the run.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::llm_client::prompts::render;
use crate::llm_client::{parse_json, LlmClient, Prompt};
use crate::models::paper::Paper;
use crate::summarization::chunking::{split_text, truncate_chars};

/// Separator placed between partial summaries when they are joined.
pub const SUMMARY_SEPARATOR: &str = "\n---\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    FullText,
    Abstract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    Complete,
    /// The reduce model answered but not in the schema.
    Unparseable,
    /// A stage exhausted every model, or there was nothing to summarize.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStage {
    Map,
    Compaction,
    Reduce,
}

/// One schema field. `value` is `None` when unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryField {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub paper_id: String,
    pub source: SummarySource,
    pub status: SummaryStatus,
    pub failed_stage: Option<SummaryStage>,
    pub detail: Option<String>,
    pub chunk_count: usize,
    /// Always one entry per schema field, in schema order.
    pub fields: Vec<SummaryField>,
}

#[cfg(test)]
impl SummaryResult {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.value.as_deref())
    }
}

#[derive(Debug, Error)]
pub enum SummaryParseError {
    #[error("reduce output is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),

    #[error("reduce output contains none of the schema fields")]
    NoSchemaFields,
}

/// Parses reduce output into schema fields. Keys match case-insensitively;
/// fields the model left out come back as `None`.
pub fn parse_summary_fields(
    text: &str,
    schema: &[String],
) -> Result<Vec<SummaryField>, SummaryParseError> {
    let object: Map<String, Value> = parse_json(text)?;

    let fields: Vec<SummaryField> = schema
        .iter()
        .map(|name| {
            let value = object.get(name).or_else(|| {
                object
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            });
            let value = match value {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Some(Value::Array(items)) if !items.is_empty() => Some(
                    items
                        .iter()
                        .map(|v| v.as_str().map(String::from).unwrap_or_else(|| v.to_string()))
                        .collect::<Vec<_>>()
                        .join("\n"),
                ),
                Some(Value::Object(inner)) => Some(Value::Object(inner.clone()).to_string()),
                Some(Value::Number(n)) => Some(n.to_string()),
                Some(Value::Bool(b)) => Some(b.to_string()),
                _ => None,
            };
            SummaryField {
                name: name.clone(),
                value,
            }
        })
        .collect();

    if fields.iter().all(|f| f.value.is_none()) {
        return Err(SummaryParseError::NoSchemaFields);
    }
    Ok(fields)
}

/// Groups consecutive items into batches whose joined length stays within
/// `limit` chars. An item longer than `limit` gets a batch of its own.
pub fn batch_in_order(items: &[String], limit: usize) -> Vec<Vec<String>> {
    let separator_len = SUMMARY_SEPARATOR.chars().count();
    let mut batches: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0usize;

    for item in items {
        let item_len = item.chars().count();
        if !current.is_empty() && current_len + separator_len + item_len > limit {
            batches.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current_len += separator_len;
        }
        current_len += item_len;
        current.push(item.clone());
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Picks the text to summarize. Full text wins unless it is missing, blank,
/// or longer than `max_text_length_for_full_summary` chars.
pub fn route<'p>(paper: &'p Paper, config: &PipelineConfig) -> (SummarySource, &'p str) {
    let ceiling = config.summarizer.max_text_length_for_full_summary;
    match paper.full_text.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(text) if text.chars().count() <= ceiling => (SummarySource::FullText, text),
        Some(text) => {
            info!(
                "Paper {} is too long ({} chars). Summarizing abstract only.",
                paper.id,
                text.chars().count()
            );
            (SummarySource::Abstract, paper.abstract_text.as_str())
        }
        None => {
            info!("Paper {} has no full text. Summarizing abstract only.", paper.id);
            (SummarySource::Abstract, paper.abstract_text.as_str())
        }
    }
}

struct StageFailure {
    stage: SummaryStage,
    detail: String,
}

pub struct ChunkedSummarizer<'a> {
    config: &'a PipelineConfig,
    llm: &'a LlmClient,
}

impl<'a> ChunkedSummarizer<'a> {
    pub fn new(config: &'a PipelineConfig, llm: &'a LlmClient) -> Self {
        Self { config, llm }
    }

    pub async fn summarize(&self, paper: &Paper) -> SummaryResult {
        let (source, text) = route(paper, self.config);

        if text.trim().is_empty() {
            warn!("No content to summarize for paper {}", paper.id);
            return self.failed(
                paper,
                source,
                0,
                StageFailure {
                    stage: SummaryStage::Map,
                    detail: "no text to summarize".to_string(),
                },
            );
        }

        let partials = match source {
            SummarySource::FullText => self.map_chunks(paper, text).await,
            SummarySource::Abstract => self.summarize_abstract(text).await.map(|s| vec![s]),
        };
        let partials = match partials {
            Ok(partials) => partials,
            Err(failure) => return self.failed(paper, source, 0, failure),
        };
        let chunk_count = partials.len();

        let combined = match self.compact(partials).await {
            Ok(combined) => combined,
            Err(failure) => return self.failed(paper, source, chunk_count, failure),
        };

        self.reduce(paper, source, chunk_count, &combined).await
    }

    /// Map stage: one partial summary per chunk, in chunk order.
    async fn map_chunks(&self, paper: &Paper, text: &str) -> Result<Vec<String>, StageFailure> {
        let summarizer = &self.config.summarizer;
        let chunks = split_text(text, summarizer.chunk_size, summarizer.chunk_overlap).map_err(
            |e| StageFailure {
                stage: SummaryStage::Map,
                detail: e.to_string(),
            },
        )?;
        info!(
            "Mapping {} chunks of paper {} into summaries...",
            chunks.len(),
            paper.id
        );

        let mut partials = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let prompt = Prompt::text(render(&self.config.prompts.map, &[("input", chunk.as_str())]));
            let invocation = self.llm.invoke("map", &prompt, &summarizer.map).await;
            match invocation.into_text() {
                Some(summary) => partials.push(summary),
                None => {
                    warn!(
                        "Map failed for chunk {}/{} of paper {}",
                        i + 1,
                        chunks.len(),
                        paper.id
                    );
                    return Err(StageFailure {
                        stage: SummaryStage::Map,
                        detail: format!(
                            "chunk {}/{}: all models exhausted",
                            i + 1,
                            chunks.len()
                        ),
                    });
                }
            }
        }
        Ok(partials)
    }

    async fn summarize_abstract(&self, text: &str) -> Result<String, StageFailure> {
        let prompt = Prompt::text(render(
            &self.config.prompts.abstract_only,
            &[("input", text)],
        ));
        self.llm
            .invoke("abstract", &prompt, &self.config.summarizer.map)
            .await
            .into_text()
            .ok_or_else(|| StageFailure {
                stage: SummaryStage::Map,
                detail: "abstract summary: all models exhausted".to_string(),
            })
    }

    /// Brings the joined partial summaries under the payload limit.
    async fn compact(&self, partials: Vec<String>) -> Result<String, StageFailure> {
        let summarizer = &self.config.summarizer;
        let limit = summarizer.payload_limit;
        let fields = summarizer.schema_fields.join(", ");
        let mut current = partials;
        let mut round = 0;

        loop {
            let joined = current.join(SUMMARY_SEPARATOR);
            if joined.chars().count() <= limit {
                return Ok(joined);
            }
            if round >= summarizer.max_compaction_rounds {
                warn!(
                    "Partial summaries still exceed {limit} chars after {round} compaction rounds; truncating"
                );
                return Ok(truncate_chars(&joined, limit).to_string());
            }
            round += 1;

            let batches = batch_in_order(&current, limit);
            info!(
                "Compaction round {round}: reducing {} summaries in {} batches",
                current.len(),
                batches.len()
            );

            let mut next = Vec::with_capacity(batches.len());
            for batch in &batches {
                let user = render(
                    &self.config.prompts.intermediate_reduce,
                    &[
                        ("chunk_summaries", batch.join(SUMMARY_SEPARATOR).as_str()),
                        ("fields", fields.as_str()),
                    ],
                );
                let invocation = self
                    .llm
                    .invoke("compaction", &Prompt::text(user), &summarizer.reduce)
                    .await;
                match invocation.into_text() {
                    Some(summary) => next.push(summary),
                    None => {
                        return Err(StageFailure {
                            stage: SummaryStage::Compaction,
                            detail: format!("compaction round {round}: all models exhausted"),
                        })
                    }
                }
            }
            current = next;
        }
    }

    async fn reduce(
        &self,
        paper: &Paper,
        source: SummarySource,
        chunk_count: usize,
        combined: &str,
    ) -> SummaryResult {
        let summarizer = &self.config.summarizer;
        let fields = summarizer.schema_fields.join(", ");
        let user = render(
            &self.config.prompts.reduce,
            &[("chunk_summaries", combined), ("fields", fields.as_str())],
        );
        let prompt = Prompt::json(&self.config.prompts.reduce_system, user);

        info!("Reducing summaries of paper {} into the final schema", paper.id);
        let invocation = self.llm.invoke("reduce", &prompt, &summarizer.reduce).await;
        let Some(text) = invocation.text() else {
            warn!("Final reduction failed for paper {}", paper.id);
            return self.failed(
                paper,
                source,
                chunk_count,
                StageFailure {
                    stage: SummaryStage::Reduce,
                    detail: "final reduce: all models exhausted".to_string(),
                },
            );
        };

        match parse_summary_fields(text, &summarizer.schema_fields) {
            Ok(fields) => SummaryResult {
                paper_id: paper.id.clone(),
                source,
                status: SummaryStatus::Complete,
                failed_stage: None,
                detail: None,
                chunk_count,
                fields,
            },
            Err(e) => {
                warn!("Unparseable summary for paper {}: {e}", paper.id);
                SummaryResult {
                    paper_id: paper.id.clone(),
                    source,
                    status: SummaryStatus::Unparseable,
                    failed_stage: Some(SummaryStage::Reduce),
                    detail: Some(e.to_string()),
                    chunk_count,
                    fields: self.unavailable_fields(),
                }
            }
        }
    }

    fn failed(
        &self,
        paper: &Paper,
        source: SummarySource,
        chunk_count: usize,
        failure: StageFailure,
    ) -> SummaryResult {
        SummaryResult {
            paper_id: paper.id.clone(),
            source,
            status: SummaryStatus::Failed,
            failed_stage: Some(failure.stage),
            detail: Some(failure.detail),
            chunk_count,
            fields: self.unavailable_fields(),
        }
    }

    fn unavailable_fields(&self) -> Vec<SummaryField> {
        self.config
            .summarizer
            .schema_fields
            .iter()
            .map(|name| SummaryField {
                name: name.clone(),
                value: None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm_client::testing::ScriptedProvider;
    use crate::llm_client::ProviderError;

    const FULL_SUMMARY: &str = r#"{
        "task": "Rank products",
        "approach": "Click model",
        "result": "+3% nDCG",
        "gap": "Offline only",
        "evaluation": "Two public datasets",
        "takeaway": "Model position bias"
    }"#;

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::from_yaml_str(
            r#"
classifier:
  llm_enabled: false
  keyword_weights:
    click: 1
summarizer:
  chunk_size: 100
  chunk_overlap: 10
  payload_limit: 1000
  max_text_length_for_full_summary: 1000
  map:
    model: mapper
    max_retries: 0
  reduce:
    model: reducer
    max_retries: 0
prompts:
  map: "MAP-TEMPLATE {input}"
  abstract: "ABSTRACT-TEMPLATE {input}"
  intermediate_reduce: "COMPACT-TEMPLATE {chunk_summaries}"
  reduce: "REDUCE-TEMPLATE [{fields}] {chunk_summaries}"
"#,
        )
        .unwrap();
        config.llm.backoff_base_ms = 1;
        config
    }

    fn paper(full_text: Option<String>) -> Paper {
        Paper {
            id: "p1".to_string(),
            title: "Click Models".to_string(),
            abstract_text: "We model clicks.".to_string(),
            full_text,
            categories: vec![],
            published: None,
            url: None,
            pdf_url: None,
        }
    }

    fn client(provider: &Arc<ScriptedProvider>, config: &PipelineConfig) -> LlmClient {
        LlmClient::new(provider.clone(), config.llm.clone())
    }

    fn echo_provider() -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider::with_responder(|model, user| match model {
            "mapper" => Ok(format!("partial<{}>", user.chars().count())),
            _ if user.starts_with("REDUCE-TEMPLATE") => Ok(FULL_SUMMARY.to_string()),
            _ => Ok("compacted".to_string()),
        }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_text_runs_map_per_chunk_then_reduce() {
        let config = config();
        let provider = echo_provider();
        let llm = client(&provider, &config);
        let text = "x".repeat(250); // chunks start at 0, 90, 180

        let result = ChunkedSummarizer::new(&config, &llm)
            .summarize(&paper(Some(text)))
            .await;

        assert_eq!(result.status, SummaryStatus::Complete);
        assert_eq!(result.source, SummarySource::FullText);
        assert_eq!(result.chunk_count, 3);
        assert_eq!(result.field("approach"), Some("Click model"));
        assert_eq!(provider.prompts_containing("MAP-TEMPLATE"), 3);
        assert_eq!(provider.prompts_containing("ABSTRACT-TEMPLATE"), 0);
        assert_eq!(provider.prompts_containing("REDUCE-TEMPLATE"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_summaries_reach_reduce_in_chunk_order() {
        let config = config();
        let provider = Arc::new(ScriptedProvider::new());
        provider
            .push("mapper", Ok("FIRST".into()))
            .push("mapper", Ok("SECOND".into()))
            .push("mapper", Ok("THIRD".into()))
            .push("reducer", Ok(FULL_SUMMARY.into()));
        let llm = client(&provider, &config);

        ChunkedSummarizer::new(&config, &llm)
            .summarize(&paper(Some("y".repeat(250))))
            .await;

        let reduce_prompt = provider.calls().last().unwrap().user.clone();
        assert!(reduce_prompt.contains("FIRST\n---\nSECOND\n---\nTHIRD"));
        assert!(reduce_prompt.contains("[task, approach, result, gap, evaluation, takeaway]"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlong_full_text_routes_to_abstract_template() {
        let config = config();
        let provider = echo_provider();
        let llm = client(&provider, &config);

        let result = ChunkedSummarizer::new(&config, &llm)
            .summarize(&paper(Some("z".repeat(1_001))))
            .await;

        assert_eq!(result.source, SummarySource::Abstract);
        assert_eq!(provider.prompts_containing("ABSTRACT-TEMPLATE"), 1);
        assert_eq!(provider.prompts_containing("MAP-TEMPLATE"), 0);
        assert_eq!(result.status, SummaryStatus::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_full_text_routes_to_abstract_template() {
        let config = config();
        let provider = echo_provider();
        let llm = client(&provider, &config);

        let result = ChunkedSummarizer::new(&config, &llm)
            .summarize(&paper(None))
            .await;

        assert_eq!(result.source, SummarySource::Abstract);
        assert_eq!(provider.prompts_containing("ABSTRACT-TEMPLATE We model clicks."), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_map_exhaustion_yields_failed_summary() {
        let config = config();
        let provider = Arc::new(ScriptedProvider::new());
        provider.push("mapper", Ok("ok".into()));
        provider.always("mapper", Err(ProviderError::Server { status: 500, message: "boom".into() }));
        let llm = client(&provider, &config);

        let result = ChunkedSummarizer::new(&config, &llm)
            .summarize(&paper(Some("w".repeat(250))))
            .await;

        assert_eq!(result.status, SummaryStatus::Failed);
        assert_eq!(result.failed_stage, Some(SummaryStage::Map));
        assert!(result.detail.as_deref().unwrap().contains("chunk 2/3"));
        assert_eq!(result.fields.len(), 6);
        assert!(result.fields.iter().all(|f| f.value.is_none()));
        // stopped at the failing chunk; reduce never ran
        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reduce_exhaustion_yields_failed_summary() {
        let config = config();
        let provider = Arc::new(ScriptedProvider::new());
        provider.always("mapper", Ok("partial".into()));
        provider.always("reducer", Err(ProviderError::Auth("revoked".into())));
        let llm = client(&provider, &config);

        let result = ChunkedSummarizer::new(&config, &llm)
            .summarize(&paper(None))
            .await;

        assert_eq!(result.status, SummaryStatus::Failed);
        assert_eq!(result.failed_stage, Some(SummaryStage::Reduce));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unparseable_reduce_output_is_marked() {
        let config = config();
        let provider = Arc::new(ScriptedProvider::new());
        provider.always("mapper", Ok("partial".into()));
        provider.always("reducer", Ok("Here is your summary: it is good.".into()));
        let llm = client(&provider, &config);

        let result = ChunkedSummarizer::new(&config, &llm)
            .summarize(&paper(None))
            .await;

        assert_eq!(result.status, SummaryStatus::Unparseable);
        assert!(result.fields.iter().all(|f| f.value.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_partials_are_compacted_before_reduce() {
        let mut config = config();
        config.summarizer.payload_limit = 120;
        let provider = Arc::new(ScriptedProvider::with_responder(|model, user| {
            if user.starts_with("REDUCE-TEMPLATE") {
                Ok(FULL_SUMMARY.to_string())
            } else if model == "mapper" {
                Ok("m".repeat(50))
            } else {
                Ok("short".to_string())
            }
        }));
        let llm = client(&provider, &config);

        let result = ChunkedSummarizer::new(&config, &llm)
            .summarize(&paper(Some("v".repeat(250))))
            .await;

        assert_eq!(result.status, SummaryStatus::Complete);
        // 3 × 50 chars + separators > 120 → two batches → two compaction calls
        assert_eq!(provider.prompts_containing("COMPACT-TEMPLATE"), 2);
        let reduce_prompt = provider.calls().last().unwrap().user.clone();
        assert!(reduce_prompt.ends_with("short\n---\nshort"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_compaction_exhaustion_fails_before_final_reduce() {
        let mut config = config();
        config.summarizer.payload_limit = 120;
        let provider = Arc::new(ScriptedProvider::new());
        provider.always("mapper", Ok("p".repeat(60)));
        provider.always("reducer", Err(ProviderError::Auth("revoked".into())));
        let llm = client(&provider, &config);

        let result = ChunkedSummarizer::new(&config, &llm)
            .summarize(&paper(Some("t".repeat(250))))
            .await;

        assert_eq!(result.status, SummaryStatus::Failed);
        assert_eq!(result.failed_stage, Some(SummaryStage::Compaction));
        assert_eq!(
            result.detail.as_deref(),
            Some("compaction round 1: all models exhausted")
        );
        assert_eq!(result.chunk_count, 3);
        assert!(result.fields.iter().all(|f| f.value.is_none()));
        // 3 map calls, then the first compaction batch fails; no final reduce
        assert_eq!(provider.calls().len(), 4);
        assert_eq!(provider.prompts_containing("REDUCE-TEMPLATE"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_compaction_that_cannot_shrink_is_truncated() {
        let mut config = config();
        config.summarizer.payload_limit = 120;
        config.summarizer.max_compaction_rounds = 1;
        let provider = Arc::new(ScriptedProvider::with_responder(|_, user| {
            if user.starts_with("REDUCE-TEMPLATE") {
                Ok(FULL_SUMMARY.to_string())
            } else {
                Ok("n".repeat(100))
            }
        }));
        let llm = client(&provider, &config);

        let result = ChunkedSummarizer::new(&config, &llm)
            .summarize(&paper(Some("u".repeat(250))))
            .await;

        assert_eq!(result.status, SummaryStatus::Complete);
        let reduce_prompt = provider.calls().last().unwrap().user.clone();
        let payload = reduce_prompt.rsplit("] ").next().unwrap();
        assert_eq!(payload.chars().count(), 120);
    }

    #[test]
    fn test_parse_summary_fields_matches_keys_case_insensitively() {
        let schema: Vec<String> = ["task", "takeaway"].iter().map(|s| s.to_string()).collect();
        let fields =
            parse_summary_fields(r#"{"Task": "Do X", "TAKEAWAY": ["a", "b"]}"#, &schema).unwrap();
        assert_eq!(fields[0].value.as_deref(), Some("Do X"));
        assert_eq!(fields[1].value.as_deref(), Some("a\nb"));
    }

    #[test]
    fn test_parse_summary_fields_keeps_missing_as_none() {
        let schema: Vec<String> = ["task", "gap"].iter().map(|s| s.to_string()).collect();
        let fields = parse_summary_fields(r#"{"task": "Do X"}"#, &schema).unwrap();
        assert_eq!(fields[1], SummaryField { name: "gap".into(), value: None });
    }

    #[test]
    fn test_parse_summary_fields_rejects_unrelated_object() {
        let schema = vec!["task".to_string()];
        assert!(matches!(
            parse_summary_fields(r#"{"summary": "..."}"#, &schema),
            Err(SummaryParseError::NoSchemaFields)
        ));
        assert!(matches!(
            parse_summary_fields("[1, 2]", &schema),
            Err(SummaryParseError::Json(_))
        ));
    }

    #[test]
    fn test_batch_in_order_respects_limit_and_order() {
        let items: Vec<String> = ["aaaa", "bbbb", "cccc", "dddddddddddd"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        // separator is 5 chars: "aaaa" + sep + "bbbb" = 13
        let batches = batch_in_order(&items, 13);
        assert_eq!(
            batches,
            vec![
                vec!["aaaa".to_string(), "bbbb".to_string()],
                vec!["cccc".to_string()],
                vec!["dddddddddddd".to_string()],
            ]
        );
    }
}
