// Prompt constants for the map-reduce summarizer.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

/// Map stage: one chunk of full text. Replace: {input}
pub const MAP_PROMPT_TEMPLATE: &str = r#"The text below is one consecutive section of a computer science research paper.
Write a dense summary of this section only. Keep every concrete detail about:
- the problem being addressed
- the proposed method and its components
- datasets, baselines and metrics
- quantitative results
- stated limitations

Do not speculate about sections you have not seen.

SECTION:
{input}"#;

/// Abstract-only path: used instead of the map stage when the full text is
/// missing or too long. Replace: {input}
pub const ABSTRACT_PROMPT_TEMPLATE: &str = r#"Only the abstract of this computer science research paper is available.
Write a dense summary of it. Keep every concrete detail about the problem,
the method, the evaluation and the results. Say explicitly when the abstract
does not mention one of these.

ABSTRACT:
{input}"#;

/// Compaction pass: merges a batch of consecutive partial summaries.
/// Replace: {chunk_summaries}
pub const INTERMEDIATE_REDUCE_PROMPT_TEMPLATE: &str = r#"The following are consecutive partial summaries of one research paper, in reading order, separated by "---".
Merge them into a single shorter summary that keeps their order and every concrete
detail (methods, datasets, metrics, numbers, limitations). Remove repetition.

PARTIAL SUMMARIES:
{chunk_summaries}"#;

/// System prompt for the final reduce. Enforces JSON-only output.
pub const REDUCE_SYSTEM: &str = JSON_ONLY_SYSTEM;

/// Final reduce into the structured schema.
/// Replace: {chunk_summaries}, {fields}
pub const REDUCE_PROMPT_TEMPLATE: &str = r#"Condense the summary of a research paper below into the T.A.R.G.E.T. structure.

Return a JSON object whose keys are EXACTLY: {fields}
Each value is a short paragraph (1-3 sentences) of plain text:
- task: the problem the paper tackles
- approach: the proposed method
- result: the headline quantitative or qualitative results
- gap: limitations or open problems
- evaluation: datasets, baselines and metrics used
- takeaway: the one thing a practitioner should remember

SUMMARY:
{chunk_summaries}"#;
