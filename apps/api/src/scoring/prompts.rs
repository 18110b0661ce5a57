// Prompt constants for the relevance-scoring stage.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

/// System prompt for relevance scoring.
pub const SCORING_SYSTEM: &str = JSON_ONLY_SYSTEM;

/// Relevance-scoring prompt template.
/// Replace: {interests}, {title}, {abstract}
pub const SCORING_PROMPT_TEMPLATE: &str = r#"You are screening newly published research papers for one reader.

READER INTERESTS:
{interests}

Rate how relevant the paper below is to these interests on a scale from 0 to 10:
- 0: unrelated
- 3: same broad field, different problem
- 6: related problem or directly useful technique
- 9-10: squarely on one of the stated interests

Return a JSON object with this EXACT schema (no extra fields):
{"score": 7, "reasons": "One or two sentences explaining the score."}

PAPER TITLE:
{title}

PAPER ABSTRACT:
{abstract}"#;
