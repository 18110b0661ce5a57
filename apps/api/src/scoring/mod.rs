// Relevance scoring: deterministic keyword stage plus gated LLM judgment.
// All LLM calls go through llm_client: no direct provider calls here.

pub mod classifier;
pub mod handlers;
pub mod keyword;
pub mod prompts;
