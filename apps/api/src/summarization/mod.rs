// Chunked map-reduce summarization into the structured summary schema.
// All LLM calls go through llm_client: no direct provider calls here.

pub mod chunking;
pub mod prompts;
pub mod summarizer;
