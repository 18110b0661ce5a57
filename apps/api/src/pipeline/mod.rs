// Run orchestration: classify, rank, select top-N, summarize.

pub mod handlers;
pub mod orchestrator;
