// Contract generation: prompt rendering, completion, and persistence of the result.
// All LLM calls go through llm_client; no direct API calls here.

pub mod generator;
pub mod handlers;
pub mod prompts;
