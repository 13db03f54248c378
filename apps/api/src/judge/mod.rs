// Contract quality evaluation (LLM-as-a-judge).
// All LLM calls go through llm_client; parsing lives in parser.rs as pure functions.

pub mod evaluator;
pub mod handlers;
pub mod parser;
pub mod prompts;
