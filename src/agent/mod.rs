//! LLM-driven browser automation agent.
//!
//! One `Agent` per task run: it holds the task text, an LLM provider, and a
//! connected CDP client, and loops decide-then-act until the model declares the
//! task complete or the step cap is hit. Progress lines go into a `RunLog`.

pub mod action;
pub mod engine;
pub mod llm;
pub mod log;
pub mod types;

pub use engine::Agent;
pub use llm::{GeminiProvider, LlmProvider};
pub use log::RunLog;
pub use types::*;
