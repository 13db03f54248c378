//! Best-effort tracing of LLM calls.
//!
//! Generator and judge report through `TraceObserver` and never look at the outcome.
//! Implementations swallow and log their own failures.

pub mod langfuse;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use crate::config::LangfuseConfig;
use crate::llm_client::Usage;

pub use langfuse::LangfuseObserver;

/// Start of one request/response cycle.
#[derive(Debug, Clone)]
pub struct TraceStart {
    pub id: String,
    pub name: String,
    pub metadata: Value,
    pub tags: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// A completed model call within a trace.
#[derive(Debug, Clone)]
pub struct GenerationRecord {
    pub id: String,
    pub trace_id: String,
    pub name: String,
    pub model: String,
    pub model_parameters: Value,
    pub input: String,
    pub output: String,
    pub usage: Usage,
    pub metadata: Value,
    pub tags: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// A failed model call within a trace.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub id: String,
    pub trace_id: String,
    pub name: String,
    pub message: String,
    pub metadata: Value,
    pub timestamp: DateTime<Utc>,
}

/// Receives trace events. Implementations must not fail the caller.
#[async_trait]
pub trait TraceObserver: Send + Sync {
    async fn on_trace_start(&self, trace: &TraceStart);
    async fn on_generation(&self, generation: &GenerationRecord);
    async fn on_error(&self, error: &ErrorEvent);

    /// Whether events actually leave the process.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Default observer: drops every event.
pub struct NoopObserver;

#[async_trait]
impl TraceObserver for NoopObserver {
    async fn on_trace_start(&self, _trace: &TraceStart) {}
    async fn on_generation(&self, _generation: &GenerationRecord) {}
    async fn on_error(&self, _error: &ErrorEvent) {}

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Picks the observer for this process: Langfuse when credentials are present and the
/// project probe succeeds, otherwise the no-op observer.
pub async fn build_observer(config: &LangfuseConfig) -> Arc<dyn TraceObserver> {
    let Some((public_key, secret_key)) = config.credentials() else {
        warn!("Langfuse credentials not configured, tracing disabled");
        return Arc::new(NoopObserver);
    };

    let observer = LangfuseObserver::new(&config.host, public_key, secret_key);
    match observer.probe_project().await {
        Ok(()) => Arc::new(observer),
        Err(e) => {
            warn!("Langfuse unavailable, tracing disabled: {e}");
            Arc::new(NoopObserver)
        }
    }
}
