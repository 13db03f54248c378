use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{ErrorEvent, GenerationRecord, TraceObserver, TraceStart};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Langfuse rejected request (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("No Langfuse project found for these credentials")]
    NoProject,
}

#[derive(Debug, Deserialize)]
struct ProjectList {
    #[serde(default)]
    data: Vec<Project>,
}

#[derive(Debug, Deserialize)]
struct Project {
    id: String,
    name: String,
}

/// Sends traces, generations and error events to the Langfuse public ingestion API.
#[derive(Clone)]
pub struct LangfuseObserver {
    client: Client,
    host: String,
    public_key: String,
    secret_key: String,
}

impl LangfuseObserver {
    pub fn new(host: &str, public_key: &str, secret_key: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            host: host.trim_end_matches('/').to_string(),
            public_key: public_key.to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    pub fn trace_url(&self, trace_id: &str) -> String {
        format!("{}/trace/{}", self.host, trace_id)
    }

    /// Confirms the credentials resolve to a project.
    pub async fn probe_project(&self) -> Result<(), TelemetryError> {
        let response = self
            .client
            .get(format!("{}/api/public/projects", self.host))
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TelemetryError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let projects: ProjectList = response.json().await?;
        let project = projects.data.first().ok_or(TelemetryError::NoProject)?;
        info!("Langfuse connected: project {} (ID: {})", project.name, project.id);
        Ok(())
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<(), TelemetryError> {
        let response = self
            .client
            .post(format!("{}/api/public/{}", self.host, endpoint))
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TelemetryError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

fn trace_payload(trace: &TraceStart) -> Value {
    json!({
        "id": trace.id,
        "name": trace.name,
        "userId": "system",
        "metadata": trace.metadata,
        "tags": trace.tags,
        "public": false,
        "timestamp": trace.timestamp.to_rfc3339(),
    })
}

fn generation_payload(generation: &GenerationRecord) -> Value {
    json!({
        "id": generation.id,
        "traceId": generation.trace_id,
        "name": generation.name,
        "startTime": generation.start_time.to_rfc3339(),
        "endTime": generation.end_time.to_rfc3339(),
        "model": generation.model,
        "modelParameters": generation.model_parameters,
        "input": generation.input,
        "output": generation.output,
        "usage": {
            "promptTokens": generation.usage.prompt_tokens,
            "completionTokens": generation.usage.completion_tokens,
            "totalTokens": generation.usage.total_tokens,
        },
        "metadata": generation.metadata,
        "tags": generation.tags,
    })
}

fn error_payload(error: &ErrorEvent) -> Value {
    json!({
        "id": error.id,
        "traceId": error.trace_id,
        "name": error.name,
        "startTime": error.timestamp.to_rfc3339(),
        "level": "ERROR",
        "statusMessage": error.message,
        "metadata": error.metadata,
    })
}

#[async_trait]
impl TraceObserver for LangfuseObserver {
    async fn on_trace_start(&self, trace: &TraceStart) {
        match self.post("traces", &trace_payload(trace)).await {
            Ok(()) => debug!("Trace created: {}", trace.id),
            Err(e) => warn!("Langfuse trace start failed for {}: {e}", trace.id),
        }
    }

    async fn on_generation(&self, generation: &GenerationRecord) {
        match self
            .post("generations", &generation_payload(generation))
            .await
        {
            Ok(()) => info!("Trace URL: {}", self.trace_url(&generation.trace_id)),
            Err(e) => warn!("Langfuse generation logging failed for {}: {e}", generation.id),
        }
    }

    async fn on_error(&self, error: &ErrorEvent) {
        if let Err(e) = self.post("events", &error_payload(error)).await {
            warn!("Langfuse error logging failed for {}: {e}", error.trace_id);
        }
    }
}
