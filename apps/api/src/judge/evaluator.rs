//! Contract Judge: scores a stored contract with a second model call.
//!
//! Flow: pick rubric by type → render prompt → trace start → LLM complete →
//!       parse (never fails) → generation record → outcome.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::judge::parser::{parse_evaluation, EvaluationResult};
use crate::judge::prompts::{
    EVALUATION_PROMPT_TEMPLATE, JUDGE_SYSTEM, RENTAL_CHECKLIST, RENTAL_CRITERIA,
    SERVICE_CHECKLIST, SERVICE_CRITERIA,
};
use crate::llm_client::{fill_template, CompletionRequest, LlmClient};
use crate::storage::{read_with_metadata, ContractType};
use crate::telemetry::{ErrorEvent, GenerationRecord, TraceObserver, TraceStart};

/// Model used for grading.
pub const JUDGE_MODEL: &str = "gpt-4o";
const JUDGE_TEMPERATURE: f32 = 0.1;
const JUDGE_MAX_TOKENS: u32 = 2000;

/// The remote evaluation call failed. Parse problems never end up here.
#[derive(Debug, Error)]
#[error("Evaluation failed (trace {trace_id}): {message}")]
pub struct JudgeError {
    pub trace_id: String,
    pub message: String,
}

impl From<JudgeError> for AppError {
    fn from(e: JudgeError) -> Self {
        AppError::Llm(e.message)
    }
}

/// Successful evaluation of one contract.
#[derive(Debug, Clone, Serialize)]
pub struct JudgeOutcome {
    pub trace_id: String,
    pub evaluation: EvaluationResult,
    pub raw_response: String,
}

/// One entry of a batch run; exactly one of `evaluation` / `error` is set.
#[derive(Debug, Clone, Serialize)]
pub struct BatchEvaluation {
    pub file_path: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchEvaluation {
    fn failed(file_path: &str, error: impl ToString) -> Self {
        Self {
            file_path: file_path.to_string(),
            success: false,
            trace_id: None,
            evaluation: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct ContractJudge {
    llm: LlmClient,
    observer: Arc<dyn TraceObserver>,
}

impl ContractJudge {
    pub fn new(config: &Config, observer: Arc<dyn TraceObserver>) -> Result<Self, AppError> {
        let api_key = config.require_openai_key()?;
        Ok(Self::with_client(
            LlmClient::new(api_key, &config.openai_base_url),
            observer,
        ))
    }

    pub fn with_client(llm: LlmClient, observer: Arc<dyn TraceObserver>) -> Self {
        Self { llm, observer }
    }

    /// Grades one contract. Only the remote call can fail; unparseable output yields
    /// the fallback record.
    pub async fn evaluate(
        &self,
        content: &str,
        contract_type: ContractType,
        metadata: &Value,
    ) -> Result<JudgeOutcome, JudgeError> {
        let trace_id = Uuid::new_v4().to_string();
        self.observer
            .on_trace_start(&TraceStart {
                id: trace_id.clone(),
                name: "contract_quality_evaluation".to_string(),
                metadata: json!({
                    "type": "contract_evaluation",
                    "contract_type": contract_type,
                }),
                tags: vec!["llm-as-a-judge".to_string(), "contract-quality".to_string()],
                timestamp: Utc::now(),
            })
            .await;

        let prompt = build_evaluation_prompt(content, contract_type, metadata);
        let start_time = Utc::now();

        let completion = match self
            .llm
            .complete(CompletionRequest {
                model: JUDGE_MODEL,
                system: JUDGE_SYSTEM,
                prompt: &prompt,
                temperature: JUDGE_TEMPERATURE,
                max_tokens: Some(JUDGE_MAX_TOKENS),
            })
            .await
        {
            Ok(completion) => completion,
            Err(e) => {
                warn!("Evaluation call failed for trace {trace_id}: {e}");
                self.observer
                    .on_error(&ErrorEvent {
                        id: format!("{trace_id}_error"),
                        trace_id: trace_id.clone(),
                        name: "evaluation_error".to_string(),
                        message: e.to_string(),
                        metadata: json!({ "type": "contract_evaluation_error" }),
                        timestamp: Utc::now(),
                    })
                    .await;
                return Err(JudgeError {
                    trace_id,
                    message: e.to_string(),
                });
            }
        };

        let evaluation = parse_evaluation(&completion.text);
        if let Some(parse_error) = &evaluation.parse_error {
            warn!("Judge response for trace {trace_id} was not valid JSON: {parse_error}");
        }

        self.observer
            .on_generation(&GenerationRecord {
                id: format!("{trace_id}_evaluation"),
                trace_id: trace_id.clone(),
                name: "contract_quality_evaluation".to_string(),
                model: JUDGE_MODEL.to_string(),
                model_parameters: json!({
                    "temperature": JUDGE_TEMPERATURE,
                    "maxTokens": JUDGE_MAX_TOKENS,
                }),
                input: prompt,
                output: completion.text.clone(),
                usage: completion.usage,
                metadata: json!({
                    "evaluation_scores": evaluation.scores,
                    "overall_score": evaluation.overall_score,
                    "grade": evaluation.grade,
                }),
                tags: vec!["evaluation".to_string(), "llm-judge".to_string()],
                start_time,
                end_time: Utc::now(),
            })
            .await;

        info!(
            "Evaluated {} contract: {}/100 grade {:?} (trace {})",
            contract_type, evaluation.overall_score, evaluation.grade, trace_id
        );

        Ok(JudgeOutcome {
            trace_id,
            evaluation,
            raw_response: completion.text,
        })
    }

    /// Evaluates each file in order. A failing file produces an error entry; the batch
    /// always returns one entry per path.
    pub async fn batch_evaluate(&self, paths: &[String]) -> Vec<BatchEvaluation> {
        let mut results = Vec::with_capacity(paths.len());

        for file_path in paths {
            let (content, metadata) = match read_with_metadata(Path::new(file_path)).await {
                Ok(loaded) => loaded,
                Err(e) => {
                    results.push(BatchEvaluation::failed(file_path, e));
                    continue;
                }
            };

            let contract_type = ContractType::infer_from_path(file_path);
            let entry = match self.evaluate(&content, contract_type, &metadata).await {
                Ok(outcome) => BatchEvaluation {
                    file_path: file_path.clone(),
                    success: true,
                    trace_id: Some(outcome.trace_id),
                    evaluation: Some(outcome.evaluation),
                    error: None,
                },
                Err(e) => BatchEvaluation {
                    trace_id: Some(e.trace_id.clone()),
                    ..BatchEvaluation::failed(file_path, e.message)
                },
            };
            results.push(entry);
        }

        results
    }
}

/// Renders the type-specific rubric prompt with the contract text and its metadata.
pub fn build_evaluation_prompt(
    content: &str,
    contract_type: ContractType,
    metadata: &Value,
) -> String {
    let (criteria, checklist) = match contract_type {
        ContractType::Rental => (RENTAL_CRITERIA, RENTAL_CHECKLIST),
        ContractType::Service => (SERVICE_CRITERIA, SERVICE_CHECKLIST),
    };
    let metadata_json = serde_json::to_string_pretty(metadata).unwrap_or_else(|_| "{}".into());

    fill_template(
        EVALUATION_PROMPT_TEMPLATE,
        &[
            ("contract_label", contract_type.label()),
            ("criteria", criteria),
            ("checklist", checklist),
            ("metadata_json", &metadata_json),
            ("contract_content", content),
        ],
    )
}
