//! Axum route handlers for the Evaluation API.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::judge::evaluator::{BatchEvaluation, ContractJudge};
use crate::judge::parser::EvaluationResult;
use crate::state::AppState;
use crate::storage::handlers::ContractTypeQuery;
use crate::storage::{ContractStorage, ContractType};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EvaluationRequest {
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchEvaluationResponse {
    pub success: bool,
    pub message: String,
    pub evaluations: Vec<BatchEvaluation>,
    pub total_count: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Shared logic (used by the JSON API, the HTML pages and the CLI)
// ────────────────────────────────────────────────────────────────────────────

/// Loads a stored contract by file name and grades it.
///
/// A missing file is an error; a failed model call is reported inside the response
/// with `success: false`.
pub async fn evaluate_stored(
    storage: &ContractStorage,
    judge: &ContractJudge,
    file_name: &str,
) -> Result<EvaluationResponse, AppError> {
    let contract = storage
        .load(file_name)
        .await?
        .ok_or_else(|| AppError::NotFound("契約書が見つかりません".to_string()))?;

    let response = match judge
        .evaluate(&contract.content, contract.contract_type, &contract.metadata)
        .await
    {
        Ok(outcome) => EvaluationResponse {
            success: true,
            message: "契約書の品質評価が完了しました".to_string(),
            trace_id: Some(outcome.trace_id),
            evaluation: Some(outcome.evaluation),
            error: None,
        },
        Err(e) => EvaluationResponse {
            success: false,
            message: "評価中にエラーが発生しました".to_string(),
            trace_id: Some(e.trace_id),
            evaluation: None,
            error: Some(e.message),
        },
    };

    Ok(response)
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/evaluate
pub async fn handle_evaluate(
    State(state): State<AppState>,
    Json(request): Json<EvaluationRequest>,
) -> Result<Json<EvaluationResponse>, AppError> {
    let response = evaluate_stored(&state.storage, &state.judge, &request.file_name).await?;
    Ok(Json(response))
}

/// POST /api/batch-evaluate?contract_type=
///
/// Evaluates every stored contract (optionally of one type), newest first.
pub async fn handle_batch_evaluate(
    State(state): State<AppState>,
    Query(params): Query<ContractTypeQuery>,
) -> Result<Json<BatchEvaluationResponse>, AppError> {
    let contract_type = ContractType::parse_filter(params.contract_type.as_deref())?;
    let paths: Vec<String> = state
        .storage
        .list(contract_type)
        .await?
        .into_iter()
        .map(|c| c.file_path)
        .collect();

    let evaluations = state.judge.batch_evaluate(&paths).await;

    Ok(Json(BatchEvaluationResponse {
        success: true,
        message: format!("{}件の契約書評価が完了しました", evaluations.len()),
        total_count: evaluations.len(),
        evaluations,
    }))
}
