//! Axum route handlers for the Generation API.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::errors::AppError;
use crate::generation::generator::{
    generate_and_save, RentalContractRequest, ServiceContractRequest,
};
use crate::state::AppState;
use crate::storage::{ContractParams, ContractType};

#[derive(Debug, Serialize)]
pub struct ContractResponse {
    pub success: bool,
    pub message: String,
    pub file_path: Option<String>,
    pub contract_content: Option<String>,
}

/// POST /api/rental
pub async fn handle_create_rental(
    State(state): State<AppState>,
    Json(request): Json<RentalContractRequest>,
) -> Result<Json<ContractResponse>, AppError> {
    create(&state, ContractType::Rental, request.into_params()).await
}

/// POST /api/service
pub async fn handle_create_service(
    State(state): State<AppState>,
    Json(request): Json<ServiceContractRequest>,
) -> Result<Json<ContractResponse>, AppError> {
    create(&state, ContractType::Service, request.into_params()).await
}

async fn create(
    state: &AppState,
    contract_type: ContractType,
    params: ContractParams,
) -> Result<Json<ContractResponse>, AppError> {
    let generated =
        generate_and_save(&state.generator, &state.storage, contract_type, &params).await?;

    Ok(Json(ContractResponse {
        success: true,
        message: format!("{}が正常に生成されました", contract_type.label()),
        file_path: Some(generated.file_path),
        contract_content: Some(generated.content),
    }))
}
