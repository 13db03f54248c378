//! Axum route handlers for listing, reading and searching stored contracts.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::state::AppState;
use crate::storage::{ContractSummary, ContractType, SearchFilters};

#[derive(Debug, Deserialize)]
pub struct ContractTypeQuery {
    pub contract_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContractListResponse {
    pub success: bool,
    pub contracts: Vec<ContractSummary>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ContractContentResponse {
    pub success: bool,
    pub content: String,
    pub metadata: serde_json::Value,
}

/// Search parameters, accepted as a JSON body (POST) or a query string (GET).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub contract_type: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl SearchRequest {
    /// Validates date bounds (`YYYY-MM-DD`) and converts to storage filters.
    pub fn to_filters(&self) -> Result<SearchFilters, AppError> {
        for (field, value) in [("date_from", &self.date_from), ("date_to", &self.date_to)] {
            let Some(date) = value.as_deref().map(str::trim).filter(|d| !d.is_empty()) else {
                continue;
            };
            NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                AppError::Validation(format!("{field} must be YYYY-MM-DD, got {date:?}"))
            })?;
        }

        Ok(SearchFilters::from_raw(
            self.query.clone(),
            self.contract_type.as_deref(),
            self.date_from.clone(),
            self.date_to.clone(),
        )?)
    }
}

#[derive(Debug, Serialize)]
pub struct SearchFiltersEcho {
    pub contract_type: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub contracts: Vec<ContractSummary>,
    pub count: usize,
    pub query: Option<String>,
    pub filters: SearchFiltersEcho,
}

/// GET /api/contracts?contract_type=
pub async fn handle_list_contracts(
    State(state): State<AppState>,
    Query(params): Query<ContractTypeQuery>,
) -> Result<Json<ContractListResponse>, AppError> {
    let contract_type = ContractType::parse_filter(params.contract_type.as_deref())?;
    let contracts = state.storage.list(contract_type).await?;

    Ok(Json(ContractListResponse {
        success: true,
        count: contracts.len(),
        contracts,
    }))
}

/// GET /api/contracts/:file_name
pub async fn handle_get_contract(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Json<ContractContentResponse>, AppError> {
    let contract = state
        .storage
        .load(&file_name)
        .await?
        .ok_or_else(|| AppError::NotFound("契約書が見つかりません".to_string()))?;

    Ok(Json(ContractContentResponse {
        success: true,
        content: contract.content,
        metadata: contract.metadata,
    }))
}

/// POST /api/search
pub async fn handle_search_json(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    search(&state, request).await
}

/// GET /api/search
pub async fn handle_search_query(
    State(state): State<AppState>,
    Query(request): Query<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    search(&state, request).await
}

async fn search(state: &AppState, request: SearchRequest) -> Result<Json<SearchResponse>, AppError> {
    let contracts = state.storage.search(&request.to_filters()?).await?;

    Ok(Json(SearchResponse {
        success: true,
        count: contracts.len(),
        contracts,
        query: request.query,
        filters: SearchFiltersEcho {
            contract_type: request.contract_type,
            date_from: request.date_from,
            date_to: request.date_to,
        },
    }))
}
