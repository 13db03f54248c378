//! Browser UI: form pages that drive the same generation, search and evaluation paths as the JSON API.

pub mod pages;

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use tracing::warn;

use crate::errors::AppError;
use crate::generation::generator::{
    generate_and_save, RentalContractRequest, ServiceContractRequest,
};
use crate::judge::handlers::{evaluate_stored, EvaluationRequest};
use crate::state::AppState;
use crate::storage::handlers::SearchRequest;
use crate::storage::{ContractParams, ContractType};

#[derive(Debug, Deserialize)]
pub struct EvaluatePageQuery {
    pub file: Option<String>,
}

/// Renders a failed page load as HTML with the status the JSON API would use.
fn error_response(error: AppError) -> Response {
    let status = error.status();
    warn!("web request failed: {error}");
    (status, Html(pages::error_page(&error.to_string()))).into_response()
}

/// GET /
pub async fn index_page() -> Html<String> {
    Html(pages::index())
}

/// GET /rental
pub async fn rental_form_page() -> Html<String> {
    Html(pages::rental_form())
}

/// POST /rental
pub async fn rental_submit(
    State(state): State<AppState>,
    Form(request): Form<RentalContractRequest>,
) -> Response {
    generate_page(&state, ContractType::Rental, request.into_params()).await
}

/// GET /service
pub async fn service_form_page() -> Html<String> {
    Html(pages::service_form())
}

/// POST /service
pub async fn service_submit(
    State(state): State<AppState>,
    Form(request): Form<ServiceContractRequest>,
) -> Response {
    generate_page(&state, ContractType::Service, request.into_params()).await
}

async fn generate_page(
    state: &AppState,
    contract_type: ContractType,
    params: ContractParams,
) -> Response {
    match generate_and_save(&state.generator, &state.storage, contract_type, &params).await {
        Ok(generated) => Html(pages::contract_result(Ok(&generated))).into_response(),
        Err(e) => {
            let status = e.status();
            warn!("{}の生成に失敗しました: {e}", contract_type.label());
            (status, Html(pages::contract_result(Err(e.to_string())))).into_response()
        }
    }
}

/// GET /contracts
pub async fn contracts_page(State(state): State<AppState>) -> Response {
    match state.storage.list(None).await {
        Ok(contracts) => Html(pages::contracts_list(&contracts)).into_response(),
        Err(e) => error_response(e.into()),
    }
}

/// GET /search
pub async fn search_form_page() -> Html<String> {
    Html(pages::search_form())
}

/// POST /search
pub async fn search_submit(
    State(state): State<AppState>,
    Form(request): Form<SearchRequest>,
) -> Response {
    let result = match request.to_filters() {
        Ok(filters) => state.storage.search(&filters).await.map_err(AppError::from),
        Err(e) => Err(e),
    };

    match result {
        Ok(contracts) => Html(pages::search_results(&request, Ok(contracts.as_slice()))).into_response(),
        Err(e) => (
            e.status(),
            Html(pages::search_results(&request, Err(e.to_string()))),
        )
            .into_response(),
    }
}

/// GET /evaluate?file=
pub async fn evaluate_page(
    State(state): State<AppState>,
    Query(query): Query<EvaluatePageQuery>,
) -> Response {
    match state.storage.list(None).await {
        Ok(contracts) => {
            Html(pages::evaluation_page(&contracts, query.file.as_deref())).into_response()
        }
        Err(e) => error_response(e.into()),
    }
}

/// POST /evaluate
pub async fn evaluate_submit(
    State(state): State<AppState>,
    Form(request): Form<EvaluationRequest>,
) -> Response {
    match evaluate_stored(&state.storage, &state.judge, &request.file_name).await {
        Ok(response) => {
            Html(pages::evaluation_result(&request.file_name, Ok(&response))).into_response()
        }
        Err(e) => (
            e.status(),
            Html(pages::evaluation_result(&request.file_name, Err(e.to_string()))),
        )
            .into_response(),
    }
}
