pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers as generation;
use crate::judge::handlers as judge;
use crate::state::AppState;
use crate::storage::handlers as storage;
use crate::web;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Browser UI
        .route("/", get(web::index_page))
        .route(
            "/rental",
            get(web::rental_form_page).post(web::rental_submit),
        )
        .route(
            "/service",
            get(web::service_form_page).post(web::service_submit),
        )
        .route("/contracts", get(web::contracts_page))
        .route(
            "/search",
            get(web::search_form_page).post(web::search_submit),
        )
        .route(
            "/evaluate",
            get(web::evaluate_page).post(web::evaluate_submit),
        )
        // Generation API
        .route("/api/rental", post(generation::handle_create_rental))
        .route("/api/service", post(generation::handle_create_service))
        // Storage API
        .route("/api/contracts", get(storage::handle_list_contracts))
        .route(
            "/api/contracts/:file_name",
            get(storage::handle_get_contract),
        )
        .route(
            "/api/search",
            get(storage::handle_search_query).post(storage::handle_search_json),
        )
        // Evaluation API
        .route("/api/evaluate", post(judge::handle_evaluate))
        .route("/api/batch-evaluate", post(judge::handle_batch_evaluate))
        .with_state(state)
}
