use crate::generation::generator::ContractGenerator;
use crate::judge::evaluator::ContractJudge;
use crate::storage::ContractStorage;

/// Shared application state injected into all route handlers via Axum extractors.
/// Built once at startup; every member is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub storage: ContractStorage,
    pub generator: ContractGenerator,
    pub judge: ContractJudge,
}

#[cfg(test)]
pub(crate) fn test_state(
    contracts_dir: &std::path::Path,
    llm_base_url: &str,
) -> (AppState, std::sync::Arc<crate::telemetry::recording::RecordingObserver>) {
    use std::sync::Arc;

    use crate::llm_client::LlmClient;
    use crate::telemetry::recording::RecordingObserver;

    let observer = Arc::new(RecordingObserver::default());
    let llm = LlmClient::new("sk-test", llm_base_url);
    let state = AppState {
        storage: ContractStorage::new(contracts_dir),
        generator: ContractGenerator::with_client(llm.clone(), observer.clone()),
        judge: ContractJudge::with_client(llm, observer.clone()),
    };
    (state, observer)
}
