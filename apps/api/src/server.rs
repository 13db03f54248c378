use anyhow::{bail, Context, Result};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::{Config, FALLBACK_PORTS};
use crate::generation::generator::ContractGenerator;
use crate::judge::evaluator::ContractJudge;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::ContractStorage;
use crate::telemetry::build_observer;

/// Builds the application state and serves the router until the process exits.
pub async fn serve(config: &Config) -> Result<()> {
    let observer = build_observer(&config.langfuse).await;
    info!(
        "Telemetry {}",
        if observer.is_enabled() { "enabled" } else { "disabled" }
    );

    let state = AppState {
        storage: ContractStorage::new(&config.contracts_dir),
        generator: ContractGenerator::new(config, observer.clone())?,
        judge: ContractJudge::new(config, observer)?,
    };
    info!("Contracts directory: {}", config.contracts_dir.display());

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = bind(config).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Binds `PORT` when set, otherwise the first free fallback port.
async fn bind(config: &Config) -> Result<TcpListener> {
    let host = config.bind_host.as_str();

    if let Some(port) = config.port {
        return TcpListener::bind((host, port))
            .await
            .with_context(|| format!("failed to bind {host}:{port}"));
    }

    for port in FALLBACK_PORTS {
        match TcpListener::bind((host, port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) => warn!("Port {port} unavailable: {e}"),
        }
    }

    bail!("no free port on {host} among {FALLBACK_PORTS:?}")
}
