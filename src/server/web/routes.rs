use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use super::{
    dialogue::dialogue,
    flows::{flow_next, health},
    types::AppState,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/dialogue", post(dialogue))
        .route("/flow/next", post(flow_next))
        .layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

pub async fn start_dialogue_server(port: u16, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    serve(listener, state).await
}

/// Serves on an already bound listener (port 0 in tests).
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(
        "Dialogue server listening on http://{} ({} flows)",
        addr,
        state.flows.ids().len()
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}
