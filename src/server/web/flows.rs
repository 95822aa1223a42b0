use axum::{extract::State, Json};

use super::types::{AppState, HealthResponse};
use crate::core::{FlowRequest, FlowStep};

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        flows: state.flows.ids(),
    })
}

pub async fn flow_next(
    State(state): State<AppState>,
    Json(request): Json<FlowRequest>,
) -> Json<FlowStep> {
    tracing::debug!(
        "Advancing flow {} at {:?} with {} answers",
        request.flow_id,
        request.node_id,
        request.answers.len()
    );
    Json(state.flows.advance(&request))
}
