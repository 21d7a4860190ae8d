//! Privileged control endpoints.
//!
//! `/api/shutdown` and `/api/update` require the shared secret (see
//! [`crate::auth`]). Rejected requests never reach these handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::auth::Authorized;
use crate::error::ActionError;
use crate::state::SharedState;

/// Handler for POST /api/shutdown.
#[instrument(skip(state, _auth))]
pub async fn shutdown_handler(_auth: Authorized, State(state): State<SharedState>) -> impl IntoResponse {
    info!("Authorized shutdown request");
    let actions = state.actions.clone();

    let result = tokio::task::spawn_blocking(move || actions.shutdown())
        .await
        .unwrap_or_else(|e| Err(ActionError::Join(e.to_string())));

    match result {
        Ok(()) => {
            warn!("System shutdown scheduled");
            (
                StatusCode::OK,
                Json(json!({ "message": "System shutting down in 1 minute" })),
            )
        }
        Err(e) => {
            error!("Shutdown failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Shutdown failed", "details": [e.to_string()] })),
            )
        }
    }
}

/// Handler for POST /api/update.
///
/// Answers once every step has finished.
#[instrument(skip(state, _auth))]
pub async fn update_handler(_auth: Authorized, State(state): State<SharedState>) -> impl IntoResponse {
    info!("Authorized update request");
    let actions = state.actions.clone();

    let results = tokio::task::spawn_blocking(move || actions.update())
        .await
        .unwrap_or_else(|e| vec![Err(ActionError::Join(e.to_string()))]);

    let failures: Vec<String> = results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .map(|e| e.to_string())
        .collect();

    if failures.is_empty() {
        info!("System update complete");
        (
            StatusCode::OK,
            Json(json!({ "message": "System update complete!" })),
        )
    } else {
        error!("System update finished with {} failed step(s)", failures.len());
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "System update failed", "details": failures })),
        )
    }
}
