//! Read-only metrics endpoints.
//!
//! `/api/time`, `/api/mem`, `/api/cpu` and `/api/all` sample the host on
//! every request. Samplers run on the blocking pool; a failing sampler shows
//! up as [`crate::snapshot::MISSING`] in its fields, never as an error status.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::{debug, error, instrument};

use crate::snapshot::{format_cpu, AllMetrics, CpuMetrics, MemMetrics, Sampler, TimeMetrics};
use crate::state::SharedState;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    /// The blocking sampler task panicked or was cancelled.
    SamplerTask,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to sample host metrics" })),
        )
            .into_response()
    }
}

/// Runs `f` against the sampler off the async runtime.
async fn with_sampler<T, F>(state: &SharedState, f: F) -> Result<T, MetricsError>
where
    F: FnOnce(&dyn Sampler) -> T + Send + 'static,
    T: Send + 'static,
{
    let sampler = state.sampler.clone();
    tokio::task::spawn_blocking(move || f(sampler.as_ref()))
        .await
        .map_err(|e| {
            error!("Sampler task failed: {}", e);
            MetricsError::SamplerTask
        })
}

/// Handler for /api/time.
#[instrument(skip(state))]
pub async fn time_handler(
    State(state): State<SharedState>,
) -> Result<Json<TimeMetrics>, MetricsError> {
    debug!("Processing /api/time request");
    let current_time = with_sampler(&state, |s| s.time()).await?;
    Ok(Json(TimeMetrics { current_time }))
}

/// Handler for /api/mem.
#[instrument(skip(state))]
pub async fn mem_handler(
    State(state): State<SharedState>,
) -> Result<Json<MemMetrics>, MetricsError> {
    debug!("Processing /api/mem request");
    let stats = with_sampler(&state, |s| s.snapshot_memory()).await?;
    Ok(Json(MemMetrics::from(stats)))
}

/// Handler for /api/cpu.
#[instrument(skip(state))]
pub async fn cpu_handler(
    State(state): State<SharedState>,
) -> Result<Json<CpuMetrics>, MetricsError> {
    debug!("Processing /api/cpu request");
    let percent = with_sampler(&state, |s| s.snapshot_cpu()).await?;
    Ok(Json(CpuMetrics {
        cpu_usage: format_cpu(percent),
    }))
}

/// Handler for /api/all.
#[instrument(skip(state))]
pub async fn all_handler(
    State(state): State<SharedState>,
) -> Result<Json<AllMetrics>, MetricsError> {
    debug!("Processing /api/all request");
    let snapshot = with_sampler(&state, |s| s.snapshot()).await?;
    Ok(Json(AllMetrics::from(snapshot)))
}
