//! Shared-secret authorization for privileged routes.
//!
//! Handlers that take an [`Authorized`] argument only run when the request's
//! `x-api-key` header equals the configured secret. Everything else gets
//! `401 {"error": "Unauthorized"}`, whether the header is absent, empty or
//! wrong. With no secret configured every privileged request is refused.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::state::SharedState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Proof that the request carried the shared secret.
#[derive(Debug)]
pub struct Authorized(());

impl FromRequestParts<SharedState> for Authorized {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .map(|v| v.as_bytes())
            .unwrap_or_default();

        let expected = state.api_key.as_deref().unwrap_or_default().as_bytes();

        if keys_match(provided, expected) {
            Ok(Self(()))
        } else {
            warn!(path = %parts.uri.path(), "rejected privileged request: bad or missing API key");
            Err(unauthorized())
        }
    }
}

pub fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized" })),
    )
        .into_response()
}

/// Compares keys in time independent of where they differ.
///
/// An empty expected key never matches.
pub fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    if expected.is_empty() {
        return false;
    }

    let mut diff = provided.len() ^ expected.len();
    for (i, b) in expected.iter().enumerate() {
        let p = provided.get(i).copied().unwrap_or(0);
        diff |= usize::from(p ^ b);
    }
    diff == 0
}
