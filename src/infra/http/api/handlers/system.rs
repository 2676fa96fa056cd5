//! Scheduler trigger and database health check.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use crate::application::error::ErrorReport;

use super::content_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::CountResponse;
use crate::infra::http::api::state::ApiState;

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// External trigger for the ledger purge. Hidden unless a cron secret is set.
pub async fn cleanup_media_views(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let Some(secret) = state.cron_secret.as_deref() else {
        return Err(ApiError::not_found("Not found"));
    };
    let presented = bearer(&headers).ok_or_else(ApiError::unauthorized)?;
    if presented.as_bytes().ct_eq(secret.as_bytes()).unwrap_u8() == 0 {
        return Err(ApiError::unauthorized().with_source("infra::http::api::system"));
    }

    let count = state
        .views
        .purge_expired()
        .await
        .map_err(content_to_api)?;
    Ok(Json(CountResponse { count }))
}

pub async fn db_health(State(state): State<ApiState>) -> Response {
    match state.health.ping().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
