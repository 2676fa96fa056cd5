//! Static page handlers (about, people, reports).

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::response::IntoResponse;

use crate::application::auth::Principal;
use crate::domain::types::Role;

use super::{content_to_api, denied_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::ApiJson;
use crate::infra::http::api::models::PageUpdateRequest;
use crate::infra::http::api::state::ApiState;

pub async fn get_page(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.pages.get(&slug).await.map_err(content_to_api)?;
    Ok(Json(page))
}

pub async fn admin_get_page(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let page = state.pages.get(&slug).await.map_err(content_to_api)?;
    Ok(Json(page))
}

pub async fn update_page(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(slug): Path<String>,
    ApiJson(payload): ApiJson<PageUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let page = state
        .pages
        .update(&slug, payload.into())
        .await
        .map_err(content_to_api)?;
    Ok(Json(page))
}
