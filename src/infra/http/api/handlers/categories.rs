use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::auth::Principal;
use crate::domain::types::Role;

use super::{content_to_api, denied_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::ApiJson;
use crate::infra::http::api::models::CategoryCreateRequest;
use crate::infra::http::api::state::ApiState;

pub async fn list_categories(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let categories = state.categories.list().await.map_err(content_to_api)?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<CategoryCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let category = state
        .categories
        .create(&payload.name, payload.sub_categories)
        .await
        .map_err(content_to_api)?;
    Ok((StatusCode::CREATED, Json(category)))
}
