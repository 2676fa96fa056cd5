//! Account management handlers

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::auth::Principal;
use crate::domain::types::Role;

use super::{PageQuery, denied_to_api, users_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::ApiJson;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn list_users(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let page = state
        .users
        .list(query.request())
        .await
        .map_err(users_to_api)?;
    Ok(Json(page))
}

pub async fn create_user(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<UserCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let user = state
        .users
        .create(principal.actor(), payload.into())
        .await
        .map_err(users_to_api)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UserUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let user = state
        .users
        .update(principal.actor(), id, payload.into())
        .await
        .map_err(users_to_api)?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    state
        .users
        .delete(principal.actor(), id)
        .await
        .map_err(users_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}
