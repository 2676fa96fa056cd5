//! Media handlers

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::admin::media::CreateMediaCommand;
use crate::application::auth::Principal;
use crate::domain::types::Role;

use super::{MediaListQuery, content_to_api, denied_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::ApiJson;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn list_media(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<MediaListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Contributor).map_err(denied_to_api)?;
    let (filter, page) = query.split();
    let page = state
        .media
        .list(&filter, page)
        .await
        .map_err(content_to_api)?;
    Ok(Json(page))
}

pub async fn create_media(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<MediaCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Contributor).map_err(denied_to_api)?;
    let media = state
        .media
        .create(principal.actor(), payload.into())
        .await
        .map_err(content_to_api)?;
    Ok((StatusCode::CREATED, Json(media)))
}

/// All-or-nothing batch create.
pub async fn create_media_bulk(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<MediaBulkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Contributor).map_err(denied_to_api)?;
    let commands: Vec<CreateMediaCommand> = payload.items.into_iter().map(Into::into).collect();
    let created = state
        .media
        .create_many(principal.actor(), commands)
        .await
        .map_err(content_to_api)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_media(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Contributor).map_err(denied_to_api)?;
    let media = state.media.get(id).await.map_err(content_to_api)?;
    Ok(Json(media))
}

pub async fn update_media(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<MediaUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Contributor).map_err(denied_to_api)?;
    let media = state
        .media
        .update(principal.actor(), id, payload.into())
        .await
        .map_err(content_to_api)?;
    Ok(Json(media))
}

pub async fn delete_media(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    state.media.delete(id).await.map_err(content_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn move_media(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<MoveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let media = state
        .media
        .move_to(id, payload.folder_id)
        .await
        .map_err(content_to_api)?;
    Ok(Json(media))
}

pub async fn publish_media(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let media = state
        .media
        .publish(principal.actor(), id)
        .await
        .map_err(content_to_api)?;
    Ok(Json(media))
}

pub async fn reject_media(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<RejectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let media = state
        .media
        .reject(principal.actor(), id, &payload.reason)
        .await
        .map_err(content_to_api)?;
    Ok(Json(media))
}

pub async fn publish_media_many(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<IdsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let count = state
        .media
        .publish_many(principal.actor(), &payload.ids)
        .await
        .map_err(content_to_api)?;
    Ok(Json(CountResponse { count }))
}

pub async fn bulk_delete_media(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<IdsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let count = state
        .media
        .delete_many(&payload.ids)
        .await
        .map_err(content_to_api)?;
    Ok(Json(CountResponse { count }))
}
