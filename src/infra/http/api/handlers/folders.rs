//! Folder handlers

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::auth::Principal;
use crate::domain::types::{Role, Visibility};

use super::{ContentListQuery, content_to_api, denied_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::ApiJson;
use crate::infra::http::api::middleware::MaybePrincipal;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn list_folders(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ContentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Contributor).map_err(denied_to_api)?;
    let (filter, page) = query.split();
    let page = state
        .folders
        .list(&filter, page)
        .await
        .map_err(content_to_api)?;
    Ok(Json(page))
}

pub async fn create_folder(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<FolderCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Contributor).map_err(denied_to_api)?;
    let folder = state
        .folders
        .create(principal.actor(), payload.into())
        .await
        .map_err(content_to_api)?;
    Ok((StatusCode::CREATED, Json(folder)))
}

pub async fn get_folder(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Contributor).map_err(denied_to_api)?;
    let context = state
        .folders
        .context(id, Visibility::All)
        .await
        .map_err(content_to_api)?;
    Ok(Json(context))
}

pub async fn update_folder(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<FolderUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Contributor).map_err(denied_to_api)?;
    let folder = state
        .folders
        .update(principal.actor(), id, payload.into())
        .await
        .map_err(content_to_api)?;
    Ok(Json(folder))
}

pub async fn delete_folder(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let outcome = state.folders.delete(id).await.map_err(content_to_api)?;
    Ok(Json(CascadeResponse::from(outcome)))
}

pub async fn publish_folder(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let folder = state
        .folders
        .publish(principal.actor(), id)
        .await
        .map_err(content_to_api)?;
    Ok(Json(folder))
}

pub async fn reject_folder(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<RejectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let folder = state
        .folders
        .reject(principal.actor(), id, &payload.reason)
        .await
        .map_err(content_to_api)?;
    Ok(Json(folder))
}

pub async fn publish_folders(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<IdsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let count = state
        .folders
        .publish_many(principal.actor(), &payload.ids)
        .await
        .map_err(content_to_api)?;
    Ok(Json(CountResponse { count }))
}

pub async fn bulk_delete_folders(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<IdsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let outcome = state
        .folders
        .delete_many(&payload.ids)
        .await
        .map_err(content_to_api)?;
    Ok(Json(CascadeResponse::from(outcome)))
}

/// Staff sessions see every status; everyone else sees published folders.
fn visibility(principal: &MaybePrincipal) -> Visibility {
    Visibility::for_role(principal.0.as_ref().map(|principal| principal.role))
}

pub async fn folder_tree(
    State(state): State<ApiState>,
    principal: MaybePrincipal,
) -> Result<impl IntoResponse, ApiError> {
    let tree = state
        .folders
        .tree(visibility(&principal))
        .await
        .map_err(content_to_api)?;
    Ok(Json(tree))
}

pub async fn root_folders(
    State(state): State<ApiState>,
    principal: MaybePrincipal,
) -> Result<impl IntoResponse, ApiError> {
    let roots = state
        .folders
        .roots(visibility(&principal))
        .await
        .map_err(content_to_api)?;
    Ok(Json(roots))
}
