//! Blog handlers

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::auth::Principal;
use crate::domain::types::Role;

use super::{ContentListQuery, content_to_api, denied_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::ApiJson;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn list_blogs(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ContentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Contributor).map_err(denied_to_api)?;
    let (filter, page) = query.split();
    let page = state
        .blogs
        .list(&filter, page)
        .await
        .map_err(content_to_api)?;
    Ok(Json(page.map(BlogView::from)))
}

pub async fn create_blog(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<BlogCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Contributor).map_err(denied_to_api)?;
    let blog = state
        .blogs
        .create(principal.actor(), payload.into())
        .await
        .map_err(content_to_api)?;
    Ok((StatusCode::CREATED, Json(BlogView::from(blog))))
}

pub async fn get_blog(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Contributor).map_err(denied_to_api)?;
    let blog = state.blogs.get(id).await.map_err(content_to_api)?;
    Ok(Json(BlogView::from(blog)))
}

pub async fn update_blog(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<BlogUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Contributor).map_err(denied_to_api)?;
    let blog = state
        .blogs
        .update(principal.actor(), id, payload.into())
        .await
        .map_err(content_to_api)?;
    Ok(Json(BlogView::from(blog)))
}

pub async fn delete_blog(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    state.blogs.delete(id).await.map_err(content_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn publish_blog(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let blog = state
        .blogs
        .publish(principal.actor(), id)
        .await
        .map_err(content_to_api)?;
    Ok(Json(BlogView::from(blog)))
}

pub async fn reject_blog(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<RejectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let blog = state
        .blogs
        .reject(principal.actor(), id, &payload.reason)
        .await
        .map_err(content_to_api)?;
    Ok(Json(BlogView::from(blog)))
}

pub async fn publish_blogs(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<IdsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let count = state
        .blogs
        .publish_many(principal.actor(), &payload.ids)
        .await
        .map_err(content_to_api)?;
    Ok(Json(CountResponse { count }))
}

pub async fn bulk_delete_blogs(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    ApiJson(payload): ApiJson<IdsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let count = state
        .blogs
        .delete_many(&payload.ids)
        .await
        .map_err(content_to_api)?;
    Ok(Json(CountResponse { count }))
}
