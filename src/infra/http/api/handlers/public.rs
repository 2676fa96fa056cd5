//! Read-only reader endpoints, the view ping and the contact form.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::repos::ContentFilter;
use crate::domain::types::{ContentStatus, Visibility};

use super::{MediaListQuery, PageQuery, SearchParams, contact_to_api, content_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::ApiJson;
use crate::infra::http::api::middleware::ClientIp;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn public_collections(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let roots = state
        .folders
        .roots(Visibility::PublishedOnly)
        .await
        .map_err(content_to_api)?;
    Ok(Json(roots))
}

pub async fn public_collection(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let context = state
        .folders
        .context(id, Visibility::PublishedOnly)
        .await
        .map_err(content_to_api)?;
    Ok(Json(context))
}

pub async fn public_media_list(
    State(state): State<ApiState>,
    Query(query): Query<MediaListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (mut filter, page) = query.split();
    filter.status = Some(ContentStatus::Published);
    let page = state
        .media
        .list(&filter, page)
        .await
        .map_err(content_to_api)?;
    Ok(Json(page))
}

pub async fn public_media(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let media = state
        .media
        .get_visible(id, Visibility::PublishedOnly)
        .await
        .map_err(content_to_api)?;
    Ok(Json(media))
}

pub async fn record_media_view(
    State(state): State<ApiState>,
    ClientIp(client): ClientIp,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .views
        .record(id, &client)
        .await
        .map_err(content_to_api)?;
    Ok(Json(ViewResponse::from(outcome)))
}

pub async fn search(
    State(state): State<ApiState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (query, page) = params.into_query()?;
    let results = state
        .search
        .search(&query, page)
        .await
        .map_err(content_to_api)?;
    Ok(Json(results))
}

pub async fn public_blogs(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ContentFilter {
        status: Some(ContentStatus::Published),
        search: None,
    };
    let page = state
        .blogs
        .list(&filter, query.request())
        .await
        .map_err(content_to_api)?;
    Ok(Json(page.map(BlogView::from)))
}

pub async fn public_blog(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let blog = state
        .blogs
        .find_by_slug(&slug, Visibility::PublishedOnly)
        .await
        .map_err(content_to_api)?;
    Ok(Json(BlogView::from(blog)))
}

pub async fn contact(
    State(state): State<ApiState>,
    ApiJson(payload): ApiJson<ContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .contact
        .submit(payload.into())
        .await
        .map_err(contact_to_api)?;
    Ok(Json(SuccessResponse::ok()))
}
