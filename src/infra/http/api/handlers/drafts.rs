//! Review queues: DRAFT entities awaiting an approver.

use axum::Json;
use axum::extract::{Extension, Query, State};
use axum::response::IntoResponse;

use crate::application::auth::Principal;
use crate::application::repos::{ContentFilter, MediaFilter};
use crate::domain::types::{ContentStatus, Role};

use super::{PageQuery, content_to_api, denied_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::BlogView;
use crate::infra::http::api::state::ApiState;

fn drafts_only() -> ContentFilter {
    ContentFilter {
        status: Some(ContentStatus::Draft),
        search: None,
    }
}

pub async fn draft_folders(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let page = state
        .folders
        .list(&drafts_only(), query.request())
        .await
        .map_err(content_to_api)?;
    Ok(Json(page))
}

pub async fn draft_media(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let filter = MediaFilter {
        status: Some(ContentStatus::Draft),
        ..Default::default()
    };
    let page = state
        .media
        .list(&filter, query.request())
        .await
        .map_err(content_to_api)?;
    Ok(Json(page))
}

pub async fn draft_blogs(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    principal.requires(Role::Admin).map_err(denied_to_api)?;
    let page = state
        .blogs
        .list(&drafts_only(), query.request())
        .await
        .map_err(content_to_api)?;
    Ok(Json(page.map(BlogView::from)))
}
