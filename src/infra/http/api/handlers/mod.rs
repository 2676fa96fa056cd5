//! API handlers organized by resource.
//!
//! Query structs and the service-error to [`ApiError`] conversions shared
//! by every submodule live here.

mod auth;
mod blogs;
mod categories;
mod drafts;
mod folders;
mod media;
mod pages;
mod public;
mod system;
mod users;

pub use auth::*;
pub use blogs::*;
pub use categories::*;
pub use drafts::*;
pub use folders::*;
pub use media::*;
pub use pages::*;
pub use public::*;
pub use system::*;
pub use users::*;

// ----- Shared query structs -----

use serde::Deserialize;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::repos::{ContentFilter, MediaFilter};
use crate::application::search::SearchQuery;
use crate::domain::types::{ContentStatus, MediaType};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ContentListQuery {
    pub status: Option<ContentStatus>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ContentListQuery {
    pub fn split(self) -> (ContentFilter, PageRequest) {
        (
            ContentFilter {
                status: self.status,
                search: self.search,
            },
            PageRequest::new(self.page, self.limit),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaListQuery {
    pub status: Option<ContentStatus>,
    pub search: Option<String>,
    pub folder_id: Option<Uuid>,
    pub media_type: Option<MediaType>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl MediaListQuery {
    pub fn split(self) -> (MediaFilter, PageRequest) {
        (
            MediaFilter {
                status: self.status,
                search: self.search,
                folder_id: self.folder_id,
                media_type: self.media_type,
            },
            PageRequest::new(self.page, self.limit),
        )
    }
}

/// Facet lists are comma separated: `?mediaType=AUDIO,VIDEO&tags=folk`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub q: Option<String>,
    pub folder_id: Option<Uuid>,
    pub media_type: Option<String>,
    pub language: Option<String>,
    pub tags: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

impl SearchParams {
    pub fn into_query(self) -> Result<(SearchQuery, PageRequest), ApiError> {
        let media_types = split_list(self.media_type.as_deref())
            .iter()
            .map(|raw| raw.parse::<MediaType>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| ApiError::bad_request("Invalid media type", Some(err.to_string())))?;

        Ok((
            SearchQuery {
                q: self.q,
                folder_id: self.folder_id,
                media_types,
                languages: split_list(self.language.as_deref()),
                tags: split_list(self.tags.as_deref()),
            },
            PageRequest::new(self.page, self.limit),
        ))
    }
}

// ----- Shared error conversions -----

use axum::http::StatusCode;

use crate::application::admin::content::ContentError;
use crate::application::admin::users::UserAdminError;
use crate::application::auth::{AccessDenied, AuthError};
use crate::application::contact::ContactError;
use crate::application::repos::RepoError;
use crate::domain::error::DomainError;
use crate::domain::slug::SlugError;
use crate::domain::workflow::WorkflowError;

use super::error::{ApiError, codes};

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::NotFound => ApiError::not_found("Resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Integrity constraint violated",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(message) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            Some(message),
        ),
    }
}

pub(crate) fn denied_to_api(err: AccessDenied) -> ApiError {
    ApiError::forbidden(Some(err.to_string()))
}

fn workflow_to_api(err: WorkflowError) -> ApiError {
    match err {
        WorkflowError::ReadOnlyRole(_) | WorkflowError::ApprovalDenied(_) => {
            ApiError::forbidden(Some(err.to_string()))
        }
        WorkflowError::RejectViaUpdate | WorkflowError::MissingReason => {
            ApiError::bad_request("Invalid status transition", Some(err.to_string()))
        }
    }
}

fn domain_to_api(err: DomainError) -> ApiError {
    match err {
        DomainError::NotFound { entity } => ApiError::new(
            StatusCode::NOT_FOUND,
            codes::NOT_FOUND,
            "Resource not found",
            Some(format!("{entity} not found")),
        ),
        DomainError::Validation { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        DomainError::Conflict { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::CONFLICT,
            "Conflict",
            Some(message),
        ),
        DomainError::Invariant { message } => ApiError::internal(message),
    }
}

pub(crate) fn content_to_api(err: ContentError) -> ApiError {
    match err {
        ContentError::ConstraintViolation(field) => {
            ApiError::bad_request("Invalid field", Some(field.to_string()))
        }
        ContentError::NotFound(entity) => ApiError::new(
            StatusCode::NOT_FOUND,
            codes::NOT_FOUND,
            "Resource not found",
            Some(format!("{entity} not found")),
        ),
        ContentError::InvalidParent => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_PARENT,
            "Invalid parent folder",
            Some(err.to_string()),
        ),
        ContentError::InvalidIdList => {
            ApiError::bad_request("Invalid id list", Some(err.to_string()))
        }
        ContentError::SlugTaken(slug) => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Slug already in use",
            Some(slug),
        ),
        ContentError::Slug(SlugError::Exhausted { base }) => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Slug already in use",
            Some(base),
        ),
        ContentError::Slug(err) => ApiError::bad_request("Invalid slug", Some(err.to_string())),
        ContentError::Workflow(err) => workflow_to_api(err),
        ContentError::Domain(err) => domain_to_api(err),
        ContentError::Repo(err) => repo_to_api(err),
    }
}

pub(crate) fn auth_to_api(err: AuthError) -> ApiError {
    match err {
        AuthError::ConstraintViolation(field) => {
            ApiError::bad_request("Invalid field", Some(field.to_string()))
        }
        AuthError::InvalidCredentials => ApiError::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "Invalid email or password",
            None,
        ),
        AuthError::InsufficientRole(_) => ApiError::forbidden(Some(err.to_string())),
        AuthError::InvalidToken => ApiError::unauthorized(),
        AuthError::AccountExists => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Account already exists",
            None,
        ),
        AuthError::Hash(_) | AuthError::Signing(_) => ApiError::internal(err.to_string()),
        AuthError::Repo(err) => repo_to_api(err),
    }
}

pub(crate) fn users_to_api(err: UserAdminError) -> ApiError {
    match err {
        UserAdminError::ConstraintViolation(field) => {
            ApiError::bad_request("Invalid field", Some(field.to_string()))
        }
        UserAdminError::NotFound => ApiError::not_found("User not found"),
        UserAdminError::Forbidden(_) => ApiError::forbidden(Some(err.to_string())),
        UserAdminError::LastSuperadmin => ApiError::new(
            StatusCode::CONFLICT,
            codes::LAST_SUPERADMIN,
            "The last SUPERADMIN cannot be demoted or deleted",
            None,
        ),
        UserAdminError::AccountExists => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Account already exists",
            None,
        ),
        UserAdminError::Auth(err) => auth_to_api(err),
        UserAdminError::Repo(err) => repo_to_api(err),
    }
}

pub(crate) fn contact_to_api(err: ContactError) -> ApiError {
    match err {
        ContactError::ConstraintViolation(field) => {
            ApiError::bad_request("Invalid field", Some(field.to_string()))
        }
        ContactError::Mail(err) => ApiError::new(
            StatusCode::BAD_GATEWAY,
            codes::MAIL,
            "Message could not be delivered",
            Some(err.to_string()),
        ),
    }
}
