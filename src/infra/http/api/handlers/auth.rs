//! Session handlers: signup, signin, logout and the current user.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::application::auth::{SESSION_COOKIE, SessionToken};
use crate::domain::types::Role;

use super::auth_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::extract::ApiJson;
use crate::infra::http::api::middleware::MaybePrincipal;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

fn session_cookie(state: &ApiState, token: SessionToken) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.cookie_secure)
        .max_age(token.max_age)
        .build()
}

pub async fn signup(
    State(state): State<ApiState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, token) = state
        .auth
        .signup(payload.into())
        .await
        .map_err(auth_to_api)?;

    let jar = jar.add(session_cookie(&state, token));
    Ok((StatusCode::CREATED, jar, Json(SessionResponse { user })))
}

pub async fn signin(
    State(state): State<ApiState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<SigninRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, token) = state
        .auth
        .signin(payload.into(), None)
        .await
        .map_err(auth_to_api)?;

    let jar = jar.add(session_cookie(&state, token));
    Ok((jar, Json(SessionResponse { user })))
}

/// Staff sign-in: VIEWER accounts are refused.
pub async fn admin_signin(
    State(state): State<ApiState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<SigninRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, token) = state
        .auth
        .signin(payload.into(), Some(Role::Contributor))
        .await
        .map_err(auth_to_api)?;

    let jar = jar.add(session_cookie(&state, token));
    Ok((jar, Json(SessionResponse { user })))
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(SuccessResponse::ok()))
}

pub async fn me(
    State(state): State<ApiState>,
    MaybePrincipal(principal): MaybePrincipal,
) -> Result<impl IntoResponse, ApiError> {
    let principal = principal.ok_or_else(ApiError::unauthorized)?;
    let user = state
        .auth
        .current_user(&principal)
        .await
        .map_err(auth_to_api)?;
    Ok(Json(SessionResponse { user }))
}
