use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::application::auth::{Principal, SESSION_COOKIE};

use super::error::ApiError;
use super::rate_limit::Admission;
use super::state::ApiState;

const FORWARDED_FOR: &str = "x-forwarded-for";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const UNKNOWN_CLIENT: &str = "unknown";

/// Resolve the session cookie, when present and valid, into a [`Principal`]
/// on the request. The principal is mirrored onto the response for logging.
pub async fn attach_session(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    let principal = jar.get(SESSION_COOKIE).and_then(|cookie| {
        state
            .auth
            .sessions()
            .verify(cookie.value())
            .inspect_err(|err| {
                debug!(
                    target = "sylheti_archive::http::session",
                    error = %err,
                    "ignoring invalid session cookie"
                );
            })
            .ok()
    });

    if let Some(principal) = principal.clone() {
        request.extensions_mut().insert(principal);
    }

    let mut response = next.run(request).await;
    if let Some(principal) = principal {
        response.extensions_mut().insert(principal);
    }
    response
}

/// Reject requests that carry no valid session.
pub async fn require_session(request: Request<Body>, next: Next) -> Response {
    if request.extensions().get::<Principal>().is_none() {
        return ApiError::unauthorized()
            .with_source("infra::http::api::require_session")
            .into_response();
    }
    next.run(request).await
}

/// Per-client throttle for unauthenticated write endpoints.
pub async fn rate_limit_public(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = state
        .client_addresses
        .resolve(request.headers(), request.extensions().get());
    let route = request.uri().path().to_string();

    match state.rate_limiter.check(&client, &route) {
        Admission::Limited { retry_after } => ApiError::rate_limited(retry_after),
        Admission::Allowed { remaining } => {
            let mut response = next.run(request).await;
            response
                .headers_mut()
                .insert(RATE_LIMIT_REMAINING, HeaderValue::from(remaining));
            response
        }
    }
}

/// How the caller's address is derived from the socket peer and proxy headers.
#[derive(Debug, Clone, Default)]
pub struct ClientAddressPolicy {
    trust_forwarded_for: bool,
    trusted_proxies: Vec<IpAddr>,
}

impl ClientAddressPolicy {
    pub fn new(trust_forwarded_for: bool, trusted_proxies: Vec<IpAddr>) -> Self {
        Self {
            trust_forwarded_for,
            trusted_proxies,
        }
    }

    /// The socket peer, unless forwarding is trusted. Then the rightmost
    /// `X-Forwarded-For` hop that is not a known proxy wins.
    pub fn resolve(&self, headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
        let forwarded = if self.trust_forwarded_for {
            self.forwarded_client(headers)
        } else {
            None
        };
        forwarded
            .or_else(|| peer.map(|ConnectInfo(addr)| addr.ip()))
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }

    fn forwarded_client(&self, headers: &HeaderMap) -> Option<IpAddr> {
        let hops: Vec<IpAddr> = headers
            .get_all(FORWARDED_FOR)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(|hop| hop.trim().parse::<IpAddr>())
            .collect::<Result<_, _>>()
            .ok()?;

        hops.iter()
            .rev()
            .find(|hop| !self.trusted_proxies.contains(hop))
            .or_else(|| hops.first())
            .copied()
    }
}

/// The caller's address as used for rate limiting and view de-duplication.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl FromRequestParts<ApiState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(
            state
                .client_addresses
                .resolve(&parts.headers, parts.extensions.get()),
        ))
    }
}

/// The session principal if one was attached, for endpoints open to everyone.
#[derive(Debug, Clone)]
pub struct MaybePrincipal(pub Option<Principal>);

impl<S: Send + Sync> FromRequestParts<S> for MaybePrincipal {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Principal>().cloned()))
    }
}
