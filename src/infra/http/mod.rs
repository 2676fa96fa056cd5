//! HTTP surface: the JSON API router plus request-scoped middleware.

pub mod api;
mod middleware;

pub use api::{ApiConfig, ApiState, build_router};
pub use middleware::RequestContext;
