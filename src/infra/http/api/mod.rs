pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use state::{ApiConfig, ApiState};

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, post},
};

use crate::infra::http::middleware::{log_responses, set_request_context};

/// Routes that need a valid session; role checks happen per handler.
fn staff_routes() -> Router<ApiState> {
    Router::new()
        .route("/api/auth/me", get(handlers::me))
        .route(
            "/api/admin/folders",
            get(handlers::list_folders).post(handlers::create_folder),
        )
        .route(
            "/api/admin/folders/{id}",
            get(handlers::get_folder)
                .patch(handlers::update_folder)
                .delete(handlers::delete_folder),
        )
        .route(
            "/api/admin/folders/{id}/publish",
            patch(handlers::publish_folder),
        )
        .route(
            "/api/admin/folders/{id}/reject",
            post(handlers::reject_folder),
        )
        .route(
            "/api/admin/folders/bulk-delete",
            post(handlers::bulk_delete_folders),
        )
        .route(
            "/api/admin/folders/publish-multiple",
            patch(handlers::publish_folders),
        )
        .route(
            "/api/admin/media",
            get(handlers::list_media).post(handlers::create_media),
        )
        .route(
            "/api/admin/media/{id}",
            get(handlers::get_media)
                .patch(handlers::update_media)
                .delete(handlers::delete_media),
        )
        .route(
            "/api/admin/media/{id}/publish",
            patch(handlers::publish_media),
        )
        .route("/api/admin/media/{id}/move", patch(handlers::move_media))
        .route("/api/admin/media/{id}/reject", post(handlers::reject_media))
        .route("/api/admin/media/bulk", post(handlers::create_media_bulk))
        .route(
            "/api/admin/media/bulk-delete",
            post(handlers::bulk_delete_media),
        )
        .route(
            "/api/admin/media/publish-multiple",
            patch(handlers::publish_media_many),
        )
        .route(
            "/api/admin/blogs",
            get(handlers::list_blogs).post(handlers::create_blog),
        )
        .route(
            "/api/admin/blogs/{id}",
            get(handlers::get_blog)
                .patch(handlers::update_blog)
                .delete(handlers::delete_blog),
        )
        .route("/api/admin/blogs/{id}/publish", post(handlers::publish_blog))
        .route("/api/admin/blogs/{id}/reject", post(handlers::reject_blog))
        .route(
            "/api/admin/blogs/bulk-delete",
            post(handlers::bulk_delete_blogs),
        )
        .route(
            "/api/admin/blogs/publish-multiple",
            patch(handlers::publish_blogs),
        )
        .route("/api/admin/drafts/folders", get(handlers::draft_folders))
        .route("/api/admin/drafts/media", get(handlers::draft_media))
        .route("/api/admin/drafts/blogs", get(handlers::draft_blogs))
        .route(
            "/api/admin/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/api/admin/users/{id}",
            patch(handlers::update_user).delete(handlers::delete_user),
        )
        .route(
            "/api/admin/pages/{slug}",
            get(handlers::admin_get_page).patch(handlers::update_page),
        )
        .route("/api/admin/categories", post(handlers::create_category))
        .route_layer(axum_middleware::from_fn(middleware::require_session))
}

/// Unauthenticated writes, throttled per client.
fn throttled_routes(state: ApiState) -> Router<ApiState> {
    Router::new()
        .route("/api/auth/signup", post(handlers::signup))
        .route("/api/auth/signin", post(handlers::signin))
        .route("/api/auth/admin/signin", post(handlers::admin_signin))
        .route("/api/public/contact", post(handlers::contact))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::rate_limit_public,
        ))
}

fn open_routes() -> Router<ApiState> {
    Router::new()
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/admin/folders/tree", get(handlers::folder_tree))
        .route("/api/admin/folders/root", get(handlers::root_folders))
        .route("/api/public/collections", get(handlers::public_collections))
        .route(
            "/api/public/collections/{id}",
            get(handlers::public_collection),
        )
        .route("/api/public/media", get(handlers::public_media_list))
        .route("/api/public/media/{id}", get(handlers::public_media))
        .route(
            "/api/public/media/{id}/view",
            post(handlers::record_media_view),
        )
        .route("/api/public/search", get(handlers::search))
        .route("/api/public/blogs", get(handlers::public_blogs))
        .route("/api/public/blogs/{slug}", get(handlers::public_blog))
        .route("/api/public/pages/{slug}", get(handlers::get_page))
        .route("/api/public/categories", get(handlers::list_categories))
        .route(
            "/api/system/cleanup-media-views",
            post(handlers::cleanup_media_views),
        )
        .route("/_health/db", get(handlers::db_health))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .merge(staff_routes())
        .merge(throttled_routes(state.clone()))
        .merge(open_routes())
        .with_state(state.clone())
        .layer(axum_middleware::from_fn_with_state(
            state,
            middleware::attach_session,
        ))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
