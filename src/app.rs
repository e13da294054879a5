use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/auth/login", post(handlers::login))
        .route("/auth/register", post(handlers::register))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/tab/:tab", post(handlers::select_tab))
        .route("/content", post(handlers::add_content))
        .route("/content/:id/delete", post(handlers::delete_content))
        .route("/engagement", post(handlers::record_engagement))
        .route("/metrics/refresh", post(handlers::refresh_metrics))
        .route("/data/reload", post(handlers::reload_data))
        .route("/settings/api", post(handlers::save_api_settings))
        .route("/profile", post(handlers::update_profile))
        .route("/preferences/dark-mode", post(handlers::toggle_dark_mode))
        .route("/api/session", get(handlers::get_session))
        .route("/api/login", post(handlers::api_login))
        .route("/api/logout", post(handlers::api_logout))
        .route(
            "/api/content",
            get(handlers::get_content).post(handlers::api_add_content),
        )
        .route("/api/content/:id", delete(handlers::api_delete_content))
        .route("/api/engagement", get(handlers::get_engagement))
        .route("/api/stats", get(handlers::get_stats))
        .with_state(state)
}
