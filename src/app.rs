use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/quests", post(handlers::create_activity_form))
        .route("/quests/:id/delete", post(handlers::delete_activity_form))
        .route("/quests/:id/log", post(handlers::log_form))
        .route("/logs/:id/delete", post(handlers::delete_log_form))
        .route(
            "/api/activities",
            get(handlers::list_activities).post(handlers::create_activity),
        )
        .route(
            "/api/activities/:id",
            patch(handlers::update_activity).delete(handlers::delete_activity),
        )
        .route("/api/activities/:id/progress", get(handlers::get_progress))
        .route("/api/logs", get(handlers::list_logs).post(handlers::create_log))
        .route("/api/logs/:id", delete(handlers::delete_log))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/remote", get(handlers::get_remote))
        .with_state(state)
}
