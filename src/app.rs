use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post, put}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/admin", get(handlers::admin_page))
        .route("/api/settings", get(handlers::get_settings))
        .route("/api/register", post(handlers::register))
        .route("/api/login", post(handlers::login))
        .route("/api/logout", post(handlers::logout))
        .route("/api/session", get(handlers::get_session))
        .route("/api/timer", get(handlers::get_timer))
        .route("/api/timer/start", post(handlers::start_timer))
        .route("/api/timer/stop", post(handlers::stop_timer))
        .route("/api/timer/reset", post(handlers::reset_timer))
        .route("/api/attempt", post(handlers::attempt))
        .route("/api/attempts", get(handlers::get_attempts))
        .route("/api/admin/login", post(handlers::admin_login))
        .route("/api/admin/users", get(handlers::admin_users))
        .route("/api/admin/users/:id/reset", post(handlers::admin_reset_user))
        .route("/api/admin/settings/attempts", put(handlers::admin_attempts_number))
        .route("/api/admin/settings/ranges", put(handlers::admin_discount_ranges))
        .route("/api/admin/export", get(handlers::admin_export))
        .route("/api/admin/stats", get(handlers::admin_stats))
        .with_state(state)
}
