use crate::models::AppState;
use axum::Router;

pub mod health_routes;
pub mod reminder_routes;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1/reminders", reminder_routes::router())
        // Legacy path used by existing cron setups.
        .merge(reminder_routes::legacy_router())
        .merge(health_routes::router())
        .with_state(state)
}
