// src/routes/reminder_routes.rs

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    dispatcher::DispatchOutcome,
    error::ApiError,
    middleware::trigger_auth::TriggerAuth,
    models::{AppState, NotifiedFilter, NotifiedListResponse, SendRemindersResponse},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send", post(send_reminders).fallback(method_not_allowed))
        .route("/notified", get(list_notified))
}

pub fn legacy_router() -> Router<AppState> {
    Router::new().route(
        "/api/send-reminders",
        post(send_reminders).fallback(method_not_allowed),
    )
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

// --------------------------
// POST /send
// --------------------------

pub async fn send_reminders(
    State(state): State<AppState>,
    _auth: TriggerAuth,
) -> Result<Json<SendRemindersResponse>, ApiError> {
    let outcome = state.dispatcher.run().await.map_err(|e| {
        tracing::error!(error = %e, "error sending reminders");
        ApiError::ReminderRunFailed(e.to_string())
    })?;

    let body = match outcome {
        DispatchOutcome::NoAppointments { .. } => SendRemindersResponse {
            message: "No appointments for tomorrow.".into(),
            notified_patients: None,
            skipped: None,
        },
        DispatchOutcome::Completed(report) => SendRemindersResponse {
            message: format!("Successfully sent {} reminders.", report.sent_count()),
            notified_patients: Some(report.notified),
            skipped: Some(report.skipped),
        },
    };

    Ok(Json(body))
}

// --------------------------
// GET /notified
// --------------------------

#[derive(Debug, Deserialize)]
pub struct NotifiedQuery {
    // YYYY-MM-DD, matched against the appointment date
    pub date: Option<String>,
    pub user_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_notified(
    State(state): State<AppState>,
    _auth: TriggerAuth,
    Query(q): Query<NotifiedQuery>,
) -> Result<Json<NotifiedListResponse>, ApiError> {
    let date = match q.date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            ApiError::BadRequest("VALIDATION_ERROR", "date must be YYYY-MM-DD".into())
        })?),
        None => None,
    };

    let filter = NotifiedFilter {
        date,
        user_id: q.user_id,
        limit: q.limit.unwrap_or(50).clamp(1, 200),
        offset: q.offset.unwrap_or(0).max(0),
    };

    let rows = state
        .store
        .list_notified(&filter)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(NotifiedListResponse { data: rows }))
}
