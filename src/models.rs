use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{dispatcher::ReminderDispatcher, store::ReminderStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReminderStore>,
    pub dispatcher: Arc<ReminderDispatcher>,
    /// SHA-256 hex of the trigger bearer token; `None` leaves the endpoints open.
    pub trigger_token_hash: Option<String>,
}

/* -------------------------
   API DTOs
--------------------------*/

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub data: OkData,
}

#[derive(Debug, Serialize)]
pub struct OkData {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRemindersResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notified_patients: Option<Vec<NotifiedPatientRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<Vec<SkippedBooking>>,
}

#[derive(Debug, Serialize)]
pub struct NotifiedListResponse {
    pub data: Vec<NotifiedPatientRow>,
}

/* -------------------------
   DB Row Models
--------------------------*/

/// A booking for the target day with its doctor resolved alongside.
/// `doctor_name` is `None` when the doctor reference dangles.
#[derive(Debug, Clone, FromRow)]
pub struct BookingWithDoctor {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub doctor_id: Uuid,
    pub doctor_name: Option<String>,
    pub date: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PatientRow {
    pub user_id: Uuid,
    pub name: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NotifiedPatientRow {
    pub notified_patient_id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub doctor_name: String,
    pub appointment_date: NaiveDate,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the notification log.
#[derive(Debug, Clone)]
pub struct NewNotifiedPatient {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub doctor_name: String,
    pub appointment_date: NaiveDate,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct NotifiedFilter {
    pub date: Option<NaiveDate>,
    pub user_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

/* -------------------------
   Dispatch results
--------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingPatient,
    MissingPhone,
    MissingDoctor,
    StoreFailed,
    AlreadyNotified,
    SendFailed,
    LogFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedBooking {
    pub booking_id: Uuid,
    pub reason: SkipReason,
}
