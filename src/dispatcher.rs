// src/dispatcher.rs

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use futures_util::{StreamExt, stream};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    models::{BookingWithDoctor, NewNotifiedPatient, NotifiedPatientRow, SkipReason, SkippedBooking},
    reminder_message::{
        MISSING_DESCRIPTION_LOG, booking_date_string, compose_reminder, normalize_phone_number,
        tomorrow,
    },
    sms_gateway::SmsGateway,
    store::{ReminderStore, StoreError},
};

/// Aborts the whole run; nothing was sent.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to load bookings for {date}: {source}")]
    Query {
        date: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    pub utc_offset: FixedOffset,
    pub concurrency: usize,
}

#[derive(Debug)]
pub enum DispatchOutcome {
    NoAppointments { target_date: NaiveDate },
    Completed(DispatchReport),
}

#[derive(Debug)]
pub struct DispatchReport {
    pub target_date: NaiveDate,
    pub notified: Vec<NotifiedPatientRow>,
    pub skipped: Vec<SkippedBooking>,
}

impl DispatchReport {
    pub fn sent_count(&self) -> usize {
        self.notified.len()
    }
}

pub struct ReminderDispatcher {
    store: Arc<dyn ReminderStore>,
    gateway: Arc<dyn SmsGateway>,
    settings: DispatchSettings,
}

impl ReminderDispatcher {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        gateway: Arc<dyn SmsGateway>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            store,
            gateway,
            settings: DispatchSettings {
                concurrency: settings.concurrency.max(1),
                ..settings
            },
        }
    }

    pub async fn run(&self) -> Result<DispatchOutcome, DispatchError> {
        self.run_at(Utc::now()).await
    }

    /// Send reminders for every booking dated the day after `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<DispatchOutcome, DispatchError> {
        let target_date = tomorrow(now, self.settings.utc_offset);
        let date = booking_date_string(target_date);

        info!(target_date = %date, "sending reminders");

        let bookings = self
            .store
            .bookings_on(&date)
            .await
            .map_err(|source| DispatchError::Query {
                date: date.clone(),
                source,
            })?;

        if bookings.is_empty() {
            info!(target_date = %date, "no appointments for tomorrow");
            return Ok(DispatchOutcome::NoAppointments { target_date });
        }

        // `buffered` keeps results in query order whatever the fan-out.
        let results: Vec<(Uuid, Result<NotifiedPatientRow, SkipReason>)> =
            stream::iter(bookings.iter().cloned())
                .map(|booking| async move {
                    let result = self.process(&booking, target_date).await;
                    (booking.booking_id, result)
                })
                .buffered(self.settings.concurrency)
                .collect()
                .await;

        let mut report = DispatchReport {
            target_date,
            notified: Vec::with_capacity(results.len()),
            skipped: Vec::new(),
        };
        for (booking_id, result) in results {
            match result {
                Ok(row) => report.notified.push(row),
                Err(reason) => report.skipped.push(SkippedBooking { booking_id, reason }),
            }
        }

        info!(
            target_date = %date,
            bookings = bookings.len(),
            sent = report.sent_count(),
            skipped = report.skipped.len(),
            "reminder run finished"
        );

        Ok(DispatchOutcome::Completed(report))
    }

    async fn process(
        &self,
        booking: &BookingWithDoctor,
        target_date: NaiveDate,
    ) -> Result<NotifiedPatientRow, SkipReason> {
        let booking_id = booking.booking_id;
        let user_id = booking.user_id;
        info!(%booking_id, date = %booking.date, "processing booking");

        let Some(doctor_name) = booking.doctor_name.as_deref() else {
            warn!(%booking_id, doctor_id = %booking.doctor_id, "doctor not found, skipping");
            return Err(SkipReason::MissingDoctor);
        };

        let patient = match self.store.find_patient(user_id).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                warn!(%booking_id, %user_id, "patient not found, skipping");
                return Err(SkipReason::MissingPatient);
            }
            Err(e) => {
                warn!(%booking_id, %user_id, error = %e, "patient lookup failed, skipping");
                return Err(SkipReason::StoreFailed);
            }
        };

        let Some(raw_phone) = patient
            .phone_number
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
        else {
            warn!(%booking_id, %user_id, "no phone number found for user, skipping");
            return Err(SkipReason::MissingPhone);
        };

        let phone_number = normalize_phone_number(raw_phone);
        let message = compose_reminder(doctor_name, target_date, booking.description.as_deref());

        match self.store.claim_reminder(booking_id, target_date).await {
            Ok(true) => {}
            Ok(false) => {
                info!(%booking_id, "reminder already sent for this day, skipping");
                return Err(SkipReason::AlreadyNotified);
            }
            Err(e) => {
                warn!(%booking_id, error = %e, "could not claim reminder, skipping");
                return Err(SkipReason::StoreFailed);
            }
        }

        info!(%booking_id, phone = %phone_number, "sending reminder");
        if let Err(e) = self.gateway.send(&phone_number, &message).await {
            error!(%booking_id, phone = %phone_number, error = %e, "failed to send sms");
            if let Err(e) = self.store.release_reminder(booking_id, target_date).await {
                warn!(%booking_id, error = %e, "failed to release reminder claim");
            }
            return Err(SkipReason::SendFailed);
        }

        let description = booking
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(MISSING_DESCRIPTION_LOG)
            .to_string();

        // The claim stays in place on failure: the patient already got the SMS.
        self.store
            .insert_notified(NewNotifiedPatient {
                booking_id,
                user_id,
                name: patient.name,
                phone_number,
                doctor_name: doctor_name.to_string(),
                appointment_date: target_date,
                description,
            })
            .await
            .map_err(|e| {
                error!(%booking_id, error = %e, "sms sent but notification log insert failed");
                SkipReason::LogFailed
            })
    }
}
