// src/store.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use crate::models::{
    BookingWithDoctor, NewNotifiedPatient, NotifiedFilter, NotifiedPatientRow, PatientRow,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("db error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence consumed by the reminder job and the notification log endpoint.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Bookings whose stored date string equals `date` exactly.
    async fn bookings_on(&self, date: &str) -> Result<Vec<BookingWithDoctor>, StoreError>;

    async fn find_patient(&self, user_id: Uuid) -> Result<Option<PatientRow>, StoreError>;

    /// Reserve the send for `(booking_id, target_date)`. `false` means
    /// another run already holds it.
    async fn claim_reminder(
        &self,
        booking_id: Uuid,
        target_date: NaiveDate,
    ) -> Result<bool, StoreError>;

    async fn release_reminder(
        &self,
        booking_id: Uuid,
        target_date: NaiveDate,
    ) -> Result<(), StoreError>;

    async fn insert_notified(
        &self,
        entry: NewNotifiedPatient,
    ) -> Result<NotifiedPatientRow, StoreError>;

    async fn list_notified(
        &self,
        filter: &NotifiedFilter,
    ) -> Result<Vec<NotifiedPatientRow>, StoreError>;
}

pub struct PgReminderStore {
    db: PgPool,
}

impl PgReminderStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReminderStore for PgReminderStore {
    async fn bookings_on(&self, date: &str) -> Result<Vec<BookingWithDoctor>, StoreError> {
        // No ORDER BY: bookings are processed in whatever order Postgres returns.
        let rows: Vec<BookingWithDoctor> = sqlx::query_as::<_, BookingWithDoctor>(
            r#"
            SELECT
              b.booking_id,
              b.user_id,
              b.doctor_id,
              d.name AS doctor_name,
              b.date,
              b.description
            FROM booking b
            LEFT JOIN doctor d ON d.doctor_id = b.doctor_id
            WHERE b.date = $1
            "#,
        )
        .bind(date)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    async fn find_patient(&self, user_id: Uuid) -> Result<Option<PatientRow>, StoreError> {
        let row: Option<PatientRow> = sqlx::query_as::<_, PatientRow>(
            r#"
            SELECT user_id, name, phone_number
            FROM clinic_user
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row)
    }

    async fn claim_reminder(
        &self,
        booking_id: Uuid,
        target_date: NaiveDate,
    ) -> Result<bool, StoreError> {
        let res = sqlx::query(
            r#"
            INSERT INTO reminder_claim (booking_id, target_date)
            VALUES ($1, $2)
            ON CONFLICT (booking_id, target_date) DO NOTHING
            "#,
        )
        .bind(booking_id)
        .bind(target_date)
        .execute(&self.db)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    async fn release_reminder(
        &self,
        booking_id: Uuid,
        target_date: NaiveDate,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            DELETE FROM reminder_claim
            WHERE booking_id = $1 AND target_date = $2
            "#,
        )
        .bind(booking_id)
        .bind(target_date)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn insert_notified(
        &self,
        entry: NewNotifiedPatient,
    ) -> Result<NotifiedPatientRow, StoreError> {
        let row: NotifiedPatientRow = sqlx::query_as::<_, NotifiedPatientRow>(
            r#"
            INSERT INTO notified_patient
              (booking_id, user_id, name, phone_number, doctor_name, appointment_date, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING
              notified_patient_id,
              booking_id,
              user_id,
              name,
              phone_number,
              doctor_name,
              appointment_date,
              description,
              created_at
            "#,
        )
        .bind(entry.booking_id)
        .bind(entry.user_id)
        .bind(&entry.name)
        .bind(&entry.phone_number)
        .bind(&entry.doctor_name)
        .bind(entry.appointment_date)
        .bind(&entry.description)
        .fetch_one(&self.db)
        .await?;

        Ok(row)
    }

    async fn list_notified(
        &self,
        filter: &NotifiedFilter,
    ) -> Result<Vec<NotifiedPatientRow>, StoreError> {
        let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            r#"
            SELECT
              notified_patient_id,
              booking_id,
              user_id,
              name,
              phone_number,
              doctor_name,
              appointment_date,
              description,
              created_at
            FROM notified_patient
            WHERE 1=1
            "#,
        );

        if let Some(date) = filter.date {
            qb.push(" AND appointment_date = ");
            qb.push_bind(date);
        }
        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ");
            qb.push_bind(user_id);
        }

        qb.push(" ORDER BY created_at DESC ");
        qb.push(" LIMIT ");
        qb.push_bind(filter.limit);
        qb.push(" OFFSET ");
        qb.push_bind(filter.offset);

        let rows: Vec<NotifiedPatientRow> = qb
            .build_query_as::<NotifiedPatientRow>()
            .fetch_all(&self.db)
            .await?;

        Ok(rows)
    }
}
