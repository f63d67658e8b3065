// In-memory ReminderStore for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{
    BookingWithDoctor, NewNotifiedPatient, NotifiedFilter, NotifiedPatientRow, PatientRow,
};
use crate::store::{ReminderStore, StoreError};

/// Store operations that can be made to fail one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FindPatient,
    Claim,
    Release,
    InsertNotified,
}

#[derive(Default)]
struct Inner {
    bookings: Vec<BookingWithDoctor>,
    patients: HashMap<Uuid, PatientRow>,
    claims: HashSet<(Uuid, NaiveDate)>,
    notified: Vec<NotifiedPatientRow>,
    unavailable: bool,
    failing: HashSet<StoreOp>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn add_patient(&self, patient: PatientRow) -> Uuid {
        let id = patient.user_id;
        self.inner.lock().unwrap().patients.insert(id, patient);
        id
    }

    pub fn add_booking(&self, booking: BookingWithDoctor) -> Uuid {
        let id = booking.booking_id;
        self.inner.lock().unwrap().bookings.push(booking);
        id
    }

    /// Make every query fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unwrap().unavailable = unavailable;
    }

    pub fn fail_on(&self, op: StoreOp, failing: bool) {
        let mut inner = self.inner.lock().unwrap();
        if failing {
            inner.failing.insert(op);
        } else {
            inner.failing.remove(&op);
        }
    }

    pub fn notified(&self) -> Vec<NotifiedPatientRow> {
        self.inner.lock().unwrap().notified.clone()
    }

    pub fn claim_count(&self) -> usize {
        self.inner.lock().unwrap().claims.len()
    }

    /// Number of store calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.lock().unwrap();
        if inner.unavailable {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(inner)
    }

    fn enter_op(&self, op: StoreOp) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        let inner = self.enter()?;
        if inner.failing.contains(&op) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(inner)
    }
}

pub fn patient(name: &str, phone_number: Option<&str>) -> PatientRow {
    PatientRow {
        user_id: Uuid::new_v4(),
        name: name.to_string(),
        phone_number: phone_number.map(str::to_string),
    }
}

pub fn booking(
    user_id: Uuid,
    doctor_name: &str,
    date: &str,
    description: Option<&str>,
) -> BookingWithDoctor {
    BookingWithDoctor {
        booking_id: Uuid::new_v4(),
        user_id,
        doctor_id: Uuid::new_v4(),
        doctor_name: Some(doctor_name.to_string()),
        date: date.to_string(),
        description: description.map(str::to_string),
    }
}

pub fn booking_without_doctor(user_id: Uuid, date: &str) -> BookingWithDoctor {
    BookingWithDoctor {
        doctor_name: None,
        ..booking(user_id, "", date, None)
    }
}

#[async_trait]
impl ReminderStore for InMemoryStore {
    async fn bookings_on(&self, date: &str) -> Result<Vec<BookingWithDoctor>, StoreError> {
        let inner = self.enter()?;
        Ok(inner
            .bookings
            .iter()
            .filter(|b| b.date == date)
            .cloned()
            .collect())
    }

    async fn find_patient(&self, user_id: Uuid) -> Result<Option<PatientRow>, StoreError> {
        let inner = self.enter_op(StoreOp::FindPatient)?;
        Ok(inner.patients.get(&user_id).cloned())
    }

    async fn claim_reminder(
        &self,
        booking_id: Uuid,
        target_date: NaiveDate,
    ) -> Result<bool, StoreError> {
        let mut inner = self.enter_op(StoreOp::Claim)?;
        Ok(inner.claims.insert((booking_id, target_date)))
    }

    async fn release_reminder(
        &self,
        booking_id: Uuid,
        target_date: NaiveDate,
    ) -> Result<(), StoreError> {
        let mut inner = self.enter_op(StoreOp::Release)?;
        inner.claims.remove(&(booking_id, target_date));
        Ok(())
    }

    async fn insert_notified(
        &self,
        entry: NewNotifiedPatient,
    ) -> Result<NotifiedPatientRow, StoreError> {
        let mut inner = self.enter_op(StoreOp::InsertNotified)?;
        let row = NotifiedPatientRow {
            notified_patient_id: Uuid::new_v4(),
            booking_id: entry.booking_id,
            user_id: entry.user_id,
            name: entry.name,
            phone_number: entry.phone_number,
            doctor_name: entry.doctor_name,
            appointment_date: entry.appointment_date,
            description: entry.description,
            created_at: Utc::now(),
        };
        inner.notified.push(row.clone());
        Ok(row)
    }

    async fn list_notified(
        &self,
        filter: &NotifiedFilter,
    ) -> Result<Vec<NotifiedPatientRow>, StoreError> {
        let inner = self.enter()?;
        Ok(inner
            .notified
            .iter()
            .rev()
            .filter(|n| filter.date.is_none_or(|d| n.appointment_date == d))
            .filter(|n| filter.user_id.is_none_or(|u| n.user_id == u))
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
