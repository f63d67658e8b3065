// src/scheduler.rs

use std::sync::Arc;

use chrono::{DateTime, Days, FixedOffset, NaiveTime, TimeDelta, Utc};
use tracing::{error, info};

use crate::dispatcher::{DispatchOutcome, ReminderDispatcher};

/// Next instant strictly after `now` whose wall-clock time in `offset` is `at`.
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    let local_now = now.with_timezone(&offset);
    let today = local_now.date_naive();

    let candidate = today.and_time(at);
    let candidate = if candidate > local_now.naive_local() {
        candidate
    } else {
        // Only fails at NaiveDate::MAX
        today
            .checked_add_days(Days::new(1))
            .unwrap_or(today)
            .and_time(at)
    };

    // A fixed offset maps every local time to exactly one instant.
    (candidate - TimeDelta::seconds(offset.local_minus_utc() as i64)).and_utc()
}

/// Run the dispatcher once a day at `at` (local to `offset`). Never returns.
pub async fn run_daily(dispatcher: Arc<ReminderDispatcher>, at: NaiveTime, offset: FixedOffset) {
    loop {
        let now = Utc::now();
        let next = next_run_after(now, at, offset);
        let wait = (next - now).to_std().unwrap_or_default();
        info!(next_run = %next, "reminder run scheduled");

        tokio::time::sleep(wait).await;

        match dispatcher.run().await {
            Ok(DispatchOutcome::NoAppointments { target_date }) => {
                info!(%target_date, "scheduled run: no appointments for tomorrow");
            }
            Ok(DispatchOutcome::Completed(report)) => {
                info!(
                    target_date = %report.target_date,
                    sent = report.sent_count(),
                    skipped = report.skipped.len(),
                    "scheduled run finished"
                );
            }
            Err(e) => {
                error!(error = %e, "scheduled reminder run failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_next_run_later_today() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        assert_eq!(
            next_run_after(now, at(18, 0), utc),
            Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();
        // exactly at the scheduled time counts as already run
        assert_eq!(
            next_run_after(now, at(18, 0), utc),
            Utc.with_ymd_and_hms(2024, 6, 2, 18, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_run_respects_offset() {
        // 18:00 in UTC+8 is 10:00 UTC
        let plus8 = FixedOffset::east_opt(8 * 3600).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        assert_eq!(
            next_run_after(now, at(18, 0), plus8),
            Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
        );

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap();
        assert_eq!(
            next_run_after(now, at(18, 0), plus8),
            Utc.with_ymd_and_hms(2024, 6, 2, 10, 0, 0).unwrap()
        );
    }
}
