use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::entity::sea_orm_active_enums::AppointmentStatus;

use super::availability::parse_minutes;

/// Derived grouping for appointment listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AppointmentBucket {
    Upcoming,
    Past,
    Cancelled,
}

/// Classifies an appointment relative to `now`:
/// upcoming = PENDING/CONFIRMED that has not ended yet, past = COMPLETED or
/// an elapsed PENDING/CONFIRMED, cancelled = CANCELLED/ARCHIVED.
pub fn bucket(
    status: AppointmentStatus,
    date: NaiveDate,
    time_end: &str,
    now: NaiveDateTime,
) -> AppointmentBucket {
    match status {
        AppointmentStatus::Cancelled | AppointmentStatus::Archived => AppointmentBucket::Cancelled,
        AppointmentStatus::Completed => AppointmentBucket::Past,
        AppointmentStatus::Pending | AppointmentStatus::Confirmed => {
            let end_minutes = parse_minutes(time_end).unwrap_or(0);
            let end_time =
                NaiveTime::from_hms_opt((end_minutes / 60) as u32, (end_minutes % 60) as u32, 0)
                    .unwrap_or(NaiveTime::MIN);
            let ends_at = NaiveDateTime::new(date, end_time);
            if ends_at > now {
                AppointmentBucket::Upcoming
            } else {
                AppointmentBucket::Past
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn now() -> NaiveDateTime {
        day(15).and_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn future_pending_and_confirmed_are_upcoming() {
        assert_eq!(
            bucket(AppointmentStatus::Pending, day(16), "10:00", now()),
            AppointmentBucket::Upcoming
        );
        assert_eq!(
            bucket(AppointmentStatus::Confirmed, day(15), "13:00", now()),
            AppointmentBucket::Upcoming
        );
    }

    #[test]
    fn elapsed_confirmed_is_past() {
        assert_eq!(
            bucket(AppointmentStatus::Confirmed, day(15), "11:00", now()),
            AppointmentBucket::Past
        );
        assert_eq!(
            bucket(AppointmentStatus::Pending, day(14), "10:00", now()),
            AppointmentBucket::Past
        );
    }

    #[test]
    fn completed_is_always_past() {
        assert_eq!(
            bucket(AppointmentStatus::Completed, day(20), "10:00", now()),
            AppointmentBucket::Past
        );
    }

    #[test]
    fn cancelled_and_archived_group_together() {
        assert_eq!(
            bucket(AppointmentStatus::Cancelled, day(20), "10:00", now()),
            AppointmentBucket::Cancelled
        );
        assert_eq!(
            bucket(AppointmentStatus::Archived, day(1), "10:00", now()),
            AppointmentBucket::Cancelled
        );
    }
}
