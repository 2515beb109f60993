use chrono::NaiveDate;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::entity::{appointment, sea_orm_active_enums::AppointmentStatus};

/// "HH:MM" to minutes since midnight. Returns None for malformed input.
pub fn parse_minutes(time: &str) -> Option<i32> {
    let (hours, minutes) = time.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Half-open interval overlap: a slot ending at 11:00 does not conflict with
/// one starting at 11:00. Malformed times are treated as conflicting so they
/// never book.
pub fn overlaps(a_start: &str, a_end: &str, b_start: &str, b_end: &str) -> bool {
    match (
        parse_minutes(a_start),
        parse_minutes(a_end),
        parse_minutes(b_start),
        parse_minutes(b_end),
    ) {
        (Some(a0), Some(a1), Some(b0), Some(b1)) => a0 < b1 && b0 < a1,
        _ => true,
    }
}

/// Checks whether the requested slot is free: no non-cancelled appointment of
/// the specialist on that date overlaps it.
pub async fn check_availability<C: ConnectionTrait>(
    db: &C,
    specialist_id: &str,
    date: NaiveDate,
    time_start: &str,
    time_end: &str,
) -> Result<bool, sea_orm::DbErr> {
    let existing = appointment::Entity::find()
        .filter(appointment::Column::SpecialistId.eq(specialist_id))
        .filter(appointment::Column::Date.eq(date))
        .filter(appointment::Column::Status.is_not_in([
            AppointmentStatus::Cancelled,
            AppointmentStatus::Archived,
        ]))
        .all(db)
        .await?;

    Ok(!existing
        .iter()
        .any(|a| overlaps(&a.time_start, &a.time_end, time_start, time_end)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_times() {
        assert_eq!(parse_minutes("00:00"), Some(0));
        assert_eq!(parse_minutes("09:30"), Some(570));
        assert_eq!(parse_minutes("23:59"), Some(1439));
    }

    #[test]
    fn rejects_malformed_times() {
        assert_eq!(parse_minutes("24:00"), None);
        assert_eq!(parse_minutes("12:60"), None);
        assert_eq!(parse_minutes("noon"), None);
        assert_eq!(parse_minutes("12"), None);
    }

    #[test]
    fn detects_overlap() {
        assert!(overlaps("10:00", "11:00", "10:30", "11:30"));
        assert!(overlaps("10:30", "11:30", "10:00", "11:00"));
        assert!(overlaps("10:00", "12:00", "10:30", "11:00"));
    }

    #[test]
    fn touching_edges_do_not_conflict() {
        assert!(!overlaps("10:00", "11:00", "11:00", "12:00"));
        assert!(!overlaps("11:00", "12:00", "10:00", "11:00"));
    }

    #[test]
    fn disjoint_slots_do_not_conflict() {
        assert!(!overlaps("09:00", "10:00", "14:00", "15:00"));
    }

    #[test]
    fn malformed_times_always_conflict() {
        assert!(overlaps("10:00", "11:00", "garbage", "11:30"));
    }
}
