//! Pure availability calculations over slot listings.
//!
//! The manager fetches slots from the store and hands them to these
//! functions, which keeps the calendar arithmetic free of I/O.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use common::{AvailabilitySlot, DayOfWeek, DoctorId};

/// Returns the doctors owning at least one slot that covers the window.
///
/// The result is de-duplicated and sorted.
pub fn available_doctors(
    slots: &[AvailabilitySlot],
    start: Option<NaiveTime>,
    end: Option<NaiveTime>,
) -> Vec<DoctorId> {
    slots
        .iter()
        .filter(|slot| slot.covers_window(start, end))
        .map(|slot| slot.doctor_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Returns each weekday that occurs at least once in `[from, to]`, starting
/// with the weekday of `from`.
///
/// A reversed range yields nothing.
pub fn distinct_weekdays(from: NaiveDate, to: NaiveDate) -> Vec<DayOfWeek> {
    from.iter_days()
        .take_while(|day| *day <= to)
        .take(7)
        .map(|day| DayOfWeek::of(&day))
        .collect()
}

/// Sums the durations of the slots whose weekday occurs in `[from, to]`.
///
/// Each weekday counts once however many times it recurs in the range.
pub fn total_available_time(slots: &[AvailabilitySlot], from: NaiveDate, to: NaiveDate) -> Duration {
    let days = distinct_weekdays(from, to);
    slots
        .iter()
        .filter(|slot| days.contains(&slot.day_of_week))
        .fold(Duration::zero(), |total, slot| total + slot.duration())
}

/// Returns the first occurrence of the slot that starts at or after `after`.
pub fn next_occurrence(slot: &AvailabilitySlot, after: NaiveDateTime) -> Option<NaiveDateTime> {
    let date = after.date();
    let offset = (7 + slot.day_of_week.index() - DayOfWeek::of(&date).index()) % 7;
    let candidate = date
        .checked_add_signed(Duration::days(i64::from(offset)))?
        .and_time(slot.start_time);

    if candidate < after {
        candidate.checked_add_signed(Duration::days(7))
    } else {
        Some(candidate)
    }
}

/// Returns the slots with at least one weekly occurrence lying entirely
/// within `[start, end]`, in listing order.
pub fn slots_in_interval(
    slots: &[AvailabilitySlot],
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Vec<AvailabilitySlot> {
    slots
        .iter()
        .filter(|slot| {
            next_occurrence(slot, start)
                .is_some_and(|occurrence| occurrence.date().and_time(slot.end_time) <= end)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn slot(doctor: DoctorId, day: DayOfWeek, start: (u32, u32), end: (u32, u32)) -> AvailabilitySlot {
        AvailabilitySlot::new(doctor, day, t(start.0, start.1), t(end.0, end.1))
    }

    #[test]
    fn test_available_doctors_window() {
        let d1 = DoctorId::new();
        let d2 = DoctorId::new();
        let slots = vec![
            slot(d1, DayOfWeek::Monday, (8, 0), (12, 0)),
            slot(d2, DayOfWeek::Monday, (13, 0), (17, 0)),
        ];

        assert_eq!(available_doctors(&slots, Some(t(9, 0)), Some(t(10, 0))), vec![d1]);
        assert_eq!(available_doctors(&slots, Some(t(13, 0)), Some(t(14, 0))), vec![d2]);
        assert!(available_doctors(&slots, Some(t(11, 0)), Some(t(14, 0))).is_empty());
    }

    #[test]
    fn test_available_doctors_open_bound_and_dedup() {
        let d1 = DoctorId::new();
        let slots = vec![
            slot(d1, DayOfWeek::Monday, (8, 0), (10, 0)),
            slot(d1, DayOfWeek::Monday, (14, 0), (16, 0)),
        ];

        assert_eq!(available_doctors(&slots, None, None), vec![d1]);
        assert_eq!(available_doctors(&slots, Some(t(20, 0)), None), vec![d1]);
    }

    #[test]
    fn test_distinct_weekdays() {
        // 2025-05-05 is a Monday
        assert_eq!(
            distinct_weekdays(date(2025, 5, 5), date(2025, 5, 6)),
            vec![DayOfWeek::Monday, DayOfWeek::Tuesday]
        );
        assert_eq!(distinct_weekdays(date(2025, 5, 5), date(2025, 6, 30)).len(), 7);
        assert_eq!(
            distinct_weekdays(date(2025, 5, 5), date(2025, 5, 5)),
            vec![DayOfWeek::Monday]
        );
        assert!(distinct_weekdays(date(2025, 5, 6), date(2025, 5, 5)).is_empty());
    }

    #[test]
    fn test_total_available_time_counts_weekday_once() {
        let doctor = DoctorId::new();
        let slots = vec![
            slot(doctor, DayOfWeek::Monday, (8, 0), (12, 0)),
            slot(doctor, DayOfWeek::Monday, (13, 0), (14, 30)),
            slot(doctor, DayOfWeek::Wednesday, (9, 0), (10, 0)),
        ];

        // Monday only
        assert_eq!(
            total_available_time(&slots, date(2025, 5, 5), date(2025, 5, 5)),
            Duration::minutes(330)
        );

        // Three weeks still counts Monday and Wednesday once each
        assert_eq!(
            total_available_time(&slots, date(2025, 5, 5), date(2025, 5, 25)),
            Duration::minutes(390)
        );

        // Tuesday has no slots
        assert_eq!(
            total_available_time(&slots, date(2025, 5, 6), date(2025, 5, 6)),
            Duration::zero()
        );
    }

    #[test]
    fn test_next_occurrence() {
        let doctor = DoctorId::new();
        let monday = slot(doctor, DayOfWeek::Monday, (8, 0), (12, 0));
        let start = date(2025, 5, 5).and_hms_opt(7, 0, 0).unwrap();

        assert_eq!(
            next_occurrence(&monday, start),
            Some(date(2025, 5, 5).and_hms_opt(8, 0, 0).unwrap())
        );

        // Started after this Monday's slot began: next week
        let later = date(2025, 5, 5).and_hms_opt(9, 0, 0).unwrap();
        assert_eq!(
            next_occurrence(&monday, later),
            Some(date(2025, 5, 12).and_hms_opt(8, 0, 0).unwrap())
        );

        // From a Thursday, the next Monday
        let thursday = date(2025, 5, 8).and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(
            next_occurrence(&monday, thursday),
            Some(date(2025, 5, 12).and_hms_opt(8, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_slots_in_interval_honours_dates() {
        let doctor = DoctorId::new();
        let monday = slot(doctor, DayOfWeek::Monday, (8, 0), (12, 0));
        let friday = slot(doctor, DayOfWeek::Friday, (14, 0), (16, 0));
        let slots = vec![monday.clone(), friday.clone()];

        let start = date(2025, 5, 5).and_hms_opt(0, 0, 0).unwrap();

        // Monday only
        let end = date(2025, 5, 5).and_hms_opt(23, 59, 0).unwrap();
        assert_eq!(slots_in_interval(&slots, start, end), vec![monday.clone()]);

        // Whole week
        let end = date(2025, 5, 11).and_hms_opt(23, 59, 0).unwrap();
        assert_eq!(slots_in_interval(&slots, start, end), slots);

        // Monday morning cut short: the 08:00-12:00 occurrence does not fit
        let end = date(2025, 5, 5).and_hms_opt(11, 0, 0).unwrap();
        assert!(slots_in_interval(&slots, start, end).is_empty());
    }

    #[test]
    fn test_slots_in_interval_skips_partial_occurrence() {
        let doctor = DoctorId::new();
        let monday = slot(doctor, DayOfWeek::Monday, (8, 0), (12, 0));

        // Starts mid-slot on Monday and ends before the next Monday
        let start = date(2025, 5, 5).and_hms_opt(9, 0, 0).unwrap();
        let end = date(2025, 5, 11).and_hms_opt(23, 0, 0).unwrap();
        assert!(slots_in_interval(std::slice::from_ref(&monday), start, end).is_empty());

        // Extending to the next Monday picks it up
        let end = date(2025, 5, 12).and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(slots_in_interval(std::slice::from_ref(&monday), start, end), vec![monday]);
    }
}
