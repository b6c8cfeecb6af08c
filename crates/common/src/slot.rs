//! Recurring weekly availability slots.

use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::{DoctorId, SlotId};

/// Day of the week a recurring slot applies to.
///
/// Indexed from Sunday = 0 to Saturday = 6. Serialized by name, and accepts
/// either the name or the index when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayOfWeek {
    /// All days, Sunday first.
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Sunday,
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ];

    /// Returns the day for an index in `0..=6`, Sunday being 0.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    /// Returns the index of this day, Sunday being 0.
    pub fn index(&self) -> u8 {
        *self as u8
    }

    /// Returns the weekday of a calendar date or timestamp.
    pub fn of(date: &impl Datelike) -> Self {
        date.weekday().into()
    }

    /// Returns the day name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Sunday => "Sunday",
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
        }
    }
}

impl std::fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Sun => DayOfWeek::Sunday,
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
        }
    }
}

impl From<DayOfWeek> for Weekday {
    fn from(day: DayOfWeek) -> Self {
        match day {
            DayOfWeek::Sunday => Weekday::Sun,
            DayOfWeek::Monday => Weekday::Mon,
            DayOfWeek::Tuesday => Weekday::Tue,
            DayOfWeek::Wednesday => Weekday::Wed,
            DayOfWeek::Thursday => Weekday::Thu,
            DayOfWeek::Friday => Weekday::Fri,
            DayOfWeek::Saturday => Weekday::Sat,
        }
    }
}

/// Error returned when a string does not name a day of the week.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid day of week: {0}")]
pub struct ParseDayOfWeekError(String);

impl FromStr for DayOfWeek {
    type Err = ParseDayOfWeekError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(index) = trimmed.parse::<u8>() {
            return Self::from_index(index).ok_or_else(|| ParseDayOfWeekError(s.to_string()));
        }
        // chrono accepts both "Mon" and "Monday", case-insensitively
        trimmed
            .parse::<Weekday>()
            .map(Self::from)
            .map_err(|_| ParseDayOfWeekError(s.to_string()))
    }
}

impl Serialize for DayOfWeek {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DayOfWeek {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Index(u8),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Index(index) => Self::from_index(index)
                .ok_or_else(|| D::Error::custom(format!("day index out of range: {index}"))),
            Repr::Name(name) => name.parse().map_err(D::Error::custom),
        }
    }
}

/// Half-open interval intersection: `[a_start, a_end)` and `[b_start, b_end)`
/// share at least one instant.
pub fn intervals_overlap(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// A recurring weekly interval during which a doctor accepts appointments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: SlotId,
    pub doctor_id: DoctorId,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl AvailabilitySlot {
    /// Creates a slot with a fresh id.
    pub fn new(
        doctor_id: DoctorId,
        day_of_week: DayOfWeek,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            id: SlotId::new(),
            doctor_id,
            day_of_week,
            start_time,
            end_time,
        }
    }

    /// Returns true if `start_time < end_time`.
    pub fn has_valid_range(&self) -> bool {
        self.start_time < self.end_time
    }

    /// Returns true if both slots belong to the same doctor and day and their
    /// intervals intersect. A slot never conflicts with itself.
    pub fn conflicts_with(&self, other: &AvailabilitySlot) -> bool {
        self.id != other.id
            && self.doctor_id == other.doctor_id
            && self.day_of_week == other.day_of_week
            && intervals_overlap(
                self.start_time,
                self.end_time,
                other.start_time,
                other.end_time,
            )
    }

    /// Returns true if `time` falls in `[start_time, end_time)`.
    pub fn contains_time(&self, time: NaiveTime) -> bool {
        self.start_time <= time && time < self.end_time
    }

    /// Returns true if this slot occurs on the timestamp's weekday and contains
    /// its time of day.
    pub fn is_open_at(&self, at: NaiveDateTime) -> bool {
        self.day_of_week == DayOfWeek::of(&at) && self.contains_time(at.time())
    }

    /// Returns true if the slot covers the requested window.
    ///
    /// When either bound is missing the window is open and any slot matches.
    pub fn covers_window(&self, start: Option<NaiveTime>, end: Option<NaiveTime>) -> bool {
        match (start, end) {
            (Some(start), Some(end)) => self.start_time <= start && end <= self.end_time,
            _ => true,
        }
    }

    /// Returns the length of the slot.
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}

/// Sort key used by every slot listing: day, then start time.
pub fn slot_order(slot: &AvailabilitySlot) -> (u8, NaiveTime) {
    (slot.day_of_week.index(), slot.start_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn slot(day: DayOfWeek, start: NaiveTime, end: NaiveTime) -> AvailabilitySlot {
        AvailabilitySlot::new(DoctorId::new(), day, start, end)
    }

    #[test]
    fn day_index_round_trips_through_from_index() {
        for day in DayOfWeek::ALL {
            assert_eq!(DayOfWeek::from_index(day.index()), Some(day));
        }
        assert_eq!(DayOfWeek::Sunday.index(), 0);
        assert_eq!(DayOfWeek::Saturday.index(), 6);
        assert_eq!(DayOfWeek::from_index(7), None);
    }

    #[test]
    fn day_of_date_uses_calendar_weekday() {
        // 2025-05-05 is a Monday
        let date = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();
        assert_eq!(DayOfWeek::of(&date), DayOfWeek::Monday);
    }

    #[test]
    fn day_parses_names_and_indices() {
        assert_eq!("Monday".parse::<DayOfWeek>().unwrap(), DayOfWeek::Monday);
        assert_eq!("tue".parse::<DayOfWeek>().unwrap(), DayOfWeek::Tuesday);
        assert_eq!("0".parse::<DayOfWeek>().unwrap(), DayOfWeek::Sunday);
        assert!("Funday".parse::<DayOfWeek>().is_err());
        assert!("9".parse::<DayOfWeek>().is_err());
    }

    #[test]
    fn unknown_day_error_names_the_input() {
        let err = "Funday".parse::<DayOfWeek>().unwrap_err();
        assert_eq!(err.to_string(), "invalid day of week: Funday");
    }

    #[test]
    fn day_deserializes_from_name_or_number() {
        let by_name: DayOfWeek = serde_json::from_str("\"Friday\"").unwrap();
        let by_index: DayOfWeek = serde_json::from_str("5").unwrap();
        assert_eq!(by_name, DayOfWeek::Friday);
        assert_eq!(by_index, DayOfWeek::Friday);
        assert_eq!(
            serde_json::to_string(&DayOfWeek::Friday).unwrap(),
            "\"Friday\""
        );
        assert!(serde_json::from_str::<DayOfWeek>("12").is_err());
    }

    #[test]
    fn overlap_is_half_open() {
        assert!(intervals_overlap(t(8, 0), t(12, 0), t(11, 0), t(13, 0)));
        assert!(intervals_overlap(t(8, 0), t(12, 0), t(9, 0), t(10, 0)));
        assert!(!intervals_overlap(t(8, 0), t(12, 0), t(12, 0), t(13, 0)));
        assert!(!intervals_overlap(t(12, 0), t(13, 0), t(8, 0), t(12, 0)));
    }

    #[test]
    fn conflicts_require_same_doctor_and_day() {
        let a = slot(DayOfWeek::Monday, t(8, 0), t(12, 0));
        let mut b = a.clone();
        b.id = SlotId::new();
        b.start_time = t(10, 0);
        b.end_time = t(14, 0);
        assert!(a.conflicts_with(&b));

        let mut other_day = b.clone();
        other_day.day_of_week = DayOfWeek::Tuesday;
        assert!(!a.conflicts_with(&other_day));

        let mut other_doctor = b.clone();
        other_doctor.doctor_id = DoctorId::new();
        assert!(!a.conflicts_with(&other_doctor));

        assert!(!a.conflicts_with(&a));
    }

    #[test]
    fn open_at_checks_weekday_and_half_open_time() {
        let s = slot(DayOfWeek::Monday, t(8, 0), t(12, 0));
        let monday = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();
        assert!(s.is_open_at(monday.and_time(t(8, 0))));
        assert!(s.is_open_at(monday.and_time(t(11, 59))));
        assert!(!s.is_open_at(monday.and_time(t(12, 0))));
        assert!(!s.is_open_at(monday.succ_opt().unwrap().and_time(t(9, 0))));
    }

    #[test]
    fn window_coverage() {
        let s = slot(DayOfWeek::Monday, t(8, 0), t(12, 0));
        assert!(s.covers_window(Some(t(9, 0)), Some(t(10, 0))));
        assert!(s.covers_window(Some(t(8, 0)), Some(t(12, 0))));
        assert!(!s.covers_window(Some(t(13, 0)), Some(t(14, 0))));
        assert!(!s.covers_window(Some(t(11, 0)), Some(t(13, 0))));
        assert!(s.covers_window(None, Some(t(14, 0))));
        assert!(s.covers_window(Some(t(20, 0)), None));
        assert!(s.covers_window(None, None));
    }

    #[test]
    fn duration_is_end_minus_start() {
        let s = slot(DayOfWeek::Monday, t(8, 0), t(12, 30));
        assert_eq!(s.duration(), Duration::minutes(270));
        assert!(s.has_valid_range());
        assert!(!slot(DayOfWeek::Monday, t(9, 0), t(9, 0)).has_valid_range());
    }
}
