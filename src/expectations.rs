//! Age-based expectations
//!
//! Population norms keyed by age: a weeks table with canonical nap schedules,
//! wake windows and bedtimes, and a months table with expected daily feed and
//! nap counts. Bands are inclusive. Ages outside every band yield `None`, which
//! callers treat as "no expectation available", never as zero.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive integer range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

impl CountRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn midpoint(&self) -> f64 {
        (self.min as f64 + self.max as f64) / 2.0
    }
}

/// A canonical nap slot: start (minutes since midnight) and length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NapWindow {
    pub start: u32,
    pub duration: u32,
}

/// Canonical day for an age band in weeks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeSchedule {
    pub weeks: CountRange,
    pub total_naps: u32,
    pub nap_windows: &'static [NapWindow],
    /// Wake window range, minutes
    pub wake_windows: CountRange,
    /// Bedtime range, minutes since midnight
    pub bedtime: CountRange,
    /// Total sleep per 24h, hours
    pub total_sleep: CountRange,
    /// Feed interval range, minutes
    pub feed_interval: CountRange,
    /// Daytime sleep target, minutes
    pub target_day_sleep: u32,
    /// Shortest nap worth scheduling, minutes
    pub nap_duration_floor: u32,
}

/// Expected daily counts for an age band in months
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedRanges {
    pub months: CountRange,
    pub expected_feeds: CountRange,
    pub expected_naps: CountRange,
}

const fn nap(start: u32, duration: u32) -> NapWindow {
    NapWindow { start, duration }
}

const fn hm(hours: u32, minutes: u32) -> u32 {
    hours * 60 + minutes
}

static NEWBORN_NAPS: [NapWindow; 5] = [
    nap(hm(8, 0), 60),
    nap(hm(10, 0), 75),
    nap(hm(12, 30), 75),
    nap(hm(15, 0), 60),
    nap(hm(17, 30), 45),
];

static EARLY_NAPS: [NapWindow; 4] = [
    nap(hm(8, 30), 75),
    nap(hm(11, 0), 90),
    nap(hm(14, 0), 75),
    nap(hm(16, 45), 45),
];

static THREE_NAP_YOUNG: [NapWindow; 3] = [
    nap(hm(9, 0), 75),
    nap(hm(12, 15), 90),
    nap(hm(15, 45), 45),
];

static THREE_NAP_OLDER: [NapWindow; 3] = [
    nap(hm(9, 15), 75),
    nap(hm(12, 45), 75),
    nap(hm(16, 0), 45),
];

static TWO_NAP: [NapWindow; 2] = [nap(hm(9, 30), 75), nap(hm(14, 0), 90)];

static TWO_NAP_TODDLER: [NapWindow; 2] = [nap(hm(10, 0), 60), nap(hm(14, 30), 75)];

static ONE_NAP: [NapWindow; 1] = [nap(hm(12, 30), 120)];

static AGE_SCHEDULES: [AgeSchedule; 7] = [
    AgeSchedule {
        weeks: CountRange::new(0, 5),
        total_naps: 5,
        nap_windows: &NEWBORN_NAPS,
        wake_windows: CountRange::new(45, 60),
        bedtime: CountRange::new(hm(21, 0), hm(23, 0)),
        total_sleep: CountRange::new(14, 17),
        feed_interval: CountRange::new(120, 180),
        target_day_sleep: 360,
        nap_duration_floor: 30,
    },
    AgeSchedule {
        weeks: CountRange::new(6, 11),
        total_naps: 4,
        nap_windows: &EARLY_NAPS,
        wake_windows: CountRange::new(60, 90),
        bedtime: CountRange::new(hm(20, 0), hm(22, 0)),
        total_sleep: CountRange::new(14, 16),
        feed_interval: CountRange::new(150, 180),
        target_day_sleep: 285,
        nap_duration_floor: 30,
    },
    AgeSchedule {
        weeks: CountRange::new(12, 19),
        total_naps: 3,
        nap_windows: &THREE_NAP_YOUNG,
        wake_windows: CountRange::new(75, 120),
        bedtime: CountRange::new(hm(19, 0), hm(21, 0)),
        total_sleep: CountRange::new(12, 16),
        feed_interval: CountRange::new(180, 210),
        target_day_sleep: 210,
        nap_duration_floor: 40,
    },
    AgeSchedule {
        weeks: CountRange::new(20, 31),
        total_naps: 3,
        nap_windows: &THREE_NAP_OLDER,
        wake_windows: CountRange::new(120, 150),
        bedtime: CountRange::new(hm(19, 0), hm(20, 0)),
        total_sleep: CountRange::new(12, 15),
        feed_interval: CountRange::new(180, 240),
        target_day_sleep: 195,
        nap_duration_floor: 45,
    },
    AgeSchedule {
        weeks: CountRange::new(32, 51),
        total_naps: 2,
        nap_windows: &TWO_NAP,
        wake_windows: CountRange::new(150, 210),
        bedtime: CountRange::new(hm(19, 0), hm(20, 0)),
        total_sleep: CountRange::new(12, 15),
        feed_interval: CountRange::new(210, 270),
        target_day_sleep: 165,
        nap_duration_floor: 45,
    },
    AgeSchedule {
        weeks: CountRange::new(52, 64),
        total_naps: 2,
        nap_windows: &TWO_NAP_TODDLER,
        wake_windows: CountRange::new(180, 240),
        bedtime: CountRange::new(hm(19, 0), hm(20, 0)),
        total_sleep: CountRange::new(11, 14),
        feed_interval: CountRange::new(180, 240),
        target_day_sleep: 135,
        nap_duration_floor: 45,
    },
    AgeSchedule {
        weeks: CountRange::new(65, 103),
        total_naps: 1,
        nap_windows: &ONE_NAP,
        wake_windows: CountRange::new(300, 360),
        bedtime: CountRange::new(hm(19, 0), hm(20, 30)),
        total_sleep: CountRange::new(11, 14),
        feed_interval: CountRange::new(180, 240),
        target_day_sleep: 120,
        nap_duration_floor: 60,
    },
];

static EXPECTED_RANGES: [ExpectedRanges; 7] = [
    ExpectedRanges {
        months: CountRange::new(0, 1),
        expected_feeds: CountRange::new(8, 12),
        expected_naps: CountRange::new(4, 6),
    },
    ExpectedRanges {
        months: CountRange::new(2, 3),
        expected_feeds: CountRange::new(5, 7),
        expected_naps: CountRange::new(2, 3),
    },
    ExpectedRanges {
        months: CountRange::new(4, 6),
        expected_feeds: CountRange::new(5, 7),
        expected_naps: CountRange::new(2, 3),
    },
    ExpectedRanges {
        months: CountRange::new(7, 9),
        expected_feeds: CountRange::new(4, 6),
        expected_naps: CountRange::new(2, 3),
    },
    ExpectedRanges {
        months: CountRange::new(10, 12),
        expected_feeds: CountRange::new(4, 5),
        expected_naps: CountRange::new(1, 2),
    },
    ExpectedRanges {
        months: CountRange::new(13, 18),
        expected_feeds: CountRange::new(3, 4),
        expected_naps: CountRange::new(1, 2),
    },
    ExpectedRanges {
        months: CountRange::new(19, 24),
        expected_feeds: CountRange::new(3, 4),
        expected_naps: CountRange::new(1, 1),
    },
];

/// Canonical schedule for an age in weeks
pub fn schedule_for_weeks(weeks: i64) -> Option<&'static AgeSchedule> {
    let weeks = u32::try_from(weeks).ok()?;
    AGE_SCHEDULES.iter().find(|s| s.weeks.contains(weeks))
}

/// Expected daily feed and nap counts for an age in months
pub fn ranges_for_months(months: i64) -> Option<&'static ExpectedRanges> {
    let months = u32::try_from(months).ok()?;
    EXPECTED_RANGES.iter().find(|r| r.months.contains(months))
}

/// Whole calendar months between birth and the given date; `None` before birth
pub fn age_in_months(birth: NaiveDate, on: NaiveDate) -> Option<u32> {
    if on < birth {
        return None;
    }
    let mut months = (on.year() - birth.year()) * 12 + on.month() as i32 - birth.month() as i32;
    if on.day() < birth.day() {
        months -= 1;
    }
    u32::try_from(months).ok()
}

/// Age-derived parameters feeding the predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeBasedParams {
    pub age_days: i64,
    pub wake_window_min: u32,
    pub wake_window_max: u32,
    pub feed_interval_min: u32,
    pub feed_interval_max: u32,
    pub target_day_sleep_minutes: u32,
    pub nap_duration_floor: u32,
    pub expected_naps: u32,
    pub bedtime_earliest: u32,
    pub bedtime_latest: u32,
}

impl AgeBasedParams {
    /// Parameters for an age in days, `None` outside the table
    pub fn for_age_days(age_days: i64) -> Option<Self> {
        if age_days < 0 {
            return None;
        }
        schedule_for_weeks(age_days / 7).map(|s| Self::from_schedule(age_days, s))
    }

    /// Parameters for an age in days, clamped to the youngest or oldest band
    pub fn for_age_days_clamped(age_days: i64) -> Self {
        let oldest = AGE_SCHEDULES[AGE_SCHEDULES.len() - 1].weeks.max as i64;
        let weeks = (age_days.max(0) / 7).min(oldest);
        let schedule = schedule_for_weeks(weeks).unwrap_or(&AGE_SCHEDULES[0]);
        Self::from_schedule(age_days.max(0), schedule)
    }

    fn from_schedule(age_days: i64, schedule: &AgeSchedule) -> Self {
        Self {
            age_days,
            wake_window_min: schedule.wake_windows.min,
            wake_window_max: schedule.wake_windows.max,
            feed_interval_min: schedule.feed_interval.min,
            feed_interval_max: schedule.feed_interval.max,
            target_day_sleep_minutes: schedule.target_day_sleep,
            nap_duration_floor: schedule.nap_duration_floor,
            expected_naps: schedule.total_naps,
            bedtime_earliest: schedule.bedtime.min,
            bedtime_latest: schedule.bedtime.max,
        }
    }

    pub fn wake_window_mid(&self) -> f64 {
        (self.wake_window_min + self.wake_window_max) as f64 / 2.0
    }

    pub fn feed_interval_mid(&self) -> f64 {
        (self.feed_interval_min + self.feed_interval_max) as f64 / 2.0
    }

    pub fn bedtime_mid(&self) -> f64 {
        (self.bedtime_earliest + self.bedtime_latest) as f64 / 2.0
    }

    /// Typical nap length implied by the day-sleep target
    pub fn nap_duration(&self) -> f64 {
        let naps = self.expected_naps.max(1) as f64;
        (self.target_day_sleep_minutes as f64 / naps).max(self.nap_duration_floor as f64)
    }

    /// Human label for reasoning strings, e.g. "10-week-olds"
    pub fn age_label(&self) -> String {
        let weeks = self.age_days / 7;
        if weeks < 16 {
            format!("{}-week-olds", weeks)
        } else {
            format!("{}-month-olds", self.age_days * 12 / 365)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weeks_bands_are_inclusive() {
        assert_eq!(schedule_for_weeks(0).unwrap().total_naps, 5);
        assert_eq!(schedule_for_weeks(5).unwrap().total_naps, 5);
        assert_eq!(schedule_for_weeks(6).unwrap().total_naps, 4);
        assert_eq!(schedule_for_weeks(103).unwrap().total_naps, 1);
        assert!(schedule_for_weeks(104).is_none());
        assert!(schedule_for_weeks(-1).is_none());
    }

    #[test]
    fn test_tables_are_contiguous() {
        for pair in AGE_SCHEDULES.windows(2) {
            assert_eq!(pair[0].weeks.max + 1, pair[1].weeks.min);
        }
        for pair in EXPECTED_RANGES.windows(2) {
            assert_eq!(pair[0].months.max + 1, pair[1].months.min);
        }
        for schedule in AGE_SCHEDULES.iter() {
            assert_eq!(schedule.nap_windows.len() as u32, schedule.total_naps);
        }
    }

    #[test]
    fn test_months_lookup() {
        let ranges = ranges_for_months(2).unwrap();
        assert_eq!(ranges.expected_feeds, CountRange::new(5, 7));
        assert_eq!(ranges.expected_naps, CountRange::new(2, 3));
        assert!(ranges_for_months(25).is_none());
    }

    #[test]
    fn test_age_in_months() {
        let birth = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(age_in_months(birth, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()), Some(0));
        assert_eq!(age_in_months(birth, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()), Some(2));
        assert_eq!(age_in_months(birth, NaiveDate::from_ymd_opt(2023, 12, 1).unwrap()), None);

        // ten weeks old
        let ten_weeks = birth + chrono::Duration::weeks(10);
        assert_eq!(age_in_months(birth, ten_weeks), Some(2));
    }

    #[test]
    fn test_params_outside_table() {
        assert!(AgeBasedParams::for_age_days(-3).is_none());
        assert!(AgeBasedParams::for_age_days(800).is_none());

        let clamped = AgeBasedParams::for_age_days_clamped(800);
        assert_eq!(clamped.expected_naps, 1);
        let newborn = AgeBasedParams::for_age_days_clamped(-3);
        assert_eq!(newborn.expected_naps, 5);
        assert_eq!(newborn.age_days, 0);
    }

    #[test]
    fn test_params_for_ten_weeks() {
        let params = AgeBasedParams::for_age_days(70).unwrap();
        assert_eq!(params.wake_window_mid(), 75.0);
        assert_eq!(params.feed_interval_mid(), 165.0);
        assert_eq!(params.age_label(), "10-week-olds");
        assert!(params.nap_duration() >= params.nap_duration_floor as f64);
    }
}
