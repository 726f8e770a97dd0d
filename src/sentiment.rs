//! Day pattern classification
//!
//! Assigns one label per day by walking a fixed, ordered rule cascade over
//! the day's feed and nap counts compared with the age-expected ranges. The
//! first matching rule wins, so more specific patterns sit before the general
//! ones they overlap with.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::expectations::{ranges_for_months, CountRange, ExpectedRanges};
use crate::features::{aggregate_by_day, aggregate_daily_summary, event_date, NightWindow};
use crate::types::{Activity, DailySummary};

/// Hours after the first ever log during which every day is "Early Days"
pub const EARLY_DAYS_HOURS: i64 = 24;

/// Before this hour, minimum counts are pro-rated to the elapsed day
pub const EVENING_HOUR: u32 = 18;

/// Previous days (of the last 6) that must also be feed-heavy for a growth spurt
pub const GROWTH_SPURT_DAYS: usize = 3;

/// Look-back for the growth spurt rule, in days
pub const GROWTH_SPURT_LOOKBACK: i64 = 6;

/// Pattern labels, in cascade order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPattern {
    EarlyDays,
    QuietDay,
    GrowthSpurtWeek,
    OffRhythmDay,
    FeedHeavyDay,
    ExtraSleepyDay,
    ShortNapDay,
    LightFeedingDay,
    SmoothFlow,
    SteadyDay,
}

impl DayPattern {
    pub fn label(&self) -> &'static str {
        match self {
            DayPattern::EarlyDays => "Early Days",
            DayPattern::QuietDay => "Quiet Day",
            DayPattern::GrowthSpurtWeek => "Growth Spurt Week",
            DayPattern::OffRhythmDay => "Off Rhythm Day",
            DayPattern::FeedHeavyDay => "Feed-Heavy Day",
            DayPattern::ExtraSleepyDay => "Extra Sleepy Day",
            DayPattern::ShortNapDay => "Short Nap Day",
            DayPattern::LightFeedingDay => "Light Feeding Day",
            DayPattern::SmoothFlow => "Smooth Flow",
            DayPattern::SteadyDay => "Steady Day",
        }
    }
}

/// Classification result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySentiment {
    pub label: String,
    pub pattern: DayPattern,
}

impl From<DayPattern> for DaySentiment {
    fn from(pattern: DayPattern) -> Self {
        Self {
            label: pattern.label().to_string(),
            pattern,
        }
    }
}

/// Counts and expectations a rule looks at
struct DayFacts<'a> {
    summary: &'a DailySummary,
    ranges: &'a ExpectedRanges,
    feed_min: u32,
    nap_min: u32,
    heavy_previous_days: usize,
}

impl DayFacts<'_> {
    fn feeds_high(&self) -> bool {
        self.summary.feed_count > self.ranges.expected_feeds.max
    }
    fn feeds_low(&self) -> bool {
        self.summary.feed_count < self.feed_min
    }
    fn naps_high(&self) -> bool {
        self.summary.nap_count > self.ranges.expected_naps.max
    }
    fn naps_low(&self) -> bool {
        self.summary.nap_count < self.nap_min
    }
}

type Rule = (DayPattern, fn(&DayFacts<'_>) -> bool);

/// Ordered cascade; growth spurt must stay ahead of the plain feed-heavy rule
const RULES: [Rule; 7] = [
    (DayPattern::GrowthSpurtWeek, |f| {
        f.feeds_high() && f.heavy_previous_days >= GROWTH_SPURT_DAYS
    }),
    (DayPattern::OffRhythmDay, |f| {
        (f.feeds_high() || f.feeds_low()) && (f.naps_high() || f.naps_low())
    }),
    (DayPattern::FeedHeavyDay, |f| f.feeds_high()),
    (DayPattern::ExtraSleepyDay, |f| f.naps_high()),
    (DayPattern::ShortNapDay, |f| f.naps_low()),
    (DayPattern::LightFeedingDay, |f| f.feeds_low()),
    (DayPattern::SmoothFlow, |_| true),
];

/// Minimum pro-rated to the share of the day elapsed
fn prorated_min(range: &CountRange, current_hour: u32) -> u32 {
    if current_hour >= EVENING_HOUR {
        range.min
    } else {
        range.min * current_hour.min(24) / 24
    }
}

/// Classify one day.
///
/// `day_activities` are the day being labelled; `all_activities` is the full
/// history (used for the early-days window and the growth spurt look-back).
/// `now` supplies both the current instant and the viewer's timezone.
pub fn classify_day_sentiment<Tz: TimeZone>(
    day_activities: &[Activity],
    all_activities: &[Activity],
    baby_age_months: Option<u32>,
    current_hour: u32,
    now: &DateTime<Tz>,
    night_window: &NightWindow,
) -> DaySentiment {
    let tz = now.timezone();
    let now_utc = now.with_timezone(&Utc);

    let first_ever = all_activities
        .iter()
        .chain(day_activities)
        .map(|a| a.logged_at)
        .min();
    if let Some(first) = first_ever {
        if now_utc - first < Duration::hours(EARLY_DAYS_HOURS) {
            return DayPattern::EarlyDays.into();
        }
    }

    if day_activities.is_empty() {
        return DayPattern::QuietDay.into();
    }

    let Some(ranges) = baby_age_months.and_then(|m| ranges_for_months(m as i64)) else {
        return DayPattern::SteadyDay.into();
    };

    let summary = aggregate_daily_summary(day_activities, night_window, &tz, now_utc);
    let day_date = day_activities
        .iter()
        .map(|a| event_date(a, &tz))
        .max()
        .unwrap_or_else(|| now.date_naive());
    let lookback_start = day_date - Duration::days(GROWTH_SPURT_LOOKBACK);
    let heavy_previous_days = aggregate_by_day(all_activities, night_window, &tz, now_utc)
        .iter()
        .filter(|s| s.date.is_some_and(|d| d >= lookback_start && d < day_date))
        .filter(|s| s.feed_count > ranges.expected_feeds.max)
        .count();

    let facts = DayFacts {
        summary: &summary,
        ranges,
        feed_min: prorated_min(&ranges.expected_feeds, current_hour),
        nap_min: prorated_min(&ranges.expected_naps, current_hour),
        heavy_previous_days,
    };

    let pattern = RULES
        .iter()
        .find(|(_, applies)| applies(&facts))
        .map(|(pattern, _)| *pattern)
        .unwrap_or(DayPattern::SteadyDay);

    debug!(
        feeds = summary.feed_count,
        naps = summary.nap_count,
        heavy_previous_days,
        label = pattern.label(),
        "classified day"
    );
    pattern.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActivityDetails, FeedDetails, NapDetails};
    use chrono::{NaiveDate, TimeZone};
    use uuid::Uuid;

    fn at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
        date.and_hms_opt(hour, 0, 0).unwrap().and_utc()
    }

    fn feed(date: NaiveDate, hour: u32) -> Activity {
        Activity {
            id: Uuid::new_v4(),
            logged_at: at(date, hour),
            timezone: "UTC".to_string(),
            date_local: None,
            details: ActivityDetails::Feed(FeedDetails::default()),
        }
    }

    fn nap(date: NaiveDate, hour: u32) -> Activity {
        Activity {
            id: Uuid::new_v4(),
            logged_at: at(date, hour),
            timezone: "UTC".to_string(),
            date_local: None,
            details: ActivityDetails::Nap(NapDetails {
                start_time: Some(format!("{}:00", hour)),
                end_time: Some(format!("{}:30", hour)),
                is_night_sleep: None,
            }),
        }
    }

    /// Feeds hourly from 06:00, naps every three hours from 08:00
    fn day(date: NaiveDate, feeds: u32, naps: u32) -> Vec<Activity> {
        let mut activities: Vec<Activity> = (0..feeds).map(|i| feed(date, 6 + i)).collect();
        activities.extend((0..naps).map(|i| nap(date, 8 + i * 3)));
        activities
    }

    fn base() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 1).unwrap()
    }

    fn classify(today: &[Activity], history: &[Activity], months: Option<u32>) -> DayPattern {
        let now = Utc.with_ymd_and_hms(2024, 8, 10, 21, 0, 0).unwrap();
        classify_day_sentiment(today, history, months, 21, &now, &NightWindow::default()).pattern
    }

    #[test]
    fn test_early_days_wins() {
        let now = Utc.with_ymd_and_hms(2024, 8, 10, 21, 0, 0).unwrap();
        let today = now.date_naive();
        let activities = day(today, 12, 0);
        let night = NightWindow::default();
        let result = classify_day_sentiment(&activities, &activities, Some(2), 21, &now, &night);
        assert_eq!(result.pattern, DayPattern::EarlyDays);
        assert_eq!(result.label, "Early Days");
    }

    #[test]
    fn test_smooth_flow() {
        let today = day(base() + Duration::days(9), 6, 3);
        let history = day(base(), 6, 3);
        assert_eq!(classify(&today, &history, Some(2)), DayPattern::SmoothFlow);
    }

    #[test]
    fn test_growth_spurt_before_feed_heavy() {
        let today_date = base() + Duration::days(9);
        let today = day(today_date, 10, 3);
        let mut history = Vec::new();
        for back in 1..=3 {
            history.extend(day(today_date - Duration::days(back), 9, 3));
        }
        assert_eq!(classify(&today, &history, Some(2)), DayPattern::GrowthSpurtWeek);

        let quiet_history = day(today_date - Duration::days(1), 6, 3);
        assert_eq!(classify(&today, &quiet_history, Some(2)), DayPattern::FeedHeavyDay);
    }

    #[test]
    fn test_off_rhythm_before_single_rules() {
        let today = day(base() + Duration::days(9), 10, 6);
        let history = day(base(), 6, 3);
        assert_eq!(classify(&today, &history, Some(2)), DayPattern::OffRhythmDay);
    }

    #[test]
    fn test_single_deviations() {
        let history = day(base(), 6, 3);
        let date = base() + Duration::days(9);
        assert_eq!(classify(&day(date, 6, 5), &history, Some(2)), DayPattern::ExtraSleepyDay);
        assert_eq!(classify(&day(date, 6, 1), &history, Some(2)), DayPattern::ShortNapDay);
        assert_eq!(classify(&day(date, 3, 3), &history, Some(2)), DayPattern::LightFeedingDay);
    }

    #[test]
    fn test_morning_is_prorated() {
        let now = Utc.with_ymd_and_hms(2024, 8, 10, 9, 0, 0).unwrap();
        let today = day(now.date_naive(), 2, 1);
        let history = day(base(), 6, 3);
        let result =
            classify_day_sentiment(&today, &history, Some(2), 9, &now, &NightWindow::default());
        assert_eq!(result.pattern, DayPattern::SmoothFlow);
    }

    #[test]
    fn test_unknown_age_skips_scoring() {
        let today = day(base() + Duration::days(9), 12, 4);
        let history = day(base(), 6, 3);
        assert_eq!(classify(&today, &history, None), DayPattern::SteadyDay);
        assert_eq!(classify(&today, &history, Some(40)), DayPattern::SteadyDay);
    }

    #[test]
    fn test_quiet_day() {
        let history = day(base(), 6, 3);
        assert_eq!(classify(&[], &history, Some(2)), DayPattern::QuietDay);
    }
}
