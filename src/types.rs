//! Core types for the Rhythm Flux engine
//!
//! This module defines the data structures that flow through each stage of the
//! engine: typed activities, per-day summaries, learned internals and the
//! predicted schedule.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalizer::{Volume, VolumeUnit};

/// Activity discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Feed,
    Nap,
    Diaper,
    Note,
    Solids,
    Photo,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Feed => "feed",
            ActivityType::Nap => "nap",
            ActivityType::Diaper => "diaper",
            ActivityType::Note => "note",
            ActivityType::Solids => "solids",
            ActivityType::Photo => "photo",
        }
    }
}

/// How a feed was given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    Breast,
    Bottle,
    Formula,
    Other,
}

/// Diaper contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiaperType {
    Wet,
    Dirty,
    Both,
    Dry,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedDetails {
    pub quantity: Option<f64>,
    pub unit: Option<VolumeUnit>,
    pub feed_type: Option<FeedType>,
}

/// Sleep details as logged: 12-hour clock strings, optionally flagged as night sleep
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NapDetails {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_night_sleep: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiaperDetails {
    pub diaper_type: Option<DiaperType>,
    #[serde(default)]
    pub has_leak: bool,
}

/// Kind-specific payload of an activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "lowercase")]
pub enum ActivityDetails {
    Feed(FeedDetails),
    Nap(NapDetails),
    Diaper(DiaperDetails),
    Note,
    Solids,
    Photo,
}

impl ActivityDetails {
    pub fn activity_type(&self) -> ActivityType {
        match self {
            ActivityDetails::Feed(_) => ActivityType::Feed,
            ActivityDetails::Nap(_) => ActivityType::Nap,
            ActivityDetails::Diaper(_) => ActivityType::Diaper,
            ActivityDetails::Note => ActivityType::Note,
            ActivityDetails::Solids => ActivityType::Solids,
            ActivityDetails::Photo => ActivityType::Photo,
        }
    }
}

/// An immutable logged event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    /// When the activity was logged (UTC)
    pub logged_at: DateTime<Utc>,
    /// IANA timezone the activity was logged in
    pub timezone: String,
    /// Calendar date chosen by the logger; authoritative when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_local: Option<NaiveDate>,
    #[serde(flatten)]
    pub details: ActivityDetails,
}

impl Activity {
    pub fn activity_type(&self) -> ActivityType {
        self.details.activity_type()
    }

    pub fn as_feed(&self) -> Option<&FeedDetails> {
        match &self.details {
            ActivityDetails::Feed(feed) => Some(feed),
            _ => None,
        }
    }

    pub fn as_nap(&self) -> Option<&NapDetails> {
        match &self.details {
            ActivityDetails::Nap(nap) => Some(nap),
            _ => None,
        }
    }

    pub fn as_diaper(&self) -> Option<&DiaperDetails> {
        match &self.details {
            ActivityDetails::Diaper(diaper) => Some(diaper),
            _ => None,
        }
    }
}

/// Whether a sleep segment is a daytime nap or the overnight sleep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepKind {
    Nap,
    Night,
}

/// A measured sleep period, in minutes since local midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepSegment {
    pub start: u32,
    pub end: u32,
    pub duration_minutes: u32,
    pub kind: SleepKind,
}

impl SleepSegment {
    /// True when the segment ends on the following calendar day
    pub fn crosses_midnight(&self) -> bool {
        self.end < self.start
    }
}

/// Aggregated counts and durations for one calendar day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    /// Event date; `None` only for an empty input
    pub date: Option<NaiveDate>,
    pub feed_count: u32,
    /// Daytime naps, including ones whose times could not be measured
    pub nap_count: u32,
    pub night_sleep_count: u32,
    pub diaper_count: u32,
    pub wet_count: u32,
    pub dirty_count: u32,
    pub leak_count: u32,
    pub solids_count: u32,
    pub day_sleep_minutes: u32,
    pub night_sleep_minutes: u32,
    pub nap_segments: Vec<SleepSegment>,
    pub night_segments: Vec<SleepSegment>,
    /// Gaps between consecutive daytime naps (minutes)
    pub wake_windows: Vec<u32>,
    /// Feed times in minutes since local midnight, sorted
    pub feed_times: Vec<u32>,
    /// Gaps between consecutive feeds (minutes)
    pub feed_intervals: Vec<u32>,
    /// Total feed volume in the dominant unit, outlier capped
    pub feed_volume: Option<Volume>,
    /// Sleeps left out of duration statistics (missing or contradictory times)
    pub excluded_sleeps: u32,
    /// Activities logged after the reference instant
    pub future_dated: u32,
}

/// Data stability tier of the learned statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataStability {
    Sparse,
    Unstable,
    Stable,
}

/// Weighting between age norms and learned statistics; always sums to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendRatio {
    pub age_weight: f64,
    pub learned_weight: f64,
}

impl BlendRatio {
    pub fn from_learned_weight(learned_weight: f64) -> Self {
        let learned_weight = learned_weight.clamp(0.0, 1.0);
        Self {
            age_weight: 1.0 - learned_weight,
            learned_weight,
        }
    }

    /// Blend an age-based value with an optional learned value
    pub fn blend(&self, age_value: f64, learned: Option<f64>) -> f64 {
        match learned {
            Some(value) => age_value * self.age_weight + value * self.learned_weight,
            None => age_value,
        }
    }

    pub fn learned_dominates(&self) -> bool {
        self.learned_weight > self.age_weight
    }
}

/// Learned-statistics snapshot used for one prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineInternals {
    pub median_wake_window: Option<f64>,
    pub median_feed_interval: Option<f64>,
    pub median_day_sleep: Option<f64>,
    pub median_nap_duration: Option<f64>,
    /// Minutes since midnight; values past midnight exceed 1440
    pub median_bedtime: Option<f64>,
    pub median_morning_wake: Option<f64>,
    pub wake_window_std_dev: Option<f64>,
    pub feed_interval_std_dev: Option<f64>,
    pub day_sleep_std_dev: Option<f64>,
    pub wake_window_samples: usize,
    pub feed_interval_samples: usize,
    pub days_in_history: usize,
    pub data_stability: DataStability,
    pub blend: BlendRatio,
}

/// Confidence attached to a predicted event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// One tier lower, saturating at `Low`
    pub fn downgrade(self) -> Self {
        match self {
            Confidence::High => Confidence::Medium,
            Confidence::Medium | Confidence::Low => Confidence::Low,
        }
    }

    /// Highest confidence a stability tier justifies
    pub fn ceiling_for(stability: DataStability) -> Self {
        match stability {
            DataStability::Stable => Confidence::High,
            DataStability::Unstable | DataStability::Sparse => Confidence::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleEventType {
    Wake,
    Nap,
    Feed,
    Bed,
}

/// One predicted event of the day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEvent {
    /// Display time, e.g. "9:30 AM"
    pub time: String,
    /// Minutes since local midnight of the predicted day
    pub minutes: u32,
    pub event_type: ScheduleEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    pub confidence: Confidence,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_duration: Option<u32>,
}

/// Predicted schedule for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedSchedule {
    pub date: NaiveDate,
    pub events: Vec<ScheduleEvent>,
    /// Weakest confidence across all events
    pub confidence: Confidence,
    pub based_on: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_score: Option<f64>,
    pub last_updated: DateTime<Utc>,
    pub internals: EngineInternals,
}
