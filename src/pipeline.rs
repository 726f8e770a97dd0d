//! Pipeline orchestration
//!
//! This module provides the public API for Rhythm Flux. Every entry point is a
//! pure function of the activity history, configuration and a caller-supplied
//! `now`; nothing reads the clock or holds state between calls.
//!
//! Pipeline stages:
//! 1. ActivityRecordAdapter - Parse stored rows into typed activities (JSON entry points only)
//! 2. Aggregation - Group by event date and summarize each day
//! 3. BaselineStore - Learn the baby's rhythm from the trailing window
//! 4. Predictor - Blend learned values with age norms and project the day
//! 5. Reconciliation - Score the prediction against what was logged

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Timelike, Utc};
use tracing::debug;

use crate::adapter::{ActivityRecordAdapter, AppRecordAdapter};
use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::expectations::age_in_months;
use crate::features::{self, group_by_date, NightWindow};
use crate::predictor;
use crate::reconcile::reconcile_schedule;
use crate::sentiment::{self, DaySentiment};
use crate::types::{Activity, DailySummary, PredictedSchedule};

/// Predict the schedule for the day `now` falls on.
///
/// # Example
/// ```ignore
/// let schedule = predict_schedule(&activities, birth_date, &EngineConfig::default(), &now)?;
/// for event in &schedule.events {
///     println!("{} {:?}", event.time, event.event_type);
/// }
/// ```
pub fn predict_schedule<Tz: TimeZone>(
    activities: &[Activity],
    birth_date: NaiveDate,
    config: &EngineConfig,
    now: &DateTime<Tz>,
) -> Result<PredictedSchedule, ComputeError> {
    predictor::predict_schedule(activities, birth_date, config, now)
}

/// Label one day's pattern; see [`sentiment::classify_day_sentiment`]
pub fn classify_day_sentiment<Tz: TimeZone>(
    day_activities: &[Activity],
    all_activities: &[Activity],
    baby_age_months: Option<u32>,
    current_hour: u32,
    now: &DateTime<Tz>,
    night_window: &NightWindow,
) -> DaySentiment {
    sentiment::classify_day_sentiment(
        day_activities,
        all_activities,
        baby_age_months,
        current_hour,
        now,
        night_window,
    )
}

/// Summarize a set of activities as one day in the viewer's timezone
pub fn aggregate_daily_summary<Tz: TimeZone>(
    activities: &[Activity],
    night_window: &NightWindow,
    now: &DateTime<Tz>,
) -> DailySummary {
    features::aggregate_daily_summary(
        activities,
        night_window,
        &now.timezone(),
        now.with_timezone(&Utc),
    )
}

/// Predict a schedule from raw activity rows.
///
/// # Arguments
/// * `activities_json` - Stored activity rows (array or `{"activities": [...]}`)
/// * `birth_date` - `YYYY-MM-DD`
/// * `config_json` - Engine configuration; `None` uses the defaults
/// * `now` - RFC 3339 instant whose offset is the viewer's timezone
///
/// # Returns
/// The predicted schedule as JSON
pub fn predict_schedule_json(
    activities_json: &str,
    birth_date: &str,
    config_json: Option<&str>,
    now: &str,
) -> Result<String, ComputeError> {
    let config = match config_json {
        Some(json) => EngineConfig::from_json(json)?,
        None => EngineConfig::default(),
    };
    let engine = RhythmEngine::new(config)?;
    let activities = engine.parse_activities(activities_json)?;
    let birth_date = parse_date(birth_date)?;
    let now = parse_now(now)?;

    let schedule = engine.predict(&activities, birth_date, &now)?;
    Ok(serde_json::to_string(&schedule)?)
}

/// Classify the pattern of the day `now` falls on from raw activity rows.
///
/// The day's activities are picked out of the full history by event date.
/// `birth_date` of `None` skips age-based scoring.
pub fn classify_day_sentiment_json(
    activities_json: &str,
    birth_date: Option<&str>,
    now: &str,
) -> Result<String, ComputeError> {
    let engine = RhythmEngine::default();
    let activities = engine.parse_activities(activities_json)?;
    let birth_date = birth_date.map(parse_date).transpose()?;
    let now = parse_now(now)?;

    let sentiment = engine.classify_today(&activities, birth_date, &now);
    Ok(serde_json::to_string(&sentiment)?)
}

/// Summarize raw activity rows per event date
pub fn aggregate_by_day_json(activities_json: &str, now: &str) -> Result<String, ComputeError> {
    let engine = RhythmEngine::default();
    let activities = engine.parse_activities(activities_json)?;
    let now = parse_now(now)?;

    let summaries = engine.summarize_days(&activities, &now);
    Ok(serde_json::to_string(&summaries)?)
}

fn parse_date(raw: &str) -> Result<NaiveDate, ComputeError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| ComputeError::DateParseError(format!("{}: {}", raw, e)))
}

fn parse_now(raw: &str) -> Result<DateTime<FixedOffset>, ComputeError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map_err(|e| ComputeError::DateParseError(format!("{}: {}", raw, e)))
}

/// Engine bound to one household's configuration.
///
/// Holds only validated settings, so one instance can serve concurrent
/// requests for the same household.
#[derive(Debug, Clone, Default)]
pub struct RhythmEngine {
    config: EngineConfig,
    adapter: AppRecordAdapter,
}

impl RhythmEngine {
    /// Create an engine, rejecting invalid configuration up front
    pub fn new(config: EngineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            adapter: AppRecordAdapter,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse stored activity rows
    pub fn parse_activities(&self, raw_json: &str) -> Result<Vec<Activity>, ComputeError> {
        self.adapter.parse(raw_json)
    }

    /// Predict the day `now` falls on
    pub fn predict<Tz: TimeZone>(
        &self,
        activities: &[Activity],
        birth_date: NaiveDate,
        now: &DateTime<Tz>,
    ) -> Result<PredictedSchedule, ComputeError> {
        predictor::predict_schedule(activities, birth_date, &self.config, now)
    }

    /// Predict, then fill in whatever of the day has already been logged
    pub fn predict_and_reconcile<Tz: TimeZone>(
        &self,
        activities: &[Activity],
        birth_date: NaiveDate,
        now: &DateTime<Tz>,
    ) -> Result<PredictedSchedule, ComputeError> {
        let schedule = self.predict(activities, birth_date, now)?;
        Ok(self.reconcile(schedule, activities, now))
    }

    /// Score an earlier prediction against the activities logged since
    pub fn reconcile<Tz: TimeZone>(
        &self,
        schedule: PredictedSchedule,
        activities: &[Activity],
        now: &DateTime<Tz>,
    ) -> PredictedSchedule {
        reconcile_schedule(schedule, activities, &self.config.night_window(), now)
    }

    /// One summary per event date, oldest first
    pub fn summarize_days<Tz: TimeZone>(
        &self,
        activities: &[Activity],
        now: &DateTime<Tz>,
    ) -> Vec<DailySummary> {
        features::aggregate_by_day(
            activities,
            &self.config.night_window(),
            &now.timezone(),
            now.with_timezone(&Utc),
        )
    }

    /// Summarize activities as a single day
    pub fn summarize<Tz: TimeZone>(
        &self,
        activities: &[Activity],
        now: &DateTime<Tz>,
    ) -> DailySummary {
        aggregate_daily_summary(activities, &self.config.night_window(), now)
    }

    /// Label the day `now` falls on, taking its activities from the full history
    pub fn classify_today<Tz: TimeZone>(
        &self,
        activities: &[Activity],
        birth_date: Option<NaiveDate>,
        now: &DateTime<Tz>,
    ) -> DaySentiment {
        let today = now.date_naive();
        let tz = now.timezone();
        let day_activities: Vec<Activity> = group_by_date(activities, &tz)
            .remove(&today)
            .unwrap_or_default()
            .into_iter()
            .cloned()
            .collect();
        let age_months = birth_date.and_then(|birth| age_in_months(birth, today));

        debug!(
            %today,
            day_activities = day_activities.len(),
            ?age_months,
            "classifying today"
        );
        sentiment::classify_day_sentiment(
            &day_activities,
            activities,
            age_months,
            now.hour(),
            now,
            &self.config.night_window(),
        )
    }
}
