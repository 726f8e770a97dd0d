//! Rhythm Flux - Schedule and rhythm prediction engine for infant care logs
//!
//! Flux turns a household's logged feeds, naps and diapers into a predicted
//! schedule for the day through a deterministic pipeline: record adaptation →
//! daily aggregation → learned baselines → age-blended prediction →
//! reconciliation against what was actually logged.
//!
//! ## Modules
//!
//! - **Prediction**: Predict today's wake, nap, feed and bed times with per-event confidence
//! - **Day patterns**: Label a day ("Smooth Flow", "Growth Spurt Week", ...) against age norms
//! - **Aggregation**: Per-day counts, sleep durations, wake windows and feed volume

pub mod adapter;
pub mod baseline;
pub mod config;
pub mod error;
pub mod expectations;
pub mod features;
pub mod normalizer;
pub mod pipeline;
pub mod predictor;
pub mod reconcile;
pub mod sentiment;
pub mod time;
pub mod types;

pub use adapter::{ActivityRecordAdapter, AppRecordAdapter};
pub use config::EngineConfig;
pub use error::ComputeError;
pub use features::NightWindow;
pub use pipeline::{
    aggregate_by_day_json, aggregate_daily_summary, classify_day_sentiment,
    classify_day_sentiment_json, predict_schedule, predict_schedule_json, RhythmEngine,
};
pub use sentiment::{DayPattern, DaySentiment};
pub use types::{
    Activity, ActivityDetails, Confidence, DailySummary, DataStability, PredictedSchedule,
    ScheduleEvent, ScheduleEventType,
};

/// Engine version, reported alongside predictions by callers that cache them
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
