//! Activity record adapter
//!
//! Parses the loosely typed activity rows the app stores (one free-form
//! `details` object shared by every activity type, camelCase or snake_case
//! keys, quantities as numbers or strings) and maps them to typed activities.
//!
//! Rows that cannot describe an activity (unknown type, unreadable timestamp)
//! are skipped rather than failing the batch. Only malformed JSON is an error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ComputeError;
use crate::normalizer::VolumeUnit;
use crate::types::{
    Activity, ActivityDetails, DiaperDetails, DiaperType, FeedDetails, FeedType, NapDetails,
};

/// Trait for activity record adapters
pub trait ActivityRecordAdapter {
    /// Parse raw JSON rows and convert to typed activities
    fn parse(&self, raw_json: &str) -> Result<Vec<Activity>, ComputeError>;
}

/// Adapter for the app's stored activity rows
#[derive(Debug, Clone, Copy, Default)]
pub struct AppRecordAdapter;

impl ActivityRecordAdapter for AppRecordAdapter {
    fn parse(&self, raw_json: &str) -> Result<Vec<Activity>, ComputeError> {
        let payload: RecordPayload = serde_json::from_str(raw_json)?;
        let rows = match payload {
            RecordPayload::Rows(rows) => rows,
            RecordPayload::Wrapped { activities } => activities,
        };

        let total = rows.len();
        let mut activities: Vec<Activity> = rows.into_iter().filter_map(convert_record).collect();
        activities.sort_by_key(|a| a.logged_at);

        debug!(
            rows = total,
            activities = activities.len(),
            skipped = total - activities.len(),
            "parsed activity records"
        );
        Ok(activities)
    }
}

/// Either a bare array of rows or `{ "activities": [...] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordPayload {
    Rows(Vec<RawRecord>),
    Wrapped { activities: Vec<RawRecord> },
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", alias = "activityType", alias = "activity_type")]
    kind: String,
    #[serde(alias = "loggedAt")]
    logged_at: String,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default, alias = "dateLocal")]
    date_local: Option<String>,
    #[serde(default)]
    details: RawDetails,
}

#[derive(Debug, Default, Deserialize)]
struct RawDetails {
    #[serde(default, alias = "amount")]
    quantity: Option<Value>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default, alias = "feedType")]
    feed_type: Option<String>,
    #[serde(default, alias = "startTime")]
    start_time: Option<String>,
    #[serde(default, alias = "endTime")]
    end_time: Option<String>,
    #[serde(default, alias = "isNightSleep")]
    is_night_sleep: Option<bool>,
    #[serde(default, alias = "diaperType")]
    diaper_type: Option<String>,
    #[serde(default, alias = "hasLeak")]
    has_leak: Option<bool>,
}

fn convert_record(raw: RawRecord) -> Option<Activity> {
    let Some(logged_at) = parse_logged_at(&raw.logged_at) else {
        warn!(logged_at = %raw.logged_at, "skipping activity with unreadable timestamp");
        return None;
    };
    let Some(details) = convert_details(&raw.kind, raw.details) else {
        warn!(kind = %raw.kind, "skipping activity of unknown type");
        return None;
    };

    let id = raw
        .id
        .as_deref()
        .and_then(|id| Uuid::parse_str(id).ok())
        .unwrap_or_else(Uuid::new_v4);
    let date_local = raw
        .date_local
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok());

    Some(Activity {
        id,
        logged_at,
        timezone: raw.timezone.unwrap_or_else(|| "UTC".to_string()),
        date_local,
        details,
    })
}

fn convert_details(kind: &str, raw: RawDetails) -> Option<ActivityDetails> {
    let details = match kind.trim().to_ascii_lowercase().as_str() {
        "feed" | "feeding" => {
            let (quantity, unit_hint) = raw
                .quantity
                .as_ref()
                .map(parse_quantity)
                .unwrap_or_default();
            let unit = raw.unit.as_deref().and_then(VolumeUnit::parse).or(unit_hint);
            ActivityDetails::Feed(FeedDetails {
                quantity,
                unit,
                feed_type: raw.feed_type.as_deref().map(parse_feed_type),
            })
        }
        "nap" | "sleep" => ActivityDetails::Nap(NapDetails {
            start_time: raw.start_time,
            end_time: raw.end_time,
            is_night_sleep: raw.is_night_sleep,
        }),
        "diaper" => ActivityDetails::Diaper(DiaperDetails {
            diaper_type: raw.diaper_type.as_deref().and_then(parse_diaper_type),
            has_leak: raw.has_leak.unwrap_or(false),
        }),
        "note" => ActivityDetails::Note,
        "solids" | "solid" => ActivityDetails::Solids,
        "photo" => ActivityDetails::Photo,
        _ => return None,
    };
    Some(details)
}

/// Parse an instant: RFC 3339, or a naive timestamp taken as UTC
fn parse_logged_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Quantity as a number, or a string like `"4"` / `"120 ml"`; a unit found in
/// the string is returned as a hint
fn parse_quantity(value: &Value) -> (Option<f64>, Option<VolumeUnit>) {
    match value {
        Value::Number(n) => (n.as_f64().filter(|q| q.is_finite() && *q >= 0.0), None),
        Value::String(s) => {
            let s = s.trim();
            let split = s
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(s.len());
            let (number, unit) = s.split_at(split);
            let quantity = number.parse::<f64>().ok().filter(|q| q.is_finite());
            (quantity, VolumeUnit::parse(unit))
        }
        _ => (None, None),
    }
}

fn parse_feed_type(raw: &str) -> FeedType {
    match raw.trim().to_ascii_lowercase().as_str() {
        "breast" | "nursing" | "breastfeeding" => FeedType::Breast,
        "bottle" | "pumped" => FeedType::Bottle,
        "formula" => FeedType::Formula,
        _ => FeedType::Other,
    }
}

fn parse_diaper_type(raw: &str) -> Option<DiaperType> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "wet" | "pee" => Some(DiaperType::Wet),
        "dirty" | "poop" | "poopy" => Some(DiaperType::Dirty),
        "both" | "mixed" => Some(DiaperType::Both),
        "dry" | "clean" => Some(DiaperType::Dry),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const SAMPLE_ROWS: &str = r#"[
        {
            "id": "6f1c1a52-3c8e-4b7e-9d0a-1f2e3d4c5b6a",
            "type": "feed",
            "logged_at": "2024-05-01T07:05:00Z",
            "timezone": "America/New_York",
            "details": {"quantity": "4", "unit": "oz", "feedType": "bottle"}
        },
        {
            "type": "nap",
            "loggedAt": "2024-05-01T09:00:00+00:00",
            "details": {"startTime": "9:00 AM", "endTime": "10:15 AM", "isNightSleep": false}
        },
        {
            "type": "diaper",
            "logged_at": "2024-05-01 11:00:00+00",
            "date_local": "2024-05-01",
            "details": {"diaperType": "both", "hasLeak": true}
        },
        {
            "type": "tummy_time",
            "logged_at": "2024-05-01T12:00:00Z",
            "details": {}
        },
        {
            "type": "feed",
            "logged_at": "yesterday-ish",
            "details": {"quantity": 3}
        }
    ]"#;

    #[test]
    fn test_parse_app_rows() {
        let activities = AppRecordAdapter.parse(SAMPLE_ROWS).unwrap();
        assert_eq!(activities.len(), 3);

        let feed = activities[0].as_feed().unwrap();
        assert_eq!(feed.quantity, Some(4.0));
        assert_eq!(feed.unit, Some(VolumeUnit::Oz));
        assert_eq!(feed.feed_type, Some(FeedType::Bottle));
        assert_eq!(activities[0].timezone, "America/New_York");
        assert_eq!(
            activities[0].id.to_string(),
            "6f1c1a52-3c8e-4b7e-9d0a-1f2e3d4c5b6a"
        );

        let nap = activities[1].as_nap().unwrap();
        assert_eq!(nap.start_time.as_deref(), Some("9:00 AM"));
        assert_eq!(nap.is_night_sleep, Some(false));

        let diaper = activities[2].as_diaper().unwrap();
        assert_eq!(diaper.diaper_type, Some(DiaperType::Both));
        assert!(diaper.has_leak);
        assert_eq!(activities[2].date_local, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(
            activities[2].logged_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_wrapped_payload() {
        let json = r#"{"activities": [{"type": "solids", "logged_at": "2024-05-01T12:00:00"}]}"#;
        let activities = AppRecordAdapter.parse(json).unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].details, ActivityDetails::Solids);
    }

    #[test]
    fn test_quantity_with_unit_suffix() {
        assert_eq!(
            parse_quantity(&Value::String("120 ml".to_string())),
            (Some(120.0), Some(VolumeUnit::Ml))
        );
        assert_eq!(parse_quantity(&Value::String("lots".to_string())), (None, None));
        assert_eq!(parse_quantity(&serde_json::json!(2.5)), (Some(2.5), None));
    }

    #[test]
    fn test_invalid_json() {
        let result = AppRecordAdapter.parse("not json");
        assert!(matches!(result, Err(ComputeError::JsonError(_))));
    }
}
