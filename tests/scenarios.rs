use chrono::{DateTime, Duration, NaiveDate, Utc};
use pretty_assertions::assert_eq;
use rhythm_flux::normalizer::VolumeUnit;
use rhythm_flux::time::{calculate_duration_minutes, parse_time_to_minutes};
use rhythm_flux::types::{FeedDetails, NapDetails};
use rhythm_flux::{
    aggregate_daily_summary, classify_day_sentiment, predict_schedule, Activity, ActivityDetails,
    Confidence, DataStability, DayPattern, EngineConfig, NightWindow, RhythmEngine,
    ScheduleEventType,
};
use uuid::Uuid;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 20).unwrap()
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    date.and_hms_opt(hour, minute, 0).unwrap().and_utc()
}

fn nap(date: NaiveDate, start: &str, end: &str) -> Activity {
    let minutes = parse_time_to_minutes(start).unwrap();
    Activity {
        id: Uuid::new_v4(),
        logged_at: at(date, minutes / 60, minutes % 60),
        timezone: "UTC".to_string(),
        date_local: Some(date),
        details: ActivityDetails::Nap(NapDetails {
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
            is_night_sleep: None,
        }),
    }
}

fn feed(date: NaiveDate, hour: u32) -> Activity {
    Activity {
        id: Uuid::new_v4(),
        logged_at: at(date, hour, 0),
        timezone: "UTC".to_string(),
        date_local: None,
        details: ActivityDetails::Feed(FeedDetails {
            quantity: Some(120.0),
            unit: Some(VolumeUnit::Ml),
            feed_type: None,
        }),
    }
}

/// Three 90-minute naps at fixed clock times and six 120 ml feeds
fn typical_day(date: NaiveDate) -> Vec<Activity> {
    let mut day = vec![
        nap(date, "8:30 AM", "10:00 AM"),
        nap(date, "12:00 PM", "1:30 PM"),
        nap(date, "3:30 PM", "5:00 PM"),
    ];
    day.extend([7, 10, 13, 15, 17, 18].into_iter().map(|h| feed(date, h)));
    day
}

#[test]
fn ten_week_old_with_steady_week_has_smooth_flow() {
    let birth = today() - Duration::weeks(10);
    let history: Vec<Activity> = (1..=5)
        .rev()
        .flat_map(|back| typical_day(today() - Duration::days(back)))
        .collect();
    let day_six = typical_day(today());
    let mut all = history.clone();
    all.extend(day_six.iter().cloned());

    let now = at(today(), 21, 0);
    let night = NightWindow::default();
    let sentiment = classify_day_sentiment(&day_six, &all, Some(2), 21, &now, &night);
    assert_eq!(sentiment.pattern, DayPattern::SmoothFlow);
    assert_eq!(sentiment.label, "Smooth Flow");

    let morning = at(today(), 6, 0);
    let schedule = predict_schedule(&history, birth, &EngineConfig::default(), &morning).unwrap();
    assert_eq!(schedule.internals.days_in_history, 5);
    assert_eq!(schedule.internals.data_stability, DataStability::Stable);
    assert_eq!(schedule.internals.median_wake_window, Some(120.0));
    assert_eq!(schedule.internals.median_nap_duration, Some(90.0));
    assert_ne!(schedule.based_on, "age-based defaults");
}

#[test]
fn newborn_with_no_history_gets_fallback_schedule() {
    let now = at(today(), 6, 0);
    let schedule = predict_schedule(&[], today(), &EngineConfig::default(), &now).unwrap();

    assert_eq!(schedule.based_on, "age-based defaults");
    assert!(!schedule.events.is_empty());
    assert_eq!(schedule.events[0].event_type, ScheduleEventType::Wake);
    assert_eq!(schedule.events.last().unwrap().event_type, ScheduleEventType::Bed);
    assert!(schedule.events.iter().all(|e| e.confidence != Confidence::High));
    assert!(schedule
        .events
        .windows(2)
        .all(|pair| pair[0].minutes < pair[1].minutes));
}

#[test]
fn overnight_sleep_crosses_midnight() {
    let start = parse_time_to_minutes("11:50 PM").unwrap();
    let end = parse_time_to_minutes("6:10 AM").unwrap();
    assert_eq!(calculate_duration_minutes(start, end), 380);

    let yesterday = today() - Duration::days(1);
    let summary = aggregate_daily_summary(
        &[nap(yesterday, "11:50 PM", "6:10 AM")],
        &NightWindow::default(),
        &at(today(), 12, 0),
    );
    assert_eq!(summary.night_sleep_count, 1);
    assert_eq!(summary.night_sleep_minutes, 380);
}

#[test]
fn first_log_ten_hours_ago_is_early_days() {
    let now = at(today(), 18, 0);
    let first = now - Duration::hours(10);
    let mut activities = typical_day(today());
    for activity in &mut activities {
        if activity.logged_at < first {
            activity.logged_at = first;
        }
    }

    let night = NightWindow::default();
    let sentiment = classify_day_sentiment(&activities, &activities, Some(2), 18, &now, &night);
    assert_eq!(sentiment.pattern, DayPattern::EarlyDays);

    let engine = RhythmEngine::default();
    let sentiment = engine.classify_today(&activities, Some(today() - Duration::weeks(10)), &now);
    assert_eq!(sentiment.label, "Early Days");
}

#[test]
fn messy_data_degrades_without_errors() {
    let date = today() - Duration::days(1);
    let mut unreadable = nap(date, "11:00 AM", "11:30 AM");
    unreadable.details = ActivityDetails::Nap(NapDetails {
        start_time: Some("not a time".to_string()),
        end_time: Some("11:30 AM".to_string()),
        is_night_sleep: None,
    });
    let activities = vec![
        nap(date, "9:00 AM", "10:00 AM"),
        nap(date, "2:00 PM", "1:00 PM"),
        unreadable,
        feed(date, 8),
        feed(today() + Duration::days(2), 8),
    ];
    let now = at(today(), 7, 0);

    let summary = aggregate_daily_summary(&activities[..4], &NightWindow::default(), &now);
    assert_eq!(summary.excluded_sleeps, 2);
    assert_eq!(summary.day_sleep_minutes, 60);

    let birth = date - Duration::weeks(12);
    let schedule = predict_schedule(&activities, birth, &EngineConfig::default(), &now);
    assert!(schedule.is_ok());
}

#[test]
fn custom_night_window_reclassifies_sleep() {
    let date = today() - Duration::days(1);
    let evening = [nap(date, "6:00 PM", "6:45 PM")];
    let now = at(today(), 7, 0);

    let default_summary = aggregate_daily_summary(&evening, &NightWindow::default(), &now);
    assert_eq!(default_summary.nap_count, 1);

    let early = aggregate_daily_summary(&evening, &NightWindow::new(18, 6), &now);
    assert_eq!(early.nap_count, 0);
    assert_eq!(early.night_sleep_count, 1);
}
