use chrono::{
    DateTime, Days, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, TimeZone,
};
use pretty_assertions::assert_eq;
use rhythm_flux::predictor::HORIZON_MINUTES;
use rhythm_flux::time::is_dst_transition_day;
use rhythm_flux::types::NapDetails;
use rhythm_flux::{
    predict_schedule, Activity, ActivityDetails, Confidence, DataStability, EngineConfig,
    PredictedSchedule,
};
use uuid::Uuid;

/// Zone on UTC-5 that springs forward to UTC-4 at 02:00 local on 2024-03-10
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SpringForward;

impl SpringForward {
    fn change_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn switch_local() -> NaiveDateTime {
        Self::change_day().and_hms_opt(2, 0, 0).unwrap()
    }

    fn standard() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).unwrap()
    }

    fn daylight() -> FixedOffset {
        FixedOffset::west_opt(4 * 3600).unwrap()
    }
}

impl TimeZone for SpringForward {
    type Offset = FixedOffset;

    fn from_offset(_offset: &FixedOffset) -> Self {
        SpringForward
    }

    fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
        self.offset_from_local_datetime(&local.and_hms_opt(0, 0, 0).unwrap())
    }

    fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
        let switch = Self::switch_local();
        if *local < switch {
            LocalResult::Single(Self::standard())
        } else if *local < switch + Duration::hours(1) {
            LocalResult::None
        } else {
            LocalResult::Single(Self::daylight())
        }
    }

    fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
        self.offset_from_utc_datetime(&utc.and_hms_opt(0, 0, 0).unwrap())
    }

    fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
        if *utc < Self::switch_local() + Duration::hours(5) {
            Self::standard()
        } else {
            Self::daylight()
        }
    }
}

fn morning_of(date: NaiveDate) -> DateTime<SpringForward> {
    SpringForward.from_local_datetime(&date.and_hms_opt(5, 0, 0).unwrap()).unwrap()
}

fn nap(date: NaiveDate, start: &str, end: &str) -> Activity {
    Activity {
        id: Uuid::new_v4(),
        logged_at: date.and_hms_opt(20, 0, 0).unwrap().and_utc(),
        timezone: "America/New_York".to_string(),
        date_local: Some(date),
        details: ActivityDetails::Nap(NapDetails {
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
            is_night_sleep: None,
        }),
    }
}

/// Five days of three 90-minute naps two hours apart
fn steady_naps_before(today: NaiveDate) -> Vec<Activity> {
    (1..=5)
        .rev()
        .map(|back| today - Days::new(back))
        .flat_map(|date| {
            [
                nap(date, "8:30 AM", "10:00 AM"),
                nap(date, "12:00 PM", "1:30 PM"),
                nap(date, "3:30 PM", "5:00 PM"),
            ]
        })
        .collect()
}

fn predict_on(today: NaiveDate) -> PredictedSchedule {
    let birth = today - Days::new(70);
    let schedule = predict_schedule(
        &steady_naps_before(today),
        birth,
        &EngineConfig::default(),
        &morning_of(today),
    )
    .unwrap();
    assert_eq!(schedule.internals.data_stability, DataStability::Stable);
    schedule
}

/// Confidence each event would carry without any daylight-saving penalty
fn horizon_only(schedule: &PredictedSchedule) -> Vec<Confidence> {
    let anchor = schedule.events[0].minutes;
    schedule
        .events
        .iter()
        .map(|e| {
            if e.minutes > anchor + HORIZON_MINUTES {
                Confidence::High.downgrade()
            } else {
                Confidence::High
            }
        })
        .collect()
}

fn confidences(schedule: &PredictedSchedule) -> Vec<Confidence> {
    schedule.events.iter().map(|e| e.confidence).collect()
}

#[test]
fn offset_change_marks_only_the_change_day() {
    let change = SpringForward::change_day();
    assert!(is_dst_transition_day(&SpringForward, change));
    assert!(!is_dst_transition_day(&SpringForward, change - Days::new(1)));
    assert!(!is_dst_transition_day(&SpringForward, change + Days::new(1)));
    assert!(!is_dst_transition_day(&SpringForward, change + Days::new(2)));
}

#[test]
fn ordinary_day_keeps_full_confidence() {
    let schedule = predict_on(SpringForward::change_day() + Days::new(2));
    assert_eq!(confidences(&schedule), horizon_only(&schedule));
    assert_eq!(schedule.events[0].confidence, Confidence::High);
}

#[test]
fn change_day_and_day_after_drop_one_tier() {
    let change = SpringForward::change_day();
    for today in [change, change + Days::new(1)] {
        let schedule = predict_on(today);
        let expected: Vec<Confidence> = horizon_only(&schedule)
            .into_iter()
            .map(Confidence::downgrade)
            .collect();
        assert_eq!(confidences(&schedule), expected, "on {}", today);
        assert!(schedule.events.iter().all(|e| e.confidence != Confidence::High));
    }
}
