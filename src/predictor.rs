//! Schedule prediction
//!
//! Projects today's schedule forward from the most recent logged event. Each
//! step compares the next nap (anchor + wake window) against the next feed
//! (last feed + feed interval) and emits whichever comes first, until the
//! day-sleep target or the nap-slot bound is reached. A bed event closes the
//! day.
//!
//! Wake windows, feed intervals, nap lengths, day-sleep target and bedtime
//! are blends of the age norms and the baby's learned medians, weighted by the
//! data-stability tier.

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use tracing::debug;

use crate::baseline::BaselineStore;
use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::expectations::AgeBasedParams;
use crate::features::{aggregate_by_day, morning_wake, NightWindow};
use crate::time::{
    format_minutes_to_time, is_dst_transition_day, is_hour_in_range, MINUTES_PER_DAY,
};
use crate::types::{
    Activity, Confidence, DailySummary, DataStability, EngineInternals, PredictedSchedule,
    ScheduleEvent, ScheduleEventType,
};

/// `based_on` value when no history is available
pub const AGE_BASED_DEFAULTS: &str = "age-based defaults";

/// Candidates this close favour the feed
pub const TIE_EPSILON_MINUTES: u32 = 5;

/// Minimum spacing between consecutive events
pub const MIN_EVENT_GAP_MINUTES: u32 = 5;

/// Safety bound on projected naps per day
pub const MAX_NAP_SLOTS: u32 = 6;

/// Safety bound on events per schedule
pub const MAX_EVENTS: usize = 24;

/// Events further than this past the anchor lose a confidence tier
pub const HORIZON_MINUTES: u32 = 6 * 60;

/// How far learned bedtime drift may move bedtime outside the age band
pub const BEDTIME_SLACK_MINUTES: f64 = 60.0;

/// Blended rhythm values in minutes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendedRhythm {
    pub wake_window: f64,
    pub feed_interval: f64,
    pub nap_duration: f64,
    pub day_sleep_target: f64,
    pub bedtime: f64,
    pub morning_wake: f64,
}

impl BlendedRhythm {
    /// Blend age norms with learned medians using the internals' blend ratio
    pub fn new(params: &AgeBasedParams, internals: &EngineInternals, night_end_hour: u32) -> Self {
        let blend = internals.blend;
        let floor = params.nap_duration_floor as f64;
        let earliest = params.bedtime_earliest as f64 - BEDTIME_SLACK_MINUTES;
        let latest = (params.bedtime_latest as f64 + BEDTIME_SLACK_MINUTES)
            .min((MINUTES_PER_DAY - 1) as f64);

        Self {
            wake_window: blend
                .blend(params.wake_window_mid(), internals.median_wake_window)
                .max(1.0),
            feed_interval: blend
                .blend(params.feed_interval_mid(), internals.median_feed_interval)
                .max(1.0),
            nap_duration: blend
                .blend(params.nap_duration(), internals.median_nap_duration)
                .max(floor),
            day_sleep_target: blend.blend(
                params.target_day_sleep_minutes as f64,
                internals.median_day_sleep,
            ),
            bedtime: blend
                .blend(params.bedtime_mid(), internals.median_bedtime)
                .clamp(earliest, latest),
            morning_wake: blend.blend((night_end_hour * 60) as f64, internals.median_morning_wake),
        }
    }
}

/// What is already known about today from the log
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodayAnchor {
    pub morning_wake: Option<u32>,
    pub last_nap_end: Option<u32>,
    /// Latest feed of the day, night feeds included; drives feed cadence
    pub last_feed: Option<u32>,
    /// Latest feed outside the night window
    pub last_day_feed: Option<u32>,
    /// Earliest daytime nap start or feed
    pub first_logged: Option<u32>,
    pub day_sleep: u32,
    pub naps: u32,
}

impl TodayAnchor {
    /// Night feeds and any nap starting inside `night` never anchor the day.
    pub fn from_summaries(
        today: Option<&DailySummary>,
        yesterday: Option<&DailySummary>,
        night: &NightWindow,
    ) -> Self {
        let Some(summary) = today else {
            return Self {
                morning_wake: morning_wake(None, yesterday),
                ..Default::default()
            };
        };

        let daytime =
            |minutes: &u32| !is_hour_in_range(minutes / 60, night.start_hour, night.end_hour);
        let last_nap_end = summary
            .nap_segments
            .iter()
            .filter(|s| !s.crosses_midnight() && daytime(&s.start))
            .map(|s| s.end)
            .max();
        let day_feeds = || summary.feed_times.iter().copied().filter(daytime);
        let first_logged = summary
            .nap_segments
            .iter()
            .map(|s| s.start)
            .filter(daytime)
            .chain(day_feeds())
            .min();

        Self {
            morning_wake: morning_wake(Some(summary), yesterday),
            last_nap_end,
            last_feed: summary.feed_times.iter().copied().max(),
            last_day_feed: day_feeds().max(),
            first_logged,
            day_sleep: summary.day_sleep_minutes,
            naps: summary.nap_segments.len() as u32,
        }
    }

    /// Most recent actual daytime event: wake, nap end or feed
    pub fn latest_event(&self) -> Option<u32> {
        [self.morning_wake, self.last_nap_end, self.last_day_feed]
            .into_iter()
            .flatten()
            .max()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NextEvent {
    Feed { at: u32, overdue: bool },
    Nap { at: u32, duration: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProjectionState {
    AwaitingFirstEvent,
    Projecting(NextEvent),
    Complete,
}

struct Projection<'a> {
    params: &'a AgeBasedParams,
    internals: &'a EngineInternals,
    rhythm: BlendedRhythm,
    today: &'a TodayAnchor,
    ceiling: Confidence,
    dst_downgrade: bool,
    bedtime: u32,
    anchor: u32,
    cursor: u32,
    last_feed: Option<u32>,
    day_sleep: u32,
    nap_slots: u32,
    events: Vec<ScheduleEvent>,
}

impl<'a> Projection<'a> {
    fn run(mut self) -> Vec<ScheduleEvent> {
        let mut state = ProjectionState::AwaitingFirstEvent;
        loop {
            state = match state {
                ProjectionState::AwaitingFirstEvent => {
                    self.emit_wake();
                    self.next_step()
                }
                ProjectionState::Projecting(NextEvent::Feed { at, overdue }) => {
                    self.emit_feed(at, overdue);
                    self.next_step()
                }
                ProjectionState::Projecting(NextEvent::Nap { at, duration }) => {
                    self.emit_nap(at, duration);
                    self.next_step()
                }
                ProjectionState::Complete => break,
            };
        }
        self.emit_bed();
        self.events
    }

    fn next_step(&self) -> ProjectionState {
        if self.events.len() >= MAX_EVENTS {
            return ProjectionState::Complete;
        }

        let floor = self.floor();
        let (feed_at, overdue) = match self.last_feed {
            Some(last) => {
                let due = last + self.rhythm.feed_interval.round() as u32;
                (due.max(self.cursor).max(floor), due < self.cursor)
            }
            None => (self.cursor.max(floor), false),
        };
        let feed_ok = feed_at < self.bedtime;

        match (feed_ok, self.plan_nap(floor)) {
            (true, Some((nap_at, _))) if feed_at <= nap_at + TIE_EPSILON_MINUTES => {
                ProjectionState::Projecting(NextEvent::Feed { at: feed_at, overdue })
            }
            (_, Some((at, duration))) => {
                ProjectionState::Projecting(NextEvent::Nap { at, duration })
            }
            (true, None) => ProjectionState::Projecting(NextEvent::Feed { at: feed_at, overdue }),
            (false, None) => ProjectionState::Complete,
        }
    }

    /// Next nap start and length, or `None` once naps are done for the day
    fn plan_nap(&self, floor: u32) -> Option<(u32, u32)> {
        if self.day_sleep as f64 >= self.rhythm.day_sleep_target
            || self.nap_slots >= MAX_NAP_SLOTS
        {
            return None;
        }
        let start = (self.cursor + self.rhythm.wake_window.round() as u32).max(floor);
        let latest_end = self.bedtime.checked_sub(self.params.wake_window_min)?;
        let available = latest_end.checked_sub(start)?;
        let duration = (self.rhythm.nap_duration.round() as u32).min(available);
        (duration >= self.params.nap_duration_floor).then_some((start, duration))
    }

    fn floor(&self) -> u32 {
        self.events
            .last()
            .map(|e| e.minutes + MIN_EVENT_GAP_MINUTES)
            .unwrap_or(0)
    }

    fn confidence_at(&self, minutes: u32) -> Confidence {
        let mut confidence = self.ceiling;
        if minutes > self.anchor + HORIZON_MINUTES {
            confidence = confidence.downgrade();
        }
        if self.dst_downgrade {
            confidence = confidence.downgrade();
        }
        confidence
    }

    fn push(
        &mut self,
        minutes: u32,
        event_type: ScheduleEventType,
        duration: Option<u32>,
        reasoning: String,
    ) {
        let confidence = self.confidence_at(minutes);
        self.events.push(ScheduleEvent {
            time: format_minutes_to_time(minutes as i64, false),
            minutes,
            event_type,
            duration,
            confidence,
            reasoning,
            actual_time: None,
            actual_duration: None,
        });
    }

    fn emit_wake(&mut self) {
        let (wake, reasoning) = match self.today.morning_wake {
            Some(actual) => (actual, format!("logged wake-up at {}", clock(actual))),
            None => {
                let predicted = self.rhythm.morning_wake.round() as u32;
                let wake = self.today.first_logged.map_or(predicted, |first| predicted.min(first));
                let reasoning = if self.internals.median_morning_wake.is_some()
                    && self.internals.blend.learned_dominates()
                {
                    format!("your baby usually wakes around {}", clock(wake))
                } else {
                    format!("typical wake-up at the end of the night around {}", clock(wake))
                };
                (wake, reasoning)
            }
        };

        match self.today.latest_event() {
            Some(latest) => self.cursor = latest.max(wake),
            None => {
                self.anchor = wake;
                self.cursor = wake;
            }
        }
        self.push(wake, ScheduleEventType::Wake, None, reasoning);
    }

    fn emit_feed(&mut self, at: u32, overdue: bool) {
        let interval = duration_label(self.rhythm.feed_interval);
        let reasoning = match self.last_feed {
            None => "first feed after waking".to_string(),
            Some(_) if overdue => format!("feed on waking; about {} since the last feed", interval),
            Some(_) => self.blend_reason(
                self.internals.median_feed_interval.is_some(),
                format!("about {} after the last feed, your baby's usual interval", interval),
                format!("about {} after the last feed", interval),
            ),
        };
        self.push(at, ScheduleEventType::Feed, None, reasoning);
        self.last_feed = Some(at);
    }

    fn emit_nap(&mut self, at: u32, duration: u32) {
        let window = duration_label(self.rhythm.wake_window);
        let reasoning = self.blend_reason(
            self.internals.median_wake_window.is_some(),
            format!("based on your baby's typical {} wake window", window),
            format!(
                "based on a typical {} wake window for {}",
                window,
                self.params.age_label()
            ),
        );
        self.push(at, ScheduleEventType::Nap, Some(duration), reasoning);
        self.day_sleep += duration;
        self.nap_slots += 1;
        self.cursor = at + duration;
    }

    fn emit_bed(&mut self) {
        let floor = self.floor();
        let bed = self.bedtime.max(floor).min(MINUTES_PER_DAY - 1);
        let band = format!(
            "{}-{}",
            clock(self.params.bedtime_earliest),
            clock(self.params.bedtime_latest)
        );
        let reasoning = match self.internals.median_bedtime {
            Some(learned) if self.internals.blend.learned_weight > 0.0 => format!(
                "bedtime window {} for {}, shifted toward your baby's usual {}",
                band,
                self.params.age_label(),
                clock(learned.round() as u32)
            ),
            _ => format!("bedtime window {} for {}", band, self.params.age_label()),
        };
        self.push(bed, ScheduleEventType::Bed, None, reasoning);
    }

    /// Reasoning text naming whichever source dominated the blend
    fn blend_reason(&self, has_learned: bool, learned: String, age: String) -> String {
        let blend = self.internals.blend;
        if !has_learned || blend.learned_weight == 0.0 {
            age
        } else if blend.learned_dominates() {
            learned
        } else {
            format!("{} (blending age norms with your baby's history)", age)
        }
    }
}

fn clock(minutes: u32) -> String {
    format_minutes_to_time(minutes as i64, false)
}

/// "2h 30m", "45m", "3h"
pub fn duration_label(minutes: f64) -> String {
    let total = minutes.round().max(0.0) as u32;
    match (total / 60, total % 60) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

fn based_on(internals: &EngineInternals) -> String {
    let days = internals.days_in_history;
    if days == 0 {
        return AGE_BASED_DEFAULTS.to_string();
    }
    let plural = if days == 1 { "day" } else { "days" };
    match internals.data_stability {
        DataStability::Sparse => format!(
            "{} with {} {} of limited history",
            AGE_BASED_DEFAULTS, days, plural
        ),
        DataStability::Unstable => format!("age norms blended with {} {} of history", days, plural),
        DataStability::Stable => format!("{} {} of your baby's history", days, plural),
    }
}

/// Learned statistics from the trailing window of complete days before `today`
pub fn learned_internals(
    summaries: &[DailySummary],
    today: NaiveDate,
    window_days: usize,
) -> EngineInternals {
    let window_start = today
        .checked_sub_days(Days::new(window_days as u64))
        .unwrap_or(NaiveDate::MIN);
    let history = summaries
        .iter()
        .filter(|s| s.date.is_some_and(|d| d >= window_start && d < today))
        .cloned();
    BaselineStore::from_summaries(window_days, history).internals()
}

/// Predict today's schedule.
///
/// `now` fixes both the predicted day and the viewer's timezone. The only
/// error is an invalid configuration; any activity history, including an
/// empty one, yields a schedule.
pub fn predict_schedule<Tz: TimeZone>(
    activities: &[Activity],
    birth_date: NaiveDate,
    config: &EngineConfig,
    now: &DateTime<Tz>,
) -> Result<PredictedSchedule, ComputeError> {
    config.validate()?;

    let tz = now.timezone();
    let today = now.date_naive();
    let now_utc = now.with_timezone(&Utc);
    let night_window = config.night_window();

    let summaries = aggregate_by_day(activities, &night_window, &tz, now_utc);
    let internals = learned_internals(&summaries, today, config.history_window_days);

    let find =
        |date: Option<NaiveDate>| summaries.iter().find(|s| date.is_some() && s.date == date);
    let anchor = TodayAnchor::from_summaries(
        find(Some(today)),
        find(today.pred_opt()),
        &night_window,
    );

    let params = AgeBasedParams::for_age_days_clamped((today - birth_date).num_days());
    let rhythm = BlendedRhythm::new(&params, &internals, night_window.end_hour);

    let ceiling = if internals.days_in_history == 0 {
        Confidence::Medium
    } else {
        Confidence::ceiling_for(internals.data_stability)
    };
    let dst_downgrade = is_dst_transition_day(&tz, today)
        || today.pred_opt().is_some_and(|y| is_dst_transition_day(&tz, y));

    let projection = Projection {
        params: &params,
        internals: &internals,
        rhythm,
        today: &anchor,
        ceiling,
        dst_downgrade,
        bedtime: rhythm.bedtime.round() as u32,
        anchor: anchor.latest_event().unwrap_or(0),
        cursor: 0,
        last_feed: anchor.last_feed,
        day_sleep: anchor.day_sleep,
        nap_slots: anchor.naps,
        events: Vec::new(),
    };
    let events = projection.run();

    let confidence = events
        .iter()
        .map(|e| e.confidence)
        .min()
        .unwrap_or(Confidence::Low);

    debug!(
        %today,
        events = events.len(),
        stability = ?internals.data_stability,
        ?confidence,
        dst_downgrade,
        "predicted schedule"
    );

    Ok(PredictedSchedule {
        date: today,
        events,
        confidence,
        based_on: based_on(&internals),
        accuracy_score: None,
        last_updated: now_utc,
        internals,
    })
}
