//! Learned baselines
//!
//! This module learns an individual baby's rhythm from the trailing window of
//! daily summaries: medians and spread of wake windows, feed intervals and
//! day sleep, a data-stability tier, and the blend ratio between those learned
//! values and the age-based norms.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::features::{bedtime, morning_wake};
use crate::types::{BlendRatio, DailySummary, DataStability, EngineInternals};

/// Default history window in days
pub const DEFAULT_HISTORY_WINDOW: usize = 7;

/// Longest history window a configuration may ask for (days)
pub const MAX_HISTORY_WINDOW: usize = 365;

/// Fewer wake-window samples than this is `sparse`
pub const MIN_STABLE_SAMPLES: usize = 3;

/// Coefficient of variation above which data is `unstable`
pub const MAX_STABLE_CV: f64 = 0.35;

/// Sample count at which the blend weight saturates within a tier
pub const SATURATION_SAMPLES: usize = 15;

/// Rolling store of the most recent daily summaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineStore {
    /// Daily summaries, oldest first
    days: VecDeque<DailySummary>,
    /// Maximum window size (days)
    window_size: usize,
}

impl Default for BaselineStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW)
    }
}

impl BaselineStore {
    /// Create a new baseline store with specified window size
    pub fn new(window_size: usize) -> Self {
        Self {
            days: VecDeque::with_capacity(window_size.min(MAX_HISTORY_WINDOW)),
            window_size,
        }
    }

    /// Build a store from summaries, keeping the last `window_size` of them
    pub fn from_summaries<I>(window_size: usize, summaries: I) -> Self
    where
        I: IntoIterator<Item = DailySummary>,
    {
        let mut store = Self::new(window_size);
        for summary in summaries {
            store.push(summary);
        }
        store
    }

    /// Append a day, dropping the oldest beyond the window
    pub fn push(&mut self, summary: DailySummary) {
        self.days.push_back(summary);
        while self.days.len() > self.window_size {
            self.days.pop_front();
        }
    }

    pub fn days(&self) -> impl Iterator<Item = &DailySummary> {
        self.days.iter()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Learned statistics over the current window
    pub fn internals(&self) -> EngineInternals {
        let days: Vec<&DailySummary> = self.days.iter().collect();
        estimate(&days)
    }

    /// Load baseline store from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize baseline store to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Estimate learned statistics from daily summaries (oldest first)
pub fn estimate(days: &[&DailySummary]) -> EngineInternals {
    let wake_windows: Vec<f64> = days
        .iter()
        .flat_map(|d| d.wake_windows.iter().map(|&w| w as f64))
        .collect();
    let feed_intervals: Vec<f64> = days
        .iter()
        .flat_map(|d| d.feed_intervals.iter().map(|&i| i as f64))
        .collect();
    let day_sleep: Vec<f64> = days
        .iter()
        .filter(|d| !d.nap_segments.is_empty())
        .map(|d| d.day_sleep_minutes as f64)
        .collect();
    let nap_durations: Vec<f64> = days
        .iter()
        .flat_map(|d| d.nap_segments.iter().map(|s| s.duration_minutes as f64))
        .collect();
    let bedtimes: Vec<f64> = days.iter().filter_map(|d| bedtime(d)).map(f64::from).collect();

    let mut morning_wakes = Vec::new();
    for (i, day) in days.iter().enumerate() {
        let previous = i
            .checked_sub(1)
            .map(|p| days[p])
            .filter(|prev| match (prev.date, day.date) {
                (Some(prev_date), Some(date)) => prev_date.succ_opt() == Some(date),
                _ => false,
            });
        if let Some(wake) = morning_wake(Some(*day), previous) {
            morning_wakes.push(wake as f64);
        }
    }

    let median_wake_window = median(&wake_windows);
    let wake_window_std_dev = std_dev(&wake_windows);
    let data_stability = classify_stability(&wake_windows);
    let blend = BlendRatio::from_learned_weight(learned_weight(data_stability, wake_windows.len()));

    let internals = EngineInternals {
        median_wake_window,
        median_feed_interval: median(&feed_intervals),
        median_day_sleep: median(&day_sleep),
        median_nap_duration: median(&nap_durations),
        median_bedtime: median(&bedtimes),
        median_morning_wake: median(&morning_wakes),
        wake_window_std_dev,
        feed_interval_std_dev: std_dev(&feed_intervals),
        day_sleep_std_dev: std_dev(&day_sleep),
        wake_window_samples: wake_windows.len(),
        feed_interval_samples: feed_intervals.len(),
        days_in_history: days.len(),
        data_stability,
        blend,
    };

    debug!(
        days = internals.days_in_history,
        wake_window_samples = internals.wake_window_samples,
        stability = ?internals.data_stability,
        learned_weight = internals.blend.learned_weight,
        "estimated learned baselines"
    );
    internals
}

/// Stability tier from sample count and coefficient of variation
pub fn classify_stability(samples: &[f64]) -> DataStability {
    if samples.len() < MIN_STABLE_SAMPLES {
        return DataStability::Sparse;
    }
    match coefficient_of_variation(samples) {
        Some(cv) if cv <= MAX_STABLE_CV => DataStability::Stable,
        _ => DataStability::Unstable,
    }
}

/// Weight given to learned values.
///
/// Sparse data gets none. Unstable data moves from 0.40 to 0.50 and stable
/// data from 0.80 to 0.95 as samples grow from 3 to 15, then saturates.
pub fn learned_weight(stability: DataStability, samples: usize) -> f64 {
    let span = (SATURATION_SAMPLES - MIN_STABLE_SAMPLES) as f64;
    let progress = (samples.saturating_sub(MIN_STABLE_SAMPLES) as f64 / span).min(1.0);
    match stability {
        DataStability::Sparse => 0.0,
        DataStability::Unstable => 0.40 + 0.10 * progress,
        DataStability::Stable => 0.80 + 0.15 * progress,
    }
}

/// Median; mean of the middle pair for even counts
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt())
}

/// Standard deviation over median
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    match (std_dev(values), median(values)) {
        (Some(sd), Some(med)) if med > 0.0 => Some(sd / med),
        _ => None,
    }
}
