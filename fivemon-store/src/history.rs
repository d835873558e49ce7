//! Bounded player-count history.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::error::StoreError;
use crate::models::HistorySample;

/// 30 days of samples at one per 30 seconds.
pub const MAX_POINTS: usize = 86_400;
pub const RETENTION_DAYS: i64 = 30;

/// Lookback window of a history query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Period {
    #[default]
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl Period {
    pub fn lookback(self) -> TimeDelta {
        match self {
            Period::Day => TimeDelta::hours(24),
            Period::Week => TimeDelta::days(7),
            Period::Month => TimeDelta::days(30),
        }
    }

    /// Spacing and count of placeholder points when there is no real data.
    fn synthetic_layout(self) -> (TimeDelta, i32) {
        match self {
            Period::Day => (TimeDelta::hours(1), 24),
            Period::Week => (TimeDelta::days(1), 7),
            Period::Month => (TimeDelta::days(1), 30),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Day => "24h",
            Period::Week => "7d",
            Period::Month => "30d",
        }
    }
}

impl FromStr for Period {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "24h" => Ok(Period::Day),
            "7d" => Ok(Period::Week),
            "30d" => Ok(Period::Month),
            other => Err(StoreError::UnknownPeriod(other.to_string())),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Samples returned by a history query, tagged by origin.
#[derive(Debug, Clone, PartialEq)]
pub enum HistorySeries {
    /// Recorded samples inside the window
    Real(Vec<HistorySample>),
    /// Placeholder points carrying the live count, generated when the window is empty
    Synthetic(Vec<HistorySample>),
}

impl HistorySeries {
    pub fn is_real(&self) -> bool {
        matches!(self, HistorySeries::Real(_))
    }

    pub fn samples(&self) -> &[HistorySample] {
        match self {
            HistorySeries::Real(samples) | HistorySeries::Synthetic(samples) => samples,
        }
    }

    pub fn into_samples(self) -> Vec<HistorySample> {
        match self {
            HistorySeries::Real(samples) | HistorySeries::Synthetic(samples) => samples,
        }
    }
}

/// Append-only time series, oldest first.
///
/// Every append prunes samples older than the retention window (relative to
/// the new sample), then trims the oldest samples down to `max_points`.
#[derive(Debug)]
pub struct HistoryStore {
    samples: VecDeque<HistorySample>,
    retention: TimeDelta,
    max_points: usize,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::with_limits(TimeDelta::days(RETENTION_DAYS), MAX_POINTS)
    }

    pub fn with_limits(retention: TimeDelta, max_points: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            retention,
            max_points,
        }
    }

    pub fn append(&mut self, sample: HistorySample) {
        let horizon = sample.timestamp - self.retention;
        self.samples.push_back(sample);

        while self
            .samples
            .front()
            .is_some_and(|oldest| oldest.timestamp < horizon)
        {
            self.samples.pop_front();
        }

        if self.samples.len() > self.max_points {
            let excess = self.samples.len() - self.max_points;
            self.samples.drain(..excess);
        }
    }

    /// Samples with `timestamp >= now - period`, or a synthetic series at
    /// `live_count` when there are none.
    pub fn query(&self, period: Period, now: DateTime<Utc>, live_count: usize) -> HistorySeries {
        let cutoff = now - period.lookback();
        let start = self.samples.partition_point(|sample| sample.timestamp < cutoff);
        let samples: Vec<HistorySample> = self.samples.range(start..).copied().collect();

        if samples.is_empty() {
            HistorySeries::Synthetic(synthetic_series(period, now, live_count))
        } else {
            HistorySeries::Real(samples)
        }
    }

    /// The last `n` samples, oldest first.
    pub fn recent(&self, n: usize) -> Vec<HistorySample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn oldest(&self) -> Option<&HistorySample> {
        self.samples.front()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn synthetic_series(period: Period, now: DateTime<Utc>, live_count: usize) -> Vec<HistorySample> {
    let (step, points) = period.synthetic_layout();
    (0..points)
        .rev()
        .map(|i| HistorySample::new(now - step * i, live_count))
        .collect()
}
