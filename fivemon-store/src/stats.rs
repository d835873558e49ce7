use chrono::{DateTime, Utc};
use serde::Serialize;

/// Derived server statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStats {
    /// Highest player count since the last daily reset
    pub peak_today: usize,
    /// Distinct players seen since startup
    pub total_connections: usize,
    /// When monitoring started
    #[serde(rename = "uptime")]
    pub uptime_start: DateTime<Utc>,
}

#[derive(Debug)]
pub struct StatsAggregator {
    stats: ServerStats,
}

impl StatsAggregator {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            stats: ServerStats {
                peak_today: 0,
                total_connections: 0,
                uptime_start: started_at,
            },
        }
    }

    /// Fold in the player count of a successful poll.
    pub fn update(&mut self, current_count: usize, unique_players: usize) {
        self.stats.peak_today = self.stats.peak_today.max(current_count);
        self.stats.total_connections = self.stats.total_connections.max(unique_players);
    }

    /// Start a new day with the current count as its baseline.
    pub fn reset_daily(&mut self, current_count: usize) {
        self.stats.peak_today = current_count;
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    pub fn uptime_secs(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.stats.uptime_start)
            .num_seconds()
            .max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_peak_only_rises_between_resets() {
        let mut stats = StatsAggregator::new(start());
        let mut last_peak = 0;
        for count in [3, 7, 2, 9, 0, 5] {
            stats.update(count, 0);
            assert!(stats.stats().peak_today >= last_peak);
            last_peak = stats.stats().peak_today;
        }
        assert_eq!(last_peak, 9);
    }

    #[test]
    fn test_reset_uses_current_count_as_baseline() {
        let mut stats = StatsAggregator::new(start());
        stats.update(20, 0);
        stats.reset_daily(4);
        assert_eq!(stats.stats().peak_today, 4);

        stats.update(2, 0);
        assert_eq!(stats.stats().peak_today, 4);
        stats.update(6, 0);
        assert_eq!(stats.stats().peak_today, 6);
    }

    #[test]
    fn test_total_connections_is_monotonic() {
        let mut stats = StatsAggregator::new(start());
        stats.update(1, 5);
        stats.update(1, 3);
        assert_eq!(stats.stats().total_connections, 5);
        stats.update(1, 8);
        assert_eq!(stats.stats().total_connections, 8);
    }

    #[test]
    fn test_uptime() {
        let stats = StatsAggregator::new(start());
        assert_eq!(stats.uptime_secs(start() + TimeDelta::seconds(90)), 90);
    }

    #[test]
    fn test_stats_serialize_with_uptime_key() {
        let stats = StatsAggregator::new(start());
        let value = serde_json::to_value(stats.stats()).unwrap();
        assert_eq!(value["peakToday"], 0);
        assert_eq!(value["totalConnections"], 0);
        assert!(value["uptime"].is_string());
    }
}
