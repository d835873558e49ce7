mod error;
pub mod history;
mod models;
pub mod sessions;
pub mod stats;

pub use error::{Result, StoreError};
pub use history::{HistorySeries, HistoryStore, Period};
pub use models::{
  HistorySample, HistoryWindow, Overview, PlayerSnapshot, PlayersView, PollSummary, SearchResults,
  Snapshot, StatusView, TrackedPlayer, normalize_server_info,
};
pub use sessions::SessionTracker;
pub use stats::{ServerStats, StatsAggregator};

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Samples included in the dashboard overview.
pub const OVERVIEW_HISTORY_POINTS: usize = 48;
/// Shortest accepted search query, in characters.
pub const MIN_SEARCH_LEN: usize = 2;

/// Limits applied by the store.
#[derive(Debug, Clone, Copy)]
pub struct StoreSettings {
  /// Maximum age of a history sample
  pub retention: TimeDelta,
  /// Maximum number of history samples
  pub max_points: usize,
  /// Idle time after which a disconnected player's session is dropped
  pub session_ttl: TimeDelta,
  /// The server counts as online if the last successful poll is younger than this
  pub online_window: TimeDelta,
}

impl Default for StoreSettings {
  fn default() -> Self {
    Self {
      retention: TimeDelta::days(history::RETENTION_DAYS),
      max_points: history::MAX_POINTS,
      session_ttl: TimeDelta::days(30),
      online_window: TimeDelta::seconds(120),
    }
  }
}

struct MonitorState {
  players: Vec<TrackedPlayer>,
  info: Value,
  dynamic: Value,
  last_update: Option<DateTime<Utc>>,
  sessions: SessionTracker,
  history: HistoryStore,
  stats: StatsAggregator,
}

impl MonitorState {
  fn is_online(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
    self
      .last_update
      .is_some_and(|last| now.signed_duration_since(last) < window)
  }
}

/// Shared handle to all monitor state.
///
/// Polls mutate under the write lock; every read clones what it needs out of
/// the read lock, so callers always see the state of one whole poll.
#[derive(Clone)]
pub struct Store {
  state: Arc<RwLock<MonitorState>>,
  settings: StoreSettings,
}

impl Store {
  pub fn new(started_at: DateTime<Utc>) -> Self {
    Self::with_settings(StoreSettings::default(), started_at)
  }

  pub fn with_settings(settings: StoreSettings, started_at: DateTime<Utc>) -> Self {
    let state = MonitorState {
      players: Vec::new(),
      info: json!({}),
      dynamic: json!({}),
      last_update: None,
      sessions: SessionTracker::new(),
      history: HistoryStore::with_limits(settings.retention, settings.max_points),
      stats: StatsAggregator::new(started_at),
    };
    Self {
      state: Arc::new(RwLock::new(state)),
      settings,
    }
  }

  pub fn settings(&self) -> &StoreSettings {
    &self.settings
  }

  // ========================================================================
  // Writes
  // ========================================================================

  /// Apply one poll's results.
  ///
  /// Sources missing from the snapshot keep their previous value. Returns
  /// `None` without touching anything when every source failed.
  pub async fn apply_snapshot(&self, snapshot: Snapshot, now: DateTime<Utc>) -> Option<PollSummary> {
    if snapshot.is_empty() {
      return None;
    }

    let mut guard = self.state.write().await;
    let state = &mut *guard;
    let mut summary = PollSummary::default();

    if let Some(raw_players) = snapshot.players {
      state.players = state.sessions.reconcile(&raw_players, now);
      summary.evicted_sessions = state.sessions.evict_idle(now, self.settings.session_ttl);
      summary.players_updated = true;
    }
    if let Some(info) = snapshot.info {
      state.info = normalize_server_info(info);
      summary.info_updated = true;
    }
    if let Some(dynamic) = snapshot.dynamic {
      state.dynamic = dynamic;
      summary.dynamic_updated = true;
    }

    let count = state.players.len();
    state.last_update = Some(now);
    state.stats.update(count, state.sessions.unique_players());
    state.history.append(HistorySample::new(now, count));

    summary.player_count = count;
    summary.history_len = state.history.len();
    if summary.evicted_sessions > 0 {
      debug!(evicted = summary.evicted_sessions, "evicted idle sessions");
    }
    Some(summary)
  }

  /// Start a new statistics day. Returns the new peak baseline.
  pub async fn reset_daily(&self) -> usize {
    let mut state = self.state.write().await;
    let count = state.players.len();
    state.stats.reset_daily(count);
    info!(peak_today = count, "daily statistics reset");
    count
  }

  // ========================================================================
  // Reads
  // ========================================================================

  pub async fn players(&self) -> PlayersView {
    let state = self.state.read().await;
    PlayersView {
      players: state.players.clone(),
      last_update: state.last_update,
    }
  }

  pub async fn overview(&self, now: DateTime<Utc>) -> Overview {
    let state = self.state.read().await;
    Overview {
      online: state.is_online(now, self.settings.online_window),
      last_update: state.last_update,
      players: state.players.clone(),
      info: state.info.clone(),
      dynamic: state.dynamic.clone(),
      history: state.history.recent(OVERVIEW_HISTORY_POINTS),
      stats: state.stats.stats().clone(),
    }
  }

  pub async fn status(&self, now: DateTime<Utc>) -> StatusView {
    let state = self.state.read().await;
    StatusView {
      online: state.is_online(now, self.settings.online_window),
      players: state.players.len(),
      last_update: state.last_update,
      uptime_secs: state.stats.uptime_secs(now),
    }
  }

  pub async fn stats(&self) -> ServerStats {
    self.state.read().await.stats.stats().clone()
  }

  /// Case-insensitive match on player name, or substring match on the id.
  pub async fn search(&self, query: &str) -> Result<SearchResults> {
    let needle = query.trim().to_lowercase();
    if needle.chars().count() < MIN_SEARCH_LEN {
      return Err(StoreError::QueryTooShort {
        min: MIN_SEARCH_LEN,
      });
    }

    let state = self.state.read().await;
    let results = state
      .players
      .iter()
      .filter(|player| {
        player.name.to_lowercase().contains(&needle) || player.id.to_string().contains(&needle)
      })
      .cloned()
      .collect();

    Ok(SearchResults {
      query: needle,
      results,
      total: state.players.len(),
    })
  }

  pub async fn history(&self, period: Period, now: DateTime<Utc>) -> HistoryWindow {
    let state = self.state.read().await;
    let series = state.history.query(period, now, state.players.len());
    HistoryWindow {
      period,
      from: now - period.lookback(),
      to: now,
      series,
    }
  }

  pub async fn history_len(&self) -> usize {
    self.state.read().await.history.len()
  }
}
