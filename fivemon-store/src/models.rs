use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};

use crate::history::{HistorySeries, Period};
use crate::stats::ServerStats;

/// One entry of the upstream `players.json` array.
///
/// Every field is optional on the wire; missing values are filled in when the
/// player is tracked. Deserialization never fails: a field of the wrong shape
/// reads as missing, so one odd entry cannot reject the whole array.
#[derive(Debug, Clone, Default)]
pub struct PlayerSnapshot {
  pub id: Option<u64>,
  pub name: Option<String>,
  pub ping: Option<u32>,
  pub identifiers: Option<Vec<String>>,
  pub endpoint: Option<String>,
}

impl PlayerSnapshot {
  /// Read whatever fields of `value` are usable.
  pub fn from_value(value: &Value) -> Self {
    let field = |key: &str| value.get(key).unwrap_or(&Value::Null);
    Self {
      id: whole_number(field("id")),
      name: field("name").as_str().map(str::to_string),
      ping: whole_number(field("ping")).map(|ping| ping.min(u64::from(u32::MAX)) as u32),
      identifiers: field("identifiers").as_array().map(|ids| {
        ids
          .iter()
          .filter_map(|id| id.as_str().map(str::to_string))
          .collect()
      }),
      endpoint: field("endpoint").as_str().map(str::to_string),
    }
  }
}

impl<'de> Deserialize<'de> for PlayerSnapshot {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    Value::deserialize(deserializer).map(|value| Self::from_value(&value))
  }
}

/// Non-negative number, truncated; numeric strings are accepted too.
fn whole_number(value: &Value) -> Option<u64> {
  match value {
    Value::Number(n) => n.as_u64().or_else(|| {
      n.as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0)
        .map(|f| f as u64)
    }),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

/// A connected player enriched with session timing (minutes).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedPlayer {
  pub id: u64,
  pub name: String,
  pub ping: u32,
  pub identifiers: Vec<String>,
  pub endpoint: String,
  /// Minutes since the current session was anchored
  pub session_duration: i64,
  /// Accumulated minutes across every session, including the current one
  pub total_time: i64,
}

/// One point of the player-count time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySample {
  pub timestamp: DateTime<Utc>,
  pub player_count: usize,
}

impl HistorySample {
  pub fn new(timestamp: DateTime<Utc>, player_count: usize) -> Self {
    Self {
      timestamp,
      player_count,
    }
  }
}

/// Settled result of one poll. A `None` field means that source failed.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
  pub players: Option<Vec<PlayerSnapshot>>,
  pub info: Option<Value>,
  pub dynamic: Option<Value>,
}

impl Snapshot {
  /// True when none of the three sources produced data.
  pub fn is_empty(&self) -> bool {
    self.players.is_none() && self.info.is_none() && self.dynamic.is_none()
  }
}

/// What a successful poll changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSummary {
  pub players_updated: bool,
  pub info_updated: bool,
  pub dynamic_updated: bool,
  pub player_count: usize,
  pub history_len: usize,
  pub evicted_sessions: usize,
}

/// Current player list.
#[derive(Debug, Clone)]
pub struct PlayersView {
  pub players: Vec<TrackedPlayer>,
  pub last_update: Option<DateTime<Utc>>,
}

/// Everything the dashboard needs in one read.
#[derive(Debug, Clone)]
pub struct Overview {
  pub online: bool,
  pub last_update: Option<DateTime<Utc>>,
  pub players: Vec<TrackedPlayer>,
  pub info: Value,
  pub dynamic: Value,
  /// Most recent samples, oldest first
  pub history: Vec<HistorySample>,
  pub stats: ServerStats,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
  pub online: bool,
  pub players: usize,
  pub last_update: Option<DateTime<Utc>>,
  /// Seconds since the monitor started
  pub uptime_secs: i64,
}

#[derive(Debug, Clone)]
pub struct SearchResults {
  /// Normalized (trimmed, lowercased) query
  pub query: String,
  pub results: Vec<TrackedPlayer>,
  /// Number of players searched
  pub total: usize,
}

/// Answer to a windowed history query.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
  pub period: Period,
  pub from: DateTime<Utc>,
  pub to: DateTime<Utc>,
  pub series: HistorySeries,
}

/// Build the exposed server info from the raw `info.json` payload.
///
/// Derived fields come first and raw fields override them on collision.
pub fn normalize_server_info(raw: Value) -> Value {
  let vars = raw.get("vars");
  let var = |key: &str| {
    vars
      .and_then(|vars| vars.get(key))
      .filter(|value| is_present(value))
      .cloned()
  };
  let field = |key: &str| raw.get(key).filter(|value| is_present(value)).cloned();

  let mut info = Map::new();
  info.insert(
    "hostname".to_string(),
    var("sv_projectName")
      .or_else(|| var("sv_hostname"))
      .unwrap_or_else(|| json!("FiveM Server")),
  );
  info.insert(
    "version".to_string(),
    field("version").unwrap_or_else(|| json!("Unknown")),
  );
  info.insert(
    "description".to_string(),
    var("sv_projectDesc").unwrap_or_else(|| json!("")),
  );
  info.insert(
    "maxClients".to_string(),
    var("sv_maxClients").unwrap_or_else(|| json!("48")),
  );
  info.insert(
    "resources".to_string(),
    field("resources").unwrap_or_else(|| json!([])),
  );

  if let Value::Object(fields) = raw {
    info.extend(fields);
  }
  Value::Object(info)
}

/// Loose presence check: null, false, 0 and "" count as missing.
fn is_present(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(b) => *b,
    Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
    Value::String(s) => !s.is_empty(),
    _ => true,
  }
}
