//! Per-player session tracking across polls.
//!
//! Sessions are keyed by the player's server id. A player who drops off the
//! list keeps their session: the elapsed time is folded into `total_time` and
//! the session is re-anchored, so a reconnecting player carries their total
//! forward. Sessions idle for longer than the configured TTL are evicted.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeDelta, Utc};

use crate::models::{PlayerSnapshot, TrackedPlayer};

/// Timing state of one player id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSession {
    /// Anchor of the current session
    pub join_time: DateTime<Utc>,
    /// Minutes accumulated before `join_time`
    pub total_time: i64,
    /// Last poll in which the player was listed
    pub last_seen: DateTime<Utc>,
}

impl PlayerSession {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            join_time: now,
            total_time: 0,
            last_seen: now,
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionTracker {
    sessions: HashMap<u64, PlayerSession>,
    /// Stable identifiers of every player ever observed. Never shrinks.
    unique_players: HashSet<String>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a fresh player list into the tracked sessions and return the
    /// enriched players, in upstream order.
    pub fn reconcile(&mut self, snapshot: &[PlayerSnapshot], now: DateTime<Utc>) -> Vec<TrackedPlayer> {
        let mut present = HashSet::with_capacity(snapshot.len());
        let mut players = Vec::with_capacity(snapshot.len());

        for (index, raw) in snapshot.iter().enumerate() {
            let position = index as u64 + 1;
            let id = raw.id.filter(|id| *id != 0).unwrap_or(position);
            let identifiers = raw.identifiers.clone().unwrap_or_default();
            let identifier = identifiers
                .first()
                .cloned()
                .unwrap_or_else(|| format!("player_{id}"));

            present.insert(id);
            self.unique_players.insert(identifier);

            let session = self
                .sessions
                .entry(id)
                .or_insert_with(|| PlayerSession::new(now));
            session.last_seen = now;
            let session_duration = elapsed_minutes(session.join_time, now);

            players.push(TrackedPlayer {
                id,
                name: raw
                    .name
                    .clone()
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| format!("Player {position}")),
                ping: raw.ping.unwrap_or(0),
                identifiers,
                endpoint: raw
                    .endpoint
                    .clone()
                    .filter(|endpoint| !endpoint.is_empty())
                    .unwrap_or_else(|| "Unknown".to_string()),
                session_duration,
                total_time: session.total_time + session_duration,
            });
        }

        for (id, session) in self.sessions.iter_mut() {
            if !present.contains(id) {
                session.total_time += elapsed_minutes(session.join_time, now);
                session.join_time = now;
            }
        }

        players
    }

    /// Drop sessions whose player has not been listed for longer than `ttl`.
    /// Returns the number of sessions removed.
    pub fn evict_idle(&mut self, now: DateTime<Utc>, ttl: TimeDelta) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| now.signed_duration_since(session.last_seen) <= ttl);
        before - self.sessions.len()
    }

    pub fn session(&self, id: u64) -> Option<&PlayerSession> {
        self.sessions.get(&id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of distinct players ever observed.
    pub fn unique_players(&self) -> usize {
        self.unique_players.len()
    }
}

/// Whole minutes between `since` and `now`, never negative.
fn elapsed_minutes(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    now.signed_duration_since(since).num_minutes().max(0)
}
