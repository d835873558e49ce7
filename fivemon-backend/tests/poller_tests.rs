use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use fivemon_backend::fetcher::SnapshotFetcher;
use fivemon_backend::helpers;
use fivemon_backend::poller::{PollOutcome, Poller};
use fivemon_store::Store;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// What the fake game server answers. `None` means 503.
#[derive(Default)]
struct Upstream {
    players: Option<Value>,
    info: Option<Value>,
    dynamic: Option<Value>,
    /// Extra latency on info.json
    info_delay: Duration,
}

type Shared = Arc<Mutex<Upstream>>;

fn healthy_upstream() -> Upstream {
    Upstream {
        players: Some(json!([
            { "id": 7, "name": "Abby", "ping": 40, "identifiers": ["license:abby"], "endpoint": "10.0.0.7:1" },
            { "id": 12, "name": "Ben", "ping": 55, "identifiers": ["license:ben"] }
        ])),
        info: Some(json!({ "version": 6683, "vars": { "sv_projectName": "Test City RP" } })),
        dynamic: Some(json!({ "clients": 2, "hostname": "Test City" })),
        info_delay: Duration::ZERO,
    }
}

async fn respond(body: Option<Value>) -> Response {
    match body {
        Some(body) => Json(body).into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

async fn players_json(State(upstream): State<Shared>) -> Response {
    let body = upstream.lock().await.players.clone();
    respond(body).await
}

async fn info_json(State(upstream): State<Shared>) -> Response {
    let (body, delay) = {
        let upstream = upstream.lock().await;
        (upstream.info.clone(), upstream.info_delay)
    };
    tokio::time::sleep(delay).await;
    respond(body).await
}

async fn dynamic_json(State(upstream): State<Shared>) -> Response {
    let body = upstream.lock().await.dynamic.clone();
    respond(body).await
}

/// Helper to start a fake game server and return its base URL
async fn spawn_upstream(upstream: Shared) -> String {
    let app = Router::new()
        .route("/players.json", get(players_json))
        .route("/info.json", get(info_json))
        .route("/dynamic.json", get(dynamic_json))
        .with_state(upstream);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Helper to build a poller against `base_url`
fn setup_poller(base_url: String, timeout: Duration) -> (Poller, Store) {
    let store = Store::new(helpers::now());
    let fetcher = SnapshotFetcher::new(base_url, timeout).expect("Failed to build fetcher");
    let poller = Poller::new(store.clone(), fetcher, Duration::from_secs(30), 48);
    (poller, store)
}

// =============================================================================
// FETCHER TESTS
// =============================================================================

#[tokio::test]
async fn test_fetch_all_sources() {
    // GIVEN: A healthy game server
    let base_url = spawn_upstream(Arc::new(Mutex::new(healthy_upstream()))).await;
    let fetcher = SnapshotFetcher::new(base_url, Duration::from_secs(8)).unwrap();

    // WHEN: Fetching a snapshot
    let snapshot = fetcher.fetch().await;

    // THEN: All three sources are present
    let players = snapshot.players.unwrap();
    assert_eq!(players.len(), 2);
    assert_eq!(players[0].name.as_deref(), Some("Abby"));
    assert_eq!(players[1].endpoint, None);
    assert_eq!(snapshot.info.unwrap()["version"], 6683);
    assert_eq!(snapshot.dynamic.unwrap()["clients"], 2);
}

#[tokio::test]
async fn test_fetch_treats_null_body_as_missing() {
    // GIVEN: A game server answering `null` for info
    let upstream = Upstream {
        info: Some(Value::Null),
        ..healthy_upstream()
    };
    let base_url = spawn_upstream(Arc::new(Mutex::new(upstream))).await;
    let fetcher = SnapshotFetcher::new(base_url, Duration::from_secs(8)).unwrap();

    // WHEN: Fetching a snapshot
    let snapshot = fetcher.fetch().await;

    // THEN: Info is absent, the rest is present
    assert!(snapshot.info.is_none());
    assert!(snapshot.players.is_some());
    assert!(snapshot.dynamic.is_some());
}

#[tokio::test]
async fn test_fetch_keeps_players_with_malformed_entries() {
    // GIVEN: A game server reporting a fractional and a negative ping
    let upstream = Upstream {
        players: Some(json!([
            { "id": 7, "name": "Abby", "ping": 40.5 },
            { "id": 12, "name": "Ben", "ping": -1 }
        ])),
        ..healthy_upstream()
    };
    let base_url = spawn_upstream(Arc::new(Mutex::new(upstream))).await;
    let fetcher = SnapshotFetcher::new(base_url, Duration::from_secs(8)).unwrap();

    // WHEN: Fetching a snapshot
    let snapshot = fetcher.fetch().await;

    // THEN: The players source still succeeds
    let players = snapshot.players.unwrap();
    assert_eq!(players.len(), 2);
    assert_eq!(players[0].ping, Some(40));
    assert_eq!(players[1].name.as_deref(), Some("Ben"));
    assert_eq!(players[1].ping, None);
}

#[tokio::test]
async fn test_fetch_times_out_slow_source_only() {
    // GIVEN: info.json takes longer than the timeout
    let upstream = Upstream {
        info_delay: Duration::from_secs(3),
        ..healthy_upstream()
    };
    let base_url = spawn_upstream(Arc::new(Mutex::new(upstream))).await;
    let fetcher = SnapshotFetcher::new(base_url, Duration::from_millis(300)).unwrap();

    // WHEN: Fetching a snapshot
    let snapshot = fetcher.fetch().await;

    // THEN: Only info is missing
    assert!(snapshot.info.is_none());
    assert!(snapshot.players.is_some());
    assert!(snapshot.dynamic.is_some());
}

// =============================================================================
// POLLER TESTS
// =============================================================================

#[tokio::test]
async fn test_poll_updates_store() {
    // GIVEN: A healthy game server
    let base_url = spawn_upstream(Arc::new(Mutex::new(healthy_upstream()))).await;
    let (poller, store) = setup_poller(base_url, Duration::from_secs(8));

    // WHEN: Polling once
    let outcome = poller.poll_once().await;

    // THEN: Every source was applied
    let PollOutcome::Updated(summary) = outcome else {
        panic!("expected the poll to update the store");
    };
    assert!(summary.players_updated && summary.info_updated && summary.dynamic_updated);
    assert_eq!(summary.player_count, 2);

    let overview = store.overview(helpers::now()).await;
    assert!(overview.online);
    assert_eq!(overview.info["hostname"], "Test City RP");
    assert_eq!(overview.stats.total_connections, 2);
    assert_eq!(store.history_len().await, 1);
}

#[tokio::test]
async fn test_partial_failure_keeps_previous_values() {
    // GIVEN: A store populated by one healthy poll
    let upstream = Arc::new(Mutex::new(healthy_upstream()));
    let base_url = spawn_upstream(upstream.clone()).await;
    let (poller, store) = setup_poller(base_url, Duration::from_secs(8));
    poller.poll_once().await;

    // WHEN: Info and dynamic start failing while players change
    {
        let mut upstream = upstream.lock().await;
        upstream.info = None;
        upstream.dynamic = None;
        upstream.players = Some(json!([{ "id": 3, "name": "Cleo" }]));
    }
    let outcome = poller.poll_once().await;

    // THEN: Players are replaced and the failed sources keep their values
    let PollOutcome::Updated(summary) = outcome else {
        panic!("expected the poll to update the store");
    };
    assert!(summary.players_updated);
    assert!(!summary.info_updated && !summary.dynamic_updated);

    let overview = store.overview(helpers::now()).await;
    assert_eq!(overview.players.len(), 1);
    assert_eq!(overview.players[0].name, "Cleo");
    assert_eq!(overview.info["hostname"], "Test City RP");
    assert_eq!(overview.dynamic["clients"], 2);
    assert_eq!(overview.stats.peak_today, 2);
    assert_eq!(overview.stats.total_connections, 3);
}

#[tokio::test]
async fn test_total_failure_leaves_state_untouched() {
    // GIVEN: A store populated by one healthy poll
    let upstream = Arc::new(Mutex::new(healthy_upstream()));
    let base_url = spawn_upstream(upstream.clone()).await;
    let (poller, store) = setup_poller(base_url, Duration::from_secs(8));
    poller.poll_once().await;
    let before = store.players().await;

    // WHEN: Every source fails
    *upstream.lock().await = Upstream::default();
    let outcome = poller.poll_once().await;

    // THEN: Nothing changes
    assert_eq!(outcome, PollOutcome::NoData);
    let after = store.players().await;
    assert_eq!(after.players, before.players);
    assert_eq!(after.last_update, before.last_update);
    assert_eq!(store.history_len().await, 1);
}

#[tokio::test]
async fn test_unreachable_upstream_is_no_data() {
    // GIVEN: Nothing listening on the upstream port
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let (poller, store) = setup_poller(format!("http://{}", addr), Duration::from_secs(2));

    // WHEN: Polling
    let outcome = poller.poll_once().await;

    // THEN: The poll is a no-op
    assert_eq!(outcome, PollOutcome::NoData);
    assert!(store.players().await.last_update.is_none());
}

#[tokio::test]
async fn test_overlapping_poll_is_skipped() {
    // GIVEN: A slow game server
    let upstream = Upstream {
        info_delay: Duration::from_millis(500),
        ..healthy_upstream()
    };
    let base_url = spawn_upstream(Arc::new(Mutex::new(upstream))).await;
    let (poller, store) = setup_poller(base_url, Duration::from_secs(8));

    // WHEN: A second poll starts while the first is in flight
    let first = {
        let poller = poller.clone();
        tokio::spawn(async move { poller.poll_once().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = poller.poll_once().await;

    // THEN: The second is skipped and the first completes
    assert_eq!(second, PollOutcome::Skipped);
    assert!(matches!(first.await.unwrap(), PollOutcome::Updated(_)));
    assert_eq!(store.history_len().await, 1);

    // AND: The guard is released afterwards
    assert!(matches!(poller.poll_once().await, PollOutcome::Updated(_)));
}

#[tokio::test]
async fn test_run_polls_until_cancelled() {
    // GIVEN: A poller on a short interval
    let base_url = spawn_upstream(Arc::new(Mutex::new(healthy_upstream()))).await;
    let store = Store::new(helpers::now());
    let fetcher = SnapshotFetcher::new(base_url, Duration::from_secs(8)).unwrap();
    let poller = Poller::new(store.clone(), fetcher, Duration::from_millis(100), 48);
    let shutdown = CancellationToken::new();

    // WHEN: Running for a while, then cancelling
    let task = tokio::spawn(poller.run(shutdown.clone()));
    tokio::time::sleep(Duration::from_millis(450)).await;
    shutdown.cancel();

    // THEN: The task stops and several polls landed
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("poller did not stop")
        .unwrap();
    assert!(store.history_len().await >= 2);
}
