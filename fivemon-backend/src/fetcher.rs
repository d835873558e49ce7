//! Upstream game server client.
//!
//! A poll issues the three requests concurrently and settles each one on its
//! own: a failed source is logged and reported as absent without affecting
//! the other two.

use std::time::Duration;

use fivemon_store::{PlayerSnapshot, Snapshot};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned no data")]
    Empty { url: String },
}

pub struct SnapshotFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl SnapshotFetcher {
    /// `base_url` is the game server root, e.g. `http://127.0.0.1:30120`.
    /// `timeout` bounds each request individually.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch players, server info and dynamic vars.
    pub async fn fetch(&self) -> Snapshot {
        let (players, info, dynamic) = tokio::join!(
            self.get_json::<Vec<PlayerSnapshot>>("players.json"),
            self.get_object("info.json"),
            self.get_object("dynamic.json"),
        );

        let snapshot = Snapshot {
            players: settle("players", players),
            info: settle("info", info),
            dynamic: settle("dynamic", dynamic),
        };
        debug!(
            players = snapshot.players.is_some(),
            info = snapshot.info.is_some(),
            dynamic = snapshot.dynamic.is_some(),
            "upstream fetch settled"
        );
        snapshot
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status());
        let response = match response {
            Ok(response) => response,
            Err(source) => return Err(FetchError::Request { url, source }),
        };
        response
            .json::<T>()
            .await
            .map_err(|source| FetchError::Request { url, source })
    }

    /// Like `get_json`, but a `null` body counts as a failure.
    async fn get_object(&self, path: &str) -> Result<Value, FetchError> {
        match self.get_json::<Value>(path).await? {
            Value::Null => Err(FetchError::Empty {
                url: format!("{}/{}", self.base_url, path),
            }),
            value => Ok(value),
        }
    }
}

fn settle<T>(source: &'static str, result: Result<T, FetchError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(source, error = %err, "upstream source unavailable");
            None
        }
    }
}
