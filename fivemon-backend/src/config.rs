use std::env::var;
use std::path::PathBuf;
use std::time::Duration;

use dotenvy::dotenv;

/// Application configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    /// Env: PORT (default: 3000)
    pub port: u16,

    /// Game server to monitor, as host:port
    /// Env: UPSTREAM_ADDRESS (default: "136.243.177.111:30085")
    pub upstream_address: String,

    /// Advertised player slots
    /// Env: MAX_PLAYERS (default: 48)
    pub max_players: u32,

    /// Time between polls of the game server
    /// Env: POLL_INTERVAL_SECS (default: 30)
    pub poll_interval: Duration,

    /// Timeout of each upstream request
    /// Env: FETCH_TIMEOUT_SECS (default: 8)
    pub fetch_timeout: Duration,

    /// Days a disconnected player's session is kept
    /// Env: SESSION_TTL_DAYS (default: 30)
    pub session_ttl_days: i64,

    /// Directory holding the dashboard assets
    /// Env: STATIC_DIR (default: "public")
    pub static_dir: PathBuf,

    /// Directory for `fivem-monitor.log`; an empty value disables the file
    /// Env: LOG_DIR (default: "logs")
    pub log_dir: Option<PathBuf>,

    /// Request body size limit in bytes
    /// Env: REQUEST_BODY_LIMIT (default: 1048576 = 1MB)
    pub request_body_limit: usize,

    /// Request timeout in seconds
    /// Env: REQUEST_TIMEOUT_SECS (default: 30)
    pub request_timeout: Duration,

    /// Requests per minute allowed per client IP
    /// Env: RATE_LIMIT_PER_MIN (default: 100)
    pub rate_limit_per_min: u64,

    /// Burst size for the per-IP limit
    /// Env: RATE_LIMIT_BURST (default: 100)
    pub rate_limit_burst: u32,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv(); //for debugging mostly
        let defaults = Self::default();
        Self {
            port: env_or_default("PORT", defaults.port),
            upstream_address: env_or_default_string("UPSTREAM_ADDRESS", &defaults.upstream_address),
            max_players: env_or_default("MAX_PLAYERS", defaults.max_players),
            poll_interval: Duration::from_secs(env_or_default("POLL_INTERVAL_SECS", 30)),
            fetch_timeout: Duration::from_secs(env_or_default("FETCH_TIMEOUT_SECS", 8)),
            session_ttl_days: env_or_default("SESSION_TTL_DAYS", defaults.session_ttl_days),
            static_dir: PathBuf::from(env_or_default_string("STATIC_DIR", "public")),
            log_dir: Some(env_or_default_string("LOG_DIR", "logs"))
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            request_body_limit: env_or_default("REQUEST_BODY_LIMIT", defaults.request_body_limit),
            request_timeout: Duration::from_secs(env_or_default("REQUEST_TIMEOUT_SECS", 30)),
            rate_limit_per_min: env_or_default("RATE_LIMIT_PER_MIN", defaults.rate_limit_per_min),
            rate_limit_burst: env_or_default("RATE_LIMIT_BURST", defaults.rate_limit_burst),
        }
    }

    /// Base URL of the upstream game server
    pub fn upstream_url(&self) -> String {
        if self.upstream_address.starts_with("http://") || self.upstream_address.starts_with("https://") {
            self.upstream_address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", self.upstream_address)
        }
    }
}

impl Default for Config {
    /// Create configuration with all default values
    fn default() -> Self {
        Self {
            port: 3000,
            upstream_address: "136.243.177.111:30085".to_string(),
            max_players: 48,
            poll_interval: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(8),
            session_ttl_days: 30,
            static_dir: PathBuf::from("public"),
            log_dir: Some(PathBuf::from("logs")),
            request_body_limit: 1024 * 1024, // 1 MB
            request_timeout: Duration::from_secs(30),
            rate_limit_per_min: 100,
            rate_limit_burst: 100,
        }
    }
}

/// Parse environment variable or return default value
fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}

/// Parse environment variable string or return default value
fn env_or_default_string(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|_| default.to_string())
}
