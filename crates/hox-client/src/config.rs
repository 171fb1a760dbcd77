//! Connection settings and login credentials.

use std::time::Duration;

use rand::RngExt;

/// Where and how to reach the game server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Sent as `version` in every `LOGIN`.
    pub app_version: String,
    /// How often the reactor wakes up when nothing else happens.
    pub poll_interval: Duration,
    /// Upper bound on a single connect attempt.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "games.playxiangqi.com".to_string(),
            port: 80,
            app_version: "AOXChess-1.0".to_string(),
            poll_interval: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Defaults, overridden by `HOX_SERVER_HOST`, `HOX_SERVER_PORT`,
    /// `HOX_POLL_INTERVAL_MS` and `HOX_CONNECT_TIMEOUT_SECS` when set.
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(host) = lookup("HOX_SERVER_HOST").filter(|h| !h.is_empty()) {
            config.host = host;
        }
        if let Some(port) = lookup("HOX_SERVER_PORT").and_then(|p| p.parse().ok()) {
            config.port = port;
        }
        if let Some(ms) = lookup("HOX_POLL_INTERVAL_MS")
            .and_then(|v| v.parse().ok())
            .filter(|ms| *ms > 0)
        {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = lookup("HOX_CONNECT_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .filter(|secs| *secs > 0)
        {
            config.connect_timeout = Duration::from_secs(secs);
        }
        config
    }

    /// `host:port`, as handed to the resolver.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Player id and password used to log in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub pid: String,
    pub password: String,
}

impl Credentials {
    /// An empty `pid` becomes a fresh guest id.
    pub fn new(pid: impl Into<String>, password: impl Into<String>) -> Self {
        let pid = pid.into();
        Self {
            pid: if pid.is_empty() { guest_pid() } else { pid },
            password: password.into(),
        }
    }

    pub fn guest() -> Self {
        Self::new("", "")
    }

    pub fn is_guest(&self) -> bool {
        self.pid.starts_with(GUEST_PREFIX)
    }
}

const GUEST_PREFIX: &str = "Guest#an";

/// A random guest id, `Guest#an<1..=10000>`.
pub fn guest_pid() -> String {
    let n: u32 = rand::rng().random_range(1..=10_000);
    format!("{GUEST_PREFIX}{n}")
}
