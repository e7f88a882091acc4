use std::env;
use std::time::Duration;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub host: Host,
    pub load_timeout: Option<Duration>,
    pub max_cached: Option<usize>,
    pub max_blocking_threads: usize,
    pub preload: Vec<String>,
    pub normalize_ids: bool,
    pub allow_local: bool,
    pub log_level: tracing::Level,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub host: String,
    pub port: u16,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unset or unparsable
    /// values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let timeout_secs: u64 = lookup("TOKSERVE_LOAD_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(120);

        Self {
            host: Host::parse(lookup("TOKSERVE_HOST").as_deref().unwrap_or(DEFAULT_HOST)),
            load_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            max_cached: lookup("TOKSERVE_MAX_CACHED")
                .and_then(|v| v.trim().parse().ok())
                .filter(|n: &usize| *n > 0),
            max_blocking_threads: lookup("TOKSERVE_MAX_BLOCKING_THREADS")
                .and_then(|v| v.trim().parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(64),
            preload: lookup("TOKSERVE_PRELOAD")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            normalize_ids: lookup("TOKSERVE_NORMALIZE_IDS").map(is_truthy).unwrap_or(false),
            allow_local: lookup("TOKSERVE_ALLOW_LOCAL").map(is_truthy).unwrap_or(false),
            log_level: lookup("TOKSERVE_LOG")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(tracing::Level::INFO),
        }
    }
}

fn is_truthy(value: String) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Host {
    /// Accepts `host`, `host:port` or a URL with an `http(s)://` scheme.
    pub fn parse(value: &str) -> Self {
        let value = value
            .trim()
            .trim_start_matches("http://")
            .trim_start_matches("https://")
            .trim_end_matches('/');

        match value.rsplit_once(':') {
            Some((host, port)) => Self {
                host: if host.is_empty() { DEFAULT_HOST.to_string() } else { host.to_string() },
                port: port.parse().unwrap_or(DEFAULT_PORT),
            },
            None if value.is_empty() => Self {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
            },
            None => Self {
                host: value.to_string(),
                port: DEFAULT_PORT,
            },
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL for clients; a wildcard bind address is reached via loopback.
    pub fn base_url(&self) -> String {
        let host = if self.host == "0.0.0.0" { "127.0.0.1" } else { &self.host };
        format!("http://{}:{}", host, self.port)
    }
}
