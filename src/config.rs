use std::env;
use std::time::Duration;

/// Where to reach the container runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeTarget {
    /// Bollard's local defaults (`DOCKER_HOST` or the platform socket)
    LocalDefaults,
    Socket(String),
    Http(String),
}

impl RuntimeTarget {
    /// Accepts `unix://` URLs, absolute socket paths, `tcp://` and `http://`.
    fn parse(value: &str) -> Option<Self> {
        if value.starts_with("tcp://") || value.starts_with("http://") {
            Some(Self::Http(value.to_string()))
        } else if value.starts_with("unix://") || value.starts_with('/') {
            Some(Self::Socket(value.to_string()))
        } else {
            None
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}: expected {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Application configuration, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Metric name prefix, joined with `_`; empty for none
    pub metrics_prefix: String,
    pub scrape_interval: Duration,
    pub runtime_target: RuntimeTarget,
    pub runtime_timeout: Duration,
    pub include_stopped: bool,
    pub include_labels: bool,
    pub disable_default_metrics: bool,
    /// `tracing` filter directive (`error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("EXPORTER_PORT") {
            Some(v) => v.parse::<u16>().map_err(|_| invalid("EXPORTER_PORT", "a port number", &v))?,
            None => 9090,
        };

        let metrics_prefix = get("METRICS_PREFIX").unwrap_or_default();
        if !metrics_prefix.is_empty() && !is_metric_name(&metrics_prefix) {
            return Err(invalid("METRICS_PREFIX", "a Prometheus metric name", &metrics_prefix));
        }

        let scrape_interval = seconds(get("SCRAPE_INTERVAL"), "SCRAPE_INTERVAL", 15)?;
        let runtime_timeout = seconds(get("DOCKER_TIMEOUT"), "DOCKER_TIMEOUT", 5)?;

        let runtime_target = match get("DOCKER_HOST") {
            Some(v) => RuntimeTarget::parse(&v).ok_or_else(|| {
                invalid("DOCKER_HOST", "a unix://, tcp:// or http:// address or a socket path", &v)
            })?,
            None => RuntimeTarget::LocalDefaults,
        };

        let log_level = match get("LOG_LEVEL") {
            Some(v) => log_directive(&v).ok_or_else(|| {
                invalid("LOG_LEVEL", "one of DEBUG, INFO, WARNING, ERROR, CRITICAL", &v)
            })?,
            None => "info",
        };

        Ok(Self {
            port,
            metrics_prefix,
            scrape_interval,
            runtime_target,
            runtime_timeout,
            include_stopped: flag(get("INCLUDE_STOPPED"), "INCLUDE_STOPPED", true)?,
            include_labels: flag(get("INCLUDE_LABELS"), "INCLUDE_LABELS", true)?,
            disable_default_metrics: flag(get("DISABLE_DEFAULT_METRICS"), "DISABLE_DEFAULT_METRICS", true)?,
            log_level: log_level.to_string(),
        })
    }
}

fn invalid(var: &'static str, expected: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        expected,
        value: value.to_string(),
    }
}

fn seconds(value: Option<String>, var: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match value {
        None => Ok(Duration::from_secs(default)),
        Some(v) => match v.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(invalid(var, "a positive number of seconds", &v)),
        },
    }
}

fn flag(value: Option<String>, var: &'static str, default: bool) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(invalid(var, "true or false", other)),
    }
}

fn log_directive(level: &str) -> Option<&'static str> {
    match level.to_ascii_uppercase().as_str() {
        "TRACE" => Some("trace"),
        "DEBUG" => Some("debug"),
        "INFO" => Some("info"),
        "WARN" | "WARNING" => Some("warn"),
        "ERROR" | "CRITICAL" => Some("error"),
        _ => None,
    }
}

fn is_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == ':');
    first_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
