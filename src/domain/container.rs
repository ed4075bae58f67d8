use std::collections::BTreeMap;
use std::fmt;

/// Length of the short container id used in metric labels
pub const SHORT_ID_LEN: usize = 12;

/// Short (12 character) container identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerId(String);

impl ContainerId {
    /// Builds a short id from a full runtime id, truncating on a char boundary.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self(id.chars().take(SHORT_ID_LEN).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Container lifecycle state as reported by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Running,
    Exited,
    Paused,
    Restarting,
    Created,
    Removing,
    Dead,
    Unknown,
}

impl LifecycleState {
    /// Parses the runtime's state string. Anything unrecognized is `Unknown`.
    pub fn parse(state: Option<&str>) -> Self {
        match state.map(str::to_ascii_lowercase).as_deref() {
            Some("running") => Self::Running,
            Some("exited") => Self::Exited,
            Some("paused") => Self::Paused,
            Some("restarting") => Self::Restarting,
            Some("created") => Self::Created,
            Some("removing") => Self::Removing,
            Some("dead") => Self::Dead,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Exited => "exited",
            Self::Paused => "paused",
            Self::Restarting => "restarting",
            Self::Created => "created",
            Self::Removing => "removing",
            Self::Dead => "dead",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the container's health check. `None` means no check is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HealthState {
    Healthy,
    Unhealthy,
    Starting,
    #[default]
    None,
}

impl HealthState {
    /// Extracts the health from a human readable status such as
    /// `Up 3 minutes (healthy)` or `Up 2 seconds (health: starting)`.
    pub fn from_status_text(status: Option<&str>) -> Self {
        let Some(status) = status else {
            return Self::None;
        };
        let Some(open) = status.rfind('(') else {
            return Self::None;
        };
        let inner = status[open + 1..].trim_end().trim_end_matches(')').trim();

        match inner {
            "healthy" => Self::Healthy,
            "unhealthy" => Self::Unhealthy,
            "health: starting" | "starting" => Self::Starting,
            _ => Self::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::Starting => "starting",
            Self::None => "none",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable snapshot of one container at scrape time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDescriptor {
    pub id: ContainerId,
    pub name: String,
    pub lifecycle: LifecycleState,
    pub health: HealthState,
    /// Runtime labels, iterated in key order
    pub labels: BTreeMap<String, String>,
}

impl ContainerDescriptor {
    pub fn new(id: impl Into<ContainerId>, name: impl Into<String>, lifecycle: LifecycleState) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lifecycle,
            health: HealthState::None,
            labels: BTreeMap::new(),
        }
    }

    pub fn with_health(mut self, health: HealthState) -> Self {
        self.health = health;
        self
    }

    pub fn with_labels<K, V>(mut self, labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.labels = labels
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }
}
