use std::time::Duration;

use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, ListContainersOptions};
use bollard::errors::Error as BollardError;
use bollard::models::{ContainerInspectResponse, ContainerSummary, HealthStatusEnum};
use bollard::Docker;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::config::RuntimeTarget;
use crate::domain::{ContainerDescriptor, ContainerId, HealthState, LifecycleState};
use crate::ports::{ContainerSource, RuntimeError};

/// Docker adapter using bollard client
///
/// The client is created on first use and retried every cycle until it
/// succeeds, so a missing socket at startup is just an unreachable runtime.
pub struct DockerAdapter {
    target: RuntimeTarget,
    timeout: Duration,
    client: OnceCell<Docker>,
}

impl DockerAdapter {
    pub fn new(target: RuntimeTarget, timeout: Duration) -> Self {
        Self {
            target,
            timeout,
            client: OnceCell::new(),
        }
    }

    fn connect(&self) -> Result<Docker, BollardError> {
        let client = match &self.target {
            RuntimeTarget::LocalDefaults => Docker::connect_with_local_defaults()?,
            RuntimeTarget::Socket(path) => {
                Docker::connect_with_socket(path, self.timeout.as_secs(), bollard::API_DEFAULT_VERSION)?
            }
            RuntimeTarget::Http(addr) => {
                Docker::connect_with_http(addr, self.timeout.as_secs(), bollard::API_DEFAULT_VERSION)?
            }
        };

        Ok(client.with_timeout(self.timeout))
    }

    async fn client(&self) -> Result<&Docker, RuntimeError> {
        self.client
            .get_or_try_init(|| async {
                let client = self.connect().map_err(|e| RuntimeError::Unreachable(e.to_string()))?;
                debug!(runtime = ?self.target, "Docker client ready");
                Ok::<_, RuntimeError>(client)
            })
            .await
    }

    fn parse_container_name(names: &Option<Vec<String>>) -> String {
        names
            .as_ref()
            .and_then(|n| n.first())
            .map(|s| s.trim_start_matches('/').to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Health as recorded in inspect data; `None` when no check is configured
    fn inspected_health(inspect: &ContainerInspectResponse) -> HealthState {
        let status = inspect
            .state
            .as_ref()
            .and_then(|state| state.health.as_ref())
            .and_then(|health| health.status.as_ref());

        match status {
            Some(HealthStatusEnum::HEALTHY) => HealthState::Healthy,
            Some(HealthStatusEnum::UNHEALTHY) => HealthState::Unhealthy,
            Some(HealthStatusEnum::STARTING) => HealthState::Starting,
            _ => HealthState::None,
        }
    }

    /// Builds a descriptor from a list entry. The status text only carries
    /// health for running containers, so other states use inspect data when given.
    fn describe(summary: ContainerSummary, inspect: Option<&ContainerInspectResponse>) -> ContainerDescriptor {
        let name = Self::parse_container_name(&summary.names);
        let lifecycle = LifecycleState::parse(summary.state.as_deref());
        let health = match inspect {
            Some(inspect) => Self::inspected_health(inspect),
            None => HealthState::from_status_text(summary.status.as_deref()),
        };

        ContainerDescriptor::new(ContainerId::new(summary.id.unwrap_or_default()), name, lifecycle)
            .with_health(health)
            .with_labels(summary.labels.unwrap_or_default())
    }

    async fn inspect(&self, client: &Docker, summary: &ContainerSummary) -> Option<ContainerInspectResponse> {
        let id = summary.id.as_deref()?;
        match client.inspect_container(id, None::<InspectContainerOptions>).await {
            Ok(inspect) => Some(inspect),
            Err(e) => {
                // Typically removed between list and inspect
                warn!(container = id, "Failed to inspect container, using status text: {}", e);
                None
            }
        }
    }

    fn map_error(err: BollardError) -> RuntimeError {
        match err {
            BollardError::JsonSerdeError { .. } | BollardError::JsonDataError { .. } => {
                RuntimeError::MalformedResponse(err.to_string())
            }
            BollardError::DockerResponseServerError { status_code, message } => RuntimeError::Rejected {
                status: status_code,
                message,
            },
            other => RuntimeError::Unreachable(other.to_string()),
        }
    }
}

#[async_trait]
impl ContainerSource for DockerAdapter {
    async fn list_containers(&self, include_stopped: bool) -> Result<Vec<ContainerDescriptor>, RuntimeError> {
        let client = self.client().await?;
        let options = Some(ListContainersOptions::<String> {
            all: include_stopped,
            ..Default::default()
        });

        let summaries = client.list_containers(options).await.map_err(Self::map_error)?;
        debug!(count = summaries.len(), include_stopped, "Listed containers");

        let mut descriptors = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let inspect = if summary.state.as_deref() == Some("running") {
                None
            } else {
                self.inspect(client, &summary).await
            };
            descriptors.push(Self::describe(summary, inspect.as_ref()));
        }

        Ok(descriptors)
    }
}
