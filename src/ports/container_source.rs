use async_trait::async_trait;

use crate::domain::ContainerDescriptor;

/// Failure talking to the container runtime
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("container runtime unreachable: {0}")]
    Unreachable(String),
    #[error("malformed response from container runtime: {0}")]
    MalformedResponse(String),
    #[error("container runtime rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Port for fetching container descriptors
#[async_trait]
pub trait ContainerSource: Send + Sync {
    /// List containers; stopped ones too when `include_stopped` is set.
    ///
    /// Makes a single call with no retries.
    async fn list_containers(&self, include_stopped: bool) -> Result<Vec<ContainerDescriptor>, RuntimeError>;
}
