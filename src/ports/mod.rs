pub mod container_source;
pub mod metric_store;

pub use container_source::{ContainerSource, RuntimeError};
pub use metric_store::MetricStore;
