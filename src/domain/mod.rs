pub mod container;
pub mod sample;

pub use container::{ContainerDescriptor, ContainerId, HealthState, LifecycleState};
pub use sample::{build_samples, SampleOptions, SampleSet};
