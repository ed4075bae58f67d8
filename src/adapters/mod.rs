pub mod docker;
pub mod store;

pub use docker::DockerAdapter;
pub use store::{MemoryRegistry, RenderOptions};
