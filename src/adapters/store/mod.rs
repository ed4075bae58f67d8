mod exposition;
mod memory;

pub use exposition::{RenderError, RenderOptions, CONTENT_TYPE};
pub use memory::MemoryRegistry;
