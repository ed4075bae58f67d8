use std::sync::Arc;

use crate::domain::SampleSet;

/// Port for publishing and reading the current sample set
pub trait MetricStore: Send + Sync {
    /// Swap in a new sample set, replacing the previous one entirely
    fn replace(&self, samples: SampleSet);

    /// The currently visible sample set
    fn snapshot(&self) -> Arc<SampleSet>;
}
