use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::SampleSet;
use crate::ports::MetricStore;

use super::exposition::{self, RenderError, RenderOptions};

/// Single-slot in-memory registry holding the latest sample set.
///
/// New sets are built off to the side and swapped in as a whole, so a reader
/// always sees exactly one cycle's samples.
pub struct MemoryRegistry {
    current: RwLock<Arc<SampleSet>>,
    options: RenderOptions,
}

impl MemoryRegistry {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            current: RwLock::new(Arc::new(SampleSet::empty())),
            options,
        }
    }

    /// Render the currently visible sample set as exposition text
    pub fn render(&self) -> Result<String, RenderError> {
        let snapshot = self.snapshot();
        exposition::encode(&snapshot, &self.options)
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

impl MetricStore for MemoryRegistry {
    fn replace(&self, samples: SampleSet) {
        let next = Arc::new(samples);
        // The slot only holds an Arc, so a poisoned lock still guards valid data
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = next;
    }

    fn snapshot(&self) -> Arc<SampleSet> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
