use std::collections::BTreeMap;

use tracing::warn;

use super::ContainerDescriptor;

pub const CONTAINER_STATUS: &str = "container_status";
pub const CONTAINER_HEALTH: &str = "container_health";

/// Prefix for metric labels derived from runtime labels
pub const CONTAINER_LABEL_PREFIX: &str = "container_label_";

/// Metric label keys mapped to values. Keys are unique by construction.
pub type LabelSet = BTreeMap<String, String>;

/// A single gauge sample
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub labels: LabelSet,
    pub value: f64,
}

/// All samples produced by one scrape cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    samples: Vec<MetricSample>,
}

impl SampleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricSample> {
        self.samples.iter()
    }

    /// Samples grouped by metric name, in name order
    pub fn families(&self) -> BTreeMap<&str, Vec<&MetricSample>> {
        let mut families: BTreeMap<&str, Vec<&MetricSample>> = BTreeMap::new();
        for sample in self.iter() {
            families.entry(sample.name.as_str()).or_default().push(sample);
        }
        families
    }
}

/// Settings that shape the sample set
#[derive(Debug, Clone, Default)]
pub struct SampleOptions {
    /// Metric name prefix without the joining underscore; empty for none
    pub prefix: String,
    pub include_labels: bool,
}

impl SampleOptions {
    pub fn new(prefix: impl Into<String>, include_labels: bool) -> Self {
        Self {
            prefix: prefix.into(),
            include_labels,
        }
    }

    pub fn metric_name(&self, base: &str) -> String {
        if self.prefix.is_empty() {
            base.to_string()
        } else {
            format!("{}_{}", self.prefix, base)
        }
    }
}

/// Lower-cases a runtime label key and replaces anything outside `[a-z0-9_]` with `_`.
pub fn sanitize_label_key(key: &str) -> String {
    key.chars()
        .map(|c| c.to_ascii_lowercase())
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '_' => c,
            _ => '_',
        })
        .collect()
}

/// Turns container descriptors into the cycle's sample set.
///
/// Every descriptor yields one status and one health sample, both with value `1`.
/// When two runtime labels sanitize to the same key, the later one in key order wins.
pub fn build_samples(descriptors: &[ContainerDescriptor], options: &SampleOptions) -> SampleSet {
    let status_name = options.metric_name(CONTAINER_STATUS);
    let health_name = options.metric_name(CONTAINER_HEALTH);

    let mut samples = Vec::with_capacity(descriptors.len() * 2);

    for descriptor in descriptors {
        let extra = if options.include_labels {
            container_labels(descriptor)
        } else {
            LabelSet::new()
        };

        samples.push(MetricSample {
            name: status_name.clone(),
            labels: base_labels(descriptor, descriptor.lifecycle.as_str(), &extra),
            value: 1.0,
        });
        samples.push(MetricSample {
            name: health_name.clone(),
            labels: base_labels(descriptor, descriptor.health.as_str(), &extra),
            value: 1.0,
        });
    }

    SampleSet { samples }
}

fn base_labels(descriptor: &ContainerDescriptor, status: &str, extra: &LabelSet) -> LabelSet {
    let mut labels = extra.clone();
    labels.insert("container_id".to_string(), descriptor.id.as_str().to_string());
    labels.insert("name".to_string(), descriptor.name.clone());
    labels.insert("status".to_string(), status.to_string());
    labels
}

fn container_labels(descriptor: &ContainerDescriptor) -> LabelSet {
    let mut labels = LabelSet::new();
    let mut origins: BTreeMap<String, &str> = BTreeMap::new();

    for (key, value) in &descriptor.labels {
        let sanitized = format!("{}{}", CONTAINER_LABEL_PREFIX, sanitize_label_key(key));

        if let Some(previous) = origins.insert(sanitized.clone(), key.as_str()) {
            warn!(
                container = %descriptor.name,
                label = %sanitized,
                dropped = previous,
                kept = key.as_str(),
                "Container labels collide after sanitization, keeping the later one"
            );
        }
        labels.insert(sanitized, value.clone());
    }

    labels
}
