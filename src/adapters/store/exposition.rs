use std::collections::{BTreeSet, HashMap};

use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

use crate::domain::sample::{CONTAINER_HEALTH, CONTAINER_STATUS};
use crate::domain::SampleSet;

/// Content type of the rendered text
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to build metric family: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("rendered metrics are not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

const EXPORTER_DESCRIPTION: &str = "Slim Docker Container State Exporter";

/// Fixed extras rendered next to the sample set
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Full name of the exporter info gauge
    pub info_metric: String,
    pub include_process_metrics: bool,
}

impl RenderOptions {
    pub fn new(prefix: &str, include_process_metrics: bool) -> Self {
        let info_metric = if prefix.is_empty() {
            "docker_slim_exporter_info".to_string()
        } else {
            format!("{prefix}_docker_slim_exporter_info")
        };

        Self {
            info_metric,
            include_process_metrics,
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::new("", false)
    }
}

fn help_for(name: &str) -> &'static str {
    if name.ends_with(CONTAINER_HEALTH) {
        "Docker container health status"
    } else if name.ends_with(CONTAINER_STATUS) {
        "Docker container status"
    } else {
        "Docker container metric"
    }
}

/// Renders a sample set as Prometheus text exposition.
///
/// Each family's label schema is the union of its samples' keys. A sample
/// missing one of those keys gets an empty value, which Prometheus reads as absent.
pub fn encode(samples: &SampleSet, options: &RenderOptions) -> Result<String, RenderError> {
    let registry = Registry::new();

    for (name, family) in samples.families() {
        let keys: BTreeSet<&str> = family
            .iter()
            .flat_map(|s| s.labels.keys().map(String::as_str))
            .collect();
        let keys: Vec<&str> = keys.into_iter().collect();

        let gauge = GaugeVec::new(Opts::new(name, help_for(name)), &keys)?;
        for sample in family {
            let values: HashMap<&str, &str> = keys
                .iter()
                .map(|k| (*k, sample.labels.get(*k).map(String::as_str).unwrap_or("")))
                .collect();
            gauge.get_metric_with(&values)?.set(sample.value);
        }
        registry.register(Box::new(gauge))?;
    }

    let info = Gauge::with_opts(
        Opts::new(
            options.info_metric.as_str(),
            "Docker container state and health exporter information",
        )
        .const_label("version", env!("CARGO_PKG_VERSION"))
        .const_label("description", EXPORTER_DESCRIPTION),
    )?;
    info.set(1.0);
    registry.register(Box::new(info))?;

    #[cfg(target_os = "linux")]
    {
        if options.include_process_metrics {
            registry.register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))?;
        }
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
