use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info};

use crate::domain::{build_samples, SampleOptions};
use crate::ports::{ContainerSource, MetricStore, RuntimeError};

/// Summary of a published cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub containers: usize,
    pub samples: usize,
}

/// Drives the fetch, build and publish loop at a fixed interval
pub struct CollectionScheduler {
    source: Arc<dyn ContainerSource>,
    store: Arc<dyn MetricStore>,
    options: SampleOptions,
    include_stopped: bool,
    interval: Duration,
}

impl CollectionScheduler {
    pub fn new(
        source: Arc<dyn ContainerSource>,
        store: Arc<dyn MetricStore>,
        options: SampleOptions,
        include_stopped: bool,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            store,
            options,
            include_stopped,
            interval,
        }
    }

    /// Run one scrape cycle.
    ///
    /// On a fetch error nothing is published and the store keeps its last set.
    pub async fn run_cycle(&self) -> Result<CycleReport, RuntimeError> {
        let descriptors = self.source.list_containers(self.include_stopped).await?;

        let samples = build_samples(&descriptors, &self.options);
        let report = CycleReport {
            containers: descriptors.len(),
            samples: samples.len(),
        };

        self.store.replace(samples);
        Ok(report)
    }

    /// Loop forever. Cycles start `interval` apart; an overrunning cycle is
    /// followed immediately by the next one.
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "Starting collection loop");

        loop {
            let started = Instant::now();

            match self.run_cycle().await {
                Ok(report) => info!(
                    containers = report.containers,
                    samples = report.samples,
                    "Collected metrics for {} containers",
                    report.containers
                ),
                Err(e) => error!("Error collecting metrics: {}", e),
            }

            let elapsed = started.elapsed();
            debug!(elapsed_ms = elapsed.as_millis() as u64, "Scrape cycle finished");

            sleep(next_delay(self.interval, elapsed)).await;
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

/// Time to wait before the next cycle, never negative
pub fn next_delay(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::adapters::MemoryRegistry;
    use crate::domain::{ContainerDescriptor, LifecycleState};

    type Scripted = Result<Vec<ContainerDescriptor>, RuntimeError>;

    /// Replays scripted responses, then returns empty lists
    #[derive(Default)]
    struct FakeSource {
        responses: Mutex<VecDeque<Scripted>>,
        calls: Mutex<Vec<(Instant, bool)>>,
        delay: Duration,
    }

    impl FakeSource {
        fn scripted(responses: Vec<Scripted>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Default::default()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Default::default()
            }
        }

        fn call_offsets(&self, start: Instant) -> Vec<u64> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(at, _)| at.duration_since(start).as_secs())
                .collect()
        }
    }

    #[async_trait]
    impl ContainerSource for FakeSource {
        async fn list_containers(&self, include_stopped: bool) -> Result<Vec<ContainerDescriptor>, RuntimeError> {
            self.calls.lock().unwrap().push((Instant::now(), include_stopped));
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn web() -> ContainerDescriptor {
        ContainerDescriptor::new("abc123", "web", LifecycleState::Running).with_labels([("env", "prod")])
    }

    fn scheduler(source: Arc<FakeSource>, registry: Arc<MemoryRegistry>, include_stopped: bool) -> CollectionScheduler {
        CollectionScheduler::new(
            source,
            registry,
            SampleOptions::new("", true),
            include_stopped,
            Duration::from_secs(15),
        )
    }

    #[tokio::test]
    async fn test_cycle_publishes_samples() {
        let source = Arc::new(FakeSource::scripted(vec![Ok(vec![web()])]));
        let registry = Arc::new(MemoryRegistry::default());

        let report = scheduler(source, registry.clone(), true).run_cycle().await.unwrap();

        assert_eq!(report, CycleReport { containers: 1, samples: 2 });
        let text = registry.render().unwrap();
        assert!(text.contains(r#"status="running""#));
        assert!(text.contains(r#"status="none""#));
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_last_good_samples() {
        let source = Arc::new(FakeSource::scripted(vec![
            Ok(vec![web()]),
            Err(RuntimeError::Unreachable("connection refused".to_string())),
        ]));
        let registry = Arc::new(MemoryRegistry::default());
        let scheduler = scheduler(source, registry.clone(), true);

        scheduler.run_cycle().await.unwrap();
        let before = registry.render().unwrap();
        let snapshot = registry.snapshot();

        let err = scheduler.run_cycle().await.unwrap_err();
        assert!(matches!(err, RuntimeError::Unreachable(_)));

        assert!(Arc::ptr_eq(&snapshot, &registry.snapshot()));
        assert_eq!(before, registry.render().unwrap());
    }

    #[tokio::test]
    async fn test_malformed_response_skips_publish() {
        let source = Arc::new(FakeSource::scripted(vec![Err(RuntimeError::MalformedResponse(
            "unexpected token".to_string(),
        ))]));
        let registry = Arc::new(MemoryRegistry::default());

        assert!(scheduler(source, registry.clone(), true).run_cycle().await.is_err());
        assert!(registry.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_no_running_containers_publishes_empty_set() {
        let source = Arc::new(FakeSource::scripted(vec![Ok(vec![web()]), Ok(Vec::new())]));
        let registry = Arc::new(MemoryRegistry::default());
        let scheduler = scheduler(source.clone(), registry.clone(), false);

        scheduler.run_cycle().await.unwrap();
        let report = scheduler.run_cycle().await.unwrap();

        assert_eq!(report, CycleReport { containers: 0, samples: 0 });
        let text = registry.render().unwrap();
        assert!(!text.contains("container_status{"));
        assert!(!text.contains("container_health{"));
        assert!(source.calls.lock().unwrap().iter().all(|(_, all)| !all));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_runs_on_interval() {
        let source = Arc::new(FakeSource::default());
        let registry = Arc::new(MemoryRegistry::default());
        let start = Instant::now();

        let handle = scheduler(source.clone(), registry, true).spawn();
        sleep(Duration::from_secs(31)).await;
        handle.abort();

        assert_eq!(source.call_offsets(start), vec![0, 15, 30]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrunning_cycle_starts_next_immediately() {
        let source = Arc::new(FakeSource::slow(Duration::from_secs(20)));
        let registry = Arc::new(MemoryRegistry::default());
        let start = Instant::now();

        let handle = scheduler(source.clone(), registry, true).spawn();
        sleep(Duration::from_secs(41)).await;
        handle.abort();

        assert_eq!(source.call_offsets(start), vec![0, 20, 40]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_survives_errors() {
        let source = Arc::new(FakeSource::scripted(vec![
            Err(RuntimeError::Unreachable("down".to_string())),
            Err(RuntimeError::Unreachable("down".to_string())),
            Ok(vec![web()]),
        ]));
        let registry = Arc::new(MemoryRegistry::default());

        let handle = scheduler(source.clone(), registry.clone(), true).spawn();
        sleep(Duration::from_secs(31)).await;
        handle.abort();

        assert_eq!(source.calls.lock().unwrap().len(), 3);
        assert_eq!(registry.snapshot().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_endpoint_serves_through_outage_and_recovers() {
        use axum::body::{to_bytes, Body};
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        use crate::interface::http::create_router;

        async fn scrape(registry: &Arc<MemoryRegistry>) -> (StatusCode, String) {
            let response = create_router(registry.clone())
                .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, String::from_utf8(body.to_vec()).unwrap())
        }

        let source = Arc::new(FakeSource::scripted(vec![
            Err(RuntimeError::Unreachable("socket not found".to_string())),
            Err(RuntimeError::Unreachable("socket not found".to_string())),
            Ok(vec![web()]),
        ]));
        let registry = Arc::new(MemoryRegistry::default());
        let handle = scheduler(source, registry.clone(), true).spawn();

        sleep(Duration::from_secs(1)).await;
        let (status, body) = scrape(&registry).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("container_status{"));
        assert!(!handle.is_finished());

        sleep(Duration::from_secs(30)).await;
        let (status, body) = scrape(&registry).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"name="web""#));
        assert!(!handle.is_finished());

        handle.abort();
    }

    #[test]
    fn test_next_delay() {
        let interval = Duration::from_secs(15);
        assert_eq!(next_delay(interval, Duration::from_secs(4)), Duration::from_secs(11));
        assert_eq!(next_delay(interval, Duration::from_secs(15)), Duration::ZERO);
        assert_eq!(next_delay(interval, Duration::from_secs(40)), Duration::ZERO);
    }
}
