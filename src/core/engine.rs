use std::{sync::Arc, time::Duration};

use tokio::{sync::Semaphore, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    checks::Registry,
    config::EngineConfig,
    core::{
        canonical::CanonicalUrl,
        error::RadarError,
        signal::{CheckOutcome, NamedResultSet},
    },
};

/// Fans one URL out to every registered check on a bounded worker pool.
pub struct Engine {
    registry: Registry,
    semaphore: Arc<Semaphore>,
    check_timeout: Duration,
    no_network: bool,
}

impl Engine {
    pub fn new(config: &EngineConfig, registry: Registry) -> Self {
        let workers = registry.len().min(config.max_concurrency).max(1);
        Self {
            registry,
            semaphore: Arc::new(Semaphore::new(workers)),
            check_timeout: Duration::from_millis(config.check_timeout_ms),
            no_network: false,
        }
    }

    /// Network-backed checks are skipped and reported as indeterminate.
    pub fn no_network(mut self, no_network: bool) -> Self {
        self.no_network = no_network;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Never fails: each check owns exactly one key in the returned set.
    pub async fn run_all(&self, url: Arc<CanonicalUrl>) -> NamedResultSet {
        let mut results = NamedResultSet::new();
        let mut pending: Vec<(&'static str, JoinHandle<Result<CheckOutcome, RadarError>>)> =
            Vec::with_capacity(self.registry.len());

        for check in self.registry.iter() {
            if self.no_network && check.needs_network() {
                results.insert(
                    check.name().to_string(),
                    CheckOutcome::indeterminate("network disabled"),
                );
                continue;
            }
            let name = check.name();
            let check = check.clone();
            let url = url.clone();
            let pool = self.semaphore.clone();
            let limit = self.check_timeout;
            // The deadline covers the wait for a worker as well as the evaluation.
            let handle = tokio::spawn(async move {
                let work = async {
                    let _permit = pool
                        .acquire_owned()
                        .await
                        .map_err(|_| RadarError::Transport("worker pool closed".into()))?;
                    check.evaluate(&url).await
                };
                match tokio::time::timeout(limit, work).await {
                    Ok(result) => result,
                    Err(_) => Err(RadarError::Timeout),
                }
            });
            pending.push((name, handle));
        }

        for (name, handle) in pending {
            let outcome = match handle.await {
                Ok(Err(RadarError::Timeout)) => {
                    warn!("check {name} timed out after {:?}", self.check_timeout);
                    CheckOutcome::indeterminate("timeout")
                }
                Ok(result) => CheckOutcome::from_result(result),
                Err(err) if err.is_panic() => {
                    warn!("check {name} panicked");
                    CheckOutcome::indeterminate("check panicked")
                }
                Err(err) => {
                    warn!("check {name} did not complete: {err}");
                    CheckOutcome::indeterminate("check cancelled")
                }
            };
            debug!("{} {}: {:?}", url.final_url, name, outcome);
            results.insert(name.to_string(), outcome);
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use async_trait::async_trait;

    use super::*;
    use crate::checks::Check;
    use crate::sources::SourceKind;

    struct Fixed(&'static str, CheckOutcome);

    #[async_trait]
    impl Check for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }
        fn reason(&self) -> &'static str {
            "fixed"
        }
        async fn evaluate(&self, _url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
            Ok(self.1.clone())
        }
    }

    struct Sleeper;

    #[async_trait]
    impl Check for Sleeper {
        fn name(&self) -> &'static str {
            "sleeper"
        }
        fn reason(&self) -> &'static str {
            "slow"
        }
        async fn evaluate(&self, _url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(CheckOutcome::positive())
        }
    }

    struct Panics;

    #[async_trait]
    impl Check for Panics {
        fn name(&self) -> &'static str {
            "panics"
        }
        fn reason(&self) -> &'static str {
            "boom"
        }
        async fn evaluate(&self, _url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
            panic!("boom")
        }
    }

    struct Remote;

    #[async_trait]
    impl Check for Remote {
        fn name(&self) -> &'static str {
            "remote"
        }
        fn reason(&self) -> &'static str {
            "remote"
        }
        fn sources(&self) -> Vec<SourceKind> {
            vec![SourceKind::Http]
        }
        async fn evaluate(&self, _url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
            Err(RadarError::Transport("connection refused".into()))
        }
    }

    fn config(timeout_ms: u64) -> EngineConfig {
        EngineConfig {
            check_timeout_ms: timeout_ms,
            max_concurrency: 2,
            ..EngineConfig::default()
        }
    }

    fn url() -> Arc<CanonicalUrl> {
        Arc::new(CanonicalUrl::offline("http://example.com"))
    }

    #[tokio::test]
    async fn failures_are_isolated_per_check() {
        let registry = Registry::new()
            .with(Fixed("ok", CheckOutcome::positive()))
            .unwrap()
            .with(Sleeper)
            .unwrap()
            .with(Panics)
            .unwrap()
            .with(Remote)
            .unwrap();
        let engine = Engine::new(&config(50), registry);
        let results = engine.run_all(url()).await;

        assert_eq!(results.len(), 4);
        assert_eq!(results["ok"], CheckOutcome::positive());
        assert_eq!(results["sleeper"], CheckOutcome::indeterminate("timeout"));
        assert_eq!(results["panics"], CheckOutcome::indeterminate("check panicked"));
        assert!(results["remote"].is_indeterminate());
    }

    #[tokio::test]
    async fn no_network_skips_remote_checks() {
        let registry = Registry::new()
            .with(Remote)
            .unwrap()
            .with(Fixed("local", CheckOutcome::Negative))
            .unwrap();
        let engine = Engine::new(&config(1000), registry).no_network(true);
        let results = engine.run_all(url()).await;
        assert_eq!(results["remote"], CheckOutcome::indeterminate("network disabled"));
        assert_eq!(results["local"], CheckOutcome::Negative);
    }

    struct Counted {
        name: &'static str,
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Check for Counted {
        fn name(&self) -> &'static str {
            self.name
        }
        fn reason(&self) -> &'static str {
            "counted"
        }
        async fn evaluate(&self, _url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(CheckOutcome::Negative)
        }
    }

    struct Hangs(&'static str);

    #[async_trait]
    impl Check for Hangs {
        fn name(&self) -> &'static str {
            self.0
        }
        fn reason(&self) -> &'static str {
            "hangs"
        }
        async fn evaluate(&self, _url: &CanonicalUrl) -> Result<CheckOutcome, RadarError> {
            std::future::pending::<()>().await;
            Ok(CheckOutcome::positive())
        }
    }

    const NAMES: [&str; 6] = ["c1", "c2", "c3", "c4", "c5", "c6"];

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn in_flight_checks_never_exceed_max_concurrency() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        for name in NAMES {
            registry
                .register(Arc::new(Counted {
                    name,
                    in_flight: in_flight.clone(),
                    peak: peak.clone(),
                }))
                .unwrap();
        }
        let engine = Engine::new(&config(1000), registry);
        let results = engine.run_all(url()).await;

        assert_eq!(results.len(), NAMES.len());
        assert!(results.values().all(|o| *o == CheckOutcome::Negative));
        let peak = peak.load(Ordering::SeqCst);
        assert!((1..=2).contains(&peak), "peak in-flight was {peak}");
    }

    #[tokio::test]
    async fn queued_checks_share_one_deadline() {
        let mut registry = Registry::new();
        for name in NAMES {
            registry.register(Arc::new(Hangs(name))).unwrap();
        }
        let engine = Engine::new(&config(200), registry);

        let started = Instant::now();
        let results = engine.run_all(url()).await;
        let elapsed = started.elapsed();

        assert!(elapsed < Duration::from_millis(400), "took {elapsed:?}");
        assert!(results
            .values()
            .all(|o| *o == CheckOutcome::indeterminate("timeout")));
    }

    #[tokio::test]
    async fn empty_registry_yields_empty_set() {
        let engine = Engine::new(&config(1000), Registry::new());
        assert!(engine.run_all(url()).await.is_empty());
    }
}
