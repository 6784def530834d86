use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, Instrument};

use crate::domain::scenario::Scenario;
use crate::driver::ScenarioDriver;
use crate::ports::{HttpAdapter, PersistenceOracle};
use crate::report::{RunSummary, ScenarioReport};

pub const DEFAULT_WORKERS: usize = 4;

/// Fans scenarios out over at most `workers` concurrent tasks.
pub struct ScenarioRunner<H: ?Sized, O: ?Sized> {
    driver: Arc<ScenarioDriver<H, O>>,
    workers: usize,
}

impl<H, O> ScenarioRunner<H, O>
where
    H: HttpAdapter + ?Sized + 'static,
    O: PersistenceOracle + ?Sized + 'static,
{
    pub fn new(driver: ScenarioDriver<H, O>, workers: usize) -> Self {
        Self { driver: Arc::new(driver), workers: workers.max(1) }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs every scenario and returns the reports in table order. A panicking
    /// scenario becomes a failed report; its siblings keep running.
    pub async fn run(&self, run_id: &str, scenarios: Vec<Scenario>) -> RunSummary {
        let started_at = Utc::now();
        let started = Instant::now();
        let total = scenarios.len();
        info!(
            event_name = "run.started",
            run_id,
            scenarios = total,
            workers = self.workers,
            "scenario run started"
        );

        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        let mut identities = Vec::with_capacity(total);

        for (index, scenario) in scenarios.into_iter().enumerate() {
            identities.push((scenario.name.clone(), scenario.family));
            let driver = Arc::clone(&self.driver);
            let permits = Arc::clone(&permits);
            let span = tracing::info_span!("scenario", run_id, scenario = %scenario.name);
            tasks.spawn(
                async move {
                    let _permit = permits.acquire_owned().await;
                    (index, driver.run(&scenario).await)
                }
                .instrument(span),
            );
        }

        let mut slots: Vec<Option<ScenarioReport>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => slots[index] = Some(report),
                Err(join_error) => error!(
                    event_name = "run.scenario_task_failed",
                    run_id,
                    error = %join_error,
                    "scenario task did not complete"
                ),
            }
        }

        let reports: Vec<ScenarioReport> = slots
            .into_iter()
            .zip(identities)
            .map(|(slot, (name, family))| {
                slot.unwrap_or_else(|| {
                    ScenarioReport::aborted(&name, family, "scenario task panicked or was cancelled")
                })
            })
            .collect();

        let summary =
            RunSummary::new(run_id, started_at, started.elapsed().as_millis() as u64, reports);
        info!(
            event_name = "run.completed",
            run_id,
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            elapsed_ms = summary.elapsed_ms,
            "scenario run finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::domain::http::{HttpRequest, HttpResponse};
    use crate::driver::{DriverSettings, ScenarioDriver};
    use crate::errors::TransportError;
    use crate::fakes::{InMemoryCustomerService, InMemoryCustomerStore, ServiceBehavior};
    use crate::fixtures::FixtureBuilder;
    use crate::oracle::ReadConsistency;
    use crate::ports::HttpAdapter;
    use crate::runner::ScenarioRunner;

    const ENDPOINT: &str = "/api/customer";

    fn settings() -> DriverSettings {
        DriverSettings {
            consistency: ReadConsistency::Eventual {
                timeout: Duration::from_millis(200),
                interval: Duration::from_millis(10),
            },
            ..DriverSettings::default()
        }
    }

    fn runner(behavior: ServiceBehavior, workers: usize) -> ScenarioRunner<InMemoryCustomerService, InMemoryCustomerStore> {
        let store = Arc::new(InMemoryCustomerStore::default());
        let service =
            Arc::new(InMemoryCustomerService::with_behavior(Arc::clone(&store), ENDPOINT, behavior));
        ScenarioRunner::new(ScenarioDriver::new(service, store, settings()), workers)
    }

    #[tokio::test]
    async fn standard_table_passes_in_order_against_a_correct_service() {
        let table = FixtureBuilder::new().standard_table();
        let expected: Vec<_> = table.iter().map(|scenario| scenario.name.clone()).collect();

        let summary = runner(ServiceBehavior::default(), 4).run("run-ok", table).await;

        let order: Vec<_> = summary.reports.iter().map(|report| report.scenario.clone()).collect();
        assert_eq!(order, expected);
        assert!(summary.all_passed(), "{:?}", summary.failures().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn leaky_service_fails_only_the_rejection_scenarios() {
        let summary = runner(ServiceBehavior { persist_invalid: true, ..ServiceBehavior::default() }, 3)
            .run("run-leaky", FixtureBuilder::new().with_run_tag("leak").standard_table())
            .await;

        assert!(!summary.all_passed());
        let create = summary
            .reports
            .iter()
            .find(|report| report.scenario == "create-valid-customer")
            .expect("create report");
        assert!(create.passed());
        let leaked = summary
            .reports
            .iter()
            .find(|report| report.scenario == "invalid-email-missing-at")
            .expect("leak report");
        assert!(!leaked.passed());
    }

    struct Gauge {
        inner: InMemoryCustomerService,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl HttpAdapter for Gauge {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            let response = self.inner.send(request).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            response
        }
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_the_worker_bound() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let gauge = Arc::new(Gauge {
            inner: InMemoryCustomerService::new(Arc::clone(&store), ENDPOINT),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let runner =
            ScenarioRunner::new(ScenarioDriver::new(Arc::clone(&gauge), store, settings()), 2);

        let summary = runner.run("run-bounded", FixtureBuilder::new().standard_table()).await;

        assert!(summary.all_passed());
        assert!(gauge.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn zero_workers_still_runs_with_one() {
        let runner = runner(ServiceBehavior::default(), 0);
        assert_eq!(runner.workers(), 1);

        let summary = runner.run("run-single", FixtureBuilder::new().success_scenarios()).await;
        assert_eq!(summary.total, 4);
    }
}
