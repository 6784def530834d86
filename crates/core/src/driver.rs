use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::customer::{CustomerDraft, CustomerId, CustomerPatch, CustomerRecord, WireCustomer};
use crate::domain::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::domain::scenario::{FollowUp, Scenario, Target};
use crate::errors::HarnessError;
use crate::flows::{ScenarioEvent, ScenarioMachine, StepContext};
use crate::oracle::ReadConsistency;
use crate::ports::{HttpAdapter, PersistenceOracle};
use crate::report::{ScenarioReport, StepKind, StepReport};
use crate::verify::{Discrepancy, ReconciliationVerifier, VerificationResult, VerifierSettings};

pub const DEFAULT_ENDPOINT: &str = "/api/customer";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverSettings {
    pub endpoint: String,
    pub consistency: ReadConsistency,
    pub verifier: VerifierSettings,
    pub teardown: bool,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            consistency: ReadConsistency::default(),
            verifier: VerifierSettings::default(),
            teardown: false,
        }
    }
}

/// Progress of one scenario: the current step's machine plus finished steps.
struct FlowRun<'s> {
    scenario: &'s str,
    machine: ScenarioMachine,
    kind: StepKind,
    status: Option<u16>,
    recorded: bool,
    created: Option<CustomerId>,
    /// Ids the service assigned when it should have refused the write.
    strays: Vec<CustomerId>,
    steps: Vec<StepReport>,
}

impl<'s> FlowRun<'s> {
    fn new(scenario: &'s str) -> Self {
        Self {
            scenario,
            machine: ScenarioMachine::default(),
            kind: StepKind::Create,
            status: None,
            recorded: false,
            created: None,
            strays: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Re-enters `Built` for the next step with the id bound into it.
    fn chain(&mut self, kind: StepKind, id: CustomerId) -> Result<(), HarnessError> {
        self.machine.fire(ScenarioEvent::FollowUpBound, &StepContext::bound(id))?;
        self.kind = kind;
        self.status = None;
        self.recorded = false;
        Ok(())
    }

    /// Records the step result; returns whether the step reached `Done`.
    fn settle(&mut self, verification: VerificationResult) -> Result<bool, HarnessError> {
        let passed = verification.passed();
        self.machine
            .fire(ScenarioEvent::VerificationCompleted, &StepContext::verified(passed))?;
        if passed {
            self.machine.fire(ScenarioEvent::ResultRecorded, &StepContext::verified(true))?;
        }

        debug!(
            event_name = "scenario.step.settled",
            scenario = self.scenario,
            step = ?self.kind,
            status = self.status,
            state = ?self.machine.state(),
            passed,
            "scenario step verified"
        );
        self.steps.push(StepReport {
            kind: self.kind,
            status: self.status,
            final_state: self.machine.state(),
            verification,
        });
        self.recorded = true;
        Ok(passed)
    }

    /// Keeps the step that was interrupted, at whatever state it reached.
    fn abandon(&mut self) {
        if self.recorded {
            return;
        }
        self.steps.push(StepReport {
            kind: self.kind,
            status: self.status,
            final_state: self.machine.state(),
            verification: VerificationResult::default(),
        });
        self.recorded = true;
    }
}

/// Runs one scenario end to end: sends each step, captures the response,
/// reconciles it against the store and chains follow-up steps.
pub struct ScenarioDriver<H: ?Sized, O: ?Sized> {
    http: Arc<H>,
    verifier: ReconciliationVerifier<O>,
    endpoint: String,
    teardown: bool,
    duplicate_lock: Arc<Mutex<()>>,
}

impl<H, O> ScenarioDriver<H, O>
where
    H: HttpAdapter + ?Sized,
    O: PersistenceOracle + ?Sized,
{
    pub fn new(http: Arc<H>, oracle: Arc<O>, settings: DriverSettings) -> Self {
        Self {
            http,
            verifier: ReconciliationVerifier::new(oracle, settings.consistency, settings.verifier),
            endpoint: settings.endpoint,
            teardown: settings.teardown,
            duplicate_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn run(&self, scenario: &Scenario) -> ScenarioReport {
        let started = Instant::now();
        let mut run = FlowRun::new(&scenario.name);

        let result = match &scenario.follow_up {
            FollowUp::None => self.create_flow(scenario, &mut run).await,
            FollowUp::Lifecycle { update } => self.lifecycle_flow(scenario, update, &mut run).await,
            FollowUp::DuplicateEmail { second } => {
                let _serialized = self.duplicate_lock.lock().await;
                self.duplicate_flow(scenario, second, &mut run).await
            }
        };

        let mut errors = Vec::new();
        if let Err(error) = result {
            warn!(
                event_name = "scenario.aborted",
                scenario = %scenario.name,
                step = ?run.kind,
                state = ?run.machine.state(),
                error = %error,
                "scenario stopped before verification completed"
            );
            run.abandon();
            errors.push(Discrepancy::from_error(&error));
        }

        for id in run.created.take().into_iter().chain(run.strays.drain(..)) {
            self.teardown(&scenario.name, id).await;
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let report =
            ScenarioReport::from_steps(&scenario.name, scenario.family, run.steps, errors, elapsed_ms);
        for discrepancy in &report.discrepancies {
            warn!(
                event_name = "scenario.discrepancy",
                scenario = %scenario.name,
                kind = ?discrepancy.kind,
                view = discrepancy.view.as_str(),
                "{discrepancy}"
            );
        }
        info!(
            event_name = "scenario.completed",
            scenario = %scenario.name,
            family = ?scenario.family,
            outcome = ?report.outcome,
            steps = report.steps.len(),
            discrepancies = report.discrepancies.len(),
            elapsed_ms,
            "scenario finished"
        );
        report
    }

    async fn create_flow(&self, scenario: &Scenario, run: &mut FlowRun<'_>) -> Result<(), HarnessError> {
        self.create_step(scenario, run).await.map(|_| ())
    }

    async fn lifecycle_flow(
        &self,
        scenario: &Scenario,
        update: &CustomerPatch,
        run: &mut FlowRun<'_>,
    ) -> Result<(), HarnessError> {
        let Some(before) = self.create_step(scenario, run).await? else {
            return Ok(());
        };
        let id = before.id;
        let item = Target::Item(id).path(&self.endpoint);

        run.chain(StepKind::Update, id)?;
        let intended = update.apply(&before);
        let put = self
            .exchange(run, HttpRequest::json(HttpMethod::Put, &item, intended.to_json_literal()))
            .await?;
        let get = self.http.send(HttpRequest::new(HttpMethod::Get, &item)).await?;
        let verification = self.verifier.verify_update(&before, &intended, &put, &get).await?;
        if !run.settle(verification)? {
            return Ok(());
        }

        run.chain(StepKind::Delete, id)?;
        let delete = self.exchange(run, HttpRequest::new(HttpMethod::Delete, &item)).await?;
        let get_after = self.http.send(HttpRequest::new(HttpMethod::Get, &item)).await?;
        let repeat = self.http.send(HttpRequest::new(HttpMethod::Delete, &item)).await?;
        let verification = self.verifier.verify_delete(id, &delete, &get_after, &repeat).await?;
        if run.settle(verification)? {
            run.created = None;
        }
        Ok(())
    }

    async fn duplicate_flow(
        &self,
        scenario: &Scenario,
        second: &CustomerDraft,
        run: &mut FlowRun<'_>,
    ) -> Result<(), HarnessError> {
        let Some(first) = self.create_step(scenario, run).await? else {
            return Ok(());
        };

        run.chain(StepKind::DuplicateCreate, first.id)?;
        let collection = Target::Collection.path(&self.endpoint);
        let response = self
            .exchange(run, HttpRequest::json(HttpMethod::Post, collection, second.to_json_literal()))
            .await?;
        if let Some(id) = assigned_id(&response).filter(|id| *id != first.id) {
            warn!(
                event_name = "scenario.duplicate.created",
                scenario = run.scenario,
                customer_id = %id,
                "duplicate create assigned a second id"
            );
            run.strays.push(id);
        }
        let verification = self.verifier.verify_duplicate(&first, &response).await?;
        run.settle(verification)?;
        Ok(())
    }

    /// Sends the scenario's own request and verifies it. Returns the
    /// confirmed record when the step reached `Done` with one.
    async fn create_step(
        &self,
        scenario: &Scenario,
        run: &mut FlowRun<'_>,
    ) -> Result<Option<CustomerRecord>, HarnessError> {
        let request = scenario.request.to_http(&self.endpoint);
        let response = self.exchange(run, request).await?;
        run.created = assigned_id(&response);

        let verification =
            self.verifier.verify(scenario.input(), scenario.expected, &response).await?;
        let confirmed = verification.confirmed.clone();
        let passed = run.settle(verification)?;
        Ok(confirmed.filter(|_| passed))
    }

    async fn exchange(
        &self,
        run: &mut FlowRun<'_>,
        request: HttpRequest,
    ) -> Result<HttpResponse, HarnessError> {
        run.machine.fire(ScenarioEvent::Dispatched, &StepContext::default())?;
        debug!(
            event_name = "scenario.step.dispatched",
            scenario = run.scenario,
            step = ?run.kind,
            method = %request.method,
            path = %request.path,
            "request sent"
        );

        let response = self.http.send(request).await?;
        run.status = Some(response.status);
        run.machine.fire(ScenarioEvent::ResponseCaptured, &StepContext::default())?;
        Ok(response)
    }

    async fn teardown(&self, scenario: &str, id: CustomerId) {
        if !self.teardown {
            return;
        }
        let request = HttpRequest::new(HttpMethod::Delete, Target::Item(id).path(&self.endpoint));
        match self.http.send(request).await {
            Ok(response) if response.is_success() || response.status == 404 => {
                debug!(
                    event_name = "scenario.teardown.completed",
                    scenario,
                    customer_id = %id,
                    status = response.status,
                    "created record removed"
                );
            }
            Ok(response) => warn!(
                event_name = "scenario.teardown.rejected",
                scenario,
                customer_id = %id,
                status = response.status,
                "service refused to remove created record"
            ),
            Err(error) => warn!(
                event_name = "scenario.teardown.failed",
                scenario,
                customer_id = %id,
                error = %error,
                "created record could not be removed"
            ),
        }
    }
}

fn assigned_id(response: &HttpResponse) -> Option<CustomerId> {
    if !response.is_success() {
        return None;
    }
    response
        .decode::<WireCustomer>()
        .ok()
        .and_then(|wire| wire.customer_id)
        .filter(CustomerId::is_assigned)
}
