use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::scenario::ScenarioFamily;
use crate::flows::ScenarioState;
use crate::verify::{Discrepancy, DiscrepancyKind, VerificationResult, View};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Create,
    Update,
    Delete,
    DuplicateCreate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub kind: StepKind,
    pub status: Option<u16>,
    pub final_state: ScenarioState,
    pub verification: VerificationResult,
}

impl StepReport {
    pub fn passed(&self) -> bool {
        self.final_state == ScenarioState::Done && self.verification.passed()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioOutcome {
    Passed,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub family: ScenarioFamily,
    pub outcome: ScenarioOutcome,
    pub steps: Vec<StepReport>,
    pub discrepancies: Vec<Discrepancy>,
    pub notes: Vec<String>,
    pub elapsed_ms: u64,
}

impl ScenarioReport {
    /// Folds step results into one report. Harness errors are appended after
    /// the step discrepancies.
    pub fn from_steps(
        scenario: &str,
        family: ScenarioFamily,
        steps: Vec<StepReport>,
        errors: Vec<Discrepancy>,
        elapsed_ms: u64,
    ) -> Self {
        let mut discrepancies: Vec<Discrepancy> =
            steps.iter().flat_map(|step| step.verification.discrepancies.clone()).collect();
        discrepancies.extend(errors);
        let notes = steps.iter().flat_map(|step| step.verification.notes.clone()).collect();
        let outcome = if discrepancies.is_empty() && steps.iter().all(StepReport::passed) {
            ScenarioOutcome::Passed
        } else {
            ScenarioOutcome::Failed
        };

        Self {
            scenario: scenario.to_string(),
            family,
            outcome,
            steps,
            discrepancies,
            notes,
            elapsed_ms,
        }
    }

    /// Report for a scenario whose task never finished.
    pub fn aborted(scenario: &str, family: ScenarioFamily, message: impl Into<String>) -> Self {
        Self {
            scenario: scenario.to_string(),
            family,
            outcome: ScenarioOutcome::Failed,
            steps: Vec::new(),
            discrepancies: vec![Discrepancy {
                kind: DiscrepancyKind::Internal,
                view: View::Harness,
                field: None,
                expected: String::new(),
                observed: String::new(),
                message: message.into(),
            }],
            notes: Vec::new(),
            elapsed_ms: 0,
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome == ScenarioOutcome::Passed
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub reports: Vec<ScenarioReport>,
}

impl RunSummary {
    pub fn new(
        run_id: impl Into<String>,
        started_at: DateTime<Utc>,
        elapsed_ms: u64,
        reports: Vec<ScenarioReport>,
    ) -> Self {
        let passed = reports.iter().filter(|report| report.passed()).count();
        Self {
            run_id: run_id.into(),
            started_at,
            elapsed_ms,
            total: reports.len(),
            passed,
            failed: reports.len() - passed,
            reports,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioReport> {
        self.reports.iter().filter(|report| !report.passed())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::domain::scenario::ScenarioFamily;
    use crate::flows::ScenarioState;
    use crate::report::{RunSummary, ScenarioOutcome, ScenarioReport, StepKind, StepReport};
    use crate::verify::{Discrepancy, VerificationResult, View};

    fn step(final_state: ScenarioState, discrepancies: Vec<Discrepancy>) -> StepReport {
        StepReport {
            kind: StepKind::Create,
            status: Some(200),
            final_state,
            verification: VerificationResult { discrepancies, ..VerificationResult::default() },
        }
    }

    #[test]
    fn clean_steps_make_a_passing_report() {
        let report = ScenarioReport::from_steps(
            "create-valid-customer",
            ScenarioFamily::Success,
            vec![step(ScenarioState::Done, Vec::new())],
            Vec::new(),
            12,
        );

        assert_eq!(report.outcome, ScenarioOutcome::Passed);
    }

    #[test]
    fn step_stuck_before_done_fails_the_report() {
        let report = ScenarioReport::from_steps(
            "create-valid-customer",
            ScenarioFamily::Success,
            vec![step(ScenarioState::Sent, Vec::new())],
            Vec::new(),
            12,
        );

        assert!(!report.passed());
    }

    #[test]
    fn summary_counts_failures() {
        let failing = ScenarioReport::from_steps(
            "invalid-email-missing-at",
            ScenarioFamily::StructuredInvalid,
            vec![step(
                ScenarioState::Verified,
                vec![Discrepancy::assertion(View::Persisted, None, "<absent>", "{}", "leak")],
            )],
            Vec::new(),
            3,
        );
        let aborted = ScenarioReport::aborted("lifecycle-rename", ScenarioFamily::Lifecycle, "panic");
        let passing = ScenarioReport::from_steps(
            "create-valid-customer",
            ScenarioFamily::Success,
            vec![step(ScenarioState::Done, Vec::new())],
            Vec::new(),
            1,
        );

        let summary = RunSummary::new("run-1", Utc::now(), 20, vec![failing, aborted, passing]);

        assert_eq!((summary.total, summary.passed, summary.failed), (3, 1, 2));
        assert!(!summary.all_passed());
        let names: Vec<_> = summary.failures().map(|report| report.scenario.as_str()).collect();
        assert_eq!(names, vec!["invalid-email-missing-at", "lifecycle-rename"]);
    }
}
