use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::customer::{CustomerDraft, CustomerId, CustomerRecord, Field, WireCustomer};
use crate::domain::http::{HttpResponse, APPLICATION_JSON, CONTENT_TYPE};
use crate::domain::scenario::{AcceptedRule, ExpectedOutcome, StatusClass};
use crate::errors::{HarnessError, OracleError};
use crate::oracle::{Convergence, ConvergingReader, ReadConsistency};
use crate::ports::PersistenceOracle;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    Assertion,
    ConsistencyTimeout,
    Transport,
    Oracle,
    Internal,
}

/// Where a disagreement was observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Status,
    ContentType,
    Wire,
    Readback,
    Persisted,
    Harness,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::ContentType => "content_type",
            Self::Wire => "wire",
            Self::Readback => "readback",
            Self::Persisted => "persisted",
            Self::Harness => "harness",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub kind: DiscrepancyKind,
    pub view: View,
    pub field: Option<Field>,
    pub expected: String,
    pub observed: String,
    pub message: String,
}

impl Discrepancy {
    pub fn assertion(
        view: View,
        field: Option<Field>,
        expected: impl Into<String>,
        observed: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: DiscrepancyKind::Assertion,
            view,
            field,
            expected: expected.into(),
            observed: observed.into(),
            message: message.into(),
        }
    }

    fn with_kind(mut self, kind: DiscrepancyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn from_error(error: &HarnessError) -> Self {
        Self {
            kind: error.kind(),
            view: View::Harness,
            field: None,
            expected: String::new(),
            observed: String::new(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DiscrepancyKind::Assertion => "assertion",
            DiscrepancyKind::ConsistencyTimeout => "consistency_timeout",
            DiscrepancyKind::Transport => "transport",
            DiscrepancyKind::Oracle => "oracle",
            DiscrepancyKind::Internal => "internal",
        };
        write!(f, "[{kind}] {}", self.view.as_str())?;
        if let Some(field) = self.field {
            write!(f, ".{field}")?;
        }
        write!(f, ": {}", self.message)?;
        if !self.expected.is_empty() || !self.observed.is_empty() {
            write!(f, " (expected `{}`, observed `{}`)", self.expected, self.observed)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub discrepancies: Vec<Discrepancy>,
    pub confirmed: Option<CustomerRecord>,
    pub notes: Vec<String>,
}

impl VerificationResult {
    pub fn passed(&self) -> bool {
        self.discrepancies.is_empty()
    }

    fn push(&mut self, discrepancy: Discrepancy) {
        self.discrepancies.push(discrepancy);
    }

    fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierSettings {
    pub require_json_errors: bool,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self { require_json_errors: true }
    }
}

/// Cross-checks what the service answered against what the store holds.
///
/// Oracle I/O failures are returned as errors; every disagreement between
/// the views is reported as a [`Discrepancy`] in the result.
pub struct ReconciliationVerifier<O: ?Sized> {
    reader: ConvergingReader<O>,
    settings: VerifierSettings,
}

impl<O> ReconciliationVerifier<O>
where
    O: PersistenceOracle + ?Sized,
{
    pub fn new(oracle: Arc<O>, consistency: ReadConsistency, settings: VerifierSettings) -> Self {
        Self { reader: ConvergingReader::new(oracle, consistency), settings }
    }

    pub fn settings(&self) -> VerifierSettings {
        self.settings
    }

    pub async fn verify(
        &self,
        input: &CustomerDraft,
        expected: ExpectedOutcome,
        response: &HttpResponse,
    ) -> Result<VerificationResult, OracleError> {
        match expected {
            ExpectedOutcome::Accepted => self.verify_accepted(input, AcceptedRule::Verbatim, response).await,
            ExpectedOutcome::Rejected(class) => self.verify_rejected(input, class, response).await,
            ExpectedOutcome::EitherOutcome(rule) => {
                let mut result = if response.is_success() {
                    self.verify_accepted(input, rule, response).await?
                } else {
                    self.verify_rejected(input, StatusClass::Validation, response).await?
                };
                let branch = if response.is_success() { "accepted" } else { "rejected" };
                result.note(format!("service {branch} the input with status {}", response.status));
                Ok(result)
            }
        }
    }

    pub async fn verify_update(
        &self,
        before: &CustomerRecord,
        intended: &CustomerRecord,
        put: &HttpResponse,
        get: &HttpResponse,
    ) -> Result<VerificationResult, OracleError> {
        let mut result = VerificationResult::default();

        if !put.is_success() {
            result.push(status_mismatch(StatusClass::Success, put));
            return Ok(result);
        }
        if put.body.trim().is_empty() {
            result.note("update response carried no body");
        } else {
            match decode_record(put, View::Wire) {
                Ok(echoed) => diff_into(&mut result, View::Wire, intended, &echoed),
                Err(discrepancy) => result.push(discrepancy),
            }
        }

        if get.is_success() {
            match decode_record(get, View::Readback) {
                Ok(read) => diff_into(&mut result, View::Readback, intended, &read),
                Err(discrepancy) => result.push(discrepancy),
            }
        } else {
            result.push(
                Discrepancy::assertion(
                    View::Readback,
                    None,
                    StatusClass::Success.describe(),
                    get.status.to_string(),
                    "updated record could not be read back",
                ),
            );
        }

        let convergence =
            self.reader.by_id(intended.id, |found| found.as_ref() == Some(intended)).await?;
        if let Convergence::TimedOut { last, .. } = convergence {
            match last {
                None => result.push(Discrepancy::assertion(
                    View::Persisted,
                    Some(Field::Id),
                    intended.id.to_string(),
                    "<absent>",
                    "record vanished after update",
                )),
                Some(stored) if stored.same_fields(before) && self.reader.is_eventual() => {
                    result.push(
                        Discrepancy::assertion(
                            View::Persisted,
                            None,
                            intended.to_json_literal(),
                            stored.to_json_literal(),
                            "store still shows pre-update values",
                        )
                        .with_kind(DiscrepancyKind::ConsistencyTimeout),
                    );
                }
                Some(stored) => diff_into(&mut result, View::Persisted, intended, &stored),
            }
        }

        if before.email != intended.email {
            if let Some(stale) = self.reader.oracle().find_by_email(&before.email).await? {
                result.push(Discrepancy::assertion(
                    View::Persisted,
                    Some(Field::Email),
                    "<absent>",
                    stale.id.to_string(),
                    format!("old email `{}` still resolves", before.email),
                ));
            }
        }

        if result.passed() {
            result.confirmed = Some(intended.clone());
        }
        Ok(result)
    }

    pub async fn verify_delete(
        &self,
        id: CustomerId,
        delete: &HttpResponse,
        get_after: &HttpResponse,
        repeat: &HttpResponse,
    ) -> Result<VerificationResult, OracleError> {
        let mut result = VerificationResult::default();

        if !delete.is_success() {
            result.push(status_mismatch(StatusClass::Success, delete));
            return Ok(result);
        }

        let convergence = self.reader.by_id(id, Option::is_none).await?;
        match convergence {
            Convergence::TimedOut { last: Some(stored), .. } => {
                let discrepancy = Discrepancy::assertion(
                    View::Persisted,
                    Some(Field::Id),
                    "<absent>",
                    stored.to_json_literal(),
                    "record still present after delete",
                );
                result.push(if self.reader.is_eventual() {
                    discrepancy.with_kind(DiscrepancyKind::ConsistencyTimeout)
                } else {
                    discrepancy
                });
            }
            _ => {
                if self.reader.oracle().exists_by_id(id).await? {
                    result.push(Discrepancy::assertion(
                        View::Persisted,
                        Some(Field::Id),
                        "false",
                        "true",
                        "exists check still reports the deleted id",
                    ));
                }
            }
        }

        if !StatusClass::NotFound.accepts(get_after.status) {
            result.push(Discrepancy::assertion(
                View::Readback,
                None,
                StatusClass::NotFound.describe(),
                get_after.status.to_string(),
                "deleted record is still served",
            ));
        }

        if !(StatusClass::NotFound.accepts(repeat.status)
            || StatusClass::Success.accepts(repeat.status))
        {
            result.push(Discrepancy::assertion(
                View::Status,
                None,
                "404|2xx",
                repeat.status.to_string(),
                "repeated delete answered with an unexpected status",
            ));
        }

        Ok(result)
    }

    pub async fn verify_duplicate(
        &self,
        first: &CustomerRecord,
        response: &HttpResponse,
    ) -> Result<VerificationResult, OracleError> {
        let mut result = VerificationResult::default();

        if !StatusClass::Conflict.accepts(response.status) {
            result.push(status_mismatch(StatusClass::Conflict, response));
        } else {
            self.check_error_content_type(&mut result, response);
        }

        let oracle = self.reader.oracle();
        let count = oracle.count_by_email(&first.email).await?;
        if count != 1 {
            result.push(Discrepancy::assertion(
                View::Persisted,
                Some(Field::Email),
                "1",
                count.to_string(),
                format!("expected exactly one record for `{}`", first.email),
            ));
        }

        match oracle.find_by_email(&first.email).await? {
            Some(stored) => diff_into(&mut result, View::Persisted, first, &stored),
            None => result.push(Discrepancy::assertion(
                View::Persisted,
                Some(Field::Email),
                first.email.clone(),
                "<absent>",
                "original record disappeared after duplicate create",
            )),
        }

        if result.passed() {
            result.confirmed = Some(first.clone());
        }
        Ok(result)
    }

    async fn verify_accepted(
        &self,
        input: &CustomerDraft,
        rule: AcceptedRule,
        response: &HttpResponse,
    ) -> Result<VerificationResult, OracleError> {
        let mut result = VerificationResult::default();

        if !response.is_success() {
            result.push(status_mismatch(StatusClass::Success, response));
            return Ok(result);
        }

        let wire = match decode_record(response, View::Wire) {
            Ok(wire) => wire,
            Err(discrepancy) => {
                result.push(discrepancy);
                return Ok(result);
            }
        };
        if !wire.id.is_assigned() {
            result.push(Discrepancy::assertion(
                View::Wire,
                Some(Field::Id),
                "assigned id",
                wire.id.to_string(),
                "service returned the default id",
            ));
            return Ok(result);
        }

        // Every field the rule does not exempt must match the input.
        let sent = expected_record(input, wire.id);
        let expected = match rule {
            AcceptedRule::Verbatim => sent,
            AcceptedRule::Sanitized => {
                if input.name.as_deref() == Some(wire.name.as_str()) {
                    result.push(Discrepancy::assertion(
                        View::Wire,
                        Some(Field::Name),
                        "sanitized name",
                        wire.name.clone(),
                        "markup was echoed back unsanitized",
                    ));
                }
                CustomerRecord { name: wire.name.clone(), ..sent }
            }
            AcceptedRule::Lenient => CustomerRecord { active: wire.active, ..sent },
        };
        diff_into(&mut result, View::Wire, &expected, &wire);

        let convergence = self.reader.by_id(wire.id, |found| found.as_ref() == Some(&wire)).await?;
        match convergence {
            Convergence::Converged(_) => {}
            Convergence::TimedOut { last: None, .. } => {
                let discrepancy = Discrepancy::assertion(
                    View::Persisted,
                    Some(Field::Id),
                    wire.id.to_string(),
                    "<absent>",
                    format!("record {} not found in store", wire.id),
                );
                result.push(if self.reader.is_eventual() {
                    discrepancy.with_kind(DiscrepancyKind::ConsistencyTimeout)
                } else {
                    discrepancy
                });
            }
            Convergence::TimedOut { last: Some(stored), .. } => {
                diff_into(&mut result, View::Persisted, &wire, &stored);
            }
        }

        if result.passed() {
            let oracle = self.reader.oracle();
            match oracle.find_by_email(&expected.email).await? {
                Some(stored) => diff_into(&mut result, View::Persisted, &expected, &stored),
                None => result.push(Discrepancy::assertion(
                    View::Persisted,
                    Some(Field::Email),
                    expected.email.clone(),
                    "<absent>",
                    format!("no record stored under `{}`", expected.email),
                )),
            }

            let count = oracle.count_by_email(&expected.email).await?;
            if count != 1 {
                result.push(Discrepancy::assertion(
                    View::Persisted,
                    Some(Field::Email),
                    "1",
                    count.to_string(),
                    format!("expected exactly one record for `{}`", expected.email),
                ));
            }
        }

        if result.passed() {
            result.confirmed = Some(wire);
        }
        Ok(result)
    }

    async fn verify_rejected(
        &self,
        input: &CustomerDraft,
        class: StatusClass,
        response: &HttpResponse,
    ) -> Result<VerificationResult, OracleError> {
        let mut result = VerificationResult::default();

        if class.accepts(response.status) {
            self.check_error_content_type(&mut result, response);
        } else {
            result.push(status_mismatch(class, response));
        }

        match input.email.as_deref() {
            None => result.note("input carries no email; absence check skipped"),
            Some(email) => {
                if let Some(stored) = self.reader.oracle().find_by_email(email).await? {
                    result.push(Discrepancy::assertion(
                        View::Persisted,
                        Some(Field::Email),
                        "<absent>",
                        stored.to_json_literal(),
                        "invalid input was persisted",
                    ));
                }
            }
        }

        Ok(result)
    }

    fn check_error_content_type(&self, result: &mut VerificationResult, response: &HttpResponse) {
        if self.settings.require_json_errors && !response.is_json() {
            result.push(Discrepancy::assertion(
                View::ContentType,
                None,
                APPLICATION_JSON,
                response.header(CONTENT_TYPE).unwrap_or("<none>"),
                "error response is not json",
            ));
        }
    }
}

fn status_mismatch(class: StatusClass, response: &HttpResponse) -> Discrepancy {
    Discrepancy::assertion(
        View::Status,
        None,
        class.describe(),
        response.status.to_string(),
        format!("unexpected status; body: {}", response.body_excerpt()),
    )
}

fn decode_record(response: &HttpResponse, view: View) -> Result<CustomerRecord, Discrepancy> {
    let wire: WireCustomer = response.decode().map_err(|error| {
        Discrepancy::assertion(
            view,
            None,
            "customer json",
            response.body_excerpt(),
            format!("body is not a customer record: {error}"),
        )
    })?;
    wire.into_record().map_err(|missing| {
        Discrepancy::assertion(view, Some(missing.0), "present", "<missing>", missing.to_string())
    })
}

fn expected_record(input: &CustomerDraft, id: CustomerId) -> CustomerRecord {
    CustomerRecord {
        id,
        name: input.name.clone().unwrap_or_default(),
        address: input.address.clone(),
        email: input.email.clone().unwrap_or_default(),
        active: input.active,
    }
}

fn diff_into(
    result: &mut VerificationResult,
    view: View,
    expected: &CustomerRecord,
    observed: &CustomerRecord,
) {
    let mut mismatch = |field: Field, expected: String, observed: String| {
        result.push(Discrepancy::assertion(
            view,
            Some(field),
            expected,
            observed,
            format!("{} differs from the expected value", field),
        ));
    };

    if expected.id != observed.id {
        mismatch(Field::Id, expected.id.to_string(), observed.id.to_string());
    }
    if expected.name != observed.name {
        mismatch(Field::Name, expected.name.clone(), observed.name.clone());
    }
    if expected.address != observed.address {
        mismatch(
            Field::Address,
            expected.address.clone().unwrap_or_else(|| "<null>".to_string()),
            observed.address.clone().unwrap_or_else(|| "<null>".to_string()),
        );
    }
    if expected.email != observed.email {
        mismatch(Field::Email, expected.email.clone(), observed.email.clone());
    }
    if expected.active != observed.active {
        mismatch(Field::Active, expected.active.to_string(), observed.active.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::domain::customer::{CustomerDraft, CustomerPatch, CustomerRecord, Field};
    use crate::domain::http::{HttpResponse, APPLICATION_JSON, CONTENT_TYPE};
    use crate::domain::scenario::{AcceptedRule, ExpectedOutcome, StatusClass};
    use crate::fakes::InMemoryCustomerStore;
    use crate::oracle::ReadConsistency;
    use crate::verify::{DiscrepancyKind, ReconciliationVerifier, VerifierSettings, View};

    fn verifier(store: &Arc<InMemoryCustomerStore>) -> ReconciliationVerifier<InMemoryCustomerStore> {
        ReconciliationVerifier::new(
            Arc::clone(store),
            ReadConsistency::Strong,
            VerifierSettings::default(),
        )
    }

    fn echo(status: u16, record: &CustomerRecord) -> HttpResponse {
        HttpResponse::new(status)
            .with_header(CONTENT_TYPE, APPLICATION_JSON)
            .with_body(record.to_json_literal())
    }

    fn json_error(status: u16) -> HttpResponse {
        HttpResponse::json(status, &serde_json::json!({"error": "validation failed"}))
    }

    fn alice() -> CustomerDraft {
        CustomerDraft::new("Alice", "Stockholm", "alice@test.com", true)
    }

    #[tokio::test]
    async fn accepted_create_matching_all_views_passes() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let stored = store.insert(&alice()).await.expect("insert");

        let result = verifier(&store)
            .verify(&alice(), ExpectedOutcome::Accepted, &echo(200, &stored))
            .await
            .expect("verify");

        assert!(result.passed(), "{:?}", result.discrepancies);
        assert_eq!(result.confirmed, Some(stored));
    }

    #[tokio::test]
    async fn accepted_create_names_the_mismatching_wire_field() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let mut stored = store.insert(&alice()).await.expect("insert");
        stored.name = "alice".to_string();

        let result = verifier(&store)
            .verify(&alice(), ExpectedOutcome::Accepted, &echo(200, &stored))
            .await
            .expect("verify");

        assert!(!result.passed());
        let wire = &result.discrepancies[0];
        assert_eq!(wire.view, View::Wire);
        assert_eq!(wire.field, Some(Field::Name));
        assert!(result.confirmed.is_none());
    }

    #[tokio::test]
    async fn accepted_create_missing_from_store_is_an_assertion_under_strong_reads() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let phantom = CustomerRecord {
            id: crate::domain::customer::CustomerId(99),
            name: "Alice".to_string(),
            address: Some("Stockholm".to_string()),
            email: "alice@test.com".to_string(),
            active: true,
        };

        let result = verifier(&store)
            .verify(&alice(), ExpectedOutcome::Accepted, &echo(200, &phantom))
            .await
            .expect("verify");

        assert_eq!(result.discrepancies.len(), 1);
        assert_eq!(result.discrepancies[0].kind, DiscrepancyKind::Assertion);
        assert_eq!(result.discrepancies[0].view, View::Persisted);
    }

    #[tokio::test]
    async fn lagging_store_beyond_the_window_is_a_consistency_timeout() {
        let store = Arc::new(InMemoryCustomerStore::with_visibility_lag(Duration::from_secs(30)));
        let stored = store.insert(&alice()).await.expect("insert");
        let verifier = ReconciliationVerifier::new(
            Arc::clone(&store),
            ReadConsistency::Eventual {
                timeout: Duration::from_millis(40),
                interval: Duration::from_millis(10),
            },
            VerifierSettings::default(),
        );

        let result = verifier
            .verify(&alice(), ExpectedOutcome::Accepted, &echo(200, &stored))
            .await
            .expect("verify");

        assert_eq!(result.discrepancies.len(), 1);
        assert_eq!(result.discrepancies[0].kind, DiscrepancyKind::ConsistencyTimeout);
    }

    #[tokio::test]
    async fn rejected_input_absent_from_store_passes() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let input = CustomerDraft::new("testName", "Stockholm", "testgmail.com", true);

        let result = verifier(&store)
            .verify(&input, ExpectedOutcome::Rejected(StatusClass::Validation), &json_error(400))
            .await
            .expect("verify");

        assert!(result.passed(), "{:?}", result.discrepancies);
    }

    #[tokio::test]
    async fn rejected_input_that_was_persisted_fails() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let input = CustomerDraft::new("testName", "Stockholm", "testgmail.com", true);
        store.insert(&input).await.expect("insert");

        let result = verifier(&store)
            .verify(&input, ExpectedOutcome::Rejected(StatusClass::Validation), &json_error(400))
            .await
            .expect("verify");

        assert_eq!(result.discrepancies.len(), 1);
        assert_eq!(result.discrepancies[0].message, "invalid input was persisted");
    }

    #[tokio::test]
    async fn rejection_status_outside_the_class_fails() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let input = CustomerDraft::new("testName", "Stockholm", "test@", true);

        let result = verifier(&store)
            .verify(&input, ExpectedOutcome::Rejected(StatusClass::Validation), &json_error(409))
            .await
            .expect("verify");

        assert_eq!(result.discrepancies[0].view, View::Status);
        assert_eq!(result.discrepancies[0].expected, "400|422");
    }

    #[tokio::test]
    async fn non_json_rejection_is_flagged_only_when_required() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let input = CustomerDraft::new("testName", "Stockholm", "test@", true);
        let html = HttpResponse::new(400).with_header(CONTENT_TYPE, "text/html").with_body("<h1>");

        let strict = verifier(&store)
            .verify(&input, ExpectedOutcome::Rejected(StatusClass::Validation), &html)
            .await
            .expect("verify");
        let lenient = ReconciliationVerifier::new(
            Arc::clone(&store),
            ReadConsistency::Strong,
            VerifierSettings { require_json_errors: false },
        )
        .verify(&input, ExpectedOutcome::Rejected(StatusClass::Validation), &html)
        .await
        .expect("verify");

        assert_eq!(strict.discrepancies[0].view, View::ContentType);
        assert!(lenient.passed());
    }

    #[tokio::test]
    async fn missing_email_skips_the_absence_probe_with_a_note() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let input = CustomerDraft::new("testName", "Stockholm", "", true).with_email(None);

        let result = verifier(&store)
            .verify(&input, ExpectedOutcome::Rejected(StatusClass::Validation), &json_error(400))
            .await
            .expect("verify");

        assert!(result.passed());
        assert!(result.notes.iter().any(|note| note.contains("absence check skipped")));
    }

    #[tokio::test]
    async fn sanitized_branch_requires_a_changed_name() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let raw = CustomerDraft::new("<script>alert('XSS')</script>", "Stockholm", "xss@test.com", true);
        let echoed = store.insert(&raw).await.expect("insert");

        let result = verifier(&store)
            .verify(&raw, ExpectedOutcome::EitherOutcome(AcceptedRule::Sanitized), &echo(200, &echoed))
            .await
            .expect("verify");

        assert_eq!(result.discrepancies.len(), 1);
        assert_eq!(result.discrepancies[0].field, Some(Field::Name));
    }

    #[tokio::test]
    async fn sanitized_branch_passes_when_store_matches_escaped_echo() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let raw = CustomerDraft::new("<script>alert('XSS')</script>", "Stockholm", "xss@test.com", true);
        let escaped = store
            .insert(&raw.clone().with_name(Some("&lt;script&gt;alert('XSS')&lt;/script&gt;".to_string())))
            .await
            .expect("insert");

        let result = verifier(&store)
            .verify(&raw, ExpectedOutcome::EitherOutcome(AcceptedRule::Sanitized), &echo(200, &escaped))
            .await
            .expect("verify");

        assert!(result.passed(), "{:?}", result.discrepancies);
        assert!(result.notes.iter().any(|note| note.contains("accepted")));
    }

    #[tokio::test]
    async fn sanitized_branch_still_requires_the_other_fields_sent() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let raw = CustomerDraft::new("<script>alert('XSS')</script>", "Stockholm", "xss@test.com", true);
        let swapped = store
            .insert(&CustomerDraft::new("&lt;script&gt;", "Nowhere", "other@evil.com", false))
            .await
            .expect("insert");

        let result = verifier(&store)
            .verify(&raw, ExpectedOutcome::EitherOutcome(AcceptedRule::Sanitized), &echo(200, &swapped))
            .await
            .expect("verify");

        let fields: Vec<_> = result.discrepancies.iter().filter_map(|d| d.field).collect();
        assert_eq!(fields, vec![Field::Address, Field::Email, Field::Active]);
        assert!(result.confirmed.is_none());
    }

    #[tokio::test]
    async fn lenient_branch_only_exempts_the_status() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let sent = CustomerDraft::new("Test Customer", "Stockholm", "nullstatus@test.com", false);
        let defaulted = store
            .insert(&CustomerDraft { active: true, ..sent.clone() })
            .await
            .expect("insert");
        let renamed = store
            .insert(&CustomerDraft::new("Someone Else", "Stockholm", "other@evil.com", false))
            .await
            .expect("insert");
        let verifier = verifier(&store);

        let accepted = verifier
            .verify(&sent, ExpectedOutcome::EitherOutcome(AcceptedRule::Lenient), &echo(201, &defaulted))
            .await
            .expect("verify");
        let tampered = verifier
            .verify(&sent, ExpectedOutcome::EitherOutcome(AcceptedRule::Lenient), &echo(201, &renamed))
            .await
            .expect("verify");

        assert!(accepted.passed(), "{:?}", accepted.discrepancies);
        let fields: Vec<_> = tampered.discrepancies.iter().filter_map(|d| d.field).collect();
        assert_eq!(fields, vec![Field::Name, Field::Email]);
    }

    #[tokio::test]
    async fn either_outcome_rejection_branch_checks_absence() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let raw = CustomerDraft::new("Test@#$%^&*()Customer", "Stockholm", "special@test.com", true);

        let result = verifier(&store)
            .verify(&raw, ExpectedOutcome::EitherOutcome(AcceptedRule::Verbatim), &json_error(422))
            .await
            .expect("verify");

        assert!(result.passed());
        assert!(result.notes.iter().any(|note| note.contains("rejected")));
    }

    #[tokio::test]
    async fn stale_update_under_eventual_reads_times_out() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let before = store.insert(&alice()).await.expect("insert");
        let intended = CustomerPatch::rename("Alice Updated").apply(&before);
        let verifier = ReconciliationVerifier::new(
            Arc::clone(&store),
            ReadConsistency::Eventual {
                timeout: Duration::from_millis(30),
                interval: Duration::from_millis(10),
            },
            VerifierSettings::default(),
        );

        let result = verifier
            .verify_update(&before, &intended, &echo(200, &intended), &echo(200, &intended))
            .await
            .expect("verify");

        assert_eq!(result.discrepancies.len(), 1);
        assert_eq!(result.discrepancies[0].kind, DiscrepancyKind::ConsistencyTimeout);
    }

    #[tokio::test]
    async fn update_reflected_everywhere_is_confirmed() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let before = store.insert(&alice()).await.expect("insert");
        let intended = CustomerPatch::rename("Alice Updated").apply(&before);
        store.replace(&intended).await.expect("replace");

        let result = verifier(&store)
            .verify_update(&before, &intended, &echo(200, &intended), &echo(200, &intended))
            .await
            .expect("verify");

        assert!(result.passed(), "{:?}", result.discrepancies);
        assert_eq!(result.confirmed.map(|record| record.name), Some("Alice Updated".to_string()));
    }

    #[tokio::test]
    async fn delete_that_leaves_the_row_behind_fails() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let stored = store.insert(&alice()).await.expect("insert");

        let result = verifier(&store)
            .verify_delete(stored.id, &HttpResponse::new(200), &json_error(404), &json_error(404))
            .await
            .expect("verify");

        assert_eq!(result.discrepancies.len(), 1);
        assert_eq!(result.discrepancies[0].view, View::Persisted);
        assert_eq!(result.discrepancies[0].kind, DiscrepancyKind::Assertion);
    }

    #[tokio::test]
    async fn repeated_delete_may_answer_not_found_or_success() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let stored = store.insert(&alice()).await.expect("insert");
        store.remove(stored.id).await;
        let verifier = verifier(&store);

        let not_found = verifier
            .verify_delete(stored.id, &HttpResponse::new(204), &json_error(404), &json_error(404))
            .await
            .expect("verify");
        let idempotent = verifier
            .verify_delete(stored.id, &HttpResponse::new(204), &json_error(404), &HttpResponse::new(200))
            .await
            .expect("verify");
        let broken = verifier
            .verify_delete(stored.id, &HttpResponse::new(204), &json_error(404), &json_error(500))
            .await
            .expect("verify");

        assert!(not_found.passed());
        assert!(idempotent.passed());
        assert!(!broken.passed());
    }

    #[tokio::test]
    async fn duplicate_create_must_leave_exactly_one_record() {
        let store = Arc::new(InMemoryCustomerStore::default());
        let first = store
            .insert(&CustomerDraft::new("Bob", "Oslo", "dup@test.com", true))
            .await
            .expect("insert");

        let clean = verifier(&store).verify_duplicate(&first, &json_error(409)).await.expect("verify");
        assert!(clean.passed(), "{:?}", clean.discrepancies);

        store
            .force_insert(&CustomerDraft::new("Bob", "Oslo", "dup@test.com", true))
            .await
            .expect("insert");
        let doubled = verifier(&store).verify_duplicate(&first, &json_error(409)).await.expect("verify");
        assert!(doubled.discrepancies.iter().any(|d| d.expected == "1" && d.observed == "2"));
    }

    #[tokio::test]
    async fn oracle_outage_is_returned_as_an_error() {
        let store = Arc::new(InMemoryCustomerStore::default());
        store.set_unavailable(true);

        let error = verifier(&store)
            .verify(&alice(), ExpectedOutcome::Rejected(StatusClass::Validation), &json_error(400))
            .await
            .expect_err("oracle is down");

        assert!(error.to_string().contains("unavailable"));
    }
}
