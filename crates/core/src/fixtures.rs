use crate::domain::customer::{CustomerDraft, CustomerPatch};
use crate::domain::http::{HttpMethod, APPLICATION_JSON};
use crate::domain::scenario::{
    AcceptedRule, ExpectedOutcome, FollowUp, Payload, RawPayload, Scenario, ScenarioFamily,
    ScenarioRequest, StatusClass, Target,
};

const SQL_INJECTION_NAME: &str = "'; DROP TABLE customers; --";
const SPECIAL_CHARACTERS_NAME: &str = "Test@#$%^&*()Customer";
const SCRIPT_INJECTION_NAME: &str = "<script>alert('XSS')</script>";

/// Builds the scenario table that a single parametrized driver consumes.
#[derive(Clone, Debug, Default)]
pub struct FixtureBuilder {
    run_tag: Option<String>,
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sub-addresses every well-formed email so repeated runs against a
    /// persistent store never collide.
    pub fn with_run_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        self.run_tag = (!tag.trim().is_empty()).then_some(tag);
        self
    }

    pub fn standard_table(&self) -> Vec<Scenario> {
        let mut table = Vec::new();
        table.extend(self.success_scenarios());
        table.extend(self.structured_invalid_scenarios());
        table.extend(self.adversarial_scenarios());
        table.extend(self.raw_malformed_scenarios());
        table.extend(self.transport_shape_scenarios());

        if let Some(tag) = self.run_tag.as_deref() {
            for (index, scenario) in table.iter_mut().enumerate() {
                retag(scenario, tag, index + 1);
            }
        }
        table
    }

    pub fn success_scenarios(&self) -> Vec<Scenario> {
        let alice = CustomerDraft::new("Alice", "Stockholm", "alice@test.com", true);
        let lifecycle = CustomerDraft::new("Alice", "Stockholm", "alice.lifecycle@test.com", true);
        let replaced = CustomerDraft::new("Customer", "Stockholm", "customer@gmail.com", true);
        let bob = CustomerDraft::new("Bob", "Oslo", "dup@test.com", true);

        vec![
            typed(
                "create-valid-customer",
                "valid customer is persisted with the exact fields sent",
                ScenarioFamily::Success,
                alice,
                ExpectedOutcome::Accepted,
            ),
            typed(
                "lifecycle-rename",
                "create, rename, read back, delete and delete again",
                ScenarioFamily::Lifecycle,
                lifecycle,
                ExpectedOutcome::Accepted,
            )
            .with_follow_up(FollowUp::Lifecycle { update: CustomerPatch::rename("Alice Updated") }),
            typed(
                "lifecycle-replace-all-fields",
                "update replaces every field including the email",
                ScenarioFamily::Lifecycle,
                replaced,
                ExpectedOutcome::Accepted,
            )
            .with_follow_up(FollowUp::Lifecycle {
                update: CustomerPatch {
                    name: Some("Updated name".to_string()),
                    address: Some("updated Stockholm".to_string()),
                    email: Some("updated@gmail.com".to_string()),
                    active: Some(false),
                },
            }),
            typed(
                "duplicate-email",
                "second create with a taken email is refused and changes nothing",
                ScenarioFamily::Uniqueness,
                bob.clone(),
                ExpectedOutcome::Accepted,
            )
            .with_follow_up(FollowUp::DuplicateEmail { second: bob }),
        ]
    }

    pub fn structured_invalid_scenarios(&self) -> Vec<Scenario> {
        let base = CustomerDraft::new("testName", "Stockholm", "test@gmail.com", true);
        let invalid = |name: &str, description: &str, draft: CustomerDraft| {
            typed(
                name,
                description,
                ScenarioFamily::StructuredInvalid,
                draft,
                ExpectedOutcome::Rejected(StatusClass::Validation),
            )
        };

        vec![
            invalid(
                "invalid-email-missing-at",
                "email without @",
                base.clone().with_email(Some("testgmail.com".to_string())),
            ),
            invalid(
                "invalid-email-missing-domain",
                "email without a domain",
                base.clone().with_email(Some("test@".to_string())),
            ),
            invalid(
                "invalid-email-double-at",
                "email with two @",
                base.clone().with_email(Some("test@@gmail.com".to_string())),
            ),
            invalid(
                "invalid-name-empty",
                "empty name",
                base.clone()
                    .with_name(Some(String::new()))
                    .with_email(Some("emptyname@test.com".to_string())),
            ),
            invalid(
                "invalid-name-null",
                "null name",
                base.clone().with_name(None).with_email(Some("nullname@test.com".to_string())),
            ),
            invalid(
                "invalid-email-empty",
                "empty email",
                base.clone().with_email(Some(String::new())),
            ),
            invalid("invalid-email-null", "null email", base.clone().with_email(None)),
            invalid(
                "invalid-name-too-long",
                "name of 1000 characters",
                CustomerDraft::new(&"A".repeat(1000), "Stockholm", "longname@test.com", true),
            ),
            invalid(
                "invalid-email-too-long",
                "email local part of 250 characters",
                CustomerDraft::new(
                    "Long Email",
                    "Stockholm",
                    &format!("{}@test.com", "a".repeat(250)),
                    true,
                ),
            ),
            invalid(
                "sql-injection-name",
                "SQL metacharacters in the name are refused and nothing is dropped",
                CustomerDraft::new(SQL_INJECTION_NAME, "Stockholm", "sqlinjection@test.com", true),
            ),
        ]
    }

    pub fn adversarial_scenarios(&self) -> Vec<Scenario> {
        let null_status = CustomerDraft {
            name: Some("Test Customer".to_string()),
            address: Some("Stockholm".to_string()),
            email: Some("nullstatus@test.com".to_string()),
            active: false,
        };

        vec![
            typed(
                "special-characters-name",
                "punctuation in the name is either stored verbatim or refused",
                ScenarioFamily::Adversarial,
                CustomerDraft::new(SPECIAL_CHARACTERS_NAME, "Stockholm", "special@test.com", true),
                ExpectedOutcome::EitherOutcome(AcceptedRule::Verbatim),
            ),
            typed(
                "script-injection-name",
                "markup in the name is either sanitized or refused",
                ScenarioFamily::Adversarial,
                CustomerDraft::new(SCRIPT_INJECTION_NAME, "Stockholm", "xss@test.com", true),
                ExpectedOutcome::EitherOutcome(AcceptedRule::Sanitized),
            ),
            raw(
                "null-status",
                "explicit null status is either defaulted or refused",
                ScenarioFamily::Adversarial,
                r#"{"name":"Test Customer","address":"Stockholm","email":"nullstatus@test.com","status":null}"#,
                null_status,
                ExpectedOutcome::EitherOutcome(AcceptedRule::Lenient),
            ),
        ]
    }

    pub fn raw_malformed_scenarios(&self) -> Vec<Scenario> {
        let probe = |name: Option<&str>, email: Option<&str>| CustomerDraft {
            name: name.map(str::to_string),
            address: None,
            email: email.map(str::to_string),
            active: false,
        };
        let malformed = |name: &str, description: &str, body: &str, probe: CustomerDraft| {
            raw(
                name,
                description,
                ScenarioFamily::RawMalformed,
                body,
                probe,
                ExpectedOutcome::Rejected(StatusClass::Validation),
            )
        };

        vec![
            malformed(
                "raw-trailing-comma",
                "trailing comma after the last member",
                r#"{"name":"testName","email":"trailingcomma@test.com",}"#,
                probe(Some("testName"), Some("trailingcomma@test.com")),
            ),
            malformed(
                "raw-unquoted-key",
                "object key without quotes",
                r#"{name:"testName","email":"unquotedkey@test.com"}"#,
                probe(Some("testName"), Some("unquotedkey@test.com")),
            ),
            malformed(
                "raw-missing-email",
                "email member absent",
                r#"{"name":"testName"}"#,
                probe(Some("testName"), None),
            ),
            malformed(
                "raw-missing-name",
                "name member absent",
                r#"{"email":"missingname@test.com"}"#,
                probe(None, Some("missingname@test.com")),
            ),
            malformed(
                "raw-invalid-email",
                "email that is not an address",
                r#"{"name":"testName","email":"invalid-email"}"#,
                probe(Some("testName"), Some("invalid-email")),
            ),
            malformed(
                "raw-empty-name",
                "empty name string",
                r#"{"name":"","email":"rawemptyname@test.com"}"#,
                probe(Some(""), Some("rawemptyname@test.com")),
            ),
            malformed(
                "raw-empty-email",
                "empty email string",
                r#"{"name":"testName","email":""}"#,
                probe(Some("testName"), Some("")),
            ),
        ]
    }

    pub fn transport_shape_scenarios(&self) -> Vec<Scenario> {
        let listed = CustomerDraft::new("testName", "Stockholm", "getcollection@test.com", true);
        let plain = CustomerDraft::new("testName", "Stockholm", "plaintext@test.com", true);

        vec![
            Scenario {
                name: "get-on-collection".to_string(),
                description: "collection endpoint does not list customers".to_string(),
                family: ScenarioFamily::TransportShape,
                request: ScenarioRequest {
                    method: HttpMethod::Get,
                    target: Target::Collection,
                    payload: Payload::Raw(RawPayload {
                        body: listed.to_json_literal(),
                        content_type: APPLICATION_JSON.to_string(),
                        probe: listed,
                    }),
                },
                expected: ExpectedOutcome::Rejected(StatusClass::MethodNotAllowed),
                follow_up: FollowUp::None,
            },
            Scenario {
                name: "plain-text-content-type".to_string(),
                description: "json body declared as text/plain".to_string(),
                family: ScenarioFamily::TransportShape,
                request: ScenarioRequest::create(Payload::Raw(RawPayload {
                    body: plain.to_json_literal(),
                    content_type: "text/plain".to_string(),
                    probe: plain,
                })),
                expected: ExpectedOutcome::Rejected(StatusClass::UnsupportedMediaType),
                follow_up: FollowUp::None,
            },
        ]
    }
}

impl Scenario {
    fn with_follow_up(mut self, follow_up: FollowUp) -> Self {
        self.follow_up = follow_up;
        self
    }
}

fn typed(
    name: &str,
    description: &str,
    family: ScenarioFamily,
    draft: CustomerDraft,
    expected: ExpectedOutcome,
) -> Scenario {
    Scenario {
        name: name.to_string(),
        description: description.to_string(),
        family,
        request: ScenarioRequest::create(Payload::Typed(draft)),
        expected,
        follow_up: FollowUp::None,
    }
}

fn raw(
    name: &str,
    description: &str,
    family: ScenarioFamily,
    body: &str,
    probe: CustomerDraft,
    expected: ExpectedOutcome,
) -> Scenario {
    Scenario {
        name: name.to_string(),
        description: description.to_string(),
        family,
        request: ScenarioRequest::create(Payload::Raw(RawPayload {
            body: body.to_string(),
            content_type: APPLICATION_JSON.to_string(),
            probe,
        })),
        expected,
        follow_up: FollowUp::None,
    }
}

/// Inserts `+{tag}-{n}` before the `@` of a structurally valid address.
/// Anything without exactly one `@` and non-empty sides is returned as is.
pub fn tag_email(email: &str, tag: &str, n: usize) -> String {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            format!("{local}+{tag}-{n}@{domain}")
        }
        _ => email.to_string(),
    }
}

fn retag(scenario: &mut Scenario, tag: &str, n: usize) {
    let retag_field = |email: &mut Option<String>| {
        if let Some(value) = email.as_mut() {
            *value = tag_email(value, tag, n);
        }
    };

    match &mut scenario.request.payload {
        Payload::Typed(draft) => retag_field(&mut draft.email),
        Payload::Raw(raw) => {
            if let Some(original) = raw.probe.email.clone() {
                let tagged = tag_email(&original, tag, n);
                raw.body = raw.body.replace(&format!("\"{original}\""), &format!("\"{tagged}\""));
                raw.probe.email = Some(tagged);
            }
        }
    }

    match &mut scenario.follow_up {
        FollowUp::None => {}
        FollowUp::Lifecycle { update } => retag_field(&mut update.email),
        FollowUp::DuplicateEmail { second } => retag_field(&mut second.email),
    }
}
