use serde::{Deserialize, Serialize};

use crate::domain::customer::{CustomerDraft, CustomerId, CustomerPatch};
use crate::domain::http::{HttpMethod, HttpRequest, APPLICATION_JSON};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioFamily {
    Success,
    Lifecycle,
    Uniqueness,
    StructuredInvalid,
    Adversarial,
    RawMalformed,
    TransportShape,
}

impl ScenarioFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Lifecycle => "lifecycle",
            Self::Uniqueness => "uniqueness",
            Self::StructuredInvalid => "structured_invalid",
            Self::Adversarial => "adversarial",
            Self::RawMalformed => "raw_malformed",
            Self::TransportShape => "transport_shape",
        }
    }
}

/// Status codes a scenario tolerates for a given outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Success,
    Validation,
    Conflict,
    MethodNotAllowed,
    UnsupportedMediaType,
    NotFound,
}

impl StatusClass {
    pub fn accepts(self, status: u16) -> bool {
        match self {
            Self::Success => (200..300).contains(&status),
            Self::Validation => matches!(status, 400 | 422),
            Self::Conflict => matches!(status, 400 | 409),
            Self::MethodNotAllowed => status == 405,
            Self::UnsupportedMediaType => matches!(status, 400 | 415),
            Self::NotFound => status == 404,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::Success => "2xx",
            Self::Validation => "400|422",
            Self::Conflict => "400|409",
            Self::MethodNotAllowed => "405",
            Self::UnsupportedMediaType => "400|415",
            Self::NotFound => "404",
        }
    }
}

/// What an accepted response must prove when the service may go either way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptedRule {
    /// Persisted exactly as sent.
    Verbatim,
    /// Persisted name must differ from the raw input.
    Sanitized,
    /// Persisted state must match whatever the service echoed back.
    Lenient,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "rule")]
pub enum ExpectedOutcome {
    Accepted,
    Rejected(StatusClass),
    EitherOutcome(AcceptedRule),
}

impl AcceptedRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verbatim => "verbatim",
            Self::Sanitized => "sanitized",
            Self::Lenient => "lenient",
        }
    }
}

impl ExpectedOutcome {
    pub fn describe(&self) -> String {
        match self {
            Self::Accepted => "accepted".to_string(),
            Self::Rejected(class) => format!("rejected {}", class.describe()),
            Self::EitherOutcome(rule) => format!("accepted {} or rejected", rule.as_str()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Collection,
    Item(CustomerId),
}

impl Target {
    pub fn path(&self, endpoint: &str) -> String {
        let endpoint = endpoint.trim_end_matches('/');
        match self {
            Self::Collection => endpoint.to_string(),
            Self::Item(id) => format!("{endpoint}/{id}"),
        }
    }
}

/// Literal request text plus the logical input it encodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPayload {
    pub body: String,
    pub content_type: String,
    pub probe: CustomerDraft,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Typed(CustomerDraft),
    Raw(RawPayload),
}

impl Payload {
    /// Logical input used for expectations and the absence probe.
    pub fn logical(&self) -> &CustomerDraft {
        match self {
            Self::Typed(draft) => draft,
            Self::Raw(raw) => &raw.probe,
        }
    }

    pub fn body(&self) -> String {
        match self {
            Self::Typed(draft) => draft.to_json_literal(),
            Self::Raw(raw) => raw.body.clone(),
        }
    }

    pub fn content_type(&self) -> &str {
        match self {
            Self::Typed(_) => APPLICATION_JSON,
            Self::Raw(raw) => &raw.content_type,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioRequest {
    pub method: HttpMethod,
    pub target: Target,
    pub payload: Payload,
}

impl ScenarioRequest {
    pub fn create(payload: Payload) -> Self {
        Self { method: HttpMethod::Post, target: Target::Collection, payload }
    }

    /// An empty payload body is sent as no body at all.
    pub fn to_http(&self, endpoint: &str) -> HttpRequest {
        let request = HttpRequest::new(self.method, self.target.path(endpoint))
            .with_content_type(self.payload.content_type());
        let body = self.payload.body();
        if body.is_empty() {
            request
        } else {
            request.with_body(body)
        }
    }
}

/// Steps chained after the initial create once its id is known.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUp {
    None,
    Lifecycle { update: CustomerPatch },
    DuplicateEmail { second: CustomerDraft },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub family: ScenarioFamily,
    pub request: ScenarioRequest,
    pub expected: ExpectedOutcome,
    pub follow_up: FollowUp,
}

impl Scenario {
    pub fn input(&self) -> &CustomerDraft {
        self.request.payload.logical()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AcceptedRule, ExpectedOutcome, Payload, RawPayload, ScenarioRequest, StatusClass, Target,
    };
    use crate::domain::customer::{CustomerDraft, CustomerId};
    use crate::domain::http::HttpMethod;

    #[test]
    fn status_classes_match_documented_codes() {
        assert!(StatusClass::Success.accepts(200));
        assert!(StatusClass::Success.accepts(201));
        assert!(StatusClass::Validation.accepts(422));
        assert!(!StatusClass::Validation.accepts(409));
        assert!(StatusClass::Conflict.accepts(409));
        assert!(StatusClass::Conflict.accepts(400));
        assert!(StatusClass::UnsupportedMediaType.accepts(415));
        assert!(!StatusClass::MethodNotAllowed.accepts(404));
        assert!(StatusClass::NotFound.accepts(404));
    }

    #[test]
    fn expected_outcomes_render_for_listings() {
        assert_eq!(ExpectedOutcome::Accepted.describe(), "accepted");
        assert_eq!(
            ExpectedOutcome::Rejected(StatusClass::Conflict).describe(),
            "rejected 400|409"
        );
        assert_eq!(
            ExpectedOutcome::EitherOutcome(AcceptedRule::Sanitized).describe(),
            "accepted sanitized or rejected"
        );
    }

    #[test]
    fn target_paths_join_without_double_slash() {
        assert_eq!(Target::Collection.path("/api/customer/"), "/api/customer");
        assert_eq!(Target::Item(CustomerId(9)).path("/api/customer"), "/api/customer/9");
    }

    #[test]
    fn raw_payload_keeps_its_own_content_type() {
        let request = ScenarioRequest::create(Payload::Raw(RawPayload {
            body: "name=x".to_string(),
            content_type: "text/plain".to_string(),
            probe: CustomerDraft::default(),
        }));

        let http = request.to_http("/api/customer");
        assert_eq!(http.method, HttpMethod::Post);
        assert_eq!(http.header("content-type"), Some("text/plain"));
        assert_eq!(http.body.as_deref(), Some("name=x"));
    }

    #[test]
    fn empty_raw_body_is_omitted() {
        let request = ScenarioRequest {
            method: HttpMethod::Get,
            target: Target::Collection,
            payload: Payload::Raw(RawPayload {
                body: String::new(),
                content_type: "application/json".to_string(),
                probe: CustomerDraft::default(),
            }),
        };

        assert_eq!(request.to_http("/api/customer").body, None);
    }
}
