use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    Built,
    Sent,
    ResponseReceived,
    Verified,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioEvent {
    Dispatched,
    ResponseCaptured,
    VerificationCompleted,
    ResultRecorded,
    FollowUpBound,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StepContext {
    pub verification_passed: Option<bool>,
    pub bound_id: Option<CustomerId>,
}

impl StepContext {
    pub fn verified(passed: bool) -> Self {
        Self { verification_passed: Some(passed), bound_id: None }
    }

    pub fn bound(id: CustomerId) -> Self {
        Self { verification_passed: None, bound_id: Some(id) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: ScenarioState,
    pub to: ScenarioState,
    pub event: ScenarioEvent,
    pub bound_id: Option<CustomerId>,
}
