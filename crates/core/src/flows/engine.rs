use thiserror::Error;

use crate::flows::states::{ScenarioEvent, ScenarioState, StepContext, TransitionOutcome};

#[derive(Clone, Debug, Default)]
pub struct ScenarioEngine;

impl ScenarioEngine {
    pub fn initial_state(&self) -> ScenarioState {
        ScenarioState::Built
    }

    pub fn apply(
        &self,
        current: &ScenarioState,
        event: &ScenarioEvent,
        context: &StepContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition(current, event, context)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: ScenarioState, event: ScenarioEvent },
    #[error("result cannot be recorded from {state:?}: verification did not pass")]
    VerificationFailed { state: ScenarioState },
    #[error("follow-up step requires a bound customer id")]
    MissingBoundId,
}

fn transition(
    current: &ScenarioState,
    event: &ScenarioEvent,
    context: &StepContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use ScenarioEvent::{
        Dispatched, FollowUpBound, ResponseCaptured, ResultRecorded, VerificationCompleted,
    };
    use ScenarioState::{Built, Done, ResponseReceived, Sent, Verified};

    let to = match (current, event) {
        (Built, Dispatched) => Sent,
        (Sent, ResponseCaptured) => ResponseReceived,
        (ResponseReceived, VerificationCompleted) => Verified,
        (Verified, ResultRecorded) => {
            if context.verification_passed != Some(true) {
                return Err(FlowTransitionError::VerificationFailed { state: *current });
            }
            Done
        }
        (Done, FollowUpBound) => {
            if context.bound_id.is_none() {
                return Err(FlowTransitionError::MissingBoundId);
            }
            Built
        }
        _ => {
            return Err(FlowTransitionError::InvalidTransition { state: *current, event: *event });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: *event, bound_id: context.bound_id })
}

/// Tracks one scenario's position and the transitions it has taken.
#[derive(Clone, Debug)]
pub struct ScenarioMachine {
    engine: ScenarioEngine,
    state: ScenarioState,
    history: Vec<TransitionOutcome>,
}

impl Default for ScenarioMachine {
    fn default() -> Self {
        Self::new(ScenarioEngine)
    }
}

impl ScenarioMachine {
    pub fn new(engine: ScenarioEngine) -> Self {
        let state = engine.initial_state();
        Self { engine, state, history: Vec::new() }
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    pub fn history(&self) -> &[TransitionOutcome] {
        &self.history
    }

    pub fn fire(
        &mut self,
        event: ScenarioEvent,
        context: &StepContext,
    ) -> Result<ScenarioState, FlowTransitionError> {
        let outcome = self.engine.apply(&self.state, &event, context)?;
        self.state = outcome.to;
        self.history.push(outcome);
        Ok(self.state)
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::customer::CustomerId;
    use crate::flows::engine::{FlowTransitionError, ScenarioEngine, ScenarioMachine};
    use crate::flows::states::{ScenarioEvent, ScenarioState, StepContext};

    #[test]
    fn passing_step_reaches_done() {
        let mut machine = ScenarioMachine::default();

        machine.fire(ScenarioEvent::Dispatched, &StepContext::default()).expect("built -> sent");
        machine
            .fire(ScenarioEvent::ResponseCaptured, &StepContext::default())
            .expect("sent -> response received");
        machine
            .fire(ScenarioEvent::VerificationCompleted, &StepContext::verified(true))
            .expect("response received -> verified");
        let state = machine
            .fire(ScenarioEvent::ResultRecorded, &StepContext::verified(true))
            .expect("verified -> done");

        assert_eq!(state, ScenarioState::Done);
        assert_eq!(machine.history().len(), 4);
    }

    #[test]
    fn failed_verification_never_moves_past_verified() {
        let engine = ScenarioEngine;
        let error = engine
            .apply(
                &ScenarioState::Verified,
                &ScenarioEvent::ResultRecorded,
                &StepContext::verified(false),
            )
            .expect_err("failed verification must not be recorded as done");

        assert_eq!(error, FlowTransitionError::VerificationFailed { state: ScenarioState::Verified });
    }

    #[test]
    fn follow_up_re_enters_built_with_bound_id() {
        let engine = ScenarioEngine;
        let outcome = engine
            .apply(
                &ScenarioState::Done,
                &ScenarioEvent::FollowUpBound,
                &StepContext::bound(CustomerId(41)),
            )
            .expect("done -> built");

        assert_eq!(outcome.to, ScenarioState::Built);
        assert_eq!(outcome.bound_id, Some(CustomerId(41)));
    }

    #[test]
    fn follow_up_without_id_is_rejected() {
        let engine = ScenarioEngine;
        let error = engine
            .apply(&ScenarioState::Done, &ScenarioEvent::FollowUpBound, &StepContext::default())
            .expect_err("follow-up needs an id");

        assert_eq!(error, FlowTransitionError::MissingBoundId);
    }

    #[test]
    fn skipping_states_is_invalid() {
        let engine = ScenarioEngine;
        let error = engine
            .apply(
                &ScenarioState::Built,
                &ScenarioEvent::VerificationCompleted,
                &StepContext::verified(true),
            )
            .expect_err("built cannot jump to verified");

        assert!(matches!(
            error,
            FlowTransitionError::InvalidTransition {
                state: ScenarioState::Built,
                event: ScenarioEvent::VerificationCompleted
            }
        ));
    }

    #[test]
    fn machine_keeps_state_on_rejected_event() {
        let mut machine = ScenarioMachine::default();
        let result = machine.fire(ScenarioEvent::ResultRecorded, &StepContext::verified(true));

        assert!(result.is_err());
        assert_eq!(machine.state(), ScenarioState::Built);
        assert!(machine.history().is_empty());
    }
}
