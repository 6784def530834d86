pub mod engine;
pub mod states;

pub use engine::{FlowTransitionError, ScenarioEngine, ScenarioMachine};
pub use states::{ScenarioEvent, ScenarioState, StepContext, TransitionOutcome};
