pub mod config;
pub mod domain;
pub mod driver;
pub mod errors;
pub mod fakes;
pub mod fixtures;
pub mod flows;
pub mod oracle;
pub mod ports;
pub mod report;
pub mod runner;
pub mod verify;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::customer::{CustomerDraft, CustomerId, CustomerPatch, CustomerRecord, Field};
pub use domain::http::{HttpMethod, HttpRequest, HttpResponse};
pub use domain::scenario::{ExpectedOutcome, Scenario, ScenarioFamily, StatusClass};
pub use driver::{DriverSettings, ScenarioDriver};
pub use errors::{HarnessError, OracleError, TransportError};
pub use fixtures::FixtureBuilder;
pub use flows::{ScenarioEngine, ScenarioEvent, ScenarioMachine, ScenarioState};
pub use oracle::{ConvergingReader, ReadConsistency};
pub use ports::{HttpAdapter, PersistenceOracle};
pub use report::{RunSummary, ScenarioOutcome, ScenarioReport};
pub use runner::ScenarioRunner;
pub use verify::{Discrepancy, DiscrepancyKind, ReconciliationVerifier, VerificationResult};
