use std::path::PathBuf;
use std::sync::Arc;

use crosscheck_core::config::{AppConfig, ConfigOverrides};
use crosscheck_core::domain::scenario::Scenario;
use crosscheck_core::driver::ScenarioDriver;
use crosscheck_core::fixtures::FixtureBuilder;
use crosscheck_core::report::RunSummary;
use crosscheck_core::runner::ScenarioRunner;
use crosscheck_db::{connect_oracle, missing_columns, SqlCustomerOracle};
use crosscheck_http::ReqwestAdapter;
use tracing::{error, info};
use uuid::Uuid;

use crate::commands::{
    escape_json, load_config, runtime, CommandResult, EXIT_CONFIG, EXIT_OK, EXIT_ORACLE_CONNECT,
    EXIT_SCENARIO_FAILED,
};

#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub config_path: Option<PathBuf>,
    pub json: bool,
    pub filter: Option<String>,
    pub workers: Option<usize>,
}

pub fn run(args: RunArgs) -> CommandResult {
    let overrides = ConfigOverrides { workers: args.workers, ..ConfigOverrides::default() };
    let config = match load_config(args.config_path, overrides) {
        Ok(loaded) => loaded.config,
        Err(error) => {
            return CommandResult::failure("run", "config_validation", error.to_string(), EXIT_CONFIG)
        }
    };

    let scenarios = select(&config, args.filter.as_deref());
    if scenarios.is_empty() {
        return CommandResult::failure(
            "run",
            "scenario_filter",
            format!("no scenario name contains `{}`", args.filter.unwrap_or_default()),
            EXIT_CONFIG,
        );
    }

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure("run", "runtime", format!("{error:#}"), EXIT_CONFIG)
        }
    };

    match runtime.block_on(execute(&config, scenarios)) {
        Ok(summary) => {
            let exit_code = if summary.all_passed() { EXIT_OK } else { EXIT_SCENARIO_FAILED };
            let output = if args.json { render_json(&summary) } else { render_human(&summary) };
            CommandResult { exit_code, output }
        }
        Err(failure) => failure,
    }
}

/// Scenario table for this run, narrowed by name when a filter is given.
pub fn select(config: &AppConfig, filter: Option<&str>) -> Vec<Scenario> {
    let mut fixtures = FixtureBuilder::new();
    if let Some(tag) = &config.runner.run_tag {
        fixtures = fixtures.with_run_tag(tag.clone());
    }

    let table = fixtures.standard_table();
    match filter.map(str::trim).filter(|needle| !needle.is_empty()) {
        Some(needle) => table.into_iter().filter(|scenario| scenario.name.contains(needle)).collect(),
        None => table,
    }
}

async fn execute(config: &AppConfig, scenarios: Vec<Scenario>) -> Result<RunSummary, CommandResult> {
    let pool = connect_oracle(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| {
        error!(event_name = "oracle.connect.failed", error = %error, "store connection failed");
        CommandResult::failure(
            "run",
            "oracle_connect",
            format!("failed to connect to `{}`: {error}", config.database.url),
            EXIT_ORACLE_CONNECT,
        )
    })?;

    let missing = missing_columns(&pool).await.map_err(|error| {
        CommandResult::failure("run", "oracle_connect", error.to_string(), EXIT_ORACLE_CONNECT)
    })?;
    if !missing.is_empty() {
        return Err(CommandResult::failure(
            "run",
            "oracle_schema",
            format!("`customers` table is missing columns: {}", missing.join(", ")),
            EXIT_ORACLE_CONNECT,
        ));
    }

    let http = ReqwestAdapter::from_config(&config.service).map_err(|error| {
        CommandResult::failure("run", "http_client", error.to_string(), EXIT_CONFIG)
    })?;

    let run_id = Uuid::new_v4().to_string();
    info!(
        event_name = "run.configured",
        run_id = %run_id,
        base_url = %config.service.base_url,
        database_url = %config.database.url,
        workers = config.runner.workers,
        "starting scenario run"
    );

    let driver = ScenarioDriver::new(
        Arc::new(http),
        Arc::new(SqlCustomerOracle::new(pool.clone())),
        config.driver_settings(),
    );
    let summary = ScenarioRunner::new(driver, config.runner.workers).run(&run_id, scenarios).await;

    pool.close().await;
    Ok(summary)
}

fn render_json(summary: &RunSummary) -> String {
    serde_json::to_string_pretty(summary).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"run\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            escape_json(&error.to_string())
        )
    })
}

fn render_human(summary: &RunSummary) -> String {
    let mut lines = Vec::with_capacity(summary.reports.len() + 1);

    for report in &summary.reports {
        let marker = if report.passed() { "pass" } else { "FAIL" };
        lines.push(format!(
            "[{marker}] {} ({}, {}ms)",
            report.scenario,
            report.family.as_str(),
            report.elapsed_ms
        ));
        for discrepancy in &report.discrepancies {
            lines.push(format!("    - {discrepancy}"));
        }
        for note in &report.notes {
            lines.push(format!("    note: {note}"));
        }
    }

    lines.push(format!(
        "run {}: {}/{} passed, {} failed in {}ms",
        summary.run_id, summary.passed, summary.total, summary.failed, summary.elapsed_ms
    ));
    lines.join("\n")
}
