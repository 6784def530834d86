use std::path::PathBuf;

use crosscheck_core::config::{AppConfig, ConfigOverrides};
use crosscheck_core::domain::http::{HttpMethod, HttpRequest};
use crosscheck_core::ports::HttpAdapter;
use crosscheck_db::{connect_oracle, missing_columns};
use crosscheck_http::ReqwestAdapter;
use serde::Serialize;

use crate::commands::{
    escape_json, load_config, runtime, CommandResult, EXIT_CHECK_FAILED, EXIT_CONFIG, EXIT_OK,
    EXIT_ORACLE_CONNECT,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    /// Config failures outrank store failures, which outrank the rest.
    fn exit_code(&self) -> u8 {
        let failed = |name: &str| {
            self.checks.iter().any(|check| check.name == name && check.status == CheckStatus::Fail)
        };

        if failed("config_validation") {
            EXIT_CONFIG
        } else if failed("oracle_connectivity") || failed("customers_schema") {
            EXIT_ORACLE_CONNECT
        } else if self.overall_status == CheckStatus::Pass {
            EXIT_OK
        } else {
            EXIT_CHECK_FAILED
        }
    }
}

pub fn run(config_path: Option<PathBuf>, json_output: bool) -> CommandResult {
    let report = build_report(config_path);
    let exit_code = report.exit_code();

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(config_path: Option<PathBuf>) -> DoctorReport {
    let mut checks = Vec::new();

    match load_config(config_path, ConfigOverrides::default()) {
        Ok(loaded) => {
            let details = if loaded.warnings.is_empty() {
                "configuration loaded and validated".to_string()
            } else {
                let warnings: Vec<String> =
                    loaded.warnings.iter().map(ToString::to_string).collect();
                format!("configuration validated with fallback: {}", warnings.join("; "))
            };
            checks.push(DoctorCheck { name: "config_validation", status: CheckStatus::Pass, details });
            checks.extend(runtime_checks(&loaded.config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["service_reachability", "oracle_connectivity", "customers_schema"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn runtime_checks(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![DoctorCheck {
                name: "service_reachability",
                status: CheckStatus::Fail,
                details: format!("{error:#}"),
            }];
        }
    };

    runtime.block_on(async {
        let mut checks = vec![check_service(config).await];
        checks.extend(check_oracle(config).await);
        checks
    })
}

/// Any HTTP response counts as reachable; only transport failures fail.
async fn check_service(config: &AppConfig) -> DoctorCheck {
    let name = "service_reachability";
    let adapter = match ReqwestAdapter::from_config(&config.service) {
        Ok(adapter) => adapter,
        Err(error) => {
            return DoctorCheck { name, status: CheckStatus::Fail, details: error.to_string() }
        }
    };

    let probe = HttpRequest::new(HttpMethod::Get, config.service.endpoint.as_str());
    match adapter.send(probe).await {
        Ok(response) => DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: format!(
                "GET {} answered with status {}",
                adapter.url_for(&config.service.endpoint),
                response.status
            ),
        },
        Err(error) => DoctorCheck { name, status: CheckStatus::Fail, details: error.to_string() },
    }
}

async fn check_oracle(config: &AppConfig) -> Vec<DoctorCheck> {
    let pool = match connect_oracle(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    {
        Ok(pool) => pool,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "oracle_connectivity",
                    status: CheckStatus::Fail,
                    details: format!("failed to connect to store: {error}"),
                },
                DoctorCheck {
                    name: "customers_schema",
                    status: CheckStatus::Skipped,
                    details: "skipped because the store is unreachable".to_string(),
                },
            ];
        }
    };

    let connectivity = DoctorCheck {
        name: "oracle_connectivity",
        status: CheckStatus::Pass,
        details: format!("connected read-only using `{}`", config.database.url),
    };
    let schema = match missing_columns(&pool).await {
        Ok(missing) if missing.is_empty() => DoctorCheck {
            name: "customers_schema",
            status: CheckStatus::Pass,
            details: "`customers` table exposes every required column".to_string(),
        },
        Ok(missing) => DoctorCheck {
            name: "customers_schema",
            status: CheckStatus::Fail,
            details: format!("`customers` table is missing columns: {}", missing.join(", ")),
        },
        Err(error) => DoctorCheck {
            name: "customers_schema",
            status: CheckStatus::Fail,
            details: format!("schema probe failed: {error}"),
        },
    };

    pool.close().await;
    vec![connectivity, schema]
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
