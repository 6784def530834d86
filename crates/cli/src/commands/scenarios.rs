use std::path::PathBuf;

use crosscheck_core::config::ConfigOverrides;

use crate::commands::run::select;
use crate::commands::{load_config, CommandResult, EXIT_CONFIG, EXIT_OK};

pub fn run(config_path: Option<PathBuf>) -> CommandResult {
    let config = match load_config(config_path, ConfigOverrides::default()) {
        Ok(loaded) => loaded.config,
        Err(error) => {
            return CommandResult::failure(
                "scenarios",
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };

    let table = select(&config, None);
    let mut lines = vec![format!("{} scenarios:", table.len())];
    for scenario in &table {
        lines.push(format!(
            "- {} [{}] expects {}: {}",
            scenario.name,
            scenario.family.as_str(),
            scenario.expected.describe(),
            scenario.description
        ));
    }

    CommandResult { exit_code: EXIT_OK, output: lines.join("\n") }
}
