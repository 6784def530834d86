use std::path::PathBuf;

use crosscheck_core::config::{ConfigOverrides, ConfigSource};

use crate::commands::{load_config, CommandResult, EXIT_CONFIG, EXIT_OK};

pub fn run(config_path: Option<PathBuf>) -> CommandResult {
    let loaded = match load_config(config_path, ConfigOverrides::default()) {
        Ok(loaded) => loaded,
        Err(error) => {
            return CommandResult {
                exit_code: EXIT_CONFIG,
                output: format!("config validation failed: {error}"),
            }
        }
    };

    let file_label = loaded
        .file
        .as_ref()
        .map(|path| format!("file ({})", path.display()))
        .unwrap_or_else(|| "file".to_string());

    let mut lines =
        vec!["effective config (source precedence: override > env > file > default):".to_string()];
    for (key, value) in loaded.config.entries() {
        let shown = if value.is_empty() { "<unset>".to_string() } else { value };
        let source = match loaded.provenance.source_of(key) {
            ConfigSource::File => file_label.clone(),
            other => other.as_str().to_string(),
        };
        lines.push(format!("- {key} = {shown} (source: {source})"));
    }
    for warning in &loaded.warnings {
        lines.push(format!("warning: {warning}"));
    }

    CommandResult { exit_code: EXIT_OK, output: lines.join("\n") }
}
