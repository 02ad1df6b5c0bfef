//! Configuration command implementations

use crate::cli::{ConfigCommands, Output};
use crate::config::{CliOverrides, VidguardConfig};
use anyhow::Result;

/// Execute config commands
pub fn execute(cmd: ConfigCommands, custom_config: Option<&str>, output: &Output) -> Result<()> {
    let config = VidguardConfig::load_with_overrides(custom_config, &CliOverrides::default())?;

    match cmd {
        ConfigCommands::Show => {
            println!("{}", serde_json::to_string_pretty(&config.get_full_config()?)?);
        }
        ConfigCommands::Get { key } => {
            let value = config
                .get_section(&key)
                .map_err(|_| anyhow::anyhow!("Configuration key '{}' not found", key))?;

            match value {
                serde_json::Value::Object(_) => println!("{}", serde_json::to_string_pretty(&value)?),
                serde_json::Value::Array(items) => {
                    for item in items {
                        match item {
                            serde_json::Value::String(s) => println!("{}", s),
                            other => println!("{}", other),
                        }
                    }
                }
                serde_json::Value::String(s) => println!("{}", s),
                other => println!("{}", other),
            }
        }
        ConfigCommands::Validate => {
            let settings = config.settings()?;
            output.success("Configuration is valid");
            output.table_row("Workers", &settings.worker_count().to_string());
            output.table_row("Timeout", &format!("{}s", settings.validator.timeout_secs));
            output.table_row("Checkpoint every", &settings.runner.checkpoint_interval.to_string());
            output.table_row("Extensions", &settings.scanner.extensions.join(", "));
        }
    }

    Ok(())
}
