//! Resolves a command line against the configuration and prepares the start
//! script for execution.

use itertools::Itertools;
use log::{debug, info};

use paramgate_core::command_definitions::AppConfig;
use paramgate_core::engine::Engine;
use paramgate_core::error::{Error, Result};
use paramgate_core::interpolation::EnvVar;

use crate::cli_args::OutputFormat;

/// A validated invocation, ready to run.
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    /// Space separated path from the root command, e.g. `tool db migrate`
    pub command: String,
    pub script: Option<String>,
    pub environment: Vec<EnvVar>,
    pub json: String,
}

/// Resolves the sub-command named by the leading words of `command_line`,
/// processes the remaining words with the engine, and interpolates the
/// command's start script.
///
/// # Errors
///
/// Returns the first validation error, or [`Error::CommandNotFound`] when the
/// first remaining word names no sub-command of a command that has nothing
/// to run itself.
pub fn prepare<S: AsRef<str>>(
    config: &AppConfig,
    engine: &Engine,
    command_line: &[S],
) -> Result<Prepared> {
    let (command, consumed) = config.root.resolve(command_line);
    let remainder = &command_line[consumed..];

    if command.start.is_none() && !command.commands.is_empty() {
        if let Some(word) = remainder.first().map(|word| word.as_ref()) {
            if !word.starts_with('-') {
                return Err(Error::CommandNotFound(word.to_string()));
            }
        }
    }

    let path = std::iter::once(config.root.name.as_str())
        .chain(command_line[..consumed].iter().map(|word| word.as_ref()))
        .filter(|word| !word.is_empty())
        .join(" ");
    info!("Resolved command `{path}`");

    let mut params = engine.process_command(command, remainder)?.into_result()?;
    params.set("cli.name", config.root.name.as_str());
    params.set("cli.version", config.version.clone().unwrap_or_default());
    params.set("cli.command", path.as_str());

    let script = command.start.as_deref().map(|start| params.interpolate(start));
    debug!("Start script: {script:?}");

    Ok(Prepared {
        command: path,
        script,
        environment: params.env_vars(),
        json: params.to_json_string(),
    })
}

/// Text printed by a dry run.
pub fn render(prepared: &Prepared, format: OutputFormat) -> String {
    match format {
        OutputFormat::Script => prepared.script.clone().unwrap_or_default(),
        OutputFormat::Env => prepared.environment.iter().join("\n"),
        OutputFormat::Json => prepared.json.clone(),
    }
}
