//! Loading and validation of command configuration files.
//!
//! A configuration file describes the root command, its sub-commands, and the
//! arguments and flags each of them accepts. Validation checks names and types
//! up front so problems surface before any input is processed.

use std::collections::HashSet;
use std::fs::File;

use log::debug;

use crate::command_definitions::{AppConfig, CommandDefinition, ParameterDefinition};
use crate::error::Error::{EmptyName, NameWithSpace, NonUniqueCommandName, NonUniqueParameterName};
use crate::error::{Error, Result};
use crate::store::Scope;
use crate::types::TypeRegistry;

fn get_reader(file_description: &str, path: &str) -> Result<File> {
    match File::open(path) {
        Ok(reader) => Ok(reader),
        Err(e) => Err(Error::io_error(
            file_description.to_string(),
            path.to_string(),
            e,
        )),
    }
}

/// Reads a command configuration file without validating it.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is not a valid
/// configuration document.
///
/// # Examples
///
/// ```no_run
/// use paramgate_core::file_handling::get_app_config;
///
/// let config = get_app_config("commands.yml")?;
/// println!("Loaded {}", config.root);
/// # Ok::<(), paramgate_core::error::Error>(())
/// ```
pub fn get_app_config(config_path: &str) -> Result<AppConfig> {
    let config_reader = get_reader("config", config_path)?;

    // Not shortcut with ? so the path ends up in the error
    let parsing_result: serde_yaml::Result<AppConfig> = serde_yaml::from_reader(config_reader);

    parsing_result.map_err(|e| {
        Error::yaml_error(
            "reading".to_string(),
            "config".to_string(),
            config_path.to_string(),
            e,
        )
    })
}

/// Parses a configuration document held in memory.
pub fn parse_app_config(contents: &str) -> Result<AppConfig> {
    serde_yaml::from_str(contents).map_err(|e| {
        Error::yaml_error(
            "parsing".to_string(),
            "config".to_string(),
            "<memory>".to_string(),
            e,
        )
    })
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(EmptyName);
    }

    if name.contains(' ') {
        return Err(NameWithSpace(name.to_string()));
    }

    Ok(())
}

fn validate_parameters(
    command: &CommandDefinition,
    scope: Scope,
    parameters: &[ParameterDefinition],
    registry: &TypeRegistry,
) -> Result<()> {
    let mut names = HashSet::new();
    for parameter in parameters {
        validate_name(&parameter.name)?;
        registry.lookup(parameter.type_name())?;

        if !names.insert(parameter.name.as_str()) {
            return Err(NonUniqueParameterName {
                command: command.name.clone(),
                scope,
                name: parameter.name.clone(),
            });
        }
    }

    Ok(())
}

fn validate_command(command: &CommandDefinition, registry: &TypeRegistry) -> Result<()> {
    debug!("Validating command `{}`", command.name);
    validate_parameters(command, Scope::Args, &command.args.vars, registry)?;
    validate_parameters(command, Scope::Flags, &command.flags, registry)?;

    let mut names = HashSet::new();
    for sub_command in &command.commands {
        validate_name(&sub_command.name)?;
        for name in std::iter::once(&sub_command.name).chain(&sub_command.aliases) {
            if !names.insert(name.as_str()) {
                return Err(NonUniqueCommandName(name.clone()));
            }
        }
        validate_command(sub_command, registry)?;
    }

    Ok(())
}

/// Checks a loaded configuration: every name is non-empty and free of
/// spaces, sibling commands (and their aliases) are unique, parameter names
/// are unique per scope, and every parameter type is registered.
///
/// The root command may be unnamed.
///
/// # Errors
///
/// Returns the first problem found, walking the command tree depth first.
pub fn validate_config(config: &AppConfig, registry: &TypeRegistry) -> Result<()> {
    validate_command(&config.root, registry)
}

/// Reads and validates a configuration file in one step.
pub fn load_app_config(config_path: &str, registry: &TypeRegistry) -> Result<AppConfig> {
    let config = get_app_config(config_path)?;
    validate_config(&config, registry)?;
    Ok(config)
}
