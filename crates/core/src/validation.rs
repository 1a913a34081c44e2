//! Validation pass over a populated [`Params`].
//!
//! Parameters are checked in definition order, arguments before flags, and the
//! first failure ends the pass. For each parameter the order is:
//!
//! 1. conversion or missing-required error recorded in the store
//! 2. `constraints`
//! 3. `pattern`
//! 4. each of `rules`
//! 5. `depends-on`
//! 6. `conflicts-with`
//!
//! Steps 2 to 4 only run when the parameter has a real value (supplied or
//! defaulted); dependencies are checked for every parameter. The
//! argument-count rules run last.

use log::{debug, info};

use crate::command_definitions::{ArgsConfig, ParameterDefinition};
use crate::constraints::Evaluator;
use crate::error::{Error, Result};
use crate::params::Params;
use crate::store::{Entry, Scope};
use crate::value::Value;

pub fn validate(
    command: &str,
    args: &ArgsConfig,
    flags: &[ParameterDefinition],
    params: &Params<'_>,
    evaluator: &Evaluator<'_>,
) -> Result<()> {
    validate_args(command, args, params, evaluator)?;
    validate_flags(flags, params, evaluator)?;
    info!("Parameters of `{command}` are valid");
    Ok(())
}

pub fn validate_args(
    command: &str,
    args: &ArgsConfig,
    params: &Params<'_>,
    evaluator: &Evaluator<'_>,
) -> Result<()> {
    for (index, definition) in args.vars.iter().enumerate() {
        let Some(entry) = params.args.get_at(index) else {
            continue;
        };
        validate_parameter(Scope::Args, definition, &entry, params, evaluator)?;
    }

    let count = params.args.raw_inputs().len();
    for rule in &args.rules {
        rule.check(command, count)?;
    }

    Ok(())
}

pub fn validate_flags(
    flags: &[ParameterDefinition],
    params: &Params<'_>,
    evaluator: &Evaluator<'_>,
) -> Result<()> {
    for definition in flags {
        let Some(entry) = params.flags.get(&definition.name) else {
            continue;
        };
        validate_parameter(Scope::Flags, definition, &entry, params, evaluator)?;
    }
    Ok(())
}

fn validate_parameter(
    scope: Scope,
    definition: &ParameterDefinition,
    entry: &Entry<'_>,
    params: &Params<'_>,
    evaluator: &Evaluator<'_>,
) -> Result<()> {
    let name = definition.name.as_str();
    debug!("Validating {scope} `{name}` with value `{}`", entry.value);

    if let Some(error) = &entry.error {
        return Err(error.to_error(scope, name, &entry.raw));
    }

    if entry.has_value() {
        let constraint_error = |source| Error::Constraint {
            scope,
            name: name.to_string(),
            source,
        };

        evaluator
            .evaluate_opt(definition.constraints.as_ref(), &entry.value)
            .map_err(constraint_error)?;

        if let Some(pattern) = &definition.pattern {
            if !pattern.is_match(&entry.value.to_string()) {
                return Err(Error::PatternMismatch {
                    scope,
                    name: name.to_string(),
                    value: entry.value.to_string(),
                });
            }
        }

        for rule in &definition.rules {
            evaluator
                .evaluate(rule, &entry.value)
                .map_err(constraint_error)?;
        }
    }

    for dependency in &definition.depends_on {
        let value = params
            .lookup(scope, &dependency.name)
            .unwrap_or(Value::Null);
        debug!(
            "{scope} `{name}` depends on `{}` = `{value}`",
            dependency.name
        );
        evaluator
            .evaluate_opt(dependency.when.as_ref(), &value)
            .map_err(|source| Error::Dependency {
                scope,
                name: name.to_string(),
                dependency: dependency.name.clone(),
                source,
            })?;
    }

    for other in &definition.conflicts_with {
        let Some(other_entry) = params.lookup_entry(scope, other) else {
            continue;
        };
        let conflicting = match scope {
            Scope::Args => entry.is_present() && other_entry.is_present(),
            Scope::Flags => entry.is_explicit() && other_entry.is_explicit(),
        };
        if conflicting {
            return Err(Error::Conflict {
                scope,
                name: name.to_string(),
                other: other.clone(),
            });
        }
    }

    Ok(())
}
