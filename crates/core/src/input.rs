//! Splits a command line into positional values and flag values.

use indexmap::IndexMap;
use log::trace;

use crate::command_definitions::ParameterDefinition;
use crate::error::{Error, Result};

/// Raw inputs for one command invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    pub positional: Vec<String>,
    /// Supplied flags keyed by long name. A repeated flag keeps its last value.
    pub flags: IndexMap<String, String>,
}

impl Invocation {
    pub fn new(positional: Vec<String>, flags: IndexMap<String, String>) -> Self {
        Self { positional, flags }
    }

    pub fn positional_only<S: AsRef<str>>(values: &[S]) -> Self {
        Self {
            positional: values.iter().map(|v| v.as_ref().to_string()).collect(),
            flags: IndexMap::new(),
        }
    }
}

fn looks_like_number(token: &str) -> bool {
    token.parse::<f64>().is_ok()
}

/// Accepts `--name value`, `--name=value`, `-s value`, `-s=value`, and bare
/// boolean flags (`--force` means `true`). Everything after `--` is
/// positional, as are `-` and negative numbers.
pub fn split_invocation<S: AsRef<str>>(
    argv: &[S],
    flags: &[ParameterDefinition],
) -> Result<Invocation> {
    let mut invocation = Invocation::default();
    let mut tokens = argv.iter().map(|token| token.as_ref());

    while let Some(token) = tokens.next() {
        if token == "--" {
            invocation
                .positional
                .extend(tokens.by_ref().map(str::to_string));
            break;
        }

        let (definition, inline_value) = if let Some(long) = token.strip_prefix("--") {
            let (name, value) = match long.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (long, None),
            };
            let definition = flags
                .iter()
                .find(|f| f.name == name)
                .ok_or_else(|| Error::UnknownFlag(format!("--{name}")))?;
            (definition, value)
        } else if let Some(short) = token
            .strip_prefix('-')
            .filter(|s| !s.is_empty() && !looks_like_number(token))
        {
            let (name, value) = match short.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (short, None),
            };
            let definition = flags
                .iter()
                .find(|f| f.shorthand.as_deref() == Some(name))
                .ok_or_else(|| Error::UnknownFlag(format!("-{name}")))?;
            (definition, value)
        } else {
            invocation.positional.push(token.to_string());
            continue;
        };

        let value = match inline_value {
            Some(value) => value.to_string(),
            None if definition.is_boolean() => "true".to_string(),
            None => tokens
                .next()
                .map(str::to_string)
                .ok_or_else(|| Error::MissingFlagValue(definition.name.clone()))?,
        };

        trace!("Flag `{}` set to `{value}`", definition.name);
        invocation.flags.insert(definition.name.clone(), value);
    }

    Ok(invocation)
}
