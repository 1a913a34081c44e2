//! Entry point tying the registry, the stores and the validator together.
//!
//! One call to [`Engine::process`] handles one command invocation: it builds
//! the argument and flag stores, runs the validation pass, and hands back the
//! populated [`Params`] together with the first validation error, if any.

use log::{debug, warn};

use crate::command_definitions::{ArgsConfig, CommandDefinition, ParameterDefinition};
use crate::constraints::{Evaluator, FileSystem, OsFileSystem};
use crate::error::{Error, Result};
use crate::input::{split_invocation, Invocation};
use crate::params::Params;
use crate::store::ParameterStore;
use crate::types::TypeRegistry;
use crate::validation::validate;

pub struct Engine {
    registry: TypeRegistry,
    fs: Box<dyn FileSystem>,
}

/// Result of processing one invocation. The parameters stay queryable even
/// when validation failed.
#[derive(Debug)]
pub struct Outcome<'a> {
    pub params: Params<'a>,
    pub error: Option<Error>,
}

impl<'a> Outcome<'a> {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Params<'a>> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.params),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Engine with the built-in types and the real filesystem.
    pub fn new() -> Self {
        Self {
            registry: TypeRegistry::with_builtins(),
            fs: Box::new(OsFileSystem),
        }
    }

    pub fn with_registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_filesystem(mut self, fs: impl FileSystem + 'static) -> Self {
        self.fs = Box::new(fs);
        self
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    pub fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(self.fs.as_ref())
    }

    /// Builds the stores for one invocation and validates them.
    ///
    /// # Errors
    ///
    /// Only configuration defects fail the call itself (a parameter with an
    /// unregistered type). Validation failures are reported in
    /// [`Outcome::error`].
    pub fn process<'a>(
        &self,
        command: &str,
        args: &'a ArgsConfig,
        flags: &'a [ParameterDefinition],
        invocation: &Invocation,
    ) -> Result<Outcome<'a>> {
        debug!(
            "Processing `{command}` with {} positional value(s) and {} flag(s)",
            invocation.positional.len(),
            invocation.flags.len()
        );

        let params = Params::new(
            ParameterStore::for_args(&self.registry, &args.vars, &invocation.positional)?,
            ParameterStore::for_flags(&self.registry, flags, &invocation.flags)?,
        );

        let error = validate(command, args, flags, &params, &self.evaluator()).err();
        if let Some(error) = &error {
            warn!("Validation of `{command}` failed: {error}");
        }

        Ok(Outcome { params, error })
    }

    /// Splits `argv` against the command's flags and processes the result.
    ///
    /// # Errors
    ///
    /// Fails on unknown flags, flags missing their value, and the
    /// configuration defects described on [`Engine::process`].
    pub fn process_command<'a, S: AsRef<str>>(
        &self,
        command: &'a CommandDefinition,
        argv: &[S],
    ) -> Result<Outcome<'a>> {
        let invocation = split_invocation(argv, &command.flags)?;
        self.process(&command.name, &command.args, &command.flags, &invocation)
    }
}
