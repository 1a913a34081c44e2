use thiserror::Error;

use crate::constraints::ConstraintError;
use crate::store::Scope;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid value `{raw}` for {scope} `{name}` of type `{type_name}`: {reason}")]
    Conversion {
        scope: Scope,
        name: String,
        type_name: String,
        raw: String,
        reason: String,
    },

    #[error("missing required {scope}: {name}")]
    MissingRequired { scope: Scope, name: String },

    #[error("Invalid {scope} `{name}`: {source}")]
    Constraint {
        scope: Scope,
        name: String,
        source: ConstraintError,
    },

    #[error("{scope} `{name}` depends on `{dependency}`: {source}")]
    Dependency {
        scope: Scope,
        name: String,
        dependency: String,
        source: ConstraintError,
    },

    #[error("{scope} {name} conflicts with {other}")]
    Conflict {
        scope: Scope,
        name: String,
        other: String,
    },

    #[error("pattern validation failed for {scope} {name}: {value}")]
    PatternMismatch {
        scope: Scope,
        name: String,
        value: String,
    },

    #[error("{0}")]
    ArgCount(String),

    #[error("Validation failed on `{combinator}` for argument rules of `{command}`")]
    RuleViolation {
        command: String,
        combinator: &'static str,
    },

    #[error("Unknown type: `{0}`")]
    UnknownType(String),

    #[error("Type `{0}` is already registered")]
    DuplicateType(String),

    #[error("Unknown flag: `{0}`")]
    UnknownFlag(String),

    #[error("Flag `{0}` requires a value")]
    MissingFlagValue(String),

    #[error("Command not found: `{0}`")]
    CommandNotFound(String),

    #[error("Error {} {} file at `{}`: {}", .action, .file_description, .path, .original)]
    Yaml {
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    },

    #[error("IO error with {} file at path `{}`: {}", .file_description, .path, .original)]
    Io {
        file_description: String,
        path: String,
        original: std::io::Error,
    },

    #[error("Found a non-unique command name: `{}`", .0)]
    NonUniqueCommandName(String),

    #[error("Found a non-unique {} name on command {}: `{}`", .scope, .command, .name)]
    NonUniqueParameterName {
        command: String,
        scope: Scope,
        name: String,
    },

    #[error("Invalid name: name may not be empty")]
    EmptyName,

    #[error("Invalid name `{}`: name may not contain spaces", .0)]
    NameWithSpace(String),

    #[error("The sub process exiting with non-success code.")]
    SubProcessExit,

    #[error("Error with sub process process: {}", _0)]
    SubProcess(#[from] std::io::Error),
}

impl Error {
    pub fn yaml_error(
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    ) -> Self {
        Self::Yaml {
            action,
            file_description,
            path,
            original,
        }
    }

    pub fn io_error(file_description: String, path: String, original: std::io::Error) -> Self {
        Self::Io {
            file_description,
            path,
            original,
        }
    }
}
