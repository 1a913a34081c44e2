//! Declarative constraint trees.
//!
//! A [`ConstraintSpec`] is read from configuration as a map of predicate names
//! (`eq`, `min-length`, `file-exists`, `and`, ...) and stored as an ordered
//! list of [`Check`]s. Leaf checks always come before combinators, so the
//! evaluation order is fixed no matter how the configuration was written.

mod evaluate;
pub mod filesystem;
pub mod mime;

use std::fmt::{Display, Formatter};

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::value::Value;

pub use evaluate::Evaluator;
pub use filesystem::{
    FileMetadata, FileSystem, FilesystemError, MemoryFileSystem, OsFileSystem, PathPredicates,
};

#[derive(Error, Debug)]
pub enum ConstraintError {
    #[error("{message}")]
    Violation {
        check: &'static str,
        value: String,
        message: String,
    },

    /// First failing branch of an `and`/`or` group.
    #[error("{source}")]
    Branch {
        combinator: &'static str,
        branch: usize,
        #[source]
        source: Box<ConstraintError>,
    },

    #[error("Validation failed on `nand`: constraint {branch} passed for value `{value}`")]
    Nand { branch: usize, value: String },

    #[error("Condition is true for `not` constraint on value `{value}`")]
    Not { value: String },

    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    #[error("Invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("Invalid permissions `{0}`: expected an octal mode such as 0644")]
    InvalidPermissions(String),
}

impl ConstraintError {
    pub(crate) fn violation(check: &'static str, value: &Value, message: String) -> Self {
        Self::Violation {
            check,
            value: value.to_string(),
            message,
        }
    }

    /// The innermost error, following combinator branches down.
    pub fn root_cause(&self) -> &ConstraintError {
        match self {
            Self::Branch { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// A compiled regular expression compared by its source text.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, ConstraintError> {
        Regex::new(pattern)
            .map(Pattern)
            .map_err(|source| ConstraintError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.0.is_match(haystack)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for Pattern {
    type Error = ConstraintError;

    fn try_from(pattern: String) -> Result<Self, Self::Error> {
        Pattern::new(&pattern)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    Eq(Value),
    Neq(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Min(f64),
    Max(f64),
    MultipleOf(f64),
    MinLength(usize),
    MaxLength(usize),
    Pattern(Pattern),
    Path(PathPredicates),
    And(Vec<ConstraintSpec>),
    Nand(Vec<ConstraintSpec>),
    Or(Vec<ConstraintSpec>),
    Not(Box<ConstraintSpec>),
}

impl Check {
    /// Configuration name of the predicate.
    pub fn name(&self) -> &'static str {
        match self {
            Check::Eq(_) => "eq",
            Check::Neq(_) => "neq",
            Check::Gt(_) => "gt",
            Check::Gte(_) => "gte",
            Check::Lt(_) => "lt",
            Check::Lte(_) => "lte",
            Check::In(_) => "in",
            Check::NotIn(_) => "notIn",
            Check::Min(_) => "min",
            Check::Max(_) => "max",
            Check::MultipleOf(_) => "multipleOf",
            Check::MinLength(_) => "min-length",
            Check::MaxLength(_) => "max-length",
            Check::Pattern(_) => "pattern",
            Check::Path(_) => "path",
            Check::And(_) => "and",
            Check::Nand(_) => "nand",
            Check::Or(_) => "or",
            Check::Not(_) => "not",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Check::Eq(_) => 0,
            Check::Neq(_) => 1,
            Check::Gt(_) => 2,
            Check::Gte(_) => 3,
            Check::Lt(_) => 4,
            Check::Lte(_) => 5,
            Check::In(_) => 6,
            Check::NotIn(_) => 7,
            Check::Min(_) => 8,
            Check::Max(_) => 9,
            Check::MultipleOf(_) => 10,
            Check::MinLength(_) => 11,
            Check::MaxLength(_) => 12,
            Check::Pattern(_) => 13,
            Check::Path(_) => 14,
            Check::And(_) => 15,
            Check::Nand(_) => 16,
            Check::Or(_) => 17,
            Check::Not(_) => 18,
        }
    }

    pub fn is_combinator(&self) -> bool {
        matches!(
            self,
            Check::And(_) | Check::Nand(_) | Check::Or(_) | Check::Not(_)
        )
    }
}

/// One node of a constraint tree. An empty spec accepts every value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "RawConstraintSpec")]
pub struct ConstraintSpec {
    checks: Vec<Check>,
}

impl ConstraintSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_checks(mut checks: Vec<Check>) -> Self {
        checks.sort_by_key(Check::rank);
        Self { checks }
    }

    pub fn with(mut self, check: Check) -> Self {
        self.checks.push(check);
        self.checks.sort_by_key(Check::rank);
        self
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Toggle {
    Flag(bool),
    Text(String),
}

impl Toggle {
    fn enabled(&self) -> bool {
        match self {
            Toggle::Flag(flag) => *flag,
            Toggle::Text(text) => {
                !text.is_empty() && crate::types::parse_bool(text).unwrap_or(true)
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Permissions {
    Number(u64),
    Text(String),
}

impl Permissions {
    /// `0644` and `644` both mean rw-r--r--; integers are read digit by digit.
    fn mode(&self) -> Result<u32, ConstraintError> {
        let digits = match self {
            Permissions::Number(number) => number.to_string(),
            Permissions::Text(text) => text.trim().trim_start_matches("0o").to_string(),
        };
        u32::from_str_radix(&digits, 8)
            .ok()
            .filter(|mode| *mode <= 0o7777)
            .ok_or(ConstraintError::InvalidPermissions(digits))
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConstraintSpec {
    eq: Option<Value>,
    neq: Option<Value>,
    gt: Option<Value>,
    gte: Option<Value>,
    lt: Option<Value>,
    lte: Option<Value>,
    #[serde(rename = "in")]
    one_of: Option<Vec<Value>>,
    #[serde(rename = "notIn")]
    none_of: Option<Vec<Value>>,
    min: Option<f64>,
    max: Option<f64>,
    #[serde(rename = "multipleOf")]
    multiple_of: Option<f64>,
    #[serde(rename = "min-length", alias = "minLength")]
    min_length: Option<usize>,
    #[serde(rename = "max-length", alias = "maxLength")]
    max_length: Option<usize>,
    pattern: Option<String>,
    #[serde(rename = "file-exists")]
    file_exists: Option<Toggle>,
    #[serde(rename = "dir-exists")]
    dir_exists: Option<Toggle>,
    #[serde(rename = "has-permissions")]
    has_permissions: Option<Permissions>,
    #[serde(rename = "is-file-type")]
    is_file_type: Option<String>,
    and: Option<Vec<ConstraintSpec>>,
    nand: Option<Vec<ConstraintSpec>>,
    or: Option<Vec<ConstraintSpec>>,
    not: Option<Box<ConstraintSpec>>,
}

impl TryFrom<RawConstraintSpec> for ConstraintSpec {
    type Error = ConstraintError;

    fn try_from(raw: RawConstraintSpec) -> Result<Self, Self::Error> {
        let mut checks = Vec::new();

        checks.extend(raw.eq.map(Check::Eq));
        checks.extend(raw.neq.map(Check::Neq));
        checks.extend(raw.gt.map(Check::Gt));
        checks.extend(raw.gte.map(Check::Gte));
        checks.extend(raw.lt.map(Check::Lt));
        checks.extend(raw.lte.map(Check::Lte));
        checks.extend(raw.one_of.map(Check::In));
        checks.extend(raw.none_of.map(Check::NotIn));
        checks.extend(raw.min.map(Check::Min));
        checks.extend(raw.max.map(Check::Max));
        checks.extend(raw.multiple_of.map(Check::MultipleOf));
        checks.extend(raw.min_length.map(Check::MinLength));
        checks.extend(raw.max_length.map(Check::MaxLength));

        if let Some(pattern) = raw.pattern.filter(|p| !p.is_empty()) {
            checks.push(Check::Pattern(Pattern::new(&pattern)?));
        }

        let predicates = PathPredicates {
            file_exists: raw.file_exists.is_some_and(|t| t.enabled()),
            dir_exists: raw.dir_exists.is_some_and(|t| t.enabled()),
            permissions: raw.has_permissions.map(|p| p.mode()).transpose()?,
            file_type: raw.is_file_type.filter(|t| !t.is_empty()),
        };
        if !predicates.is_empty() {
            checks.push(Check::Path(predicates));
        }

        checks.extend(raw.and.map(Check::And));
        checks.extend(raw.nand.map(Check::Nand));
        checks.extend(raw.or.map(Check::Or));
        checks.extend(raw.not.map(Check::Not));

        Ok(ConstraintSpec::from_checks(checks))
    }
}
