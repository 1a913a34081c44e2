use std::fmt::{Display, Formatter};

use serde::Deserialize;

use crate::constraints::{ConstraintSpec, Pattern};
use crate::rules::ArgRule;
use crate::types::DEFAULT_TYPE;
use crate::value::Value;

/// One positional argument or flag.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub required: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    #[serde(alias = "validation")]
    pub constraints: Option<ConstraintSpec>,
    #[serde(default)]
    pub depends_on: Vec<ParameterDependency>,
    #[serde(default)]
    pub conflicts_with: Vec<String>,
    #[serde(rename = "short")]
    pub shorthand: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    pub pattern: Option<Pattern>,
    #[serde(default)]
    pub rules: Vec<ConstraintSpec>,
}

impl ParameterDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn of_type(mut self, type_name: &str) -> Self {
        self.type_name = Some(type_name.to_string());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_constraints(mut self, constraints: ConstraintSpec) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn depends_on(mut self, name: &str, when: ConstraintSpec) -> Self {
        self.depends_on.push(ParameterDependency {
            name: name.to_string(),
            when: Some(when),
        });
        self
    }

    pub fn conflicts_with(mut self, name: &str) -> Self {
        self.conflicts_with.push(name.to_string());
        self
    }

    pub fn with_shorthand(mut self, shorthand: &str) -> Self {
        self.shorthand = Some(shorthand.to_string());
        self
    }

    /// Declared type, `string` when omitted.
    pub fn type_name(&self) -> &str {
        self.type_name
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TYPE)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.type_name(), "bool" | "boolean")
    }
}

impl Display for ParameterDefinition {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "`{}`", self.name)?;

        if let Some(desc) = &self.description {
            write!(formatter, " ({})", desc)?;
        }

        Ok(())
    }
}

/// `depends-on` entry: the parameter under `name` must satisfy `when`.
///
/// `name` may be scoped: `args.input`, `flags.force`, `args[0]`, or bare.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ParameterDependency {
    #[serde(rename = "arg", alias = "name")]
    pub name: String,
    pub when: Option<ConstraintSpec>,
}

/// Positional arguments of a command, written either as a plain list of
/// definitions or as `{vars: [...], rules: [...]}`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(from = "RawArgsConfig")]
pub struct ArgsConfig {
    pub vars: Vec<ParameterDefinition>,
    pub rules: Vec<ArgRule>,
}

impl ArgsConfig {
    pub fn new(vars: Vec<ParameterDefinition>) -> Self {
        Self {
            vars,
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: ArgRule) -> Self {
        self.rules.push(rule);
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawArgsConfig {
    List(Vec<ParameterDefinition>),
    Structured {
        #[serde(default)]
        vars: Vec<ParameterDefinition>,
        #[serde(default)]
        rules: Vec<ArgRule>,
    },
}

impl From<RawArgsConfig> for ArgsConfig {
    fn from(raw: RawArgsConfig) -> Self {
        match raw {
            RawArgsConfig::List(vars) => ArgsConfig::new(vars),
            RawArgsConfig::Structured { vars, rules } => ArgsConfig { vars, rules },
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct CommandDefinition {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub args: ArgsConfig,
    #[serde(default)]
    pub flags: Vec<ParameterDefinition>,
    #[serde(default)]
    pub commands: Vec<CommandDefinition>,
    pub start: Option<String>,
}

impl CommandDefinition {
    pub fn matches(&self, word: &str) -> bool {
        self.name == word || self.aliases.iter().any(|alias| alias == word)
    }

    /// Follows `words` down the sub-command tree as far as they name
    /// sub-commands. Returns the deepest command reached and how many words
    /// were consumed.
    pub fn resolve<S: AsRef<str>>(&self, words: &[S]) -> (&CommandDefinition, usize) {
        let mut current = self;
        let mut consumed = 0;

        for word in words {
            match current.commands.iter().find(|c| c.matches(word.as_ref())) {
                Some(next) => {
                    current = next;
                    consumed += 1;
                }
                None => break,
            }
        }

        (current, consumed)
    }
}

impl Display for CommandDefinition {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(desc) => write!(formatter, "{} ({})", self.name, desc),
            None => formatter.write_str(&self.name),
        }
    }
}

/// Top level of a command configuration file: the root command plus the
/// application version.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct AppConfig {
    pub version: Option<String>,
    #[serde(flatten)]
    pub root: CommandDefinition,
}
