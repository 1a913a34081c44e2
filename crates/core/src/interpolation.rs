//! Placeholder substitution and environment variable naming.

use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^{}\s]+)\}").expect("placeholder pattern compiles"));

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Display for EnvVar {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}={}", self.name, self.value)
    }
}

/// Turns a state key into an environment variable name: `foo.bar[0]` becomes
/// `FOO_BAR_0`. Hyphens also become underscores so the result is a valid
/// shell identifier.
pub fn env_name(key: &str) -> String {
    key.chars()
        .filter(|c| *c != ']')
        .map(|c| match c {
            '.' | '[' | '-' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// Replaces every `${key}` in `script` with `resolve(key)`. Placeholders the
/// resolver does not know are left as they are.
pub fn substitute(script: &str, resolve: impl Fn(&str) -> Option<String>) -> String {
    PLACEHOLDER
        .replace_all(script, |captures: &Captures| {
            resolve(&captures[1]).unwrap_or_else(|| captures[0].to_string())
        })
        .into_owned()
}

/// Keys referenced by `${...}` placeholders, in order of appearance.
pub fn placeholders(script: &str) -> Vec<&str> {
    PLACEHOLDER
        .captures_iter(script)
        .filter_map(|captures| captures.get(1).map(|key| key.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_name() {
        assert_eq!(env_name("foo.bar[0]"), "FOO_BAR_0");
        assert_eq!(env_name("list[12]"), "LIST_12");
        assert_eq!(env_name("arg1"), "ARG1");
        assert_eq!(env_name("dry-run"), "DRY_RUN");
    }

    #[test]
    fn test_substitute_known_and_unknown() {
        let result = substitute("echo ${args.name} ${args.missing} $HOME", |key| {
            (key == "args.name").then(|| "world".to_string())
        });
        assert_eq!(result, "echo world ${args.missing} $HOME");
    }

    #[test]
    fn test_substitute_repeated() {
        let result = substitute("${a}-${a}", |_| Some("x".to_string()));
        assert_eq!(result, "x-x");
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let result = substitute("${a}", |key| match key {
            "a" => Some("${b}".to_string()),
            _ => Some("nope".to_string()),
        });
        assert_eq!(result, "${b}");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(
            placeholders("run ${args.x} ${flags.y} ${ bad }"),
            vec!["args.x", "flags.y"]
        );
    }

    #[test]
    fn test_env_var_display() {
        assert_eq!(EnvVar::new("ARGS_X", "1").to_string(), "ARGS_X=1");
    }
}
