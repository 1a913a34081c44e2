//! Rules on the number of positional arguments a command accepts.
//!
//! These run once per invocation, after every argument has been validated,
//! and only look at how many raw values were supplied.

use log::debug;
use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum CountCheck {
    NoArgs,
    AtLeast(usize),
    AtMost(usize),
    Exactly(usize),
    Between(usize, usize),
    MatchAll(Vec<ArgRule>),
    MatchAny(Vec<ArgRule>),
    MatchNone(Vec<ArgRule>),
    Not(Box<ArgRule>),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawArgRule")]
pub struct ArgRule {
    checks: Vec<CountCheck>,
}

impl ArgRule {
    pub fn new(checks: Vec<CountCheck>) -> Self {
        Self { checks }
    }

    pub fn checks(&self) -> &[CountCheck] {
        &self.checks
    }

    /// Checks `count` raw arguments against every check of this rule.
    pub fn check(&self, command: &str, count: usize) -> Result<()> {
        for check in &self.checks {
            check_count(check, command, count)?;
        }
        Ok(())
    }
}

fn check_count(check: &CountCheck, command: &str, count: usize) -> Result<()> {
    match check {
        CountCheck::NoArgs if count > 0 => {
            Err(Error::ArgCount(format!("{command} accepts no args")))
        }
        CountCheck::AtLeast(min) if count < *min => Err(Error::ArgCount(format!(
            "requires at least {min} arg(s), only received {count}"
        ))),
        CountCheck::AtMost(max) if count > *max => Err(Error::ArgCount(format!(
            "accepts at most {max} arg(s), received {count}"
        ))),
        CountCheck::Exactly(exact) if count != *exact => Err(Error::ArgCount(format!(
            "accepts {exact} arg(s), received {count}"
        ))),
        CountCheck::Between(min, max) if count < *min || count > *max => {
            Err(Error::ArgCount(format!(
                "accepts between {min} and {max} arg(s), received {count}"
            )))
        }
        CountCheck::MatchAll(rules) => rules.iter().try_for_each(|rule| rule.check(command, count)),
        CountCheck::MatchAny(rules) => {
            let mut first_failure = None;
            for rule in rules {
                match rule.check(command, count) {
                    Ok(()) => return Ok(()),
                    Err(error) => {
                        first_failure.get_or_insert(error);
                    }
                }
            }
            first_failure.map_or(Ok(()), Err)
        }
        CountCheck::MatchNone(rules) => {
            if rules.iter().any(|rule| rule.check(command, count).is_ok()) {
                debug!("A `nand` argument rule of `{command}` passed with {count} argument(s)");
                return Err(Error::RuleViolation {
                    command: command.to_string(),
                    combinator: "nand",
                });
            }
            Ok(())
        }
        CountCheck::Not(rule) => match rule.check(command, count) {
            Ok(()) => Err(Error::RuleViolation {
                command: command.to_string(),
                combinator: "not",
            }),
            Err(_) => Ok(()),
        },
        _ => Ok(()),
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
struct RawArgRule {
    no_args: bool,
    arbitrary_args: bool,
    minimum_n_args: usize,
    maximum_n_args: usize,
    exact_args: usize,
    exact_valid_args: usize,
    range_args: Vec<usize>,
    #[serde(alias = "match-all")]
    and: Option<Vec<ArgRule>>,
    #[serde(alias = "match-any")]
    or: Option<Vec<ArgRule>>,
    #[serde(alias = "match-none")]
    nand: Option<Vec<ArgRule>>,
    not: Option<Box<ArgRule>>,
}

impl From<RawArgRule> for ArgRule {
    fn from(raw: RawArgRule) -> Self {
        let mut checks = Vec::new();

        if raw.no_args {
            checks.push(CountCheck::NoArgs);
        }
        if raw.minimum_n_args > 0 {
            checks.push(CountCheck::AtLeast(raw.minimum_n_args));
        }
        if raw.maximum_n_args > 0 {
            checks.push(CountCheck::AtMost(raw.maximum_n_args));
        }
        if raw.exact_args > 0 {
            checks.push(CountCheck::Exactly(raw.exact_args));
        }
        match raw.range_args.as_slice() {
            [min] => checks.push(CountCheck::AtLeast(*min)),
            [min, max, ..] => checks.push(CountCheck::Between(*min, *max)),
            [] => {}
        }
        if raw.exact_valid_args > 0 {
            checks.push(CountCheck::Exactly(raw.exact_valid_args));
        }

        checks.extend(raw.and.map(CountCheck::MatchAll));
        checks.extend(raw.or.map(CountCheck::MatchAny));
        checks.extend(raw.nand.map(CountCheck::MatchNone));
        checks.extend(raw.not.map(CountCheck::Not));

        ArgRule { checks }
    }
}
