use std::cmp::Ordering;

use itertools::Itertools;
use log::{debug, trace};

use super::filesystem::FileSystem;
use super::{Check, ConstraintError, ConstraintSpec};
use crate::value::Value;

/// Walks constraint trees against values.
///
/// Path predicates are resolved through the borrowed [`FileSystem`].
pub struct Evaluator<'fs> {
    fs: &'fs dyn FileSystem,
}

impl<'fs> Evaluator<'fs> {
    pub fn new(fs: &'fs dyn FileSystem) -> Self {
        Self { fs }
    }

    /// A missing spec always passes.
    pub fn evaluate_opt(
        &self,
        spec: Option<&ConstraintSpec>,
        value: &Value,
    ) -> Result<(), ConstraintError> {
        match spec {
            Some(spec) => self.evaluate(spec, value),
            None => Ok(()),
        }
    }

    pub fn evaluate(&self, spec: &ConstraintSpec, value: &Value) -> Result<(), ConstraintError> {
        for check in spec.checks() {
            trace!("Evaluating `{}` against `{value}`", check.name());
            self.check(check, value)?;
        }
        Ok(())
    }

    fn check(&self, check: &Check, value: &Value) -> Result<(), ConstraintError> {
        match check {
            Check::Eq(expected) => ensure(value.loose_eq(expected), || {
                ConstraintError::violation(
                    "eq",
                    value,
                    format!("Value `{value}` is not equal to `{expected}`"),
                )
            }),
            Check::Neq(unexpected) => ensure(!value.loose_eq(unexpected), || {
                ConstraintError::violation(
                    "neq",
                    value,
                    format!("Value `{value}` must not be equal to `{unexpected}`"),
                )
            }),
            Check::Gt(bound) => compare(value, bound, "gt", "is not greater than", |o| {
                o == Ordering::Greater
            }),
            Check::Gte(bound) => compare(
                value,
                bound,
                "gte",
                "is less than the minimum value of",
                |o| o != Ordering::Less,
            ),
            Check::Lt(bound) => compare(value, bound, "lt", "is not less than", |o| {
                o == Ordering::Less
            }),
            Check::Lte(bound) => compare(
                value,
                bound,
                "lte",
                "is greater than the maximum value of",
                |o| o != Ordering::Greater,
            ),
            Check::In(allowed) => ensure(allowed.iter().any(|v| value.exact_eq(v)), || {
                ConstraintError::violation(
                    "in",
                    value,
                    format!("Value `{value}` is not in the list of [{}]", allowed.iter().join(", ")),
                )
            }),
            Check::NotIn(excluded) => ensure(!excluded.iter().any(|v| value.exact_eq(v)), || {
                ConstraintError::violation(
                    "notIn",
                    value,
                    format!("Value `{value}` is in the excluded list of [{}]", excluded.iter().join(", ")),
                )
            }),
            Check::Min(min) => numeric(value, "min", |n| n >= *min, || {
                format!("Value `{value}` is less than the minimum of {min}")
            }),
            Check::Max(max) => numeric(value, "max", |n| n <= *max, || {
                format!("Value `{value}` is greater than the maximum of {max}")
            }),
            Check::MultipleOf(step) => numeric(value, "multipleOf", |n| is_multiple(n, *step), || {
                format!("Value `{value}` is not a multiple of {step}")
            }),
            Check::MinLength(min) => ensure(char_len(value) >= *min, || {
                ConstraintError::violation(
                    "min-length",
                    value,
                    format!("Value is less than the minimum character length of {min}"),
                )
            }),
            Check::MaxLength(max) => ensure(char_len(value) <= *max, || {
                ConstraintError::violation(
                    "max-length",
                    value,
                    format!("Value is greater than the maximum character length of {max}"),
                )
            }),
            Check::Pattern(pattern) => ensure(pattern.is_match(&value.to_string()), || {
                ConstraintError::violation(
                    "pattern",
                    value,
                    format!("Value `{value}` does not match pattern: {pattern}"),
                )
            }),
            Check::Path(predicates) => Ok(predicates.check(self.fs, &value.to_string())?),
            Check::And(branches) => {
                for (index, branch) in branches.iter().enumerate() {
                    self.evaluate(branch, value)
                        .map_err(|source| ConstraintError::Branch {
                            combinator: "and",
                            branch: index,
                            source: Box::new(source),
                        })?;
                }
                Ok(())
            }
            Check::Nand(branches) => {
                for (index, branch) in branches.iter().enumerate() {
                    if self.evaluate(branch, value).is_ok() {
                        debug!("`nand` branch {index} unexpectedly passed for `{value}`");
                        return Err(ConstraintError::Nand {
                            branch: index,
                            value: value.to_string(),
                        });
                    }
                }
                Ok(())
            }
            Check::Or(branches) => {
                let mut first_failure = None;
                for (index, branch) in branches.iter().enumerate() {
                    match self.evaluate(branch, value) {
                        Ok(()) => return Ok(()),
                        Err(source) => {
                            first_failure.get_or_insert(ConstraintError::Branch {
                                combinator: "or",
                                branch: index,
                                source: Box::new(source),
                            });
                        }
                    }
                }
                first_failure.map_or(Ok(()), Err)
            }
            Check::Not(inner) => match self.evaluate(inner, value) {
                Ok(()) => Err(ConstraintError::Not {
                    value: value.to_string(),
                }),
                Err(_) => Ok(()),
            },
        }
    }
}

fn ensure(
    passed: bool,
    failure: impl FnOnce() -> ConstraintError,
) -> Result<(), ConstraintError> {
    if passed {
        Ok(())
    } else {
        Err(failure())
    }
}

fn compare(
    value: &Value,
    bound: &Value,
    check: &'static str,
    relation: &str,
    accept: impl Fn(Ordering) -> bool,
) -> Result<(), ConstraintError> {
    let passed = value.loose_cmp(bound).is_some_and(accept);
    ensure(passed, || {
        ConstraintError::violation(check, value, format!("Value `{value}` {relation} `{bound}`"))
    })
}

fn numeric(
    value: &Value,
    check: &'static str,
    accept: impl Fn(f64) -> bool,
    message: impl FnOnce() -> String,
) -> Result<(), ConstraintError> {
    match value.as_number() {
        Some(number) if accept(number) => Ok(()),
        Some(_) => Err(ConstraintError::violation(check, value, message())),
        None => Err(ConstraintError::violation(
            check,
            value,
            format!("Value `{value}` is not a number"),
        )),
    }
}

fn is_multiple(number: f64, step: f64) -> bool {
    if step == 0.0 || !step.is_finite() || !number.is_finite() {
        return false;
    }
    let quotient = number / step;
    (quotient - quotient.round()).abs() < 1e-9
}

fn char_len(value: &Value) -> usize {
    value.to_string().chars().count()
}
