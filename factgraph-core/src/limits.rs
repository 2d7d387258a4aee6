//! Declarative validators attached to writable facts.
//!
//! A limit never aborts anything: failing limits are collected into
//! [`LimitViolation`]s and handed back from `set` and `save`. Bounds are
//! themselves expressions, evaluated with the owning fact as context; a
//! bound (or actual) without a value simply does not fire.

use crate::error::EvalError;
use crate::expr::context::EvalContext;
use crate::expr::Expr;
use crate::result::MaybeVec;
use crate::value::Value;
use factgraph_path::Path;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Display};

/// How severe a failing limit is. Only `Error` violations make an
/// operation report failure; warnings ride along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The write is unacceptable.
    Error,
    /// The write is suspicious but tolerated.
    Warning,
}

/// The supported limit predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "camelCase")]
pub enum LimitKind {
    /// Inclusive lower bound on ordered kinds.
    Min,
    /// Inclusive upper bound on ordered kinds.
    Max,
    /// Minimum length of a string or collection.
    MinLength,
    /// Maximum length of a string.
    MaxLength,
    /// Maximum member count of a collection.
    MaxCollectionSize,
    /// Regex match over a string.
    Match,
}

/// A declared limit: a predicate, a severity, and a bound expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Limit {
    /// Identifies the limit in violations; defaults to the kind's name.
    pub name: String,
    /// The predicate applied.
    pub kind: LimitKind,
    /// Whether failure is an error or a warning.
    pub severity: Severity,
    /// The bound, evaluated against the graph.
    pub bound: Expr,
}

impl Limit {
    /// A limit named after its kind.
    pub fn new(kind: LimitKind, severity: Severity, bound: Expr) -> Self {
        Self {
            name: kind.to_string(),
            kind,
            severity,
            bound,
        }
    }

    /// Overrides the reported name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A failing limit, reported from `set` and `save`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitViolation {
    /// The concrete path of the offending writable.
    pub path: String,
    /// The limit's name (`max`, `minLength`, `enum-options`, …).
    pub limit: String,
    /// Error or warning.
    pub severity: Severity,
    /// Canonical rendering of the value that failed.
    pub actual: String,
    /// Canonical rendering of the bound it failed against.
    pub expected: String,
}

/// The aggregate outcome of a validation pass (`set` or `save`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitReport {
    /// `true` when no error-severity limit failed; warnings ride along.
    pub ok: bool,
    /// Every failing limit, declared and intrinsic.
    pub violations: Vec<LimitViolation>,
}

impl LimitReport {
    pub(crate) fn from_violations(violations: Vec<LimitViolation>) -> Self {
        let ok = violations
            .iter()
            .all(|v| v.severity != Severity::Error);
        Self { ok, violations }
    }
}

impl Display for LimitViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} violates {} ({})",
            self.path, self.actual, self.limit, self.expected
        )
    }
}

fn violation(
    limit: &Limit,
    path: &Path,
    actual: &Value,
    bound: &Value,
) -> LimitViolation {
    LimitViolation {
        path: path.to_string(),
        limit: limit.name.clone(),
        severity: limit.severity,
        actual: actual.to_string(),
        expected: bound.to_string(),
    }
}

/// Evaluates one declared limit against a written value.
///
/// # Errors
/// Propagates fatal evaluation defects from the bound expression.
pub(crate) fn check(
    limit: &Limit,
    path: &Path,
    actual: &Value,
    ctx: &EvalContext<'_>,
) -> Result<Option<LimitViolation>, EvalError> {
    let bound = match limit.bound.eval(ctx)? {
        MaybeVec::Single(c) => c,
        MaybeVec::Multiple { items, .. } => {
            return Err(EvalError::NotSingular {
                path: path.to_string(),
                count: items.len(),
            })
        }
    };
    let Some(bound) = bound.into_value() else {
        return Ok(None);
    };
    let passes = match limit.kind {
        LimitKind::Min => ordered(actual, &bound, Ordering::is_ge),
        LimitKind::Max => ordered(actual, &bound, Ordering::is_le),
        LimitKind::MinLength => length_of(actual)
            .zip(bound_int(&bound))
            .map(|(len, min)| len >= min),
        LimitKind::MaxLength => match actual {
            Value::Str(s) => bound_int(&bound).map(|max| s.chars().count() <= max),
            _ => None,
        },
        LimitKind::MaxCollectionSize => match actual {
            Value::Collection(c) => bound_int(&bound).map(|max| c.len() <= max),
            _ => None,
        },
        LimitKind::Match => match (actual, &bound) {
            (Value::Str(s), Value::Str(pattern)) => {
                // a pattern that does not compile is an authoring bug, not
                // missing data; literal patterns were already rejected at
                // freeze, so this only fires for evaluated bounds
                let re = Regex::new(pattern).map_err(|_| EvalError::InvalidPattern {
                    path: path.to_string(),
                    pattern: pattern.clone(),
                })?;
                Some(re.is_match(s))
            }
            _ => None,
        },
    };
    // an inapplicable or undecidable limit does not fire
    match passes {
        Some(false) => Ok(Some(violation(limit, path, actual, &bound))),
        _ => Ok(None),
    }
}

fn ordered(actual: &Value, bound: &Value, accept: impl Fn(Ordering) -> bool) -> Option<bool> {
    crate::expr::math::compare(actual, bound).map(accept)
}

fn length_of(actual: &Value) -> Option<usize> {
    match actual {
        Value::Str(s) => Some(s.chars().count()),
        Value::Collection(c) => Some(c.len()),
        _ => None,
    }
}

fn bound_int(bound: &Value) -> Option<usize> {
    match bound {
        Value::Int(n) => usize::try_from(*n).ok(),
        _ => None,
    }
}

/// Intrinsic limits: always attached by the value's type, never declared.
///
/// Enum and multi-enum writables enforce membership in their option set
/// (an unknown set does not fire, so no settable value is ever reported);
/// addresses and bank accounts re-run their field validation, which guards
/// values that arrived through deserialization.
pub(crate) fn intrinsic(
    options_path: Option<&Path>,
    path: &Path,
    value: &Value,
    ctx: &EvalContext<'_>,
) -> Result<Vec<LimitViolation>, EvalError> {
    let mut violations = Vec::new();
    match value {
        Value::Enum(chosen) => {
            if let Some(set) = option_set(options_path, ctx)? {
                if !set.contains(&chosen.value) {
                    violations.push(membership_violation(path, &chosen.value, &set));
                }
            }
        }
        Value::MultiEnum(chosen) => {
            if let Some(set) = option_set(options_path, ctx)? {
                for value in &chosen.values {
                    if !set.contains(value) {
                        violations.push(membership_violation(path, value, &set));
                    }
                }
            }
        }
        Value::Address(address) => {
            if address.validate().is_err() {
                violations.push(LimitViolation {
                    path: path.to_string(),
                    limit: "address-format".to_string(),
                    severity: Severity::Error,
                    actual: address.to_string(),
                    expected: "a deliverable address".to_string(),
                });
            }
        }
        Value::BankAccount(account) => {
            if account.validate().is_err() {
                violations.push(LimitViolation {
                    path: path.to_string(),
                    limit: "bank-account-format".to_string(),
                    severity: Severity::Error,
                    actual: account.to_string(),
                    expected: "a valid routing/account pair".to_string(),
                });
            }
        }
        _ => {}
    }
    Ok(violations)
}

fn membership_violation(
    path: &Path,
    value: &str,
    set: &crate::value::MultiEnumValue,
) -> LimitViolation {
    LimitViolation {
        path: path.to_string(),
        limit: "enum-options".to_string(),
        severity: Severity::Error,
        actual: value.to_string(),
        expected: format!("one of [{set}]"),
    }
}

fn option_set(
    options_path: Option<&Path>,
    ctx: &EvalContext<'_>,
) -> Result<Option<crate::value::MultiEnumValue>, EvalError> {
    let Some(options_path) = options_path else {
        return Ok(None);
    };
    let evaluated = ctx.graph().eval_path(options_path, &Path::root())?;
    let set = match evaluated {
        MaybeVec::Single(c) => c.into_value(),
        MaybeVec::Multiple { .. } => None,
    };
    match set {
        Some(Value::MultiEnum(set)) => Ok(Some(set)),
        _ => Ok(None),
    }
}
