//! Boolean operators with three-valued completeness.
//!
//! `All` and `Any` short-circuit on decisive `Complete` operands, and a
//! decisive operand dominates an `Incomplete` sibling: knowing one conjunct
//! is false settles a conjunction no matter what the others turn out to be.

use crate::error::EvalError;
use crate::expr::context::EvalContext;
use crate::expr::{Evaluated, Expr};
use crate::result::{vectorize1, vectorize_with, Computed, MaybeVec};
use crate::value::Value;

use Computed::{Complete, Incomplete, Placeholder};

/// Logical negation; non-boolean operands are incomplete.
pub(crate) fn not(v: &Value) -> Computed<Value> {
    match v {
        Value::Bool(b) => Complete(Value::Bool(!b)),
        _ => Incomplete,
    }
}

pub(crate) fn as_bool(c: &Computed<Value>) -> Computed<bool> {
    match c {
        Complete(Value::Bool(b)) => Complete(*b),
        Placeholder(Value::Bool(b)) => Placeholder(*b),
        Incomplete | Complete(_) | Placeholder(_) => Incomplete,
    }
}

/// Three-valued AND: `Complete(false)` dominates everything, then
/// `Incomplete`, then `Placeholder`.
fn and3(a: &Computed<Value>, b: &Computed<Value>) -> Computed<Value> {
    let (a, b) = (as_bool(a), as_bool(b));
    if a == Complete(false) || b == Complete(false) {
        return Complete(Value::Bool(false));
    }
    match (a, b) {
        (Incomplete, _) | (_, Incomplete) => Incomplete,
        (Complete(x), Complete(y)) => Complete(Value::Bool(x && y)),
        (x, y) => match (x.into_value(), y.into_value()) {
            (Some(x), Some(y)) => Placeholder(Value::Bool(x && y)),
            _ => Incomplete,
        },
    }
}

/// Three-valued OR, symmetric to [`and3`] with `Complete(true)` dominant.
fn or3(a: &Computed<Value>, b: &Computed<Value>) -> Computed<Value> {
    let (a, b) = (as_bool(a), as_bool(b));
    if a == Complete(true) || b == Complete(true) {
        return Complete(Value::Bool(true));
    }
    match (a, b) {
        (Incomplete, _) | (_, Incomplete) => Incomplete,
        (Complete(x), Complete(y)) => Complete(Value::Bool(x || y)),
        (x, y) => match (x.into_value(), y.into_value()) {
            (Some(x), Some(y)) => Placeholder(Value::Bool(x || y)),
            _ => Incomplete,
        },
    }
}

fn decisive(acc: &Evaluated, value: bool) -> bool {
    matches!(acc, MaybeVec::Single(Complete(Value::Bool(b))) if *b == value)
}

/// Short-circuit conjunction over operand expressions, elementwise under
/// vectorization.
pub(crate) fn all(ctx: &EvalContext<'_>, operands: &[Expr]) -> Result<Evaluated, EvalError> {
    let mut acc: Evaluated = MaybeVec::Single(Complete(Value::Bool(true)));
    for operand in operands {
        if decisive(&acc, false) {
            break;
        }
        let value = operand.eval(ctx)?;
        acc = vectorize_with(&[&acc, &value], |ops| and3(ops[0], ops[1]))?;
    }
    Ok(acc)
}

/// Short-circuit disjunction over operand expressions.
pub(crate) fn any(ctx: &EvalContext<'_>, operands: &[Expr]) -> Result<Evaluated, EvalError> {
    let mut acc: Evaluated = MaybeVec::Single(Complete(Value::Bool(false)));
    for operand in operands {
        if decisive(&acc, true) {
            break;
        }
        let value = operand.eval(ctx)?;
        acc = vectorize_with(&[&acc, &value], |ops| or3(ops[0], ops[1]))?;
    }
    Ok(acc)
}

/// `Not`, lifted over vectors.
pub(crate) fn eval_not(inner: &Evaluated) -> Result<Evaluated, EvalError> {
    vectorize1(inner, not)
}

/// Whether the inner result evaluated to `Complete`; always a `Complete`
/// boolean itself. A `Multiple` is complete when its membership is known
/// and every element is complete.
pub(crate) fn is_complete(inner: &Evaluated) -> Evaluated {
    let complete = match inner {
        MaybeVec::Single(c) => c.is_complete(),
        MaybeVec::Multiple { items, complete } => {
            *complete && items.iter().all(Computed::is_complete)
        }
    };
    MaybeVec::Single(Complete(Value::Bool(complete)))
}
