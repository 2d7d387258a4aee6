//! `Switch` and `ConditionalList`.

use crate::error::EvalError;
use crate::expr::context::EvalContext;
use crate::expr::logic::as_bool;
use crate::expr::{Evaluated, Expr, SwitchCase};
use crate::result::{Computed, MaybeVec};

use Computed::{Complete, Incomplete, Placeholder};

fn single_condition(
    ctx: &EvalContext<'_>,
    condition: &Expr,
) -> Result<Computed<bool>, EvalError> {
    let evaluated = condition.eval(ctx)?;
    match evaluated {
        MaybeVec::Single(c) => Ok(as_bool(&c)),
        MaybeVec::Multiple { items, .. } => Err(EvalError::NotSingular {
            path: ctx.owner_path().to_string(),
            count: items.len(),
        }),
    }
}

fn demoted(result: Evaluated) -> Evaluated {
    result.map(Computed::to_placeholder)
}

/// Evaluates cases in declaration order, returning the first case whose
/// condition holds.
///
/// An `Incomplete` condition stops evaluation and makes the whole
/// expression incomplete, since an earlier unknown can decide the result. A
/// placeholder condition that was passed over (or taken) demotes the
/// eventual result. With every condition completely false and no catch-all,
/// the expression is incomplete.
pub(crate) fn switch(ctx: &EvalContext<'_>, cases: &[SwitchCase]) -> Result<Evaluated, EvalError> {
    let mut demote = false;
    for case in cases {
        match single_condition(ctx, &case.condition)? {
            Incomplete => return Ok(MaybeVec::Single(Incomplete)),
            Complete(true) => {
                let result = case.value.eval(ctx)?;
                return Ok(if demote { demoted(result) } else { result });
            }
            Placeholder(true) => return Ok(demoted(case.value.eval(ctx)?)),
            Complete(false) => {}
            Placeholder(false) => demote = true,
        }
    }
    Ok(MaybeVec::Single(Incomplete))
}

/// Emits one element per case whose condition holds, as a `Multiple`.
///
/// Conditions that are not completely decided leave the emitted membership
/// uncertain, which clears the result's completeness flag.
pub(crate) fn conditional_list(
    ctx: &EvalContext<'_>,
    cases: &[SwitchCase],
) -> Result<Evaluated, EvalError> {
    let mut items = Vec::new();
    let mut complete = true;
    for case in cases {
        match single_condition(ctx, &case.condition)? {
            Complete(true) => {
                let value = case.value.eval(ctx)?;
                match value {
                    MaybeVec::Single(c) => items.push(c),
                    MaybeVec::Multiple { items: inner, .. } => {
                        return Err(EvalError::NotSingular {
                            path: ctx.owner_path().to_string(),
                            count: inner.len(),
                        })
                    }
                }
            }
            Placeholder(true) => {
                let value = case.value.eval(ctx)?;
                if let MaybeVec::Single(c) = value {
                    items.push(c.to_placeholder());
                }
                complete = false;
            }
            Complete(false) => {}
            Placeholder(false) | Incomplete => complete = false,
        }
    }
    Ok(MaybeVec::Multiple { items, complete })
}
