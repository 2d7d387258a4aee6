//! Evaluation of a writable fact's effective value.

use crate::dictionary::{FactSource, Override};
use crate::error::EvalError;
use crate::expr::context::EvalContext;
use crate::expr::logic::as_bool;
use crate::expr::{Evaluated, Expr};
use crate::result::{Computed, MaybeVec};

use Computed::Complete;

/// Reads the owning writable.
///
/// Precedence: a triggered override replaces everything; otherwise a stored
/// value is complete as written (limit checks are a separate pass);
/// otherwise the placeholder expression supplies a provisional value; with
/// none of those, the fact is incomplete.
pub(crate) fn eval(ctx: &EvalContext<'_>) -> Result<Evaluated, EvalError> {
    let Some(def) = ctx.owner_def() else {
        return Ok(MaybeVec::Single(Computed::Incomplete));
    };
    let FactSource::Writable {
        placeholder,
        overrides,
        ..
    } = &def.source
    else {
        return Ok(MaybeVec::Single(Computed::Incomplete));
    };
    if let Some(replacement) = triggered(ctx, overrides)? {
        return replacement.eval(ctx);
    }
    if let Some(stored) = ctx.stored() {
        return Ok(MaybeVec::Single(Complete(stored)));
    }
    if let Some(placeholder) = placeholder {
        let provisional = placeholder.eval(ctx)?;
        return Ok(provisional.map(Computed::to_placeholder));
    }
    Ok(MaybeVec::Single(Computed::Incomplete))
}

/// The first override whose condition is completely true.
fn triggered<'d>(
    ctx: &EvalContext<'_>,
    overrides: &'d [Override],
) -> Result<Option<&'d Expr>, EvalError> {
    for over in overrides {
        let condition = over.condition.eval(ctx)?;
        if let MaybeVec::Single(c) = condition {
            if as_bool(&c) == Complete(true) {
                return Ok(Some(&over.replacement));
            }
        }
    }
    Ok(None)
}
