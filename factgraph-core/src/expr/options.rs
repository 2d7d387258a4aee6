//! Enum option-set expressions.

use crate::error::EvalError;
use crate::expr::context::EvalContext;
use crate::expr::logic::as_bool;
use crate::expr::{EnumOption, Evaluated};
use crate::result::{vectorize1, vectorize2, Computed, MaybeVec};
use crate::value::{MultiEnumValue, Value};

use Computed::{Complete, Incomplete, Placeholder};

/// `EnumOptions`: the option set, as a multi-enum whose options path is the
/// owning fact itself.
///
/// Unconditional options are always present. A conditional option is
/// included only while its condition is completely true; an undecided
/// condition leaves the set provisional.
pub(crate) fn enum_options(
    ctx: &EvalContext<'_>,
    options: &[EnumOption],
) -> Result<Evaluated, EvalError> {
    let mut values = Vec::with_capacity(options.len());
    let mut demote = false;
    for option in options {
        match &option.condition {
            None => values.push(option.value.clone()),
            Some(condition) => {
                let evaluated = condition.eval(ctx)?;
                let verdict = match evaluated {
                    MaybeVec::Single(c) => as_bool(&c),
                    MaybeVec::Multiple { items, .. } => {
                        return Err(EvalError::NotSingular {
                            path: ctx.owner_path().to_string(),
                            count: items.len(),
                        })
                    }
                };
                match verdict {
                    Complete(true) => values.push(option.value.clone()),
                    Complete(false) => {}
                    Placeholder(included) => {
                        if included {
                            values.push(option.value.clone());
                        }
                        demote = true;
                    }
                    Incomplete => demote = true,
                }
            }
        }
    }
    let options_path = match ctx.owner_def() {
        Some(def) => def.path.clone(),
        None => ctx.owner_path().to_abstract(),
    };
    let set = Value::MultiEnum(MultiEnumValue::new(options_path, values));
    Ok(MaybeVec::Single(if demote {
        Placeholder(set)
    } else {
        Complete(set)
    }))
}

/// `EnumOptionsContains`: membership of a choice in an option set.
pub(crate) fn contains(options: &Evaluated, value: &Evaluated) -> Result<Evaluated, EvalError> {
    vectorize2(options, value, |set, choice| {
        let Value::MultiEnum(set) = set else {
            return Incomplete;
        };
        let present = match choice {
            Value::Str(s) => set.contains(s),
            Value::Enum(e) => set.contains(&e.value),
            Value::MultiEnum(m) => m.values.iter().all(|v| set.contains(v)),
            _ => return Incomplete,
        };
        Complete(Value::Bool(present))
    })
}

/// `EnumOptionsSize`: the number of options in the set.
pub(crate) fn size(options: &Evaluated) -> Result<Evaluated, EvalError> {
    vectorize1(options, |set| match set {
        Value::MultiEnum(set) => {
            i32::try_from(set.len()).map_or(Incomplete, |n| Complete(Value::Int(n)))
        }
        _ => Incomplete,
    })
}
