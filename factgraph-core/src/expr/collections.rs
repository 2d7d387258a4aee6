//! Collection operators: counting, summing, filtering, searching.

use crate::error::EvalError;
use crate::expr::context::EvalContext;
use crate::expr::logic::as_bool;
use crate::expr::{math, Evaluated, Expr};
use crate::result::{vectorize2, Computed, MaybeVec};
use crate::value::{Collection, Value};
use factgraph_path::Path;

use Computed::{Complete, Incomplete, Placeholder};

/// `Count`: members of a collection value, or complete elements of a
/// vector.
pub(crate) fn count(operand: &Evaluated) -> Evaluated {
    match operand {
        MaybeVec::Single(c) => MaybeVec::Single(c.as_ref().and_then(|v| match v {
            Value::Collection(c) => i32::try_from(c.len())
                .map_or(Incomplete, |n| Complete(Value::Int(n))),
            _ => Incomplete,
        })),
        MaybeVec::Multiple { items, complete } => {
            let counted = items.iter().filter(|c| c.is_complete()).count();
            let result = i32::try_from(counted).map_or(Incomplete, |n| Complete(Value::Int(n)));
            MaybeVec::Single(if *complete {
                result
            } else {
                result.to_placeholder()
            })
        }
    }
}

/// `CollectionSum`: element-type sum over a vector. Incomplete elements are
/// skipped outright; placeholder elements (and unknown membership) demote
/// the result.
///
/// An empty vector sums to the element type's zero, which is looked up
/// from the dictionary when the operand is a direct dependency.
pub(crate) fn sum(
    ctx: &EvalContext<'_>,
    operand_expr: &Expr,
    operand: &Evaluated,
) -> Result<Evaluated, EvalError> {
    let MaybeVec::Multiple { items, complete } = operand else {
        return Ok(MaybeVec::Single(Incomplete));
    };
    let mut demote = !*complete;
    let mut acc: Option<Value> = None;
    for item in items {
        let value = match item {
            Complete(v) => v,
            Placeholder(v) => {
                demote = true;
                v
            }
            Incomplete => continue,
        };
        acc = match acc {
            None => Some(value.clone()),
            Some(prev) => match math::add(&prev, value) {
                Complete(v) | Placeholder(v) => Some(v),
                Incomplete => return Ok(MaybeVec::Single(Incomplete)),
            },
        };
    }
    let total = match acc {
        Some(v) => v,
        None => match empty_sum(ctx, operand_expr) {
            Some(zero) => zero,
            None => return Ok(MaybeVec::Single(Incomplete)),
        },
    };
    let result = if demote {
        Placeholder(total)
    } else {
        Complete(total)
    };
    Ok(MaybeVec::Single(result))
}

/// The zero value for an empty sum, derived from the summed fact's declared
/// kind.
fn empty_sum(ctx: &EvalContext<'_>, operand_expr: &Expr) -> Option<Value> {
    let Expr::Dep(dep) = operand_expr else {
        return None;
    };
    let resolved = dep.path.resolve(ctx.owner_path()).ok()?;
    let def = ctx.graph().dictionary().definition(&resolved.to_abstract())?;
    math::zero_of(def.kind)
}

fn resolve_collection(ctx: &EvalContext<'_>, collection: &Path) -> Result<Path, EvalError> {
    let resolved = collection.resolve(ctx.owner_path())?;
    if resolved.is_abstract() {
        return Err(EvalError::NotSingular {
            path: resolved.to_string(),
            count: 0,
        });
    }
    Ok(resolved)
}

/// `Filter`: the member ids for which the predicate, evaluated with the
/// member as the current position, is completely true.
pub(crate) fn filter(
    ctx: &EvalContext<'_>,
    collection: &Path,
    predicate: &Expr,
) -> Result<Evaluated, EvalError> {
    let collection = resolve_collection(ctx, collection)?;
    let (members, enumerated) = ctx.graph().collection_members(&collection)?;
    let mut demote = !enumerated;
    let mut kept = Collection::new();
    for id in members {
        let member_ctx = ctx.for_position(collection.member(id.clone()), None);
        let verdict = predicate.eval(&member_ctx)?.into_single().map(|c| as_bool(&c));
        match verdict {
            Some(Complete(true)) => {
                // duplicate ids cannot occur: membership is a Collection
                let _ = kept.add(id);
            }
            Some(Complete(false)) => {}
            _ => demote = true,
        }
    }
    let value = Value::Collection(kept);
    Ok(MaybeVec::Single(if demote {
        Placeholder(value)
    } else {
        Complete(value)
    }))
}

/// `Find`: the first member whose predicate is completely true. An
/// undecided predicate on an earlier member leaves the winner unknown.
pub(crate) fn find(
    ctx: &EvalContext<'_>,
    collection: &Path,
    predicate: &Expr,
) -> Result<Evaluated, EvalError> {
    let collection = resolve_collection(ctx, collection)?;
    let (members, _) = ctx.graph().collection_members(&collection)?;
    let mut demote = false;
    for id in members {
        let member_ctx = ctx.for_position(collection.member(id.clone()), None);
        let verdict = predicate.eval(&member_ctx)?.into_single().map(|c| as_bool(&c));
        match verdict {
            Some(Complete(true)) => {
                let found = Value::Str(id.as_str().to_string());
                return Ok(MaybeVec::Single(if demote {
                    Placeholder(found)
                } else {
                    Complete(found)
                }));
            }
            Some(Placeholder(true)) => {
                return Ok(MaybeVec::Single(Placeholder(Value::Str(
                    id.as_str().to_string(),
                ))))
            }
            Some(Complete(false)) => {}
            Some(Placeholder(false)) => demote = true,
            Some(Incomplete) | None => return Ok(MaybeVec::Single(Incomplete)),
        }
    }
    Ok(MaybeVec::Single(Incomplete))
}

/// `IndexOf`: the member id at a position, incomplete out of bounds.
pub(crate) fn index_of(
    collection: &Evaluated,
    index: &Evaluated,
) -> Result<Evaluated, EvalError> {
    vectorize2(collection, index, |c, i| match (c, i) {
        (Value::Collection(c), Value::Int(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| c.get(i))
            .map_or(Incomplete, |id| {
                Complete(Value::Str(id.as_str().to_string()))
            }),
        _ => Incomplete,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(values: Vec<Computed<Value>>, complete: bool) -> Evaluated {
        MaybeVec::Multiple {
            items: values,
            complete,
        }
    }

    #[test]
    fn test_count_vector_skips_incomplete() {
        let v = items(
            vec![
                Complete(Value::Int(1)),
                Incomplete,
                Placeholder(Value::Int(3)),
            ],
            true,
        );
        assert_eq!(count(&v), MaybeVec::Single(Complete(Value::Int(1))));
        let v = items(vec![Complete(Value::Int(1))], false);
        assert_eq!(count(&v), MaybeVec::Single(Placeholder(Value::Int(1))));
    }

    #[test]
    fn test_count_collection_value() {
        let mut c = Collection::new();
        c.add("a".parse().unwrap()).unwrap();
        let v = MaybeVec::Single(Complete(Value::Collection(c)));
        assert_eq!(count(&v), MaybeVec::Single(Complete(Value::Int(1))));
        assert_eq!(
            count(&MaybeVec::Single(Incomplete)),
            MaybeVec::Single(Incomplete)
        );
    }
}
