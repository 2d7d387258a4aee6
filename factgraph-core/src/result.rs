//! Three-state completeness and single/multi result packaging.
//!
//! Every evaluation produces a [`Computed`]: a value known definitively
//! (`Complete`), a provisional value standing in while some input is missing
//! (`Placeholder`), or nothing at all (`Incomplete`). Results travel inside
//! a [`MaybeVec`], which is `Single` for ordinary facts and `Multiple` for
//! facts reached through a collection wildcard.

use crate::error::EvalError;
use either::Either;
use std::iter;

/// A value tagged with how definitive it is.
///
/// Combining rule, applied uniformly across the engine: any `Incomplete`
/// input makes the output `Incomplete`; otherwise any `Placeholder` input
/// demotes the output to `Placeholder`; otherwise the output is `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Computed<T> {
    /// The value is definitive.
    Complete(T),
    /// A provisional value; some input is still missing.
    Placeholder(T),
    /// No value can be produced yet.
    Incomplete,
}

use Computed::{Complete, Incomplete, Placeholder};

impl<T> Computed<T> {
    /// Whether a value is present (`Complete` or `Placeholder`).
    pub fn has_value(&self) -> bool {
        !matches!(self, Incomplete)
    }

    /// Whether the value is definitive.
    pub fn is_complete(&self) -> bool {
        matches!(self, Complete(_))
    }

    /// The carried value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Complete(v) | Placeholder(v) => Some(v),
            Incomplete => None,
        }
    }

    /// Consumes `self`, returning the carried value if any.
    pub fn into_value(self) -> Option<T> {
        match self {
            Complete(v) | Placeholder(v) => Some(v),
            Incomplete => None,
        }
    }

    /// Applies `f` to the carried value, preserving completeness.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Computed<U> {
        match self {
            Complete(v) => Complete(f(v)),
            Placeholder(v) => Placeholder(f(v)),
            Incomplete => Incomplete,
        }
    }

    /// Chains a computation that may itself be incomplete.
    ///
    /// The result is the *less* complete of the two: a `Placeholder` input
    /// demotes a `Complete` output of `f`.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Computed<U>) -> Computed<U> {
        match self {
            Complete(v) => f(v),
            Placeholder(v) => f(v).to_placeholder(),
            Incomplete => Incomplete,
        }
    }

    /// Demotes `Complete` to `Placeholder`; other states pass through.
    pub fn to_placeholder(self) -> Self {
        match self {
            Complete(v) => Placeholder(v),
            other => other,
        }
    }

    /// Borrows the carried value in place.
    pub fn as_ref(&self) -> Computed<&T> {
        match self {
            Complete(v) => Complete(v),
            Placeholder(v) => Placeholder(v),
            Incomplete => Incomplete,
        }
    }
}

/// A result that is either singular or one element per collection member.
///
/// `Multiple::complete` records whether the backing collection itself was
/// fully enumerated (membership is known), independent of whether each
/// element is [`Complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaybeVec<T> {
    /// A singular result.
    Single(T),
    /// One result per member of the backing collection.
    Multiple {
        /// The elementwise results.
        items: Vec<T>,
        /// Whether the backing collection's membership is known.
        complete: bool,
    },
}

impl<T> MaybeVec<T> {
    /// Wraps `items` as a `Multiple`.
    pub fn multiple(items: Vec<T>, complete: bool) -> Self {
        MaybeVec::Multiple { items, complete }
    }

    /// `Some(len)` for `Multiple`, `None` for `Single`.
    pub fn multiplicity(&self) -> Option<usize> {
        match self {
            MaybeVec::Single(_) => None,
            MaybeVec::Multiple { items, .. } => Some(items.len()),
        }
    }

    /// The `Multiple` completeness flag; `Single` is vacuously complete.
    pub fn is_enumerated(&self) -> bool {
        match self {
            MaybeVec::Single(_) => true,
            MaybeVec::Multiple { complete, .. } => *complete,
        }
    }

    /// Iterates the one or many carried values.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        match self {
            MaybeVec::Single(v) => Either::Left(iter::once(v)),
            MaybeVec::Multiple { items, .. } => Either::Right(items.iter()),
        }
    }

    /// Applies `f` to every carried value.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> MaybeVec<U> {
        match self {
            MaybeVec::Single(v) => MaybeVec::Single(f(v)),
            MaybeVec::Multiple { items, complete } => MaybeVec::Multiple {
                items: items.into_iter().map(f).collect(),
                complete,
            },
        }
    }

    /// Unwraps a `Single`, or `None` for `Multiple`.
    pub fn into_single(self) -> Option<T> {
        match self {
            MaybeVec::Single(v) => Some(v),
            MaybeVec::Multiple { .. } => None,
        }
    }

    /// Flattens to a plain vector, losing the single/multiple distinction.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            MaybeVec::Single(v) => vec![v],
            MaybeVec::Multiple { items, .. } => items,
        }
    }
}

/// Applies `f` under the completeness combining rule.
///
/// Any `Incomplete` operand short-circuits to `Incomplete`; a `Placeholder`
/// operand demotes whatever `f` produces.
pub fn apply<T, U>(operands: &[&Computed<T>], f: impl FnOnce(&[&T]) -> Computed<U>) -> Computed<U> {
    let mut demote = false;
    let mut values = Vec::with_capacity(operands.len());
    for operand in operands {
        match operand {
            Complete(v) => values.push(v),
            Placeholder(v) => {
                demote = true;
                values.push(v);
            }
            Incomplete => return Incomplete,
        }
    }
    let out = f(&values);
    if demote {
        out.to_placeholder()
    } else {
        out
    }
}

/// Lifts an n-ary pure function over [`MaybeVec`]-packaged operands.
///
/// All-`Single` inputs produce a `Single`. If any input is `Multiple`, every
/// `Multiple` input must share one length, `Single` inputs broadcast, and
/// the output is a `Multiple` of that length whose completeness flag is the
/// AND of the inputs' flags.
///
/// # Errors
/// Returns [`EvalError::ShapeMismatch`] when `Multiple` inputs disagree on
/// length. Length disagreement is a dictionary bug, never data-driven, so it
/// is fatal rather than `Incomplete`.
pub fn vectorize<T, U>(
    inputs: &[&MaybeVec<Computed<T>>],
    f: impl Fn(&[&T]) -> Computed<U>,
) -> Result<MaybeVec<Computed<U>>, EvalError> {
    vectorize_with(inputs, |operands| apply(operands, &f))
}

/// Like [`vectorize`], but hands `f` the raw [`Computed`] operands instead
/// of applying the standard combining rule.
///
/// This is the escape hatch for operators whose completeness semantics are
/// *not* the standard rule: short-circuiting `All`/`Any`, where a decisive
/// `Complete(false)`/`Complete(true)` must dominate an `Incomplete`
/// sibling, and `IsComplete`, which inspects completeness itself.
///
/// # Errors
/// Returns [`EvalError::ShapeMismatch`] exactly as [`vectorize`] does.
pub fn vectorize_with<T, U>(
    inputs: &[&MaybeVec<Computed<T>>],
    f: impl Fn(&[&Computed<T>]) -> Computed<U>,
) -> Result<MaybeVec<Computed<U>>, EvalError> {
    let mut len: Option<usize> = None;
    let mut complete = true;
    for input in inputs {
        if let MaybeVec::Multiple { items, complete: c } = input {
            complete = complete && *c;
            match len {
                None => len = Some(items.len()),
                Some(expected) if expected != items.len() => {
                    return Err(EvalError::ShapeMismatch {
                        left: expected,
                        right: items.len(),
                    });
                }
                Some(_) => {}
            }
        }
    }
    let Some(len) = len else {
        let operands: Vec<&Computed<T>> = inputs
            .iter()
            .map(|i| match i {
                MaybeVec::Single(v) => v,
                MaybeVec::Multiple { .. } => unreachable!(),
            })
            .collect();
        return Ok(MaybeVec::Single(f(&operands)));
    };
    let mut items = Vec::with_capacity(len);
    for index in 0..len {
        let operands: Vec<&Computed<T>> = inputs
            .iter()
            .map(|input| match input {
                MaybeVec::Single(v) => v,
                MaybeVec::Multiple { items, .. } => &items[index],
            })
            .collect();
        items.push(f(&operands));
    }
    Ok(MaybeVec::Multiple { items, complete })
}

/// Binary convenience wrapper over [`vectorize`].
pub fn vectorize2<T, U>(
    a: &MaybeVec<Computed<T>>,
    b: &MaybeVec<Computed<T>>,
    f: impl Fn(&T, &T) -> Computed<U>,
) -> Result<MaybeVec<Computed<U>>, EvalError> {
    vectorize(&[a, b], |vs| f(vs[0], vs[1]))
}

/// Unary convenience wrapper over [`vectorize`].
pub fn vectorize1<T, U>(
    input: &MaybeVec<Computed<T>>,
    f: impl Fn(&T) -> Computed<U>,
) -> Result<MaybeVec<Computed<U>>, EvalError> {
    vectorize(&[input], |vs| f(vs[0]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(c: Computed<i64>) -> MaybeVec<Computed<i64>> {
        MaybeVec::Single(c)
    }

    fn multi(items: Vec<Computed<i64>>, complete: bool) -> MaybeVec<Computed<i64>> {
        MaybeVec::Multiple { items, complete }
    }

    #[test]
    fn test_combining_rule() {
        let tests = [
            (Complete(1), Complete(2), Complete(3)),
            (Complete(1), Placeholder(2), Placeholder(3)),
            (Placeholder(1), Placeholder(2), Placeholder(3)),
            (Complete(1), Incomplete, Incomplete),
            (Placeholder(1), Incomplete, Incomplete),
            (Incomplete, Incomplete, Incomplete),
        ];
        for (a, b, expected) in tests {
            let out = apply(&[&a, &b], |vs| Complete(vs[0] + vs[1]));
            assert_eq!(out, expected, "\na: {a:?}\nb: {b:?}");
        }
    }

    #[test]
    fn test_demote_and_chaining() {
        assert_eq!(Complete(1).to_placeholder(), Placeholder(1));
        assert_eq!(Placeholder(1).to_placeholder(), Placeholder(1));
        assert_eq!(Computed::<i64>::Incomplete.to_placeholder(), Incomplete);
        assert_eq!(Placeholder(1).and_then(|v| Complete(v + 1)), Placeholder(2));
        assert_eq!(Complete(1).and_then(|_| Computed::<i64>::Incomplete), Incomplete);
    }

    #[test]
    fn test_vectorize_all_single() {
        let out = vectorize2(&single(Complete(2)), &single(Complete(3)), |a, b| {
            Complete(a * b)
        })
        .unwrap();
        assert_eq!(out, single(Complete(6)));
    }

    #[test]
    fn test_vectorize_broadcast() {
        let out = vectorize2(
            &multi(vec![Complete(1), Placeholder(2), Incomplete], true),
            &single(Complete(10)),
            |a, b| Complete(a + b),
        )
        .unwrap();
        assert_eq!(
            out,
            multi(vec![Complete(11), Placeholder(12), Incomplete], true)
        );
    }

    #[test]
    fn test_vectorize_flag_and() {
        let out = vectorize2(
            &multi(vec![Complete(1)], true),
            &multi(vec![Complete(2)], false),
            |a, b| Complete(a + b),
        )
        .unwrap();
        assert_eq!(out, multi(vec![Complete(3)], false));
    }

    #[test]
    fn test_vectorize_shape_mismatch() {
        let err = vectorize2(
            &multi(vec![Complete(1), Complete(2)], true),
            &multi(vec![Complete(1), Complete(2), Complete(3)], true),
            |a, b| Complete(a + b),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EvalError::ShapeMismatch { left: 2, right: 3 }
        ));
    }

    #[test]
    fn test_vectorize_inner_incomplete() {
        // f may itself report a data-driven failure
        let out = vectorize1(&single(Complete(0)), |_| Computed::<i64>::Incomplete).unwrap();
        assert_eq!(out, single(Incomplete));
    }

    #[test]
    fn test_iter_and_flatten() {
        let m = multi(vec![Complete(1), Complete(2)], true);
        assert_eq!(m.iter().count(), 2);
        assert_eq!(m.multiplicity(), Some(2));
        assert!(single(Complete(1)).multiplicity().is_none());
        assert_eq!(single(Complete(1)).into_vec().len(), 1);
        assert!(!multi(vec![], false).is_enumerated());
    }
}
