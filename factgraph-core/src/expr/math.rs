//! Arithmetic, ordering and rounding over typed values.
//!
//! Every function here is pure and elementwise; callers lift them over
//! vectors with [`vectorize`](crate::result::vectorize). Data-driven
//! failures (overflow, division by zero, operands a promotion rule does
//! not cover) collapse to [`Computed::Incomplete`].

use crate::result::Computed;
use crate::value::{dates, rational, Dollar, Value, ValueKind};
use num_rational::Rational64;
use std::cmp::Ordering;

use Computed::{Complete, Incomplete};

/// Scales a rational count of dollars back to cents, half-to-even.
fn dollar_from_rational(r: Rational64) -> Computed<Value> {
    let cents = i128::from(*r.numer())
        .checked_mul(100)
        .map(|numer| rational::round_half_even(numer, i128::from(*r.denom())));
    match cents.and_then(|c| i64::try_from(c).ok()) {
        Some(cents) => Complete(Value::Dollar(Dollar::from_cents(cents))),
        None => Incomplete,
    }
}

/// Addition with numeric promotion: `Int ⊕ Rational ⊕ Dollar` promote
/// upward (an `Int` is whole dollars against a `Dollar`); `Day + Days`
/// shifts a date; `Days + Days` adds counts.
pub(crate) fn add(a: &Value, b: &Value) -> Computed<Value> {
    use Value::{Day, Days, Dollar as Dol, Int, Rational as Rat};
    match (a, b) {
        (Int(x), Int(y)) => x.checked_add(*y).map_or(Incomplete, |v| Complete(Int(v))),
        (Dol(x), Dol(y)) => x.checked_add(*y).map_or(Incomplete, |v| Complete(Dol(v))),
        (Rat(x), Rat(y)) => {
            rational::checked_add(*x, *y).map_or(Incomplete, |v| Complete(Rat(v)))
        }
        (Int(x), Rat(y)) | (Rat(y), Int(x)) => {
            rational::checked_add(Rational64::from_integer(i64::from(*x)), *y)
                .map_or(Incomplete, |v| Complete(Rat(v)))
        }
        (Int(x), Dol(y)) | (Dol(y), Int(x)) => i64::from(*x)
            .checked_mul(100)
            .map(crate::value::Dollar::from_cents)
            .and_then(|d| d.checked_add(*y))
            .map_or(Incomplete, |v| Complete(Dol(v))),
        (Rat(x), Dol(y)) | (Dol(y), Rat(x)) => {
            match rational::checked_add(*x, y.to_rational()) {
                Some(sum) => dollar_from_rational(sum),
                None => Incomplete,
            }
        }
        (Day(d), Days(n)) | (Days(n), Day(d)) => d
            .checked_add_signed(chrono::Duration::days(*n))
            .map_or(Incomplete, |v| Complete(Day(v))),
        (Days(x), Days(y)) => x.checked_add(*y).map_or(Incomplete, |v| Complete(Days(v))),
        _ => Incomplete,
    }
}

/// Subtraction under the same promotions as [`add`]; additionally
/// `Day - Day` yields a `Days` count.
pub(crate) fn sub(a: &Value, b: &Value) -> Computed<Value> {
    use Value::{Day, Days, Dollar as Dol, Int, Rational as Rat};
    match (a, b) {
        (Int(x), Int(y)) => x.checked_sub(*y).map_or(Incomplete, |v| Complete(Int(v))),
        (Dol(x), Dol(y)) => x.checked_sub(*y).map_or(Incomplete, |v| Complete(Dol(v))),
        (Rat(x), Rat(y)) => {
            rational::checked_sub(*x, *y).map_or(Incomplete, |v| Complete(Rat(v)))
        }
        (Int(x), Rat(y)) => rational::checked_sub(Rational64::from_integer(i64::from(*x)), *y)
            .map_or(Incomplete, |v| Complete(Rat(v))),
        (Rat(x), Int(y)) => rational::checked_sub(*x, Rational64::from_integer(i64::from(*y)))
            .map_or(Incomplete, |v| Complete(Rat(v))),
        (Dol(x), Int(y)) => i64::from(*y)
            .checked_mul(100)
            .map(crate::value::Dollar::from_cents)
            .and_then(|d| x.checked_sub(d))
            .map_or(Incomplete, |v| Complete(Dol(v))),
        (Int(x), Dol(y)) => i64::from(*x)
            .checked_mul(100)
            .map(crate::value::Dollar::from_cents)
            .and_then(|d| d.checked_sub(*y))
            .map_or(Incomplete, |v| Complete(Dol(v))),
        (Dol(x), Rat(y)) => match rational::checked_sub(x.to_rational(), *y) {
            Some(diff) => dollar_from_rational(diff),
            None => Incomplete,
        },
        (Rat(x), Dol(y)) => match rational::checked_sub(*x, y.to_rational()) {
            Some(diff) => dollar_from_rational(diff),
            None => Incomplete,
        },
        (Day(d), Days(n)) => d
            .checked_sub_signed(chrono::Duration::days(*n))
            .map_or(Incomplete, |v| Complete(Day(v))),
        (Day(x), Day(y)) => Complete(Days((*x - *y).num_days())),
        (Days(x), Days(y)) => x.checked_sub(*y).map_or(Incomplete, |v| Complete(Days(v))),
        _ => Incomplete,
    }
}

/// Multiplication. `Dollar` pairs with `Int` and `Rational` factors
/// (half-to-even back to cents); `Dollar × Dollar` has no meaning and is
/// incomplete.
pub(crate) fn mul(a: &Value, b: &Value) -> Computed<Value> {
    use Value::{Days, Dollar as Dol, Int, Rational as Rat};
    match (a, b) {
        (Int(x), Int(y)) => x.checked_mul(*y).map_or(Incomplete, |v| Complete(Int(v))),
        (Rat(x), Rat(y)) => {
            rational::checked_mul(*x, *y).map_or(Incomplete, |v| Complete(Rat(v)))
        }
        (Int(x), Rat(y)) | (Rat(y), Int(x)) => {
            rational::checked_mul(Rational64::from_integer(i64::from(*x)), *y)
                .map_or(Incomplete, |v| Complete(Rat(v)))
        }
        (Dol(x), Int(y)) | (Int(y), Dol(x)) => x
            .checked_mul_int(i64::from(*y))
            .map_or(Incomplete, |v| Complete(Dol(v))),
        (Dol(x), Rat(y)) | (Rat(y), Dol(x)) => {
            x.times(*y).map_or(Incomplete, |v| Complete(Dol(v)))
        }
        (Days(x), Int(y)) | (Int(y), Days(x)) => x
            .checked_mul(i64::from(*y))
            .map_or(Incomplete, |v| Complete(Days(v))),
        _ => Incomplete,
    }
}

/// Division. A zero divisor is incomplete, never an error. `Dollar ÷
/// Dollar` yields the exact `Rational` ratio; `Int ÷ Int` likewise.
pub(crate) fn div(a: &Value, b: &Value) -> Computed<Value> {
    use Value::{Dollar as Dol, Int, Rational as Rat};
    match (a, b) {
        (Int(x), Int(y)) => {
            if *y == 0 {
                Incomplete
            } else {
                Complete(Rat(Rational64::new(i64::from(*x), i64::from(*y))))
            }
        }
        (Rat(x), Rat(y)) => {
            rational::checked_div(*x, *y).map_or(Incomplete, |v| Complete(Rat(v)))
        }
        (Rat(x), Int(y)) => {
            rational::checked_div(*x, Rational64::from_integer(i64::from(*y)))
                .map_or(Incomplete, |v| Complete(Rat(v)))
        }
        (Int(x), Rat(y)) => {
            rational::checked_div(Rational64::from_integer(i64::from(*x)), *y)
                .map_or(Incomplete, |v| Complete(Rat(v)))
        }
        (Dol(x), Dol(y)) => x.ratio_over(*y).map_or(Incomplete, |v| Complete(Rat(v))),
        (Dol(x), Int(y)) => x
            .checked_div_int(i64::from(*y))
            .map_or(Incomplete, |v| Complete(Dol(v))),
        (Dol(x), Rat(y)) => {
            if *y.numer() == 0 {
                Incomplete
            } else {
                x.times(Rational64::new(*y.denom(), *y.numer()))
                    .map_or(Incomplete, |v| Complete(Dol(v)))
            }
        }
        _ => Incomplete,
    }
}

/// Ordering across the comparable kinds. The numeric trio (`Int`,
/// `Rational`, `Dollar`) compares exactly across kinds; dates, day counts
/// and strings compare within their own kind.
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    use Value::{Day, Days, Dollar as Dol, Int, Rational as Rat, Str};
    let as_ratio = |v: &Value| -> Option<(i128, i128)> {
        match v {
            Int(x) => Some((i128::from(*x), 1)),
            Rat(x) => Some((i128::from(*x.numer()), i128::from(*x.denom()))),
            Dol(x) => Some((i128::from(x.cents()), 100)),
            _ => None,
        }
    };
    match (a, b) {
        (Day(x), Day(y)) => Some(x.cmp(y)),
        (Days(x), Days(y)) => Some(x.cmp(y)),
        (Str(x), Str(y)) => Some(x.cmp(y)),
        _ => {
            let (an, ad) = as_ratio(a)?;
            let (bn, bd) = as_ratio(b)?;
            // denominators are positive, so cross-multiplication preserves order
            Some((an * bd).cmp(&(bn * ad)))
        }
    }
}

/// Equality. Same-kind values use their own equality predicate; the
/// numeric trio additionally compares exactly across kinds.
pub(crate) fn equal(a: &Value, b: &Value) -> Computed<Value> {
    if a.kind() == b.kind() {
        return Complete(Value::Bool(a == b));
    }
    match compare(a, b) {
        Some(ord) => Complete(Value::Bool(ord == Ordering::Equal)),
        None => Incomplete,
    }
}

/// Negated [`equal`].
pub(crate) fn not_equal(a: &Value, b: &Value) -> Computed<Value> {
    match equal(a, b) {
        Complete(Value::Bool(eq)) => Complete(Value::Bool(!eq)),
        other => other,
    }
}

/// Ordering comparison through a predicate on [`Ordering`].
pub(crate) fn compare_with(
    a: &Value,
    b: &Value,
    accept: impl Fn(Ordering) -> bool,
) -> Computed<Value> {
    match compare(a, b) {
        Some(ord) => Complete(Value::Bool(accept(ord))),
        None => Incomplete,
    }
}

/// The larger of two comparable values.
pub(crate) fn max2(a: &Value, b: &Value) -> Computed<Value> {
    match compare(a, b) {
        Some(Ordering::Less) => Complete(b.clone()),
        Some(_) => Complete(a.clone()),
        None => Incomplete,
    }
}

/// The smaller of two comparable values.
pub(crate) fn min2(a: &Value, b: &Value) -> Computed<Value> {
    match compare(a, b) {
        Some(Ordering::Greater) => Complete(b.clone()),
        Some(_) => Complete(a.clone()),
        None => Incomplete,
    }
}

/// Rounds to a whole unit within the value's own kind, ties to even.
pub(crate) fn round_whole(v: &Value) -> Computed<Value> {
    match v {
        Value::Dollar(d) => Complete(Value::Dollar(d.round_to_whole())),
        Value::Rational(r) => match i64::try_from(rational::round_to_int(*r)) {
            Ok(n) => Complete(Value::Rational(Rational64::from_integer(n))),
            Err(_) => Incomplete,
        },
        Value::Int(_) | Value::Days(_) => Complete(v.clone()),
        _ => Incomplete,
    }
}

/// Rounds to the nearest integer, ties to even, producing an `Int`.
pub(crate) fn round_to_int(v: &Value) -> Computed<Value> {
    let rounded = match v {
        Value::Int(n) => return Complete(Value::Int(*n)),
        Value::Dollar(d) => rational::round_to_int(d.to_rational()),
        Value::Rational(r) => rational::round_to_int(*r),
        _ => return Incomplete,
    };
    i32::try_from(rounded).map_or(Incomplete, |n| Complete(Value::Int(n)))
}

/// Rounds toward positive infinity within the value's own kind.
pub(crate) fn ceiling(v: &Value) -> Computed<Value> {
    match v {
        Value::Dollar(d) => Complete(Value::Dollar(d.ceil_to_whole())),
        Value::Rational(r) => Complete(Value::Rational(r.ceil())),
        Value::Int(_) | Value::Days(_) => Complete(v.clone()),
        _ => Incomplete,
    }
}

/// Rounds toward negative infinity within the value's own kind.
pub(crate) fn floor(v: &Value) -> Computed<Value> {
    match v {
        Value::Dollar(d) => Complete(Value::Dollar(d.floor_to_whole())),
        Value::Rational(r) => Complete(Value::Rational(r.floor())),
        Value::Int(_) | Value::Days(_) => Complete(v.clone()),
        _ => Incomplete,
    }
}

/// The promoted kind of a numeric pairing, used by freeze-time inference.
pub(crate) fn promoted_kind(a: ValueKind, b: ValueKind) -> Option<ValueKind> {
    use ValueKind::{Day, Days, Dollar, Int, Rational};
    match (a, b) {
        (Int, Int) => Some(Int),
        (Dollar, Dollar | Int | Rational) | (Int | Rational, Dollar) => Some(Dollar),
        (Rational, Rational | Int) | (Int, Rational) => Some(Rational),
        (Day, Days) | (Days, Day) | (Day, Day) => Some(Day),
        (Days, Days | Int) | (Int, Days) => Some(Days),
        _ => None,
    }
}

/// Zero of a summable kind.
pub(crate) fn zero_of(kind: ValueKind) -> Option<Value> {
    match kind {
        ValueKind::Int => Some(Value::Int(0)),
        ValueKind::Dollar => Some(Value::Dollar(Dollar::ZERO)),
        ValueKind::Rational => Some(Value::Rational(Rational64::from_integer(0))),
        ValueKind::Days => Some(Value::Days(0)),
        _ => None,
    }
}

/// `Day`-aware helper for the date operators.
pub(crate) fn last_day_of_month(v: &Value) -> Computed<Value> {
    match v {
        Value::Day(d) => Complete(Value::Day(dates::last_day_of_month(*d))),
        _ => Incomplete,
    }
}

/// Payroll month arithmetic; see [`dates::add_payroll_months`].
pub(crate) fn add_payroll_months(date: &Value, months: &Value) -> Computed<Value> {
    match (date, months) {
        (Value::Day(d), Value::Int(n)) => dates::add_payroll_months(*d, i64::from(*n))
            .map_or(Incomplete, |v| Complete(Value::Day(v))),
        _ => Incomplete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dollar(cents: i64) -> Value {
        Value::Dollar(Dollar::from_cents(cents))
    }

    fn rat(n: i64, d: i64) -> Value {
        Value::Rational(Rational64::new(n, d))
    }

    #[test]
    fn test_add_promotions() {
        let tests = [
            (Value::Int(2), Value::Int(3), Value::Int(5)),
            (dollar(100), dollar(250), dollar(350)),
            (Value::Int(2), dollar(50), dollar(250)),
            (rat(1, 2), rat(1, 3), rat(5, 6)),
            (Value::Int(1), rat(1, 2), rat(3, 2)),
            (Value::Days(3), Value::Days(4), Value::Days(7)),
        ];
        for (a, b, expected) in tests {
            assert_eq!(add(&a, &b), Complete(expected.clone()), "{a} + {b}");
        }
        // dollar + rational rounds half-to-even on the way back to cents
        assert_eq!(add(&dollar(100), &rat(1, 800)), Complete(dollar(100)));
        // overflow collapses
        assert_eq!(add(&Value::Int(i32::MAX), &Value::Int(1)), Incomplete);
        // kinds with no promotion rule collapse
        assert_eq!(add(&Value::Str("a".into()), &Value::Int(1)), Incomplete);
    }

    #[test]
    fn test_sub_dates() {
        let a = Value::Day(dates::parse("2024-03-10").unwrap());
        let b = Value::Day(dates::parse("2024-03-01").unwrap());
        assert_eq!(sub(&a, &b), Complete(Value::Days(9)));
        assert_eq!(
            add(&b, &Value::Days(9)),
            Complete(Value::Day(dates::parse("2024-03-10").unwrap()))
        );
    }

    #[test]
    fn test_mul_and_div() {
        assert_eq!(mul(&dollar(1000), &Value::Int(3)), Complete(dollar(3000)));
        assert_eq!(mul(&dollar(125), &rat(1, 2)), Complete(dollar(62)));
        assert_eq!(mul(&dollar(100), &dollar(100)), Incomplete);

        assert_eq!(div(&Value::Int(1), &Value::Int(2)), Complete(rat(1, 2)));
        assert_eq!(div(&Value::Int(1), &Value::Int(0)), Incomplete);
        assert_eq!(div(&dollar(100), &Value::Int(0)), Incomplete);
        assert_eq!(div(&dollar(100), &dollar(200)), Complete(rat(1, 2)));
        assert_eq!(div(&dollar(100), &rat(0, 1)), Incomplete);
    }

    #[test]
    fn test_compare_across_kinds() {
        use Ordering::{Equal, Greater, Less};
        let tests = [
            (Value::Int(1), rat(1, 1), Equal),
            (Value::Int(1), rat(3, 2), Less),
            (dollar(150), rat(3, 2), Equal),
            (dollar(200), Value::Int(2), Equal),
            (dollar(250), Value::Int(2), Greater),
            (Value::Str("a".into()), Value::Str("b".into()), Less),
        ];
        for (a, b, expected) in tests {
            assert_eq!(compare(&a, &b), Some(expected), "{a} vs {b}");
        }
        assert!(compare(&Value::Int(1), &Value::Str("x".into())).is_none());
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_whole(&dollar(150)), Complete(dollar(200)));
        assert_eq!(round_whole(&dollar(250)), Complete(dollar(200)));
        assert_eq!(round_to_int(&dollar(250)), Complete(Value::Int(2)));
        assert_eq!(round_to_int(&rat(7, 2)), Complete(Value::Int(4)));
        assert_eq!(ceiling(&rat(1, 3)), Complete(rat(1, 1)));
        assert_eq!(floor(&rat(-1, 3)), Complete(rat(-1, 1)));
    }
}
