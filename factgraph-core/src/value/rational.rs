//! Exact rational values and the shared rounding rule.

use crate::error::ValueError;
use num::integer::gcd;
use num_rational::Rational64;
use std::cmp::Ordering;

/// Rounds `numer / denom` to the nearest integer, ties to even.
///
/// `denom` must be positive; callers normalize signs into `numer` first
/// (as [`Rational64`] itself does).
pub(crate) fn round_half_even(numer: i128, denom: i128) -> i128 {
    debug_assert!(denom > 0);
    let quotient = numer.div_euclid(denom);
    let remainder = numer.rem_euclid(denom);
    match (remainder * 2).cmp(&denom) {
        Ordering::Less => quotient,
        Ordering::Greater => quotient + 1,
        Ordering::Equal => {
            if quotient % 2 == 0 {
                quotient
            } else {
                quotient + 1
            }
        }
    }
}

/// Constructs a reduced rational with a positive denominator.
///
/// # Errors
/// Returns [`ValueError::ZeroDenominator`] when `denom` is zero.
pub fn rational(numer: i64, denom: i64) -> Result<Rational64, ValueError> {
    if denom == 0 {
        return Err(ValueError::ZeroDenominator);
    }
    Ok(Rational64::new(numer, denom))
}

/// Parses the canonical `"n/d"` form.
///
/// # Errors
/// Returns [`ValueError::MalformedNumber`] for anything but two integers
/// joined by `/`, or [`ValueError::ZeroDenominator`] when `d` is zero.
pub fn parse(value: &str) -> Result<Rational64, ValueError> {
    let malformed = || ValueError::MalformedNumber {
        kind: crate::value::ValueKind::Rational,
        value: value.to_string(),
    };
    let (numer, denom) = value.split_once('/').ok_or_else(malformed)?;
    let numer: i64 = numer.trim().parse().map_err(|_| malformed())?;
    let denom: i64 = denom.trim().parse().map_err(|_| malformed())?;
    rational(numer, denom)
}

/// Renders the canonical `"n/d"` form, always including the denominator.
pub fn format(r: Rational64) -> String {
    format!("{}/{}", r.numer(), r.denom())
}

/// Rounds to the nearest integer, ties to even.
pub(crate) fn round_to_int(r: Rational64) -> i128 {
    round_half_even(i128::from(*r.numer()), i128::from(*r.denom()))
}

/// Reduces `n/d` in `i128` and narrows back to [`Rational64`], or `None`
/// when the reduced terms do not fit in `i64`.
fn narrow(mut numer: i128, mut denom: i128) -> Option<Rational64> {
    if denom == 0 {
        return None;
    }
    if denom < 0 {
        numer = -numer;
        denom = -denom;
    }
    let g = gcd(numer, denom).max(1);
    let numer = i64::try_from(numer / g).ok()?;
    let denom = i64::try_from(denom / g).ok()?;
    Some(Rational64::new_raw(numer, denom))
}

/// `a + b` without the panic-on-overflow of `Ratio`'s operators.
pub(crate) fn checked_add(a: Rational64, b: Rational64) -> Option<Rational64> {
    let (an, ad) = (i128::from(*a.numer()), i128::from(*a.denom()));
    let (bn, bd) = (i128::from(*b.numer()), i128::from(*b.denom()));
    narrow(an * bd + bn * ad, ad * bd)
}

/// `a - b`, checked.
pub(crate) fn checked_sub(a: Rational64, b: Rational64) -> Option<Rational64> {
    let (an, ad) = (i128::from(*a.numer()), i128::from(*a.denom()));
    let (bn, bd) = (i128::from(*b.numer()), i128::from(*b.denom()));
    narrow(an * bd - bn * ad, ad * bd)
}

/// `a * b`, checked.
pub(crate) fn checked_mul(a: Rational64, b: Rational64) -> Option<Rational64> {
    let (an, ad) = (i128::from(*a.numer()), i128::from(*a.denom()));
    let (bn, bd) = (i128::from(*b.numer()), i128::from(*b.denom()));
    narrow(an * bn, ad * bd)
}

/// `a / b`, checked. `None` when `b` is zero or the result overflows.
pub(crate) fn checked_div(a: Rational64, b: Rational64) -> Option<Rational64> {
    if *b.numer() == 0 {
        return None;
    }
    let (an, ad) = (i128::from(*a.numer()), i128::from(*a.denom()));
    let (bn, bd) = (i128::from(*b.numer()), i128::from(*b.denom()));
    narrow(an * bd, ad * bn)
}
