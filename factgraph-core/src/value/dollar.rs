//! Exact currency arithmetic in integer cents.

use crate::error::ValueError;
use crate::value::rational::round_half_even;
use crate::value::ValueKind;
use num_rational::Rational64;
use std::fmt::{self, Display};
use std::str::FromStr;

/// A signed dollar amount held as an exact count of cents.
///
/// All arithmetic is checked; overflow surfaces as `None` and collapses to
/// an incomplete result at the evaluation layer. Conversions from
/// [`Rational64`] round half-to-even.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dollar(i64);

impl Dollar {
    /// Zero dollars.
    pub const ZERO: Dollar = Dollar(0);

    /// Constructs from a signed count of cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// The amount as signed cents.
    pub fn cents(self) -> i64 {
        self.0
    }

    /// Checked addition.
    pub fn checked_add(self, rhs: Dollar) -> Option<Dollar> {
        self.0.checked_add(rhs.0).map(Dollar)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, rhs: Dollar) -> Option<Dollar> {
        self.0.checked_sub(rhs.0).map(Dollar)
    }

    /// Checked multiplication by an integer factor.
    pub fn checked_mul_int(self, factor: i64) -> Option<Dollar> {
        self.0.checked_mul(factor).map(Dollar)
    }

    /// Multiplies by a rational factor, rounding the result half-to-even
    /// back to cents.
    pub fn times(self, factor: Rational64) -> Option<Dollar> {
        let numer = i128::from(self.0).checked_mul(i128::from(*factor.numer()))?;
        let cents = round_half_even(numer, i128::from(*factor.denom()));
        i64::try_from(cents).ok().map(Dollar)
    }

    /// Divides by an integer divisor, rounding half-to-even. Returns `None`
    /// for a zero divisor.
    pub fn checked_div_int(self, divisor: i64) -> Option<Dollar> {
        if divisor == 0 {
            return None;
        }
        let cents = round_half_even(i128::from(self.0), i128::from(divisor));
        i64::try_from(cents).ok().map(Dollar)
    }

    /// The exact ratio of two amounts. Returns `None` when `other` is zero.
    pub fn ratio_over(self, other: Dollar) -> Option<Rational64> {
        if other.0 == 0 {
            return None;
        }
        Some(Rational64::new(self.0, other.0))
    }

    /// The amount as an exact rational count of dollars.
    pub fn to_rational(self) -> Rational64 {
        Rational64::new(self.0, 100)
    }

    /// Rounds to whole dollars, half-to-even.
    pub fn round_to_whole(self) -> Dollar {
        Dollar(round_half_even(i128::from(self.0), 100) as i64 * 100)
    }

    /// Rounds toward positive infinity to whole dollars.
    pub fn ceil_to_whole(self) -> Dollar {
        Dollar(i128::from(self.0).div_euclid(100) as i64 * 100
            + i64::from(self.0.rem_euclid(100) != 0) * 100)
    }

    /// Rounds toward negative infinity to whole dollars.
    pub fn floor_to_whole(self) -> Dollar {
        Dollar(self.0.div_euclid(100) * 100)
    }

    /// Whole dollars, truncated toward zero.
    pub fn whole_dollars(self) -> i64 {
        self.0 / 100
    }
}

impl Display for Dollar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cents = i128::from(self.0);
        let sign = if cents < 0 { "-" } else { "" };
        let magnitude = cents.unsigned_abs();
        write!(f, "{sign}{}.{:02}", magnitude / 100, magnitude % 100)
    }
}

impl FromStr for Dollar {
    type Err = ValueError;

    /// Parses a decimal dollar amount: `"1234.56"`, `"-0.50"`, `"500"`,
    /// `"12.3"` (thirty cents).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ValueError::MalformedNumber {
            kind: ValueKind::Dollar,
            value: s.to_string(),
        };
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (units, fraction) = match digits.split_once('.') {
            Some((_, "")) => return Err(malformed()),
            Some((units, fraction)) => (units, fraction),
            None => (digits, ""),
        };
        if units.is_empty() && fraction.is_empty() {
            return Err(malformed());
        }
        if !units.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
            || fraction.len() > 2
        {
            return Err(malformed());
        }
        let units: i64 = if units.is_empty() {
            0
        } else {
            units.parse().map_err(|_| malformed())?
        };
        let cents_part: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| malformed())? * 10,
            _ => fraction.parse().map_err(|_| malformed())?,
        };
        let cents = units
            .checked_mul(100)
            .and_then(|c| c.checked_add(cents_part))
            .ok_or_else(malformed)?;
        Ok(Dollar(if negative { -cents } else { cents }))
    }
}
