//! Validated string types.
//!
//! Each type rejects malformed input at construction and renders one
//! canonical form, so equality and persistence never see separator or
//! casing variants.

use crate::error::ValueError;
use crate::value::ValueKind;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{self, Display};
use std::str::FromStr;

fn strip_separators(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '-' | ' ' | '.' | '(' | ')'))
        .collect()
}

fn invalid(kind: ValueKind, value: &str) -> ValueError {
    ValueError::InvalidFormat {
        kind,
        value: value.to_string(),
    }
}

/// A taxpayer identification number (SSN or ITIN): nine digits, canonical
/// form `XXX-XX-XXXX`.
///
/// The area may not be `000` or `666` and the group and serial may not be
/// all zeros. Input may carry dashes or spaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tin {
    digits: String,
}

impl Tin {
    /// Validates and constructs a `Tin`.
    ///
    /// # Errors
    /// Returns [`ValueError::InvalidFormat`] for malformed input.
    pub fn new(input: &str) -> Result<Self, ValueError> {
        let digits = strip_separators(input);
        if digits.len() != 9 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid(ValueKind::Tin, input));
        }
        let (area, rest) = digits.split_at(3);
        let (group, serial) = rest.split_at(2);
        if area == "000" || area == "666" || group == "00" || serial == "0000" {
            return Err(invalid(ValueKind::Tin, input));
        }
        Ok(Self { digits })
    }

    /// The bare nine digits.
    pub fn digits(&self) -> &str {
        &self.digits
    }
}

impl Display for Tin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}",
            &self.digits[..3],
            &self.digits[3..5],
            &self.digits[5..]
        )
    }
}

impl FromStr for Tin {
    type Err = ValueError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// An employer identification number: nine digits, canonical form
/// `XX-XXXXXXX`. The two-digit prefix may not be `00`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ein {
    digits: String,
}

impl Ein {
    /// Validates and constructs an `Ein`.
    ///
    /// # Errors
    /// Returns [`ValueError::InvalidFormat`] for malformed input.
    pub fn new(input: &str) -> Result<Self, ValueError> {
        let digits = strip_separators(input);
        if digits.len() != 9
            || !digits.chars().all(|c| c.is_ascii_digit())
            || digits.starts_with("00")
        {
            return Err(invalid(ValueKind::Ein, input));
        }
        Ok(Self { digits })
    }

    /// The bare nine digits.
    pub fn digits(&self) -> &str {
        &self.digits
    }
}

impl Display for Ein {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", &self.digits[..2], &self.digits[2..])
    }
}

impl FromStr for Ein {
    type Err = ValueError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// An identity-protection PIN: exactly six digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IpPin(String);

impl IpPin {
    /// Validates and constructs an `IpPin`.
    ///
    /// # Errors
    /// Returns [`ValueError::InvalidFormat`] for malformed input.
    pub fn new(input: &str) -> Result<Self, ValueError> {
        if input.len() != 6 || !input.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid(ValueKind::IpPin, input));
        }
        Ok(Self(input.to_string()))
    }

    /// The six digits.
    pub fn digits(&self) -> &str {
        &self.0
    }
}

impl Display for IpPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A self-select signing PIN: exactly five digits, not all zeros.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pin(String);

impl Pin {
    /// Validates and constructs a `Pin`.
    ///
    /// # Errors
    /// Returns [`ValueError::InvalidFormat`] for malformed input.
    pub fn new(input: &str) -> Result<Self, ValueError> {
        if input.len() != 5 || !input.chars().all(|c| c.is_ascii_digit()) || input == "00000" {
            return Err(invalid(ValueKind::Pin, input));
        }
        Ok(Self(input.to_string()))
    }

    /// The five digits.
    pub fn digits(&self) -> &str {
        &self.0
    }
}

impl Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A North American phone number, canonical form `+1` followed by ten
/// digits.
///
/// Input may carry separators and an optional `+1`/`1` country prefix. The
/// area code and exchange must not start with 0 or 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber {
    digits: String,
}

impl PhoneNumber {
    /// Validates and constructs a `PhoneNumber`.
    ///
    /// # Errors
    /// Returns [`ValueError::InvalidFormat`] for malformed input.
    pub fn new(input: &str) -> Result<Self, ValueError> {
        let stripped = strip_separators(input);
        let stripped = stripped.strip_prefix("+1").unwrap_or(&stripped);
        let digits = if stripped.len() == 11 {
            stripped.strip_prefix('1').unwrap_or(stripped)
        } else {
            stripped
        };
        if digits.len() != 10 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid(ValueKind::Phone, input));
        }
        let area = digits.as_bytes()[0];
        let exchange = digits.as_bytes()[3];
        if !(b'2'..=b'9').contains(&area) || !(b'2'..=b'9').contains(&exchange) {
            return Err(invalid(ValueKind::Phone, input));
        }
        Ok(Self {
            digits: digits.to_string(),
        })
    }

    /// The ten subscriber digits, without the country code.
    pub fn digits(&self) -> &str {
        &self.digits
    }
}

impl Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+1{}", self.digits)
    }
}

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$").unwrap()
});

/// An email address. The domain part is lowercased on construction; the
/// local part is preserved as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress {
    local: String,
    domain: String,
}

impl EmailAddress {
    /// Validates and constructs an `EmailAddress`.
    ///
    /// # Errors
    /// Returns [`ValueError::InvalidFormat`] for malformed input.
    pub fn new(input: &str) -> Result<Self, ValueError> {
        if !EMAIL.is_match(input) {
            return Err(invalid(ValueKind::Email, input));
        }
        let (local, domain) = input
            .rsplit_once('@')
            .ok_or_else(|| invalid(ValueKind::Email, input))?;
        Ok(Self {
            local: local.to_string(),
            domain: domain.to_ascii_lowercase(),
        })
    }
}

impl Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local, self.domain)
    }
}
