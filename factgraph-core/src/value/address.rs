//! Mailing addresses.

use crate::error::ValueError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

static REGION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]{2}$").unwrap());
static POSTAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}(-\d{4})?$").unwrap());

/// A street address. Region and postal code are format-checked at
/// construction; the region is stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Address {
    /// Street line.
    pub street: String,
    /// Optional second line (apartment, unit, …).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    /// City name.
    pub city: String,
    /// Two-letter state or territory code.
    pub region: String,
    /// ZIP code, `NNNNN` or `NNNNN-NNNN`.
    pub postal: String,
    /// Country name; defaults to `"USA"`.
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "USA".to_string()
}

impl Address {
    /// Validates and constructs an `Address`.
    ///
    /// # Errors
    /// Returns [`ValueError::InvalidField`] naming the first field that
    /// fails validation.
    pub fn new(
        street: &str,
        line2: Option<&str>,
        city: &str,
        region: &str,
        postal: &str,
        country: Option<&str>,
    ) -> Result<Self, ValueError> {
        if street.trim().is_empty() {
            return Err(field("street", street));
        }
        if city.trim().is_empty() {
            return Err(field("city", city));
        }
        if !REGION.is_match(region) {
            return Err(field("region", region));
        }
        if !POSTAL.is_match(postal) {
            return Err(field("postal code", postal));
        }
        Ok(Self {
            street: street.to_string(),
            line2: line2.map(ToString::to_string),
            city: city.to_string(),
            region: region.to_ascii_uppercase(),
            postal: postal.to_string(),
            country: country.map_or_else(default_country, ToString::to_string),
        })
    }

    /// Re-runs field validation; used when an address arrives through
    /// deserialization rather than [`Address::new`].
    pub fn validate(&self) -> Result<(), ValueError> {
        Self::new(
            &self.street,
            self.line2.as_deref(),
            &self.city,
            &self.region,
            &self.postal,
            Some(&self.country),
        )
        .map(|_| ())
    }
}

fn field(field: &'static str, value: &str) -> ValueError {
    ValueError::InvalidField {
        field,
        value: value.to_string(),
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.street)?;
        if let Some(line2) = &self.line2 {
            write!(f, " {line2}")?;
        }
        write!(
            f,
            ", {}, {} {}, {}",
            self.city, self.region, self.postal, self.country
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction() {
        let addr = Address::new("123 Main St", None, "Springfield", "il", "62704", None).unwrap();
        assert_eq!(addr.region, "IL");
        assert_eq!(addr.country, "USA");
        assert_eq!(
            addr.to_string(),
            "123 Main St, Springfield, IL 62704, USA"
        );

        let plus4 = Address::new("1 Elm", Some("Apt 2"), "Dayton", "OH", "45402-1234", None);
        assert!(plus4.is_ok());

        let tests = [
            ("", None, "City", "OH", "45402"),
            ("1 Elm", None, "", "OH", "45402"),
            ("1 Elm", None, "City", "Ohio", "45402"),
            ("1 Elm", None, "City", "OH", "4540"),
            ("1 Elm", None, "City", "OH", "45402-12"),
        ];
        for (street, line2, city, region, postal) in tests {
            assert!(
                Address::new(street, line2, city, region, postal, None).is_err(),
                "expected error for {street:?}/{city:?}/{region:?}/{postal:?}"
            );
        }
    }

    #[test]
    fn test_serde_shape() {
        let addr = Address::new("9 Oak", None, "Reno", "NV", "89501", None).unwrap();
        let json = serde_json::to_value(&addr).unwrap();
        assert_eq!(json["street"], "9 Oak");
        assert!(json.get("line2").is_none());
        let back: Address = serde_json::from_value(json).unwrap();
        assert_eq!(back, addr);
    }
}
