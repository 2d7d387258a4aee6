//! Typed fact values.
//!
//! [`Value`] is the tagged union every writable and derived fact evaluates
//! to. Each variant defines a canonical in-memory representation, an
//! equality predicate, a canonical rendering, and a JSON codec. Decoding is
//! kind-directed: the caller supplies the declared [`ValueKind`] (and, for
//! enums, the options path) from the dictionary.

pub mod address;
pub mod bank;
pub mod collection;
pub mod dates;
pub mod dollar;
pub mod enums;
pub mod formats;
pub mod rational;

pub use address::Address;
pub use bank::{AccountType, BankAccount};
pub use collection::Collection;
pub use dollar::Dollar;
pub use enums::{EnumValue, MultiEnumValue};
pub use formats::{Ein, EmailAddress, IpPin, PhoneNumber, Pin, Tin};

use crate::error::ValueError;
use chrono::NaiveDate;
use factgraph_path::{MemberId, Path};
use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use std::fmt::{self, Display};

/// The stable enumeration of writable type tags.
///
/// The `Display`/`FromStr` forms double as the `$type` tag in persisted
/// JSON and as the type names surfaced at the boundary.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ValueKind {
    /// `true` / `false`.
    Bool,
    /// Signed 32-bit integer.
    Int,
    /// UTF-8 string.
    Str,
    /// Exact cents.
    Dollar,
    /// Reduced fraction.
    Rational,
    /// Civil date.
    Day,
    /// Signed day count.
    Days,
    /// Single choice from an option set.
    Enum,
    /// Multiple choices from an option set.
    MultiEnum,
    /// Taxpayer identification number.
    Tin,
    /// Employer identification number.
    Ein,
    /// Identity-protection PIN.
    IpPin,
    /// Signing PIN.
    Pin,
    /// Phone number.
    Phone,
    /// Email address.
    Email,
    /// Mailing address.
    Address,
    /// Bank routing/account pair.
    BankAccount,
    /// Ordered member-id list.
    Collection,
}

/// A typed fact value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A boolean.
    Bool(bool),
    /// A signed 32-bit integer.
    Int(i32),
    /// A string.
    Str(String),
    /// An exact dollar amount.
    Dollar(Dollar),
    /// A reduced rational.
    Rational(Rational64),
    /// A civil date.
    Day(NaiveDate),
    /// A signed count of days.
    Days(i64),
    /// A single enum choice.
    Enum(EnumValue),
    /// A multi-select enum.
    MultiEnum(MultiEnumValue),
    /// A taxpayer identification number.
    Tin(Tin),
    /// An employer identification number.
    Ein(Ein),
    /// An identity-protection PIN.
    IpPin(IpPin),
    /// A signing PIN.
    Pin(Pin),
    /// A phone number.
    Phone(PhoneNumber),
    /// An email address.
    Email(EmailAddress),
    /// A mailing address.
    Address(Address),
    /// A bank account.
    BankAccount(BankAccount),
    /// A collection's member ids.
    Collection(Collection),
}

impl Value {
    /// The tag for this value's variant.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Str(_) => ValueKind::Str,
            Value::Dollar(_) => ValueKind::Dollar,
            Value::Rational(_) => ValueKind::Rational,
            Value::Day(_) => ValueKind::Day,
            Value::Days(_) => ValueKind::Days,
            Value::Enum(_) => ValueKind::Enum,
            Value::MultiEnum(_) => ValueKind::MultiEnum,
            Value::Tin(_) => ValueKind::Tin,
            Value::Ein(_) => ValueKind::Ein,
            Value::IpPin(_) => ValueKind::IpPin,
            Value::Pin(_) => ValueKind::Pin,
            Value::Phone(_) => ValueKind::Phone,
            Value::Email(_) => ValueKind::Email,
            Value::Address(_) => ValueKind::Address,
            Value::BankAccount(_) => ValueKind::BankAccount,
            Value::Collection(_) => ValueKind::Collection,
        }
    }

    /// Encodes to the variant's canonical JSON form.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => json!(i),
            Value::Str(s) => Json::String(s.clone()),
            Value::Dollar(d) => json!(d.cents()),
            Value::Rational(r) => Json::String(rational::format(*r)),
            Value::Day(d) => Json::String(dates::format(*d)),
            Value::Days(d) => json!(d),
            Value::Enum(e) => Json::String(e.value.clone()),
            Value::MultiEnum(m) => json!(m.values),
            Value::Tin(t) => Json::String(t.to_string()),
            Value::Ein(e) => Json::String(e.to_string()),
            Value::IpPin(p) => Json::String(p.to_string()),
            Value::Pin(p) => Json::String(p.to_string()),
            Value::Phone(p) => Json::String(p.to_string()),
            Value::Email(e) => Json::String(e.to_string()),
            Value::Address(a) => serde_json::to_value(a).unwrap_or(Json::Null),
            Value::BankAccount(b) => serde_json::to_value(b).unwrap_or(Json::Null),
            Value::Collection(c) => {
                json!(c.iter().map(|m| m.as_str().to_string()).collect::<Vec<_>>())
            }
        }
    }

    /// Decodes `json` as a value of `kind`.
    ///
    /// Enum kinds reattach the `options` path supplied by the caller (it is
    /// dictionary metadata, not part of the JSON form).
    ///
    /// # Errors
    /// Returns a [`ValueError`] when the JSON shape does not match the kind
    /// or the content fails the kind's invariants.
    pub fn from_json(
        kind: ValueKind,
        json: &Json,
        options: Option<&Path>,
    ) -> Result<Value, ValueError> {
        let mismatch = || ValueError::UnexpectedJson {
            kind,
            json: json.to_string(),
        };
        let value = match kind {
            ValueKind::Bool => Value::Bool(json.as_bool().ok_or_else(mismatch)?),
            ValueKind::Int => {
                let n = json.as_i64().ok_or_else(mismatch)?;
                Value::Int(i32::try_from(n).map_err(|_| mismatch())?)
            }
            ValueKind::Str => Value::Str(json.as_str().ok_or_else(mismatch)?.to_string()),
            ValueKind::Dollar => Value::Dollar(Dollar::from_cents(
                json.as_i64().ok_or_else(mismatch)?,
            )),
            ValueKind::Rational => {
                Value::Rational(rational::parse(json.as_str().ok_or_else(mismatch)?)?)
            }
            ValueKind::Day => Value::Day(dates::parse(json.as_str().ok_or_else(mismatch)?)?),
            ValueKind::Days => Value::Days(json.as_i64().ok_or_else(mismatch)?),
            ValueKind::Enum => {
                let chosen = json.as_str().ok_or_else(mismatch)?;
                let options = options.ok_or_else(mismatch)?;
                Value::Enum(EnumValue::new(options.clone(), chosen))
            }
            ValueKind::MultiEnum => {
                let options = options.ok_or_else(mismatch)?;
                let values = json
                    .as_array()
                    .ok_or_else(mismatch)?
                    .iter()
                    .map(|v| v.as_str().map(ToString::to_string).ok_or_else(mismatch))
                    .collect::<Result<Vec<_>, _>>()?;
                Value::MultiEnum(MultiEnumValue::new(options.clone(), values))
            }
            ValueKind::Tin => Value::Tin(Tin::new(json.as_str().ok_or_else(mismatch)?)?),
            ValueKind::Ein => Value::Ein(Ein::new(json.as_str().ok_or_else(mismatch)?)?),
            ValueKind::IpPin => Value::IpPin(IpPin::new(json.as_str().ok_or_else(mismatch)?)?),
            ValueKind::Pin => Value::Pin(Pin::new(json.as_str().ok_or_else(mismatch)?)?),
            ValueKind::Phone => {
                Value::Phone(PhoneNumber::new(json.as_str().ok_or_else(mismatch)?)?)
            }
            ValueKind::Email => {
                Value::Email(EmailAddress::new(json.as_str().ok_or_else(mismatch)?)?)
            }
            ValueKind::Address => {
                let address: Address =
                    serde_json::from_value(json.clone()).map_err(|_| mismatch())?;
                address.validate()?;
                Value::Address(address)
            }
            ValueKind::BankAccount => {
                let account: BankAccount =
                    serde_json::from_value(json.clone()).map_err(|_| mismatch())?;
                account.validate()?;
                Value::BankAccount(account)
            }
            ValueKind::Collection => {
                let ids = json
                    .as_array()
                    .ok_or_else(mismatch)?
                    .iter()
                    .map(|v| {
                        v.as_str()
                            .ok_or_else(mismatch)
                            .and_then(|s| MemberId::new(s).map_err(ValueError::from))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Value::Collection(Collection::from_members(ids)?)
            }
        };
        Ok(value)
    }

    /// Encodes as the tagged container `{"$type": …, "item": …}` used by
    /// persistence and migrations.
    pub fn to_tagged_json(&self) -> Json {
        json!({ "$type": self.kind(), "item": self.to_json() })
    }

    /// Decodes a tagged container. `options` is reattached to enum kinds as
    /// in [`Value::from_json`].
    ///
    /// # Errors
    /// Returns a [`ValueError`] for a missing or unknown `$type` tag or a
    /// malformed `item`.
    pub fn from_tagged_json(json: &Json, options: Option<&Path>) -> Result<Value, ValueError> {
        let tag = json
            .get("$type")
            .and_then(Json::as_str)
            .ok_or_else(|| ValueError::UnknownTypeTag {
                tag: json.to_string(),
            })?;
        let kind: ValueKind = tag.parse().map_err(|_| ValueError::UnknownTypeTag {
            tag: tag.to_string(),
        })?;
        match json.get("item") {
            Some(item) => Value::from_json(kind, item, options),
            None => Value::from_json(kind, &Json::Null, options),
        }
    }
}

impl Display for Value {
    /// The canonical rendering, used by string operators and violations.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Str(s) => f.write_str(s),
            Value::Dollar(d) => write!(f, "{d}"),
            Value::Rational(r) => f.write_str(&rational::format(*r)),
            Value::Day(d) => f.write_str(&dates::format(*d)),
            Value::Days(d) => write!(f, "{d}"),
            Value::Enum(e) => write!(f, "{e}"),
            Value::MultiEnum(m) => write!(f, "{m}"),
            Value::Tin(t) => write!(f, "{t}"),
            Value::Ein(e) => write!(f, "{e}"),
            Value::IpPin(p) => write!(f, "{p}"),
            Value::Pin(p) => write!(f, "{p}"),
            Value::Phone(p) => write!(f, "{p}"),
            Value::Email(e) => write!(f, "{e}"),
            Value::Address(a) => write!(f, "{a}"),
            Value::BankAccount(b) => write!(f, "{b}"),
            Value::Collection(c) => write!(f, "{c}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn path(s: &str) -> Path {
        s.parse().unwrap()
    }

    #[test]
    fn test_kind_tags_round_trip() {
        for kind in ValueKind::iter() {
            let tag = kind.to_string();
            let parsed: ValueKind = tag.parse().unwrap();
            assert_eq!(parsed, kind, "tag {tag:?}");
        }
        assert_eq!(ValueKind::MultiEnum.to_string(), "multiEnum");
        assert_eq!(ValueKind::BankAccount.to_string(), "bankAccount");
        assert_eq!(ValueKind::IpPin.to_string(), "ipPin");
    }

    #[test]
    fn test_json_round_trip() {
        let opts = path("/opts");
        let values = [
            Value::Bool(true),
            Value::Int(-3),
            Value::Str("hello".into()),
            Value::Dollar(Dollar::from_cents(55_000)),
            Value::Rational(Rational64::new(1, 3)),
            Value::Day(dates::parse("2024-04-15").unwrap()),
            Value::Days(-10),
            Value::Enum(EnumValue::new(opts.clone(), "x")),
            Value::MultiEnum(MultiEnumValue::new(opts.clone(), vec!["a".into(), "b".into()])),
            Value::Tin(Tin::new("123-45-6789").unwrap()),
            Value::Ein(Ein::new("12-3456789").unwrap()),
            Value::IpPin(IpPin::new("123456").unwrap()),
            Value::Pin(Pin::new("54321").unwrap()),
            Value::Phone(PhoneNumber::new("202-555-0140").unwrap()),
            Value::Email(EmailAddress::new("a@example.com").unwrap()),
            Value::Address(
                Address::new("1 Main", None, "Reno", "NV", "89501", None).unwrap(),
            ),
            Value::BankAccount(
                BankAccount::new(AccountType::Checking, "021000021", "12345678").unwrap(),
            ),
            Value::Collection(
                Collection::from_members(vec![
                    MemberId::new("a").unwrap(),
                    MemberId::new("b").unwrap(),
                ])
                .unwrap(),
            ),
        ];
        for value in values {
            let json = value.to_json();
            let back = Value::from_json(value.kind(), &json, Some(&opts)).unwrap();
            assert_eq!(back, value, "kind {}", value.kind());

            let tagged = value.to_tagged_json();
            let back = Value::from_tagged_json(&tagged, Some(&opts)).unwrap();
            assert_eq!(back, value, "tagged kind {}", value.kind());
        }
    }

    #[test]
    fn test_decode_errors() {
        assert!(Value::from_json(ValueKind::Int, &json!("5"), None).is_err());
        assert!(Value::from_json(ValueKind::Int, &json!(i64::MAX), None).is_err());
        assert!(Value::from_json(ValueKind::Day, &json!("04/15/2024"), None).is_err());
        assert!(Value::from_json(ValueKind::Enum, &json!("x"), None).is_err());
        assert!(Value::from_tagged_json(&json!({"item": 5}), None).is_err());
        assert!(Value::from_tagged_json(&json!({"$type": "widget", "item": 5}), None).is_err());
    }

    #[test]
    fn test_dollar_json_is_cents() {
        let v = Value::Dollar(Dollar::from_cents(50_000));
        assert_eq!(v.to_json(), json!(50_000));
        assert_eq!(v.to_string(), "500.00");
    }
}
