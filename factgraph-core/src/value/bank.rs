//! Bank account details.

use crate::error::ValueError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Checking or savings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// A checking account.
    Checking,
    /// A savings account.
    Savings,
}

impl Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
        })
    }
}

/// A routing/account number pair for direct deposit.
///
/// The routing number must be nine digits and pass the ABA check digit;
/// the account number must be five to seventeen digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BankAccount {
    /// Checking or savings.
    #[serde(rename = "type")]
    pub account_type: AccountType,
    /// Nine-digit ABA routing number.
    pub routing: String,
    /// Account number, 5–17 digits.
    pub account: String,
}

impl BankAccount {
    /// Validates and constructs a `BankAccount`.
    ///
    /// # Errors
    /// Returns [`ValueError::InvalidField`] naming the failing field.
    pub fn new(
        account_type: AccountType,
        routing: &str,
        account: &str,
    ) -> Result<Self, ValueError> {
        if routing.len() != 9
            || !routing.chars().all(|c| c.is_ascii_digit())
            || !aba_checksum_ok(routing)
        {
            return Err(ValueError::InvalidField {
                field: "routing number",
                value: routing.to_string(),
            });
        }
        if !(5..=17).contains(&account.len()) || !account.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValueError::InvalidField {
                field: "account number",
                value: account.to_string(),
            });
        }
        Ok(Self {
            account_type,
            routing: routing.to_string(),
            account: account.to_string(),
        })
    }

    /// Re-runs field validation after deserialization.
    pub fn validate(&self) -> Result<(), ValueError> {
        Self::new(self.account_type, &self.routing, &self.account).map(|_| ())
    }
}

/// ABA check: 3·(d₁+d₄+d₇) + 7·(d₂+d₅+d₈) + (d₃+d₆+d₉) ≡ 0 (mod 10).
fn aba_checksum_ok(routing: &str) -> bool {
    let d: Vec<u32> = routing.chars().filter_map(|c| c.to_digit(10)).collect();
    if d.len() != 9 {
        return false;
    }
    (3 * (d[0] + d[3] + d[6]) + 7 * (d[1] + d[4] + d[7]) + (d[2] + d[5] + d[8])) % 10 == 0
}

impl Display for BankAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // account digits are sensitive; render only the tail
        let tail = &self.account[self.account.len().saturating_sub(4)..];
        write!(f, "{} …{tail}", self.account_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_checksum() {
        // 021000021 is a well-known valid ABA number
        assert!(aba_checksum_ok("021000021"));
        assert!(!aba_checksum_ok("021000022"));

        assert!(BankAccount::new(AccountType::Checking, "021000021", "12345678").is_ok());
        assert!(BankAccount::new(AccountType::Checking, "021000022", "12345678").is_err());
        assert!(BankAccount::new(AccountType::Checking, "21000021", "12345678").is_err());
    }

    #[test]
    fn test_account_number_bounds() {
        assert!(BankAccount::new(AccountType::Savings, "021000021", "1234").is_err());
        assert!(BankAccount::new(AccountType::Savings, "021000021", "123456789012345678").is_err());
        assert!(BankAccount::new(AccountType::Savings, "021000021", "12345").is_ok());
    }

    #[test]
    fn test_display_masks_account() {
        let acct = BankAccount::new(AccountType::Checking, "021000021", "987654321").unwrap();
        assert_eq!(acct.to_string(), "checking …4321");
    }
}
