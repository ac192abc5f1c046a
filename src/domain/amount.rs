//! Money primitives
//!
//! Amounts and balances are whole numbers of the smallest currency unit.
//! Both are validated at construction time so an invalid value cannot
//! travel through the ledger.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Balance given to a freshly opened account.
pub const DEFAULT_INITIAL_BALANCE: i64 = 1_000_000;

/// Amount represents a quantity of money being moved.
///
/// # Invariants
/// - Value is always strictly positive
///
/// # Example
/// ```
/// use wallet_ledger::domain::Amount;
///
/// let amount = Amount::new(300_000).unwrap();
/// assert_eq!(amount.value(), 300_000);
/// assert!(Amount::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

/// Errors that can occur when creating an Amount or Balance
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(i64),

    #[error("Balance cannot be negative (got {0})")]
    Negative(i64),

    #[error("Amount arithmetic overflowed")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Create a new Amount, rejecting zero and negative values.
    pub fn new(value: i64) -> Result<Self, AmountError> {
        if value <= 0 {
            return Err(AmountError::NotPositive(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|e| AmountError::ParseError(e.to_string()))?;
        Amount::new(value)
    }
}

impl TryFrom<i64> for Amount {
    type Error = AmountError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Balance held by an account. Zero is allowed, negative is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Balance(i64);

impl Balance {
    pub fn new(value: i64) -> Result<Self, AmountError> {
        if value < 0 {
            return Err(AmountError::Negative(value));
        }
        Ok(Self(value))
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Compare against a raw, not yet validated quantity.
    pub fn covers(&self, quantity: i64) -> bool {
        self.0 >= quantity
    }

    pub fn credit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        let value = self
            .0
            .checked_add(amount.value())
            .ok_or(AmountError::Overflow)?;
        Balance::new(value)
    }

    pub fn debit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        let value = self
            .0
            .checked_sub(amount.value())
            .ok_or(AmountError::Overflow)?;
        Balance::new(value)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}

impl TryFrom<i64> for Balance {
    type Error = AmountError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Balance::new(value)
    }
}

impl From<Balance> for i64 {
    fn from(balance: Balance) -> Self {
        balance.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_positive() {
        let amount = Amount::new(100).unwrap();
        assert_eq!(amount.value(), 100);
    }

    #[test]
    fn test_amount_zero_rejected() {
        assert!(matches!(Amount::new(0), Err(AmountError::NotPositive(0))));
    }

    #[test]
    fn test_amount_negative_rejected() {
        assert!(matches!(Amount::new(-5), Err(AmountError::NotPositive(-5))));
    }

    #[test]
    fn test_amount_from_str() {
        let amount: Amount = " 300000 ".parse().unwrap();
        assert_eq!(amount.value(), 300_000);

        let bad: Result<Amount, _> = "12.5".parse();
        assert!(matches!(bad, Err(AmountError::ParseError(_))));
    }

    #[test]
    fn test_amount_deserialize_rejects_zero() {
        let parsed: Result<Amount, _> = serde_json::from_str("0");
        assert!(parsed.is_err());
        let parsed: Amount = serde_json::from_str("42").unwrap();
        assert_eq!(parsed.value(), 42);
    }

    #[test]
    fn test_balance_credit_debit() {
        let balance = Balance::new(DEFAULT_INITIAL_BALANCE).unwrap();
        let amount = Amount::new(300_000).unwrap();

        assert_eq!(balance.debit(&amount).unwrap().value(), 700_000);
        assert_eq!(balance.credit(&amount).unwrap().value(), 1_300_000);
    }

    #[test]
    fn test_balance_insufficient() {
        let balance = Balance::new(500).unwrap();
        let amount = Amount::new(501).unwrap();

        assert!(!balance.covers(501));
        assert!(matches!(balance.debit(&amount), Err(AmountError::Negative(-1))));
    }

    #[test]
    fn test_balance_credit_overflow() {
        let balance = Balance::new(i64::MAX).unwrap();
        let amount = Amount::new(1).unwrap();
        assert_eq!(balance.credit(&amount), Err(AmountError::Overflow));
    }
}
