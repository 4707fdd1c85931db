//! Coin amount type
//!
//! Domain primitive for coin quantities with business rule validation.
//! All amounts are validated at construction time, ensuring invalid values
//! cannot exist in the system.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hard ceiling for any single amount, independent of configured limits.
/// Keeps `balance + delta` far away from `i64` overflow.
pub const MAX_COINS: i64 = 1_000_000_000;

/// Coins represents a validated, strictly positive coin quantity.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - Value never exceeds [`MAX_COINS`]
///
/// # Example
/// ```
/// use classroom_coins::domain::Coins;
///
/// let price = Coins::new(40).unwrap();
/// assert_eq!(price.value(), 40);
/// assert_eq!(price.as_debit(), -40);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Coins(i64);

/// Errors that can occur when creating a coin amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoinsError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(i64),

    #[error("Amount exceeds maximum allowed value ({MAX_COINS})")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Coins {
    /// Create a new amount with validation.
    ///
    /// # Errors
    /// - `CoinsError::NotPositive` if value <= 0
    /// - `CoinsError::Overflow` if value > [`MAX_COINS`]
    pub fn new(value: i64) -> Result<Self, CoinsError> {
        if value <= 0 {
            return Err(CoinsError::NotPositive(value));
        }
        if value > MAX_COINS {
            return Err(CoinsError::Overflow);
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Signed delta for crediting this amount.
    pub fn as_credit(&self) -> i64 {
        self.0
    }

    /// Signed delta for debiting this amount.
    pub fn as_debit(&self) -> i64 {
        -self.0
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Coins {
    type Err = CoinsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|e| CoinsError::ParseError(e.to_string()))?;
        Coins::new(value)
    }
}

impl TryFrom<i64> for Coins {
    type Error = CoinsError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Coins::new(value)
    }
}

impl From<Coins> for i64 {
    fn from(coins: Coins) -> Self {
        coins.0
    }
}

/// A signed teacher adjustment split into its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "direction", content = "amount", rename_all = "snake_case")]
pub enum Adjustment {
    Gift(Coins),
    Deduct(Coins),
}

impl Adjustment {
    /// Split a signed amount into gift (positive) or deduction (negative).
    pub fn from_signed(amount: i64) -> Result<Self, CoinsError> {
        match amount {
            0 => Err(CoinsError::NotPositive(0)),
            a if a > 0 => Coins::new(a).map(Adjustment::Gift),
            // checked_neg: i64::MIN has no positive counterpart
            a => a
                .checked_neg()
                .ok_or(CoinsError::Overflow)
                .and_then(Coins::new)
                .map(Adjustment::Deduct),
        }
    }

    pub fn coins(&self) -> Coins {
        match self {
            Adjustment::Gift(c) | Adjustment::Deduct(c) => *c,
        }
    }

    /// The signed balance delta this adjustment applies.
    pub fn delta(&self) -> i64 {
        match self {
            Adjustment::Gift(c) => c.as_credit(),
            Adjustment::Deduct(c) => c.as_debit(),
        }
    }

    pub fn is_gift(&self) -> bool {
        matches!(self, Adjustment::Gift(_))
    }
}
