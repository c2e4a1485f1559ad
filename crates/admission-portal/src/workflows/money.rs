use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Rupee amount held as whole paise; travels as decimal rupees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_paise(paise: u64) -> Self {
        Self(paise)
    }

    pub const fn from_rupees(rupees: u64) -> Self {
        Self(rupees * 100)
    }

    pub const fn paise(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Accepts `1500`, `1500.5` and `1500.50`; rejects more than two decimals.
    pub fn parse_rupees(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };
        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let rupees: u64 = whole.parse().ok()?;
        let paise: u64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().ok()? * 10,
            _ => fraction.parse().ok()?,
        };
        rupees.checked_mul(100)?.checked_add(paise).map(Amount)
    }

    fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let paise = (value * 100.0).round();
        if paise > u64::MAX as f64 {
            return None;
        }
        Some(Amount(paise as u64))
    }

    pub fn as_rupees_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_rupees_f64())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl<'v> Visitor<'v> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative rupee amount")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Amount, E> {
                value
                    .checked_mul(100)
                    .map(Amount)
                    .ok_or_else(|| E::custom("amount overflows"))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Amount, E> {
                u64::try_from(value)
                    .map_err(|_| E::custom("amount must not be negative"))
                    .and_then(|value| self.visit_u64(value))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<Amount, E> {
                Amount::from_f64(value).ok_or_else(|| E::custom("invalid rupee amount"))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Amount, E> {
                Amount::parse_rupees(value).ok_or_else(|| E::custom("invalid rupee amount"))
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}
