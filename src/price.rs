use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

/// Represents an amount of money as reported by the receipts API.
///
/// The amount is an exact [`Decimal`], so sums never pick up floating-point
/// error. The [`Display`] implementation keeps the scale the server sent
/// (`12.50` prints as `12.50`, `10` as `10`).
#[derive(Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct Price(Decimal);

impl Debug for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Price {
    /// Adds `rhs`, or returns `None` if the sum leaves the [`Decimal`] range.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    /// Parses a plain or scientific decimal literal.
    ///
    /// Literals that [`Decimal`] could only hold by rounding (more than 28
    /// fractional digits, or magnitudes beyond its range) are rejected.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let value = if s.contains(['e', 'E']) {
            Decimal::from_scientific(s)?
        } else {
            Decimal::from_str_exact(s)?
        };
        Ok(Self(value))
    }
}

// JSON numbers are read from their literal text (serde_json's
// `arbitrary_precision`), never through an `f64`.
impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let literal = match Value::deserialize(deserializer)? {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s,
            other => {
                return Err(de::Error::invalid_type(
                    de::Unexpected::Other(&other.to_string()),
                    &"a decimal number or decimal string",
                ))
            }
        };
        literal
            .parse()
            .map_err(|e| de::Error::custom(format!("invalid price {literal:?}: {e}")))
    }
}
