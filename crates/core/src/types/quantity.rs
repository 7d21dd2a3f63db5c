//! Per-line quantity.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum quantity of a single cart line.
pub const MAX_QUANTITY_PER_LINE: u8 = 20;

/// Quantity of one cart line, always within `1..=MAX_QUANTITY_PER_LINE`.
///
/// Deserialization clamps rather than rejects, so stored or locally cached
/// data can never produce an out-of-range line. Request bodies go through
/// [`Quantity::parse`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", from = "i64")]
pub struct Quantity(u8);

impl Quantity {
    /// The smallest quantity.
    pub const ONE: Self = Self(1);
    /// The largest quantity.
    pub const MAX: Self = Self(MAX_QUANTITY_PER_LINE);

    /// Clamp any integer into `1..=20`.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        let clamped = value.clamp(1, i64::from(MAX_QUANTITY_PER_LINE));
        // Range checked above
        Self(u8::try_from(clamped).unwrap_or(MAX_QUANTITY_PER_LINE))
    }

    /// Validate a requested quantity.
    ///
    /// Values above the maximum are clamped; values below one are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::QuantityOutOfRange`] if `value < 1`.
    pub fn parse(value: i64) -> Result<Self, ValidationError> {
        if value < 1 {
            return Err(ValidationError::QuantityOutOfRange(value));
        }
        Ok(Self::clamped(value))
    }

    /// Add another quantity, clamping the sum.
    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        Self::clamped(i64::from(self.0) + i64::from(other.0))
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl From<i64> for Quantity {
    fn from(value: i64) -> Self {
        Self::clamped(value)
    }
}

impl From<Quantity> for u8 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_bounds() {
        assert_eq!(Quantity::clamped(-3).get(), 1);
        assert_eq!(Quantity::clamped(0).get(), 1);
        assert_eq!(Quantity::clamped(7).get(), 7);
        assert_eq!(Quantity::clamped(25).get(), 20);
        assert_eq!(Quantity::clamped(i64::MAX).get(), 20);
    }

    #[test]
    fn test_parse_rejects_non_positive() {
        assert_eq!(
            Quantity::parse(0),
            Err(ValidationError::QuantityOutOfRange(0))
        );
        assert!(Quantity::parse(-1).is_err());
    }

    #[test]
    fn test_parse_clamps_large_values() {
        assert_eq!(Quantity::parse(25).unwrap(), Quantity::MAX);
    }

    #[test]
    fn test_saturating_add_clamps() {
        let sum = Quantity::clamped(15).saturating_add(Quantity::clamped(9));
        assert_eq!(sum, Quantity::MAX);
    }

    #[test]
    fn test_deserialize_clamps() {
        let q: Quantity = serde_json::from_str("99").unwrap();
        assert_eq!(q.get(), 20);
        let q: Quantity = serde_json::from_str("0").unwrap();
        assert_eq!(q.get(), 1);
    }
}
