//! Integer minor-unit money type
//!
//! All monetary values are stored as paise (1/100 rupee) in an `i64`.
//! Arithmetic is exact; rounding exists only at formatting boundaries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monetary amount in paise (minor units, 100 paise = 1 rupee)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Paise(i64);

impl Paise {
    /// Zero amount
    pub const ZERO: Paise = Paise(0);

    /// Create from raw paise
    pub const fn new(paise: i64) -> Self {
        Self(paise)
    }

    /// Create from whole rupees
    pub const fn from_rupees(rupees: i64) -> Self {
        Self(rupees * 100)
    }

    /// Raw paise value
    pub const fn as_paise(self) -> i64 {
        self.0
    }

    /// True if strictly greater than zero
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// True if less than zero
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition
    pub fn checked_add(self, other: Paise) -> Option<Paise> {
        self.0.checked_add(other.0).map(Paise)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Paise) -> Option<Paise> {
        self.0.checked_sub(other.0).map(Paise)
    }

    /// Saturating addition (aggregate display sums)
    pub fn saturating_add(self, other: Paise) -> Paise {
        Paise(self.0.saturating_add(other.0))
    }

    /// Percentage of this amount, floored to whole paise
    pub fn percent(self, pct: u32) -> Paise {
        let scaled = (self.0 as i128 * pct as i128) / 100;
        Paise(scaled as i64)
    }
}

impl fmt::Display for Paise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}₹{}.{:02}", sign, abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rupees() {
        assert_eq!(Paise::from_rupees(500).as_paise(), 50_000);
        assert_eq!(Paise::from_rupees(0), Paise::ZERO);
    }

    #[test]
    fn test_percent_floors() {
        // 80% of 1000.00 is exactly 800.00
        assert_eq!(Paise::from_rupees(1000).percent(80), Paise::from_rupees(800));
        // 33% of 0.01 floors to zero
        assert_eq!(Paise::new(1).percent(33), Paise::ZERO);
        // 100% is identity
        assert_eq!(Paise::new(12_345).percent(100), Paise::new(12_345));
    }

    #[test]
    fn test_checked_arithmetic() {
        assert_eq!(
            Paise::new(100).checked_add(Paise::new(50)),
            Some(Paise::new(150))
        );
        assert_eq!(
            Paise::new(100).checked_sub(Paise::new(150)),
            Some(Paise::new(-50))
        );
        assert_eq!(Paise::new(i64::MAX).checked_add(Paise::new(1)), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Paise::from_rupees(800).to_string(), "₹800.00");
        assert_eq!(Paise::new(123_456).to_string(), "₹1234.56");
        assert_eq!(Paise::new(5).to_string(), "₹0.05");
        assert_eq!(Paise::new(-250).to_string(), "-₹2.50");
    }
}
