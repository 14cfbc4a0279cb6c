//! Monetary amounts in centavos.

use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Amount of money in the smallest currency unit (BRL centavos).
///
/// Serialized as a plain JSON integer.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest magnitude accepted from input (one trillion reais).
    pub const MAX: Money = Money(100_000_000_000_000);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_within_limit(self) -> bool {
        self.0.unsigned_abs() <= Self::MAX.0 as u64
    }

    /// Reject amounts beyond [`Money::MAX`].
    pub fn bounded(self) -> DomainResult<Money> {
        if !self.is_within_limit() {
            return Err(out_of_range());
        }
        Ok(self)
    }

    pub fn checked_add(self, rhs: Money) -> DomainResult<Money> {
        self.0.checked_add(rhs.0).map(Money).ok_or_else(out_of_range)?.bounded()
    }

    pub fn checked_mul(self, rhs: i64) -> DomainResult<Money> {
        self.0.checked_mul(rhs).map(Money).ok_or_else(out_of_range)?.bounded()
    }

    /// Sum that fails instead of overflowing or leaving [`Money::MAX`].
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> DomainResult<Money> {
        amounts.into_iter().try_fold(Money::ZERO, Money::checked_add)
    }

    /// `basis_points / 10_000` of this amount, rounded half away from zero.
    pub fn percent_bps(self, basis_points: u32) -> Money {
        let raw = self.0 as i128 * basis_points as i128;
        let rounded = if raw >= 0 { (raw + 5_000) / 10_000 } else { (raw - 5_000) / 10_000 };
        Money(rounded as i64)
    }

    /// Ratio `self / total` in basis points (0 when `total` is zero).
    pub fn ratio_bps(self, total: Money) -> i64 {
        if total.0 == 0 {
            return 0;
        }
        ((self.0 as i128 * 10_000) / total.0 as i128) as i64
    }

    /// Split into `parts` amounts that sum back to `self`; the remainder goes to the first part.
    pub fn split(self, parts: u32) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }
        let base = self.0 / parts as i64;
        let remainder = self.0 - base * parts as i64;
        (0..parts)
            .map(|i| if i == 0 { Money(base + remainder) } else { Money(base) })
            .collect()
    }

    /// Decimal rendering with a dot separator, e.g. `"1234.50"`.
    pub fn to_decimal_string(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

fn out_of_range() -> DomainError {
    DomainError::validation(format!("amount exceeds the limit of {}", Money::MAX))
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "R$ {}", self.to_decimal_string())
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, rhs: i64) -> Money {
        Money(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decimal_rendering() {
        assert_eq!(Money::from_cents(123_450).to_decimal_string(), "1234.50");
        assert_eq!(Money::from_cents(5).to_decimal_string(), "0.05");
        assert_eq!(Money::from_cents(-1_999).to_decimal_string(), "-19.99");
        assert_eq!(Money::from_cents(1_000).to_string(), "R$ 10.00");
    }

    #[test]
    fn percent_rounds_half_away_from_zero() {
        // 5% of 10.10 = 0.505 -> 0.51
        assert_eq!(Money::from_cents(1_010).percent_bps(500), Money::from_cents(51));
        assert_eq!(Money::from_cents(-1_010).percent_bps(500), Money::from_cents(-51));
        assert_eq!(Money::from_cents(10_000).percent_bps(10_000), Money::from_cents(10_000));
    }

    #[test]
    fn ratio_of_zero_total_is_zero() {
        assert_eq!(Money::from_cents(100).ratio_bps(Money::ZERO), 0);
        assert_eq!(Money::from_cents(25).ratio_bps(Money::from_cents(100)), 2_500);
    }

    #[test]
    fn split_puts_remainder_first() {
        let parts = Money::from_cents(1_000).split(3);
        assert_eq!(parts, vec![Money::from_cents(334), Money::from_cents(333), Money::from_cents(333)]);
        assert!(Money::from_cents(10).split(0).is_empty());
    }

    #[test]
    fn serializes_as_integer() {
        let json = serde_json::to_string(&Money::from_cents(4_990)).unwrap();
        assert_eq!(json, "4990");
    }

    #[test]
    fn checked_ops_reject_amounts_past_the_limit() {
        let price = Money::from_cents(100);
        assert_eq!(price.checked_mul(3), Ok(Money::from_cents(300)));
        assert!(matches!(price.checked_mul(i64::MAX / 10), Err(DomainError::Validation(_))));
        assert!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)).is_err());
        assert!(Money::MAX.checked_add(Money::from_cents(1)).is_err());
        assert_eq!(Money::MAX.bounded(), Ok(Money::MAX));
        assert!((-Money::MAX - Money::from_cents(1)).bounded().is_err());
        assert_eq!(
            Money::checked_sum([Money::from_cents(10), Money::from_cents(5)]),
            Ok(Money::from_cents(15))
        );
        assert!(Money::checked_sum([Money::MAX, Money::MAX]).is_err());
    }

    proptest! {
        #[test]
        fn split_preserves_total(cents in 0i64..10_000_000, parts in 1u32..=12) {
            let split = Money::from_cents(cents).split(parts);
            prop_assert_eq!(split.len(), parts as usize);
            prop_assert_eq!(split.iter().sum::<Money>(), Money::from_cents(cents));
        }
    }
}
