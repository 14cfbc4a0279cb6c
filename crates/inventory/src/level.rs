use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use retailpos_core::{DomainError, DomainResult, Entity, LocationId, ProductId};

/// Identity of a stock level: one product at one location.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockLevelKey {
    pub product_id: ProductId,
    pub location_id: LocationId,
}

impl StockLevelKey {
    pub fn new(product_id: ProductId, location_id: LocationId) -> Self {
        Self { product_id, location_id }
    }
}

impl core::fmt::Display for StockLevelKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.product_id, self.location_id)
    }
}

/// Min/max thresholds used for alert derivation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub min_quantity: i64,
    pub max_quantity: Option<i64>,
}

impl Thresholds {
    pub fn new(min_quantity: i64, max_quantity: Option<i64>) -> DomainResult<Self> {
        if min_quantity < 0 {
            return Err(DomainError::validation("min_quantity cannot be negative"));
        }
        if let Some(max) = max_quantity {
            if max < min_quantity {
                return Err(DomainError::validation("max_quantity must be >= min_quantity"));
            }
        }
        Ok(Self { min_quantity, max_quantity })
    }
}

/// Quantity on hand for one product at one location.
///
/// # Invariants
/// - `quantity >= 0` at all times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub key: StockLevelKey,
    pub quantity: i64,
    pub min_quantity: i64,
    pub max_quantity: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl StockLevel {
    /// Empty level; thresholds come from the product defaults.
    pub fn empty(key: StockLevelKey, thresholds: Thresholds, now: DateTime<Utc>) -> Self {
        Self {
            key,
            quantity: 0,
            min_quantity: thresholds.min_quantity,
            max_quantity: thresholds.max_quantity,
            updated_at: now,
        }
    }

    pub fn product_id(&self) -> ProductId {
        self.key.product_id
    }

    pub fn location_id(&self) -> LocationId {
        self.key.location_id
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            min_quantity: self.min_quantity,
            max_quantity: self.max_quantity,
        }
    }

    /// Add a signed delta; fails without changing anything if the result would be negative.
    pub fn apply_delta(&mut self, delta: i64, now: DateTime<Utc>) -> DomainResult<i64> {
        let next = self
            .quantity
            .checked_add(delta)
            .ok_or_else(|| DomainError::validation("quantity overflow"))?;
        if next < 0 {
            return Err(DomainError::invariant(format!(
                "insufficient stock: {} on hand, {} requested",
                self.quantity, -delta
            )));
        }
        self.quantity = next;
        self.updated_at = now;
        Ok(next)
    }

    pub fn set_thresholds(&mut self, thresholds: Thresholds, now: DateTime<Utc>) {
        self.min_quantity = thresholds.min_quantity;
        self.max_quantity = thresholds.max_quantity;
        self.updated_at = now;
    }
}

impl Entity for StockLevel {
    type Id = StockLevelKey;

    fn id(&self) -> &Self::Id {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn level() -> StockLevel {
        StockLevel::empty(
            StockLevelKey::new(ProductId::new(), LocationId::new()),
            Thresholds::new(2, Some(10)).unwrap(),
            Utc::now(),
        )
    }

    #[test]
    fn delta_cannot_drive_quantity_negative() {
        let mut l = level();
        assert_eq!(l.apply_delta(3, Utc::now()).unwrap(), 3);
        let err = l.apply_delta(-4, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(msg) if msg.contains("insufficient stock")));
        assert_eq!(l.quantity, 3);
        assert_eq!(l.apply_delta(-3, Utc::now()).unwrap(), 0);
    }

    #[test]
    fn thresholds_are_validated() {
        assert!(Thresholds::new(-1, None).is_err());
        assert!(Thresholds::new(5, Some(4)).is_err());
        assert!(Thresholds::new(5, Some(5)).is_ok());
    }

    #[test]
    fn key_display_joins_ids() {
        let key = StockLevelKey::new(ProductId::new(), LocationId::new());
        assert_eq!(key.to_string(), format!("{}:{}", key.product_id, key.location_id));
    }

    proptest! {
        #[test]
        fn quantity_never_negative(deltas in proptest::collection::vec(-50i64..50, 0..100)) {
            let mut l = level();
            for d in deltas {
                let before = l.quantity;
                match l.apply_delta(d, Utc::now()) {
                    Ok(q) => prop_assert_eq!(q, before + d),
                    Err(_) => prop_assert_eq!(l.quantity, before),
                }
                prop_assert!(l.quantity >= 0);
            }
        }
    }
}
