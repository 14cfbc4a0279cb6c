use serde::Serialize;

use retailpos_core::{LocationId, ProductId};

use crate::level::StockLevel;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    OutOfStock,
    LowStock,
    Overstock,
}

/// Derived (never stored) alert for one stock level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockAlert {
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub kind: AlertKind,
    pub quantity: i64,
    pub min_quantity: i64,
    pub max_quantity: Option<i64>,
}

/// Classify a level against its thresholds.
///
/// - `out_of_stock`: quantity is zero
/// - `low_stock`: 0 < quantity <= min (only when min > 0)
/// - `overstock`: quantity > max
pub fn alert_for(level: &StockLevel) -> Option<AlertKind> {
    if level.quantity <= 0 {
        return Some(AlertKind::OutOfStock);
    }
    if level.min_quantity > 0 && level.quantity <= level.min_quantity {
        return Some(AlertKind::LowStock);
    }
    match level.max_quantity {
        Some(max) if level.quantity > max => Some(AlertKind::Overstock),
        _ => None,
    }
}

impl StockAlert {
    pub fn from_level(level: &StockLevel) -> Option<Self> {
        alert_for(level).map(|kind| Self {
            product_id: level.product_id(),
            location_id: level.location_id(),
            kind,
            quantity: level.quantity,
            min_quantity: level.min_quantity,
            max_quantity: level.max_quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{StockLevelKey, Thresholds};
    use chrono::Utc;

    fn level(quantity: i64, min: i64, max: Option<i64>) -> StockLevel {
        let mut l = StockLevel::empty(
            StockLevelKey::new(ProductId::new(), LocationId::new()),
            Thresholds::new(min, max).unwrap(),
            Utc::now(),
        );
        l.quantity = quantity;
        l
    }

    #[test]
    fn classification() {
        assert_eq!(alert_for(&level(0, 5, None)), Some(AlertKind::OutOfStock));
        assert_eq!(alert_for(&level(0, 0, None)), Some(AlertKind::OutOfStock));
        assert_eq!(alert_for(&level(5, 5, None)), Some(AlertKind::LowStock));
        assert_eq!(alert_for(&level(6, 5, None)), None);
        assert_eq!(alert_for(&level(11, 5, Some(10))), Some(AlertKind::Overstock));
        assert_eq!(alert_for(&level(10, 5, Some(10))), None);
        assert_eq!(alert_for(&level(3, 0, None)), None);
    }

    #[test]
    fn alert_carries_level_data() {
        let l = level(1, 3, Some(9));
        let alert = StockAlert::from_level(&l).unwrap();
        assert_eq!(alert.kind, AlertKind::LowStock);
        assert_eq!(alert.product_id, l.product_id());
        assert_eq!(alert.max_quantity, Some(9));
    }
}
