use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use retailpos_core::{DomainError, DomainResult, Entity, LocationId, MovementId, ProductId, UserId};

use crate::level::StockLevel;

/// Direction/meaning of a stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Goods received.
    In,
    /// Goods leaving (sale, loss, consumption).
    Out,
    /// Inventory count: the quantity is the counted total, not a delta.
    Adjustment,
    TransferIn,
    TransferOut,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::In => "in",
            MovementKind::Out => "out",
            MovementKind::Adjustment => "adjustment",
            MovementKind::TransferIn => "transfer_in",
            MovementKind::TransferOut => "transfer_out",
        }
    }
}

/// A requested quantity change before it is resolved against the current level.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MovementRequest {
    pub kind: MovementKind,
    pub quantity: i64,
}

impl MovementRequest {
    pub fn new(kind: MovementKind, quantity: i64) -> Self {
        Self { kind, quantity }
    }

    /// Signed delta this request applies to a level currently at `current`.
    pub fn resolve_delta(&self, current: i64) -> DomainResult<i64> {
        match self.kind {
            MovementKind::In | MovementKind::TransferIn => {
                self.ensure_positive()?;
                Ok(self.quantity)
            }
            MovementKind::Out | MovementKind::TransferOut => {
                self.ensure_positive()?;
                Ok(-self.quantity)
            }
            MovementKind::Adjustment => {
                if self.quantity < 0 {
                    return Err(DomainError::validation("counted quantity cannot be negative"));
                }
                let delta = self.quantity - current;
                if delta == 0 {
                    return Err(DomainError::validation("adjustment does not change the quantity"));
                }
                Ok(delta)
            }
        }
    }

    fn ensure_positive(&self) -> DomainResult<()> {
        if self.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(())
    }
}

/// Immutable record of one change to a stock level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub kind: MovementKind,
    /// Absolute quantity moved (always > 0).
    pub quantity: i64,
    pub delta: i64,
    pub balance_after: i64,
    pub reason: Option<String>,
    /// Free-form link to the cause, e.g. a sale number or transfer id.
    pub reference: Option<String>,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Extra context recorded with a movement.
#[derive(Debug, Clone, Default)]
pub struct MovementContext {
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub user_id: Option<UserId>,
}

impl StockMovement {
    /// Resolve `request` against `level`, apply it and return the movement record.
    ///
    /// On error the level is left untouched.
    pub fn apply(
        id: MovementId,
        level: &mut StockLevel,
        request: MovementRequest,
        context: MovementContext,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let delta = request.resolve_delta(level.quantity)?;
        let balance_after = level.apply_delta(delta, now)?;

        Ok(Self {
            id,
            product_id: level.product_id(),
            location_id: level.location_id(),
            kind: request.kind,
            quantity: delta.abs(),
            delta,
            balance_after,
            reason: context.reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            reference: context.reference,
            user_id: context.user_id,
            created_at: now,
        })
    }
}

impl Entity for StockMovement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
