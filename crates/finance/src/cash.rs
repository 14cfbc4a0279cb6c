//! Cash boxes (registers) and the movements that change their balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use retailpos_core::{
    CashBoxId, CashMovementId, DomainError, DomainResult, Entity, Money, PayableId, ReceivableId,
    SaleId, UserId,
};

use crate::title::{optional, positive_amount, required};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CashBoxStatus {
    Open,
    Closed,
}

/// A cash register session, from opening to closing.
///
/// The running balance is not stored; it is derived from the movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashBox {
    pub id: CashBoxId,
    pub name: String,
    pub status: CashBoxStatus,
    pub opening_balance: Money,
    pub opened_at: DateTime<Utc>,
    pub opened_by: Option<UserId>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<UserId>,
    pub closing_balance: Option<Money>,
    /// Amount physically counted at closing.
    pub counted_balance: Option<Money>,
    /// `counted_balance - closing_balance`.
    pub difference: Option<Money>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CashMovementKind {
    In,
    Out,
}

/// What generated a movement. Manual movements carry none.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum CashReference {
    Sale(SaleId),
    Payable(PayableId),
    Receivable(ReceivableId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashMovement {
    pub id: CashMovementId,
    pub cash_box_id: CashBoxId,
    pub kind: CashMovementKind,
    pub amount: Money,
    pub description: String,
    pub category: Option<String>,
    pub reference: Option<CashReference>,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Input for a movement (manual or generated).
#[derive(Debug, Clone, Deserialize)]
pub struct NewCashMovement {
    pub kind: CashMovementKind,
    pub amount: Money,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl CashMovement {
    /// Signed effect on the balance.
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            CashMovementKind::In => self.amount,
            CashMovementKind::Out => -self.amount,
        }
    }

    pub fn is_manual(&self) -> bool {
        self.reference.is_none()
    }

    pub fn is_for_sale(&self, sale_id: SaleId) -> bool {
        self.reference == Some(CashReference::Sale(sale_id))
    }
}

impl CashBox {
    pub fn open(
        id: CashBoxId,
        name: &str,
        opening_balance: Money,
        user_id: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if opening_balance.is_negative() {
            return Err(DomainError::validation("opening_balance cannot be negative"));
        }
        opening_balance.bounded()?;
        Ok(Self {
            id,
            name: required("name", name)?,
            status: CashBoxStatus::Open,
            opening_balance,
            opened_at: now,
            opened_by: user_id,
            closed_at: None,
            closed_by: None,
            closing_balance: None,
            counted_balance: None,
            difference: None,
        })
    }

    pub fn is_open(&self) -> bool {
        self.status == CashBoxStatus::Open
    }

    /// Opening balance plus the signed sum of this box's movements.
    ///
    /// Accumulates in `i128` so the result does not depend on movement order;
    /// [`CashBox::record`] keeps the true balance between zero and [`Money::MAX`].
    pub fn balance<'a>(&self, movements: impl IntoIterator<Item = &'a CashMovement>) -> Money {
        let net: i128 = movements
            .into_iter()
            .filter(|m| m.cash_box_id == self.id)
            .map(|m| i128::from(m.signed_amount().cents()))
            .sum();
        let total = i128::from(self.opening_balance.cents()) + net;
        Money::from_cents(total.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
    }

    /// Validate and build a movement against the current balance.
    pub fn record(
        &self,
        id: CashMovementId,
        input: NewCashMovement,
        reference: Option<CashReference>,
        current_balance: Money,
        user_id: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<CashMovement> {
        if !self.is_open() {
            return Err(DomainError::conflict(format!("cash box '{}' is closed", self.name)));
        }
        let amount = positive_amount(input.amount)?;
        match input.kind {
            CashMovementKind::Out if amount > current_balance => {
                return Err(DomainError::invariant(format!(
                    "cash box balance {current_balance} is not enough for an outflow of {amount}"
                )));
            }
            CashMovementKind::In => {
                current_balance.checked_add(amount)?;
            }
            CashMovementKind::Out => {}
        }
        Ok(CashMovement {
            id,
            cash_box_id: self.id,
            kind: input.kind,
            amount,
            description: required("description", &input.description)?,
            category: optional(input.category),
            reference,
            user_id,
            created_at: now,
        })
    }

    pub fn close(
        &mut self,
        balance: Money,
        counted: Option<Money>,
        user_id: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !self.is_open() {
            return Err(DomainError::conflict(format!("cash box '{}' is already closed", self.name)));
        }
        if counted.is_some_and(Money::is_negative) {
            return Err(DomainError::validation("counted_balance cannot be negative"));
        }
        self.status = CashBoxStatus::Closed;
        self.closed_at = Some(now);
        self.closed_by = user_id;
        self.closing_balance = Some(balance);
        self.counted_balance = counted;
        self.difference = counted.map(|c| c - balance);
        Ok(())
    }
}

impl Entity for CashBox {
    type Id = CashBoxId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Entity for CashMovement {
    type Id = CashMovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
