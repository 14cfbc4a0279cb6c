use chrono::Utc;
use tracing::info;

use retailpos_core::{CashBoxId, CashMovementId, DomainError, Money, Page, PageRequest, UserId, paginate};
use retailpos_finance::{CashBox, CashMovement, CashReference, NewCashMovement};

use super::{AppServices, load};
use crate::app::dto::{CashBoxView, CloseCashBoxRequest, OpenCashBoxRequest};
use crate::app::errors::ServiceError;

impl AppServices {
    pub async fn list_cash_boxes(&self, page: PageRequest) -> Result<Page<CashBoxView>, ServiceError> {
        let mut boxes = self.stores.cash_boxes.list().await?;
        boxes.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));
        let movements = self.stores.cash_movements.list().await?;
        Ok(paginate(boxes, page).map(|cash_box| CashBoxView {
            balance: cash_box.balance(&movements),
            cash_box,
        }))
    }

    /// Only one box may be open at a time.
    pub async fn open_cash_box(&self, input: OpenCashBoxRequest, user_id: UserId) -> Result<CashBoxView, ServiceError> {
        let _gate = self.write_lock().await;
        if let Some(open) = self.stores.cash_boxes.list().await?.into_iter().find(CashBox::is_open) {
            return Err(DomainError::conflict(format!("cash box '{}' is already open", open.name)).into());
        }
        let cash_box = CashBox::open(CashBoxId::new(), &input.name, input.opening_balance, Some(user_id), Utc::now())?;
        self.stores.cash_boxes.insert(cash_box.clone()).await?;
        info!(cash_box_id = %cash_box.id, opening = %cash_box.opening_balance, "cash box opened");
        Ok(CashBoxView {
            balance: cash_box.opening_balance,
            cash_box,
        })
    }

    pub async fn get_cash_box(&self, id: CashBoxId) -> Result<CashBoxView, ServiceError> {
        let cash_box = load(&*self.stores.cash_boxes, &id.to_string(), "cash box").await?;
        let balance = self.balance_of(&cash_box).await?;
        Ok(CashBoxView { cash_box, balance })
    }

    pub async fn close_cash_box(
        &self,
        id: CashBoxId,
        input: CloseCashBoxRequest,
        user_id: UserId,
    ) -> Result<CashBoxView, ServiceError> {
        let _gate = self.write_lock().await;
        let mut cash_box = load(&*self.stores.cash_boxes, &id.to_string(), "cash box").await?;
        let balance = self.balance_of(&cash_box).await?;
        cash_box.close(balance, input.counted_balance, Some(user_id), Utc::now())?;
        self.stores.cash_boxes.update(cash_box.clone()).await?;
        info!(
            cash_box_id = %id,
            balance = %balance,
            difference = ?cash_box.difference.map(|d| d.cents()),
            "cash box closed"
        );
        Ok(CashBoxView { cash_box, balance })
    }

    pub async fn cash_movements(&self, id: CashBoxId) -> Result<Vec<CashMovement>, ServiceError> {
        load(&*self.stores.cash_boxes, &id.to_string(), "cash box").await?;
        let mut movements: Vec<CashMovement> = self
            .stores
            .cash_movements
            .list()
            .await?
            .into_iter()
            .filter(|m| m.cash_box_id == id)
            .collect();
        movements.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(movements)
    }

    /// Manual supply or withdrawal.
    pub async fn add_cash_movement(
        &self,
        id: CashBoxId,
        input: NewCashMovement,
        user_id: UserId,
    ) -> Result<CashMovement, ServiceError> {
        let _gate = self.write_lock().await;
        let cash_box = load(&*self.stores.cash_boxes, &id.to_string(), "cash box").await?;
        let movement = self.record_on(&cash_box, input, None, user_id).await?;
        info!(cash_box_id = %id, kind = ?movement.kind, amount = %movement.amount, "cash movement recorded");
        Ok(movement)
    }

    /// Validate against the live balance and persist. Callers hold the write gate.
    pub(super) async fn record_on(
        &self,
        cash_box: &CashBox,
        input: NewCashMovement,
        reference: Option<CashReference>,
        user_id: UserId,
    ) -> Result<CashMovement, ServiceError> {
        let balance = self.balance_of(cash_box).await?;
        let movement = cash_box.record(CashMovementId::new(), input, reference, balance, Some(user_id), Utc::now())?;
        self.stores.cash_movements.insert(movement.clone()).await?;
        Ok(movement)
    }

    pub(super) async fn open_cash_box_with_balance(&self) -> Result<Option<(CashBox, Money)>, ServiceError> {
        let Some(cash_box) = self.stores.cash_boxes.list().await?.into_iter().find(CashBox::is_open) else {
            return Ok(None);
        };
        let balance = self.balance_of(&cash_box).await?;
        Ok(Some((cash_box, balance)))
    }

    pub(super) async fn require_open_cash_box(&self) -> Result<(CashBox, Money), ServiceError> {
        self.open_cash_box_with_balance()
            .await?
            .ok_or_else(|| DomainError::conflict("no cash box is open").into())
    }

    async fn balance_of(&self, cash_box: &CashBox) -> Result<Money, ServiceError> {
        Ok(cash_box.balance(&self.stores.cash_movements.list().await?))
    }
}
