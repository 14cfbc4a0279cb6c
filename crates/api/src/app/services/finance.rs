use chrono::{NaiveDate, Utc};
use tracing::info;

use retailpos_core::{DateRange, DomainError, Page, PageRequest, PayableId, ReceivableId, UserId, paginate};
use retailpos_finance::{
    AccountPayable, AccountReceivable, CashMovementKind, CashReference, Dre, DreInput, FinancialSummary,
    NewCashMovement, NewPayable, NewReceivable, PayablePatch, ReceivablePatch, Settlement, Title, TitleFilter,
    build_dre, financial_summary,
};

use super::{AppServices, load};
use crate::app::dto::SettleRequest;
use crate::app::errors::ServiceError;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Responses show `overdue` instead of the stored `pending` once the due date has passed.
fn payable_view(mut payable: AccountPayable, today: NaiveDate) -> AccountPayable {
    payable.status = payable.effective_status(today);
    payable
}

fn receivable_view(mut receivable: AccountReceivable, today: NaiveDate) -> AccountReceivable {
    receivable.status = receivable.effective_status(today);
    receivable
}

fn settlement(request: &SettleRequest) -> Settlement {
    Settlement {
        date: request.date,
        amount: request.amount,
    }
}

impl AppServices {
    // ---- payables ----

    pub async fn list_payables(&self, filter: &TitleFilter, page: PageRequest) -> Result<Page<AccountPayable>, ServiceError> {
        let today = today();
        let mut payables: Vec<AccountPayable> = self
            .stores
            .payables
            .list()
            .await?
            .into_iter()
            .filter(|p| filter.matches(p, today))
            .collect();
        payables.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
        Ok(paginate(payables, page).map(|p| payable_view(p, today)))
    }

    pub async fn get_payable(&self, id: PayableId) -> Result<AccountPayable, ServiceError> {
        let payable = load(&*self.stores.payables, &id.to_string(), "account payable").await?;
        Ok(payable_view(payable, today()))
    }

    pub async fn create_payable(&self, input: NewPayable) -> Result<AccountPayable, ServiceError> {
        let payable = AccountPayable::create(PayableId::new(), input, Utc::now())?;
        self.stores.payables.insert(payable.clone()).await?;
        info!(payable_id = %payable.id, amount = %payable.amount, "account payable created");
        Ok(payable_view(payable, today()))
    }

    pub async fn update_payable(&self, id: PayableId, patch: PayablePatch) -> Result<AccountPayable, ServiceError> {
        let _gate = self.write_lock().await;
        let mut payable = load(&*self.stores.payables, &id.to_string(), "account payable").await?;
        payable.apply_patch(patch, Utc::now())?;
        self.stores.payables.update(payable.clone()).await?;
        Ok(payable_view(payable, today()))
    }

    pub async fn delete_payable(&self, id: PayableId) -> Result<(), ServiceError> {
        let _gate = self.write_lock().await;
        let payable = load(&*self.stores.payables, &id.to_string(), "account payable").await?;
        if !payable.can_delete() {
            return Err(DomainError::conflict("a paid account cannot be deleted").into());
        }
        self.stores.payables.delete(&id.to_string()).await?;
        Ok(())
    }

    /// Settle a payable; with `cash_box_id` the payment also leaves that cash box.
    pub async fn pay_payable(&self, id: PayableId, request: SettleRequest, user_id: UserId) -> Result<AccountPayable, ServiceError> {
        let _gate = self.write_lock().await;
        let mut payable = load(&*self.stores.payables, &id.to_string(), "account payable").await?;
        let cash_box = match request.cash_box_id {
            Some(box_id) => Some(load(&*self.stores.cash_boxes, &box_id.to_string(), "cash box").await?),
            None => None,
        };

        let today = today();
        let paid = payable.pay(settlement(&request), today, Utc::now())?;
        if let Some(cash_box) = &cash_box {
            self.record_on(
                cash_box,
                NewCashMovement {
                    kind: CashMovementKind::Out,
                    amount: paid,
                    description: format!("Pagamento: {}", payable.description),
                    category: Some(payable.category.clone()),
                },
                Some(CashReference::Payable(payable.id)),
                user_id,
            )
            .await?;
        }
        self.stores.payables.update(payable.clone()).await?;
        info!(payable_id = %id, amount = %paid, "account payable paid");
        Ok(payable_view(payable, today))
    }

    pub async fn cancel_payable(&self, id: PayableId) -> Result<AccountPayable, ServiceError> {
        let _gate = self.write_lock().await;
        let mut payable = load(&*self.stores.payables, &id.to_string(), "account payable").await?;
        payable.cancel(Utc::now())?;
        self.stores.payables.update(payable.clone()).await?;
        Ok(payable_view(payable, today()))
    }

    // ---- receivables ----

    pub async fn list_receivables(
        &self,
        filter: &TitleFilter,
        page: PageRequest,
    ) -> Result<Page<AccountReceivable>, ServiceError> {
        let today = today();
        let mut receivables: Vec<AccountReceivable> = self
            .stores
            .receivables
            .list()
            .await?
            .into_iter()
            .filter(|r| filter.matches(r, today))
            .collect();
        receivables.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
        Ok(paginate(receivables, page).map(|r| receivable_view(r, today)))
    }

    pub async fn get_receivable(&self, id: ReceivableId) -> Result<AccountReceivable, ServiceError> {
        let receivable = load(&*self.stores.receivables, &id.to_string(), "account receivable").await?;
        Ok(receivable_view(receivable, today()))
    }

    pub async fn create_receivable(&self, input: NewReceivable) -> Result<AccountReceivable, ServiceError> {
        let receivable = AccountReceivable::create(ReceivableId::new(), input, Utc::now())?;
        self.stores.receivables.insert(receivable.clone()).await?;
        info!(receivable_id = %receivable.id, amount = %receivable.amount, "account receivable created");
        Ok(receivable_view(receivable, today()))
    }

    pub async fn update_receivable(
        &self,
        id: ReceivableId,
        patch: ReceivablePatch,
    ) -> Result<AccountReceivable, ServiceError> {
        let _gate = self.write_lock().await;
        let mut receivable = load(&*self.stores.receivables, &id.to_string(), "account receivable").await?;
        receivable.apply_patch(patch, Utc::now())?;
        self.stores.receivables.update(receivable.clone()).await?;
        Ok(receivable_view(receivable, today()))
    }

    pub async fn delete_receivable(&self, id: ReceivableId) -> Result<(), ServiceError> {
        let _gate = self.write_lock().await;
        let receivable = load(&*self.stores.receivables, &id.to_string(), "account receivable").await?;
        if !receivable.can_delete() {
            return Err(DomainError::conflict("a received account cannot be deleted").into());
        }
        self.stores.receivables.delete(&id.to_string()).await?;
        Ok(())
    }

    /// Settle a receivable; with `cash_box_id` the money also enters that cash box.
    pub async fn receive_receivable(
        &self,
        id: ReceivableId,
        request: SettleRequest,
        user_id: UserId,
    ) -> Result<AccountReceivable, ServiceError> {
        let _gate = self.write_lock().await;
        let mut receivable = load(&*self.stores.receivables, &id.to_string(), "account receivable").await?;
        let cash_box = match request.cash_box_id {
            Some(box_id) => Some(load(&*self.stores.cash_boxes, &box_id.to_string(), "cash box").await?),
            None => None,
        };

        let today = today();
        let received = receivable.receive(settlement(&request), today, Utc::now())?;
        if let Some(cash_box) = &cash_box {
            self.record_on(
                cash_box,
                NewCashMovement {
                    kind: CashMovementKind::In,
                    amount: received,
                    description: format!("Recebimento: {}", receivable.description),
                    category: Some(receivable.category.clone()),
                },
                Some(CashReference::Receivable(receivable.id)),
                user_id,
            )
            .await?;
        }
        self.stores.receivables.update(receivable.clone()).await?;
        info!(receivable_id = %id, amount = %received, "account receivable received");
        Ok(receivable_view(receivable, today))
    }

    pub async fn cancel_receivable(&self, id: ReceivableId) -> Result<AccountReceivable, ServiceError> {
        let _gate = self.write_lock().await;
        let mut receivable = load(&*self.stores.receivables, &id.to_string(), "account receivable").await?;
        receivable.cancel(Utc::now())?;
        self.stores.receivables.update(receivable.clone()).await?;
        Ok(receivable_view(receivable, today()))
    }

    // ---- reports ----

    pub async fn dre(&self, range: DateRange) -> Result<Dre, ServiceError> {
        let (from, to) = super::sales::month_to_date(range, today());
        let sales = self.stores.sales.list().await?;
        let payables = self.stores.payables.list().await?;
        let receivables = self.stores.receivables.list().await?;
        let cash_movements = self.stores.cash_movements.list().await?;
        Ok(build_dre(DreInput {
            range: DateRange::new(Some(from), Some(to))?,
            sales: &sales,
            payables: &payables,
            receivables: &receivables,
            cash_movements: &cash_movements,
        }))
    }

    pub async fn financial_summary(&self) -> Result<FinancialSummary, ServiceError> {
        self.financial_summary_on(today()).await
    }

    pub(super) async fn financial_summary_on(&self, today: NaiveDate) -> Result<FinancialSummary, ServiceError> {
        let payables = self.stores.payables.list().await?;
        let receivables = self.stores.receivables.list().await?;
        let open_box = self.open_cash_box_with_balance().await?;
        Ok(financial_summary(
            &payables,
            &receivables,
            open_box.as_ref().map(|(cash_box, balance)| (cash_box, *balance)),
            today,
        ))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Days, Utc};
    use retailpos_core::{DateRange, DomainError, Money, UserId};
    use retailpos_finance::{NewPayable, TitleFilter, TitleStatus};

    use crate::app::dto::{OpenCashBoxRequest, SettleRequest};
    use crate::app::errors::ServiceError;
    use crate::app::services::test_support::services;

    fn payable(cents: i64, days_from_today: i64) -> NewPayable {
        let today = Utc::now().date_naive();
        let due = if days_from_today >= 0 {
            today + Days::new(days_from_today as u64)
        } else {
            today - Days::new(days_from_today.unsigned_abs())
        };
        NewPayable {
            supplier: "Distribuidora".to_string(),
            description: "Reposição".to_string(),
            category: Some("mercadorias".to_string()),
            document_number: Some("NF-100".to_string()),
            amount: Money::from_cents(cents),
            due_date: due,
            notes: None,
        }
    }

    #[tokio::test]
    async fn overdue_is_derived_and_filterable() {
        let services = services();
        services.create_payable(payable(1_000, -3)).await.unwrap();
        services.create_payable(payable(2_000, 10)).await.unwrap();

        let overdue = TitleFilter {
            status: Some(TitleStatus::Overdue),
            ..TitleFilter::default()
        };
        let page = services.list_payables(&overdue, Default::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].status, TitleStatus::Overdue);

        let summary = services.financial_summary().await.unwrap();
        assert_eq!(summary.payables.overdue, Money::from_cents(1_000));
        assert_eq!(summary.payables.pending, Money::from_cents(2_000));
    }

    #[tokio::test]
    async fn paying_through_cash_box_counts_once_in_dre() {
        let services = services();
        let user = UserId::new();
        let cash = services
            .open_cash_box(
                OpenCashBoxRequest {
                    name: "Caixa".to_string(),
                    opening_balance: Money::from_cents(10_000),
                },
                user,
            )
            .await
            .unwrap();
        let bill = services.create_payable(payable(3_000, 0)).await.unwrap();
        let paid = services
            .pay_payable(
                bill.id,
                SettleRequest {
                    cash_box_id: Some(cash.cash_box.id),
                    ..SettleRequest::default()
                },
                user,
            )
            .await
            .unwrap();
        assert_eq!(paid.status, TitleStatus::Paid);
        assert_eq!(services.get_cash_box(cash.cash_box.id).await.unwrap().balance, Money::from_cents(7_000));

        let dre = services.dre(DateRange::unbounded()).await.unwrap();
        assert_eq!(dre.total_expenses, Money::from_cents(3_000));

        let err = services.delete_payable(bill.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
        assert!(services.cancel_payable(bill.id).await.is_err());
    }

    #[tokio::test]
    async fn concurrent_pay_and_cancel_settle_on_one_outcome() {
        let services = services();
        let user = UserId::new();
        let cash = services
            .open_cash_box(
                OpenCashBoxRequest {
                    name: "Caixa".to_string(),
                    opening_balance: Money::from_cents(10_000),
                },
                user,
            )
            .await
            .unwrap();
        let bill = services.create_payable(payable(4_000, 5)).await.unwrap();
        let request = SettleRequest {
            cash_box_id: Some(cash.cash_box.id),
            ..SettleRequest::default()
        };

        let (paid, cancelled) = tokio::join!(
            services.pay_payable(bill.id, request, user),
            services.cancel_payable(bill.id),
        );
        assert!(paid.is_ok() != cancelled.is_ok());

        let stored = services.get_payable(bill.id).await.unwrap();
        let balance = services.get_cash_box(cash.cash_box.id).await.unwrap().balance;
        if paid.is_ok() {
            assert_eq!(stored.status, TitleStatus::Paid);
            assert_eq!(balance, Money::from_cents(6_000));
        } else {
            assert_eq!(stored.status, TitleStatus::Cancelled);
            assert_eq!(balance, Money::from_cents(10_000));
        }
    }
}
