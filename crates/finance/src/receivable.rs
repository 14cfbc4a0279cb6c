use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use retailpos_core::{DomainError, DomainResult, Entity, Money, ReceivableId, SaleId};
use retailpos_sales::{PaymentMethod, Sale};

use crate::title::{
    Settlement, Title, TitleStatus, category_or_default, optional, positive_amount, required,
};

/// Category used for receivables generated by store-credit sales.
pub const SALES_CATEGORY: &str = "vendas";
const WALK_IN_CUSTOMER: &str = "Consumidor";

/// Position of a receivable within an installment plan, e.g. 2 of 3.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    pub number: u32,
    pub of: u32,
}

/// Money a customer owes the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountReceivable {
    pub id: ReceivableId,
    pub customer: String,
    pub description: String,
    pub category: String,
    pub document_number: Option<String>,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub status: TitleStatus,
    pub received_at: Option<NaiveDate>,
    pub received_amount: Option<Money>,
    /// Set when generated by a store-credit sale.
    pub sale_id: Option<SaleId>,
    pub installment: Option<Installment>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReceivable {
    pub customer: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub document_number: Option<String>,
    pub amount: Money,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReceivablePatch {
    pub customer: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub document_number: Option<String>,
    pub amount: Option<Money>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl AccountReceivable {
    pub fn create(id: ReceivableId, input: NewReceivable, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id,
            customer: required("customer", &input.customer)?,
            description: required("description", &input.description)?,
            category: category_or_default(input.category),
            document_number: optional(input.document_number),
            amount: positive_amount(input.amount)?,
            due_date: input.due_date,
            status: TitleStatus::Pending,
            received_at: None,
            received_amount: None,
            sale_id: None,
            installment: None,
            notes: optional(input.notes),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: ReceivablePatch, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending("edit")?;
        let mut next = self.clone();
        if let Some(customer) = patch.customer {
            next.customer = required("customer", &customer)?;
        }
        if let Some(description) = patch.description {
            next.description = required("description", &description)?;
        }
        if patch.category.is_some() {
            next.category = category_or_default(patch.category);
        }
        if patch.document_number.is_some() {
            next.document_number = optional(patch.document_number);
        }
        if let Some(amount) = patch.amount {
            next.amount = positive_amount(amount)?;
        }
        if let Some(due) = patch.due_date {
            next.due_date = due;
        }
        if patch.notes.is_some() {
            next.notes = optional(patch.notes);
        }
        next.updated_at = now;
        *self = next;
        Ok(())
    }

    /// Mark as received and return the amount that came in.
    pub fn receive(&mut self, settlement: Settlement, today: NaiveDate, now: DateTime<Utc>) -> DomainResult<Money> {
        self.ensure_pending("receive")?;
        let (date, amount) = settlement.resolve(self.amount, today)?;
        self.status = TitleStatus::Paid;
        self.received_at = Some(date);
        self.received_amount = Some(amount);
        self.updated_at = now;
        Ok(amount)
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending("cancel")?;
        self.status = TitleStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    pub fn can_delete(&self) -> bool {
        self.status != TitleStatus::Paid
    }

    pub fn is_from_sale(&self) -> bool {
        self.sale_id.is_some()
    }

    fn ensure_pending(&self, action: &str) -> DomainResult<()> {
        if self.status != TitleStatus::Pending {
            return Err(DomainError::conflict(format!(
                "cannot {action} a {} receivable",
                self.status.as_str()
            )));
        }
        Ok(())
    }
}

/// Monthly installments for a store-credit sale.
///
/// The first installment falls due one month after the sale and carries the
/// rounding remainder. Other payment methods produce nothing.
pub fn receivables_for_sale(
    sale: &Sale,
    mut next_id: impl FnMut() -> ReceivableId,
    now: DateTime<Utc>,
) -> DomainResult<Vec<AccountReceivable>> {
    if sale.payment_method != PaymentMethod::StoreCredit {
        return Ok(Vec::new());
    }

    let customer = sale
        .customer_name
        .clone()
        .unwrap_or_else(|| WALK_IN_CUSTOMER.to_string());
    let sale_date = sale.date();
    let of = sale.installments;

    sale.total
        .split(of)
        .into_iter()
        .zip(1..=of)
        .map(|(amount, number)| {
            let due_date = sale_date
                .checked_add_months(Months::new(number))
                .ok_or_else(|| DomainError::validation("installment due date out of range"))?;
            Ok(AccountReceivable {
                id: next_id(),
                customer: customer.clone(),
                description: format!("Venda {} - parcela {number}/{of}", sale.reference()),
                category: SALES_CATEGORY.to_string(),
                document_number: Some(sale.reference()),
                amount,
                due_date,
                status: TitleStatus::Pending,
                received_at: None,
                received_amount: None,
                sale_id: Some(sale.id),
                installment: Some(Installment { number, of }),
                notes: None,
                created_at: now,
                updated_at: now,
            })
        })
        .collect()
}

impl Title for AccountReceivable {
    fn stored_status(&self) -> TitleStatus {
        self.status
    }

    fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    fn amount(&self) -> Money {
        self.amount
    }

    fn counterparty(&self) -> &str {
        &self.customer
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn document_number(&self) -> Option<&str> {
        self.document_number.as_deref()
    }
}

impl Entity for AccountReceivable {
    type Id = ReceivableId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use retailpos_core::{LocationId, ProductId};
    use retailpos_products::{NewProduct, Product};
    use retailpos_sales::{CheckoutDetails, Payment, SaleItem};

    fn store_credit_sale(total_cents: i64, installments: u32) -> Sale {
        let product = Product::create(
            ProductId::new(),
            NewProduct {
                sku: "JAQ-01".into(),
                name: "Jaqueta".into(),
                barcode: None,
                description: None,
                category: None,
                brand: None,
                unit: None,
                cost_price: Money::from_cents(1),
                sale_price: Money::from_cents(total_cents),
                min_stock: 0,
                max_stock: None,
            },
            Utc::now(),
        )
        .unwrap();
        let items = vec![SaleItem::from_product(&product, 1, None, Money::ZERO).unwrap()];
        let details = CheckoutDetails {
            number: 7,
            seller_id: None,
            location_id: LocationId::new(),
            customer_name: Some("João".into()),
            discount: Money::ZERO,
            payment: Payment {
                method: PaymentMethod::StoreCredit,
                amount_paid: None,
                installments: Some(installments),
                pix_txid: None,
            },
            user_id: None,
        };
        let at = Utc.with_ymd_and_hms(2024, 1, 31, 15, 0, 0).unwrap();
        Sale::checkout(retailpos_core::SaleId::new(), items, details, at).unwrap()
    }

    #[test]
    fn store_credit_sale_generates_monthly_installments() {
        let sale = store_credit_sale(10_000, 3);
        let titles = receivables_for_sale(&sale, ReceivableId::new, Utc::now()).unwrap();
        assert_eq!(titles.len(), 3);
        assert_eq!(titles[0].amount, Money::from_cents(3_334));
        assert_eq!(titles[1].amount, Money::from_cents(3_333));
        // Jan 31 + 1 month clamps to the end of February.
        assert_eq!(titles[0].due_date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(titles[2].due_date, NaiveDate::from_ymd_opt(2024, 4, 30).unwrap());
        assert_eq!(titles[2].installment, Some(Installment { number: 3, of: 3 }));
        assert_eq!(titles[0].customer, "João");
        assert!(titles.iter().all(|t| t.sale_id == Some(sale.id)));
        assert_eq!(titles.iter().map(|t| t.amount).sum::<Money>(), sale.total);
    }

    #[test]
    fn other_methods_generate_nothing() {
        let mut sale = store_credit_sale(10_000, 1);
        sale.payment_method = PaymentMethod::DebitCard;
        assert!(receivables_for_sale(&sale, ReceivableId::new, Utc::now()).unwrap().is_empty());
    }

    #[test]
    fn receive_and_cancel_rules() {
        let mut r = AccountReceivable::create(
            ReceivableId::new(),
            NewReceivable {
                customer: "Maria".into(),
                description: "Serviço de ajuste".into(),
                category: Some("servicos".into()),
                document_number: None,
                amount: Money::from_cents(8_000),
                due_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                notes: None,
            },
            Utc::now(),
        )
        .unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        assert_eq!(r.effective_status(today), TitleStatus::Overdue);
        let got = r
            .receive(Settlement { date: None, amount: Some(Money::from_cents(7_500)) }, today, Utc::now())
            .unwrap();
        assert_eq!(got, Money::from_cents(7_500));
        assert_eq!(r.received_at, Some(today));
        assert!(matches!(r.cancel(Utc::now()), Err(DomainError::Conflict(_))));
        assert!(!r.can_delete());
        assert!(!r.is_from_sale());
    }
}
