use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use retailpos_core::{
    CashBoxId, DomainError, DomainResult, Entity, LocationId, Money, ProductId, SaleId, SellerId,
    UserId,
};
use retailpos_products::Product;

use crate::pix::PixTxId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    Pix,
    /// In-store credit ("crediário"): the customer pays later in installments.
    StoreCredit,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Cash,
        PaymentMethod::CreditCard,
        PaymentMethod::DebitCard,
        PaymentMethod::Pix,
        PaymentMethod::StoreCredit,
    ];

    pub fn allows_installments(&self) -> bool {
        matches!(self, PaymentMethod::CreditCard | PaymentMethod::StoreCredit)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Completed,
    Cancelled,
}

/// One sold line, with catalog data captured at sale time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// Cost snapshot used for COGS.
    pub unit_cost: Money,
    pub discount: Money,
    pub total: Money,
}

impl SaleItem {
    /// Price a line from the catalog. `unit_price` overrides the catalog price.
    pub fn from_product(
        product: &Product,
        quantity: i64,
        unit_price: Option<Money>,
        discount: Money,
    ) -> DomainResult<Self> {
        if !product.can_be_sold() {
            return Err(DomainError::invariant(format!("product {} is inactive", product.sku)));
        }
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let unit_price = unit_price.unwrap_or(product.sale_price);
        if unit_price.is_negative() {
            return Err(DomainError::validation("unit_price cannot be negative"));
        }
        let gross = unit_price.checked_mul(quantity)?;
        product.cost_price.checked_mul(quantity)?;
        if discount.is_negative() || discount > gross {
            return Err(DomainError::validation(format!(
                "discount for {} must be between 0 and the line total",
                product.sku
            )));
        }

        Ok(Self {
            product_id: product.id,
            sku: product.sku.clone(),
            name: product.name.clone(),
            quantity,
            unit_price,
            unit_cost: product.cost_price,
            discount,
            total: gross - discount,
        })
    }

    pub fn gross(&self) -> Money {
        self.unit_price * self.quantity
    }

    pub fn cost(&self) -> Money {
        self.unit_cost * self.quantity
    }
}

/// How the customer pays.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Payment {
    pub method: PaymentMethod,
    /// Cash tendered; required for cash, ignored otherwise.
    #[serde(default)]
    pub amount_paid: Option<Money>,
    #[serde(default)]
    pub installments: Option<u32>,
    #[serde(default)]
    pub pix_txid: Option<PixTxId>,
}

/// Everything about a checkout except the priced lines.
#[derive(Debug, Clone)]
pub struct CheckoutDetails {
    pub number: u64,
    pub seller_id: Option<SellerId>,
    pub location_id: LocationId,
    pub customer_name: Option<String>,
    pub discount: Money,
    pub payment: Payment,
    pub user_id: Option<UserId>,
}

pub const MAX_INSTALLMENTS: u32 = 12;

/// A completed (or later cancelled) POS sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub number: u64,
    pub seller_id: Option<SellerId>,
    pub location_id: LocationId,
    pub customer_name: Option<String>,
    pub items: Vec<SaleItem>,
    /// Sum of line totals (after line discounts).
    pub subtotal: Money,
    /// Sale-level discount.
    pub discount: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub amount_paid: Money,
    pub change: Money,
    pub installments: u32,
    pub pix_txid: Option<PixTxId>,
    /// Cash box that received a cash payment.
    pub cash_box_id: Option<CashBoxId>,
    pub status: SaleStatus,
    pub cancel_reason: Option<String>,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Sale {
    pub fn checkout(
        id: SaleId,
        items: Vec<SaleItem>,
        details: CheckoutDetails,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation("a sale needs at least one item"));
        }

        let subtotal = Money::checked_sum(items.iter().map(|i| i.total))?;
        if details.discount.is_negative() || details.discount > subtotal {
            return Err(DomainError::validation("discount must be between 0 and the subtotal"));
        }
        let total = subtotal - details.discount;

        let payment = details.payment;
        let installments = payment.installments.unwrap_or(1);
        if installments == 0 || installments > MAX_INSTALLMENTS {
            return Err(DomainError::validation(format!(
                "installments must be between 1 and {MAX_INSTALLMENTS}"
            )));
        }
        if installments > 1 && !payment.method.allows_installments() {
            return Err(DomainError::validation(
                "installments are only available for credit card and store credit",
            ));
        }

        let (amount_paid, change) = match payment.method {
            PaymentMethod::Cash => {
                let paid = payment
                    .amount_paid
                    .ok_or_else(|| DomainError::validation("amount_paid is required for cash payments"))?
                    .bounded()?;
                if paid < total {
                    return Err(DomainError::validation(format!(
                        "amount paid ({paid}) is less than the total ({total})"
                    )));
                }
                (paid, paid - total)
            }
            _ => (total, Money::ZERO),
        };

        if payment.method == PaymentMethod::Pix && payment.pix_txid.is_none() {
            return Err(DomainError::validation("pix_txid is required for PIX payments"));
        }

        Ok(Self {
            id,
            number: details.number,
            seller_id: details.seller_id,
            location_id: details.location_id,
            customer_name: details
                .customer_name
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            items,
            subtotal,
            discount: details.discount,
            total,
            payment_method: payment.method,
            amount_paid,
            change,
            installments,
            pix_txid: payment.pix_txid,
            cash_box_id: None,
            status: SaleStatus::Completed,
            cancel_reason: None,
            user_id: details.user_id,
            created_at: now,
            cancelled_at: None,
        })
    }

    pub fn cancel(&mut self, reason: Option<String>, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == SaleStatus::Cancelled {
            return Err(DomainError::conflict(format!("sale {} is already cancelled", self.number)));
        }
        self.status = SaleStatus::Cancelled;
        self.cancel_reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        self.cancelled_at = Some(now);
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.status == SaleStatus::Completed
    }

    /// Calendar day (UTC) the sale happened.
    pub fn date(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    /// Display reference used on stock and cash movements, e.g. `"V000042"`.
    pub fn reference(&self) -> String {
        format!("V{:06}", self.number)
    }

    /// Sum of line prices before any discount.
    pub fn gross(&self) -> Money {
        self.items.iter().map(SaleItem::gross).sum()
    }

    /// Line discounts plus the sale-level discount.
    pub fn total_discount(&self) -> Money {
        self.items.iter().map(|i| i.discount).sum::<Money>() + self.discount
    }

    pub fn cost(&self) -> Money {
        self.items.iter().map(SaleItem::cost).sum()
    }

    pub fn items_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

impl Entity for Sale {
    type Id = SaleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
