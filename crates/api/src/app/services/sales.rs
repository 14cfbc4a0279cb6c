use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Utc};
use tracing::info;

use retailpos_core::{
    CashMovementId, DateRange, DomainError, LocationId, Page, PageRequest, ProductId, ReceivableId, SaleId,
    SellerId, UserId, paginate,
};
use retailpos_finance::{CashMovementKind, CashReference, NewCashMovement, TitleStatus, receivables_for_sale};
use retailpos_inventory::{MovementContext, MovementKind, MovementRequest, StockLevelKey};
use retailpos_sales::{
    CheckoutDetails, NewSeller, PaymentMethod, Sale, SaleItem, Seller, SellerPatch, SellerPerformance,
    by_payment_method, daily_totals, seller_performance, summarize, top_products,
};

use super::{AppServices, load};
use crate::app::dto::{CheckoutRequest, SaleFilter, SalesReport, SellerFilter};
use crate::app::errors::ServiceError;

const SALE_REASON: &str = "venda";
const CANCEL_REASON: &str = "cancelamento de venda";
const TOP_PRODUCTS: usize = 10;

/// Defaults an open-ended range to the current month so reports stay bounded.
pub(super) fn month_to_date(range: DateRange, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let to = range.to.unwrap_or(today);
    let from = range
        .from
        .unwrap_or_else(|| to.with_day(1).unwrap_or(to));
    (from, to)
}

impl AppServices {
    // ---- sellers ----

    pub async fn list_sellers(&self, filter: &SellerFilter, page: PageRequest) -> Result<Page<Seller>, ServiceError> {
        let term = filter.search.as_deref().map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
        let mut sellers: Vec<Seller> = self
            .stores
            .sellers
            .list()
            .await?
            .into_iter()
            .filter(|s| filter.active.is_none_or(|a| s.active == a))
            .filter(|s| term.as_deref().is_none_or(|t| s.name.to_lowercase().contains(t)))
            .collect();
        sellers.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(paginate(sellers, page))
    }

    pub async fn get_seller(&self, id: SellerId) -> Result<Seller, ServiceError> {
        load(&*self.stores.sellers, &id.to_string(), "seller").await
    }

    pub async fn create_seller(&self, input: NewSeller) -> Result<Seller, ServiceError> {
        if let Some(user_id) = input.user_id {
            self.current_user(user_id).await?;
        }
        let seller = Seller::create(SellerId::new(), input, Utc::now())?;
        self.stores.sellers.insert(seller.clone()).await?;
        info!(seller_id = %seller.id, "seller created");
        Ok(seller)
    }

    pub async fn update_seller(&self, id: SellerId, patch: SellerPatch) -> Result<Seller, ServiceError> {
        let mut seller = self.get_seller(id).await?;
        seller.apply_patch(patch, Utc::now())?;
        self.stores.sellers.update(seller.clone()).await?;
        Ok(seller)
    }

    /// Sellers are deactivated so past sales keep their attribution.
    pub async fn deactivate_seller(&self, id: SellerId) -> Result<(), ServiceError> {
        let mut seller = self.get_seller(id).await?;
        seller.deactivate(Utc::now());
        self.stores.sellers.update(seller).await?;
        Ok(())
    }

    pub async fn seller_performance(&self, range: DateRange) -> Result<Vec<SellerPerformance>, ServiceError> {
        let sellers = self.stores.sellers.list().await?;
        let sales = self.stores.sales.list().await?;
        Ok(seller_performance(&sales, &sellers, &range))
    }

    // ---- sales ----

    pub async fn list_sales(
        &self,
        range: DateRange,
        filter: &SaleFilter,
        page: PageRequest,
    ) -> Result<Page<Sale>, ServiceError> {
        let mut sales: Vec<Sale> = self
            .stores
            .sales
            .list()
            .await?
            .into_iter()
            .filter(|s| range.contains(s.date()))
            .filter(|s| filter.status.is_none_or(|st| s.status == st))
            .filter(|s| filter.seller_id.is_none_or(|id| s.seller_id == Some(id)))
            .filter(|s| filter.payment_method.is_none_or(|m| s.payment_method == m))
            .collect();
        sales.sort_by(|a, b| b.number.cmp(&a.number));
        Ok(paginate(sales, page))
    }

    pub async fn get_sale(&self, id: SaleId) -> Result<Sale, ServiceError> {
        load(&*self.stores.sales, &id.to_string(), "sale").await
    }

    /// Price, validate and persist a sale with its stock, cash and receivable effects.
    ///
    /// Every check runs before the first write, so a rejected checkout leaves
    /// no partial movements behind.
    pub async fn checkout(&self, request: CheckoutRequest, user_id: UserId) -> Result<Sale, ServiceError> {
        let _gate = self.write_lock().await;
        let now = Utc::now();

        let location = match request.location_id {
            Some(id) => load(&*self.stores.locations, &id.to_string(), "location").await?,
            None => self.default_location().await?,
        };
        if !location.active {
            return Err(DomainError::invariant(format!("location '{}' is inactive", location.name)).into());
        }
        if let Some(seller_id) = request.seller_id {
            let seller = self.get_seller(seller_id).await?;
            if !seller.active {
                return Err(DomainError::invariant(format!("seller '{}' is inactive", seller.name)).into());
            }
        }

        let mut products = HashMap::new();
        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let product = self.get_product(line.product_id).await?;
            items.push(SaleItem::from_product(&product, line.quantity, line.unit_price, line.discount)?);
            products.insert(product.id, product);
        }
        self.ensure_stock(&items, location.id).await?;

        let number = self
            .stores
            .sales
            .list()
            .await?
            .iter()
            .map(|s| s.number)
            .max()
            .unwrap_or(0)
            + 1;
        let mut sale = Sale::checkout(
            SaleId::new(),
            items,
            CheckoutDetails {
                number,
                seller_id: request.seller_id,
                location_id: location.id,
                customer_name: request.customer_name,
                discount: request.discount,
                payment: request.payment,
                user_id: Some(user_id),
            },
            now,
        )?;

        let cash_movement = match sale.payment_method {
            PaymentMethod::Cash => {
                let (cash_box, balance) = self.require_open_cash_box().await?;
                let movement = cash_box.record(
                    CashMovementId::new(),
                    NewCashMovement {
                        kind: CashMovementKind::In,
                        amount: sale.total,
                        description: format!("Venda {}", sale.reference()),
                        category: None,
                    },
                    Some(CashReference::Sale(sale.id)),
                    balance,
                    Some(user_id),
                    now,
                )?;
                sale.cash_box_id = Some(cash_box.id);
                Some(movement)
            }
            _ => None,
        };

        let pix_charge = match &sale.pix_txid {
            Some(txid) => {
                let mut charge = load(&*self.stores.pix_charges, txid.as_str(), "PIX charge").await?;
                charge.attach_to_sale(sale.id, sale.total)?;
                Some(charge)
            }
            None => None,
        };

        let receivables = receivables_for_sale(&sale, ReceivableId::new, now)?;

        for item in &sale.items {
            if let Some(product) = products.get(&item.product_id) {
                self.apply_movement(
                    product,
                    location.id,
                    MovementRequest::new(MovementKind::Out, item.quantity),
                    MovementContext {
                        reason: Some(SALE_REASON.to_string()),
                        reference: Some(sale.reference()),
                        user_id: Some(user_id),
                    },
                    now,
                )
                .await?;
            }
        }
        self.stores.sales.insert(sale.clone()).await?;
        if let Some(movement) = cash_movement {
            self.stores.cash_movements.insert(movement).await?;
        }
        if let Some(charge) = pix_charge {
            self.stores.pix_charges.update(charge).await?;
        }
        for receivable in receivables {
            self.stores.receivables.insert(receivable).await?;
        }

        info!(
            sale = %sale.reference(),
            total = %sale.total,
            method = ?sale.payment_method,
            items = sale.items.len(),
            "sale completed"
        );
        Ok(sale)
    }

    async fn ensure_stock(&self, items: &[SaleItem], location_id: LocationId) -> Result<(), ServiceError> {
        let mut needed: HashMap<ProductId, (i64, &str)> = HashMap::new();
        for item in items {
            let entry = needed.entry(item.product_id).or_insert((0, item.sku.as_str()));
            entry.0 += item.quantity;
        }
        for (product_id, (quantity, sku)) in needed {
            let key = StockLevelKey::new(product_id, location_id);
            let on_hand = self
                .stores
                .levels
                .get(&key.to_string())
                .await?
                .map_or(0, |l| l.quantity);
            if on_hand < quantity {
                return Err(DomainError::invariant(format!(
                    "insufficient stock for {sku}: {on_hand} on hand, {quantity} requested"
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Restock, reverse cash and cancel the sale's pending receivables.
    pub async fn cancel_sale(&self, id: SaleId, reason: Option<String>, user_id: UserId) -> Result<Sale, ServiceError> {
        let _gate = self.write_lock().await;
        let now = Utc::now();
        let mut sale = self.get_sale(id).await?;
        sale.cancel(reason, now)?;

        let reversal = if sale.payment_method == PaymentMethod::Cash {
            let (cash_box, balance) = self.require_open_cash_box().await?;
            Some(cash_box.record(
                CashMovementId::new(),
                NewCashMovement {
                    kind: CashMovementKind::Out,
                    amount: sale.total,
                    description: format!("Estorno da venda {}", sale.reference()),
                    category: None,
                },
                Some(CashReference::Sale(sale.id)),
                balance,
                Some(user_id),
                now,
            )?)
        } else {
            None
        };

        let products = self.product_index().await?;
        for item in &sale.items {
            let Some(product) = products.get(&item.product_id) else {
                continue;
            };
            self.apply_movement(
                product,
                sale.location_id,
                MovementRequest::new(MovementKind::In, item.quantity),
                MovementContext {
                    reason: Some(CANCEL_REASON.to_string()),
                    reference: Some(sale.reference()),
                    user_id: Some(user_id),
                },
                now,
            )
            .await?;
        }
        if let Some(movement) = reversal {
            self.stores.cash_movements.insert(movement).await?;
        }
        for mut receivable in self.stores.receivables.list().await? {
            if receivable.sale_id == Some(sale.id) && receivable.status == TitleStatus::Pending {
                receivable.cancel(now)?;
                self.stores.receivables.update(receivable).await?;
            }
        }
        self.stores.sales.update(sale.clone()).await?;

        info!(sale = %sale.reference(), total = %sale.total, "sale cancelled");
        Ok(sale)
    }

    pub async fn sales_report(&self, range: DateRange) -> Result<SalesReport, ServiceError> {
        let (from, to) = month_to_date(range, Utc::now().date_naive());
        let range = DateRange::new(Some(from), Some(to))?;
        let sales = self.stores.sales.list().await?;
        Ok(SalesReport {
            range,
            summary: summarize(&sales, &range),
            by_payment_method: by_payment_method(&sales, &range),
            top_products: top_products(&sales, &range, TOP_PRODUCTS),
            daily: daily_totals(&sales, from, to)?,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use retailpos_core::{DateRange, DomainError, Money, UserId};
    use retailpos_finance::{CashMovementKind, TitleFilter};
    use retailpos_inventory::{LocationKind, MovementKind, NewLocation};
    use retailpos_products::Product;
    use retailpos_sales::{NewSeller, Payment, PaymentMethod, SaleStatus};

    use crate::app::dto::{CheckoutLine, CheckoutRequest, MovementInput, OpenCashBoxRequest};
    use crate::app::errors::ServiceError;
    use crate::app::services::AppServices;
    use crate::app::services::products::tests::new_product;
    use crate::app::services::test_support::services;

    /// A store with one location and a product holding `stock` units.
    pub async fn shop(stock: i64) -> (AppServices, Product) {
        let services = services();
        services
            .create_location(NewLocation {
                name: "Loja".to_string(),
                kind: LocationKind::Store,
                description: None,
                is_default: true,
            })
            .await
            .unwrap();
        let product = services.create_product(new_product("TEN-42", "Tênis 42", 20_000)).await.unwrap();
        services
            .record_movement(
                MovementInput {
                    product_id: product.id,
                    location_id: None,
                    kind: MovementKind::In,
                    quantity: stock,
                    reason: None,
                    reference: None,
                },
                UserId::new(),
            )
            .await
            .unwrap();
        (services, product)
    }

    pub fn request(product: &Product, quantity: i64, payment: Payment) -> CheckoutRequest {
        CheckoutRequest {
            items: vec![CheckoutLine {
                product_id: product.id,
                quantity,
                unit_price: None,
                discount: Money::ZERO,
            }],
            location_id: None,
            seller_id: None,
            customer_name: Some("Maria".to_string()),
            discount: Money::ZERO,
            payment,
        }
    }

    pub fn pay(method: PaymentMethod, amount_paid: Option<i64>, installments: Option<u32>) -> Payment {
        Payment {
            method,
            amount_paid: amount_paid.map(Money::from_cents),
            installments,
            pix_txid: None,
        }
    }

    #[tokio::test]
    async fn cash_sale_needs_open_cash_box() {
        let (services, product) = shop(5).await;
        let err = services
            .checkout(request(&product, 1, pay(PaymentMethod::Cash, Some(20_000), None)), UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
        assert_eq!(services.stock_alerts().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn cash_sale_moves_stock_and_cash_then_cancel_reverses() {
        let (services, product) = shop(5).await;
        let user = UserId::new();
        let cash = services
            .open_cash_box(
                OpenCashBoxRequest {
                    name: "Caixa 1".to_string(),
                    opening_balance: Money::from_cents(5_000),
                },
                user,
            )
            .await
            .unwrap();

        let sale = services
            .checkout(request(&product, 2, pay(PaymentMethod::Cash, Some(50_000), None)), user)
            .await
            .unwrap();
        assert_eq!(sale.number, 1);
        assert_eq!(sale.total, Money::from_cents(40_000));
        assert_eq!(sale.change, Money::from_cents(10_000));
        assert_eq!(sale.cash_box_id, Some(cash.cash_box.id));
        assert_eq!(services.get_cash_box(cash.cash_box.id).await.unwrap().balance, Money::from_cents(45_000));

        let second = services
            .checkout(request(&product, 1, pay(PaymentMethod::DebitCard, None, None)), user)
            .await
            .unwrap();
        assert_eq!(second.number, 2);

        let cancelled = services.cancel_sale(sale.id, Some("desistência".into()), user).await.unwrap();
        assert_eq!(cancelled.status, SaleStatus::Cancelled);
        assert_eq!(services.get_cash_box(cash.cash_box.id).await.unwrap().balance, Money::from_cents(5_000));
        let movements = services.cash_movements(cash.cash_box.id).await.unwrap();
        assert_eq!(movements.iter().filter(|m| m.kind == CashMovementKind::Out).count(), 1);
        assert_eq!(services.pos_products(&Default::default()).await.unwrap()[0].stock, 4);

        let again = services.cancel_sale(sale.id, None, user).await.unwrap_err();
        assert!(matches!(again, ServiceError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn insufficient_stock_rejects_whole_sale() {
        let (services, product) = shop(1).await;
        let err = services
            .checkout(request(&product, 2, pay(PaymentMethod::CreditCard, None, Some(3))), UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvariantViolation(_))));
        let page = services
            .list_sales(DateRange::unbounded(), &Default::default(), Default::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn store_credit_creates_installments_cancelled_with_the_sale() {
        let (services, product) = shop(3).await;
        let user = UserId::new();
        let sale = services
            .checkout(request(&product, 1, pay(PaymentMethod::StoreCredit, None, Some(3))), user)
            .await
            .unwrap();

        let receivables = services
            .list_receivables(&TitleFilter::default(), Default::default())
            .await
            .unwrap();
        assert_eq!(receivables.total, 3);
        let total: Money = receivables.items.iter().map(|r| r.amount).sum();
        assert_eq!(total, sale.total);

        services.cancel_sale(sale.id, None, user).await.unwrap();
        let after = services
            .list_receivables(&TitleFilter::default(), Default::default())
            .await
            .unwrap();
        assert!(after.items.iter().all(|r| r.status == retailpos_finance::TitleStatus::Cancelled));
    }

    #[tokio::test]
    async fn inactive_seller_cannot_sell_and_performance_lists_sellers() {
        let (services, product) = shop(3).await;
        let seller = services
            .create_seller(NewSeller {
                name: "João".to_string(),
                email: None,
                phone: None,
                commission_bps: 500,
                user_id: None,
            })
            .await
            .unwrap();
        let mut req = request(&product, 1, pay(PaymentMethod::DebitCard, None, None));
        req.seller_id = Some(seller.id);
        services.checkout(req.clone(), UserId::new()).await.unwrap();

        let performance = services.seller_performance(DateRange::unbounded()).await.unwrap();
        assert_eq!(performance[0].sales_count, 1);
        assert_eq!(performance[0].commission, Money::from_cents(1_000));

        services.deactivate_seller(seller.id).await.unwrap();
        assert!(services.checkout(req, UserId::new()).await.is_err());
    }

    #[tokio::test]
    async fn sales_report_rejects_ranges_longer_than_a_year() {
        let services = services();
        let from = chrono::NaiveDate::from_ymd_opt(1, 1, 1).unwrap();
        let to = chrono::NaiveDate::from_ymd_opt(9999, 12, 31).unwrap();
        let err = services
            .sales_report(DateRange::new(Some(from), Some(to)).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }
}
