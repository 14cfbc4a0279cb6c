//! Read-only aggregations over sales.
//!
//! Cancelled sales never count towards revenue; `summarize` reports them on
//! their own line.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use retailpos_core::{DateRange, DomainError, DomainResult, Money, ProductId, SellerId};

use crate::sale::{PaymentMethod, Sale};
use crate::seller::Seller;

/// Longest span, in days, a daily series may cover.
pub const MAX_DAILY_SPAN_DAYS: i64 = 366;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SalesSummary {
    pub count: usize,
    pub items_sold: i64,
    pub gross: Money,
    pub discounts: Money,
    pub net: Money,
    pub cost: Money,
    pub profit: Money,
    pub average_ticket: Money,
    pub cancelled_count: usize,
    pub cancelled_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub revenue: Money,
    pub cost: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub count: usize,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentMethodTotal {
    pub method: PaymentMethod,
    pub count: usize,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellerPerformance {
    pub seller_id: SellerId,
    pub name: String,
    pub sales_count: usize,
    pub total: Money,
    pub average_ticket: Money,
    pub commission_bps: u32,
    pub commission: Money,
}

fn average(total: Money, count: usize) -> Money {
    if count == 0 {
        Money::ZERO
    } else {
        Money::from_cents(total.cents() / count as i64)
    }
}

fn completed_in<'a>(
    sales: impl IntoIterator<Item = &'a Sale>,
    range: DateRange,
) -> impl Iterator<Item = &'a Sale> {
    sales
        .into_iter()
        .filter(move |s| s.is_completed() && range.contains(s.date()))
}

pub fn summarize<'a>(sales: impl IntoIterator<Item = &'a Sale>, range: &DateRange) -> SalesSummary {
    let mut summary = SalesSummary::default();
    for sale in sales.into_iter().filter(|s| range.contains(s.date())) {
        if !sale.is_completed() {
            summary.cancelled_count += 1;
            summary.cancelled_total += sale.total;
            continue;
        }
        summary.count += 1;
        summary.items_sold += sale.items_count();
        summary.gross += sale.gross();
        summary.discounts += sale.total_discount();
        summary.net += sale.total;
        summary.cost += sale.cost();
    }
    summary.profit = summary.net - summary.cost;
    summary.average_ticket = average(summary.net, summary.count);
    summary
}

/// Best sellers by revenue, ties broken by quantity and then SKU.
pub fn top_products<'a>(
    sales: impl IntoIterator<Item = &'a Sale>,
    range: &DateRange,
    limit: usize,
) -> Vec<ProductSales> {
    let mut by_product: HashMap<ProductId, ProductSales> = HashMap::new();
    for item in completed_in(sales, *range).flat_map(|s| s.items.iter()) {
        let entry = by_product.entry(item.product_id).or_insert_with(|| ProductSales {
            product_id: item.product_id,
            sku: item.sku.clone(),
            name: item.name.clone(),
            quantity: 0,
            revenue: Money::ZERO,
            cost: Money::ZERO,
        });
        entry.quantity += item.quantity;
        entry.revenue += item.total;
        entry.cost += item.cost();
    }

    let mut ranked: Vec<ProductSales> = by_product.into_values().collect();
    ranked.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then(b.quantity.cmp(&a.quantity))
            .then_with(|| a.sku.cmp(&b.sku))
    });
    ranked.truncate(limit);
    ranked
}

/// One entry per day in `from..=to`, including days without sales.
///
/// Fails when the range covers more than [`MAX_DAILY_SPAN_DAYS`] days.
pub fn daily_totals<'a>(
    sales: impl IntoIterator<Item = &'a Sale>,
    from: NaiveDate,
    to: NaiveDate,
) -> DomainResult<Vec<DailyTotal>> {
    if (to - from).num_days() >= MAX_DAILY_SPAN_DAYS {
        return Err(DomainError::validation(format!(
            "a daily report covers at most {MAX_DAILY_SPAN_DAYS} days"
        )));
    }
    let range = DateRange {
        from: Some(from),
        to: Some(to),
    };
    let mut by_day: HashMap<NaiveDate, (usize, Money)> = HashMap::new();
    for sale in completed_in(sales, range) {
        let entry = by_day.entry(sale.date()).or_insert((0, Money::ZERO));
        entry.0 += 1;
        entry.1 += sale.total;
    }

    Ok(from
        .iter_days()
        .take_while(|d| *d <= to)
        .map(|date| {
            let (count, total) = by_day.get(&date).copied().unwrap_or((0, Money::ZERO));
            DailyTotal { date, count, total }
        })
        .collect())
}

/// Totals for every payment method, in a fixed order.
pub fn by_payment_method<'a>(
    sales: impl IntoIterator<Item = &'a Sale>,
    range: &DateRange,
) -> Vec<PaymentMethodTotal> {
    let mut totals: Vec<PaymentMethodTotal> = PaymentMethod::ALL
        .iter()
        .map(|method| PaymentMethodTotal {
            method: *method,
            count: 0,
            total: Money::ZERO,
        })
        .collect();
    for sale in completed_in(sales, *range) {
        if let Some(entry) = totals.iter_mut().find(|t| t.method == sale.payment_method) {
            entry.count += 1;
            entry.total += sale.total;
        }
    }
    totals
}

/// Per-seller totals and commission, best seller first.
///
/// Every seller passed in gets a row, even without sales in the range.
pub fn seller_performance<'a>(
    sales: impl IntoIterator<Item = &'a Sale>,
    sellers: &[Seller],
    range: &DateRange,
) -> Vec<SellerPerformance> {
    let mut by_seller: HashMap<SellerId, (usize, Money)> = HashMap::new();
    for sale in completed_in(sales, *range) {
        if let Some(seller_id) = sale.seller_id {
            let entry = by_seller.entry(seller_id).or_insert((0, Money::ZERO));
            entry.0 += 1;
            entry.1 += sale.total;
        }
    }

    let mut rows: Vec<SellerPerformance> = sellers
        .iter()
        .map(|seller| {
            let (sales_count, total) = by_seller.get(&seller.id).copied().unwrap_or((0, Money::ZERO));
            SellerPerformance {
                seller_id: seller.id,
                name: seller.name.clone(),
                sales_count,
                total,
                average_ticket: average(total, sales_count),
                commission_bps: seller.commission_bps,
                commission: seller.commission_on(total),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pix::PixTxId;
    use crate::sale::{CheckoutDetails, Payment, SaleItem};
    use crate::seller::NewSeller;
    use chrono::{TimeZone, Utc};
    use retailpos_core::{LocationId, SaleId};
    use retailpos_products::{NewProduct, Product};

    fn product(sku: &str, price: i64, cost: i64) -> Product {
        Product::create(
            ProductId::new(),
            NewProduct {
                sku: sku.into(),
                name: format!("Produto {sku}"),
                barcode: None,
                description: None,
                category: None,
                brand: None,
                unit: None,
                cost_price: Money::from_cents(cost),
                sale_price: Money::from_cents(price),
                min_stock: 0,
                max_stock: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn sale(
        day: u32,
        lines: &[(&Product, i64)],
        method: PaymentMethod,
        seller_id: Option<SellerId>,
    ) -> Sale {
        let items = lines
            .iter()
            .map(|(p, qty)| SaleItem::from_product(p, *qty, None, Money::ZERO).unwrap())
            .collect();
        let details = CheckoutDetails {
            number: day as u64,
            seller_id,
            location_id: LocationId::new(),
            customer_name: None,
            discount: Money::ZERO,
            payment: Payment {
                method,
                amount_paid: Some(Money::from_cents(1_000_000)),
                installments: None,
                pix_txid: (method == PaymentMethod::Pix).then(|| PixTxId::parse("RPT0001").unwrap()),
            },
            user_id: None,
        };
        let at = Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap();
        Sale::checkout(SaleId::new(), items, details, at).unwrap()
    }

    fn may(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    #[test]
    fn summary_excludes_cancelled_sales() {
        let a = product("A", 1_000, 400);
        let b = product("B", 2_500, 1_000);
        let first = sale(1, &[(&a, 2), (&b, 1)], PaymentMethod::Cash, None);
        let second = sale(2, &[(&b, 2)], PaymentMethod::DebitCard, None);
        let mut third = sale(2, &[(&a, 1)], PaymentMethod::DebitCard, None);
        third.cancel(None, Utc::now()).unwrap();

        let summary = summarize([&first, &second, &third], &DateRange::unbounded());
        assert_eq!(summary.count, 2);
        assert_eq!(summary.items_sold, 5);
        assert_eq!(summary.net, Money::from_cents(9_500));
        assert_eq!(summary.cost, Money::from_cents(3_800));
        assert_eq!(summary.profit, Money::from_cents(5_700));
        assert_eq!(summary.average_ticket, Money::from_cents(4_750));
        assert_eq!(summary.cancelled_count, 1);
        assert_eq!(summary.cancelled_total, Money::from_cents(1_000));
    }

    #[test]
    fn summary_respects_range() {
        let a = product("A", 1_000, 400);
        let sales = vec![
            sale(1, &[(&a, 1)], PaymentMethod::Cash, None),
            sale(3, &[(&a, 1)], PaymentMethod::Cash, None),
        ];
        let summary = summarize(&sales, &DateRange::day(may(3)));
        assert_eq!(summary.count, 1);
    }

    #[test]
    fn top_products_ranked_by_revenue() {
        let a = product("A", 1_000, 400);
        let b = product("B", 2_500, 1_000);
        let c = product("C", 100, 10);
        let sales = vec![
            sale(1, &[(&a, 3), (&c, 1)], PaymentMethod::Cash, None),
            sale(2, &[(&b, 2)], PaymentMethod::Cash, None),
        ];
        let top = top_products(&sales, &DateRange::unbounded(), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].sku, "B");
        assert_eq!(top[0].revenue, Money::from_cents(5_000));
        assert_eq!(top[1].sku, "A");
        assert_eq!(top[1].quantity, 3);
    }

    #[test]
    fn daily_totals_are_zero_filled() {
        let a = product("A", 1_000, 400);
        let sales = vec![
            sale(2, &[(&a, 1)], PaymentMethod::Cash, None),
            sale(2, &[(&a, 2)], PaymentMethod::Pix, None),
            sale(9, &[(&a, 1)], PaymentMethod::Cash, None),
        ];
        let days = daily_totals(&sales, may(1), may(4)).unwrap();
        assert_eq!(days.len(), 4);
        assert_eq!(days[0].total, Money::ZERO);
        assert_eq!(days[1].count, 2);
        assert_eq!(days[1].total, Money::from_cents(3_000));
        assert_eq!(days[3].date, may(4));
    }

    #[test]
    fn daily_totals_refuse_spans_past_a_year() {
        let year_start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let year_end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(daily_totals(&[], year_start, year_end).unwrap().len(), 366);

        let too_long = daily_totals(&[], year_start, year_end.succ_opt().unwrap());
        assert!(matches!(too_long, Err(DomainError::Validation(_))));

        let far = NaiveDate::from_ymd_opt(9999, 12, 31).unwrap();
        assert!(daily_totals(&[], NaiveDate::from_ymd_opt(1, 1, 1).unwrap(), far).is_err());
    }

    #[test]
    fn payment_method_totals_cover_all_methods() {
        let a = product("A", 1_000, 400);
        let sales = vec![
            sale(1, &[(&a, 1)], PaymentMethod::Cash, None),
            sale(1, &[(&a, 4)], PaymentMethod::CreditCard, None),
        ];
        let totals = by_payment_method(&sales, &DateRange::unbounded());
        assert_eq!(totals.len(), PaymentMethod::ALL.len());
        let credit = totals.iter().find(|t| t.method == PaymentMethod::CreditCard).unwrap();
        assert_eq!(credit.total, Money::from_cents(4_000));
        let pix = totals.iter().find(|t| t.method == PaymentMethod::Pix).unwrap();
        assert_eq!(pix.count, 0);
    }

    #[test]
    fn seller_commission_on_completed_sales() {
        let a = product("A", 10_000, 4_000);
        let ana = Seller::create(
            SellerId::new(),
            NewSeller {
                name: "Ana".into(),
                email: None,
                phone: None,
                commission_bps: 500,
                user_id: None,
            },
            Utc::now(),
        )
        .unwrap();
        let bia = Seller::create(
            SellerId::new(),
            NewSeller {
                name: "Bia".into(),
                email: None,
                phone: None,
                commission_bps: 300,
                user_id: None,
            },
            Utc::now(),
        )
        .unwrap();
        let sales = vec![
            sale(1, &[(&a, 2)], PaymentMethod::Cash, Some(ana.id)),
            sale(1, &[(&a, 1)], PaymentMethod::Cash, Some(ana.id)),
            sale(1, &[(&a, 1)], PaymentMethod::Cash, None),
        ];
        let rows = seller_performance(&sales, &[bia.clone(), ana.clone()], &DateRange::unbounded());
        assert_eq!(rows[0].seller_id, ana.id);
        assert_eq!(rows[0].sales_count, 2);
        assert_eq!(rows[0].total, Money::from_cents(30_000));
        assert_eq!(rows[0].commission, Money::from_cents(1_500));
        assert_eq!(rows[1].seller_id, bia.id);
        assert_eq!(rows[1].commission, Money::ZERO);
    }
}
