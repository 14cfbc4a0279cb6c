//! DRE (income statement) for a period.
//!
//! Revenue and COGS come from completed sales. Expenses are paid payables
//! plus manual cash outflows; other income is receivables not generated by
//! sales plus manual cash inflows. Movements created by sales, payables or
//! receivables are skipped so nothing is counted twice.

use std::collections::BTreeMap;

use serde::Serialize;

use retailpos_core::{DateRange, Money};
use retailpos_sales::Sale;

use crate::cash::{CashMovement, CashMovementKind};
use crate::payable::AccountPayable;
use crate::receivable::AccountReceivable;
use crate::title::TitleStatus;

const MANUAL_CASH_CATEGORY: &str = "caixa";

pub struct DreInput<'a> {
    pub range: DateRange,
    pub sales: &'a [Sale],
    pub payables: &'a [AccountPayable],
    pub receivables: &'a [AccountReceivable],
    pub cash_movements: &'a [CashMovement],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseLine {
    pub category: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dre {
    pub range: DateRange,
    pub sales_count: usize,
    pub gross_revenue: Money,
    pub discounts: Money,
    pub net_revenue: Money,
    pub cogs: Money,
    pub gross_profit: Money,
    pub operating_expenses: Vec<ExpenseLine>,
    pub total_expenses: Money,
    pub operating_result: Money,
    pub other_income: Money,
    pub net_result: Money,
    pub gross_margin_bps: i64,
    pub net_margin_bps: i64,
    pub cancelled_count: usize,
    pub cancelled_total: Money,
}

pub fn build_dre(input: DreInput<'_>) -> Dre {
    let range = input.range;

    let mut sales_count = 0;
    let mut gross_revenue = Money::ZERO;
    let mut discounts = Money::ZERO;
    let mut net_revenue = Money::ZERO;
    let mut cogs = Money::ZERO;
    let mut cancelled_count = 0;
    let mut cancelled_total = Money::ZERO;
    for sale in input.sales.iter().filter(|s| range.contains(s.date())) {
        if sale.is_completed() {
            sales_count += 1;
            gross_revenue += sale.gross();
            discounts += sale.total_discount();
            net_revenue += sale.total;
            cogs += sale.cost();
        } else {
            cancelled_count += 1;
            cancelled_total += sale.total;
        }
    }
    let gross_profit = net_revenue - cogs;

    let mut expenses: BTreeMap<String, Money> = BTreeMap::new();
    for payable in input.payables.iter().filter(|p| p.status == TitleStatus::Paid) {
        if payable.paid_at.is_some_and(|d| range.contains(d)) {
            *expenses.entry(payable.category.clone()).or_default() +=
                payable.paid_amount.unwrap_or(payable.amount);
        }
    }

    let mut other_income = Money::ZERO;
    for receivable in input
        .receivables
        .iter()
        .filter(|r| r.status == TitleStatus::Paid && !r.is_from_sale())
    {
        if receivable.received_at.is_some_and(|d| range.contains(d)) {
            other_income += receivable.received_amount.unwrap_or(receivable.amount);
        }
    }

    for movement in input
        .cash_movements
        .iter()
        .filter(|m| m.is_manual() && range.contains(m.created_at.date_naive()))
    {
        match movement.kind {
            CashMovementKind::In => other_income += movement.amount,
            CashMovementKind::Out => {
                let category = movement
                    .category
                    .clone()
                    .unwrap_or_else(|| MANUAL_CASH_CATEGORY.to_string());
                *expenses.entry(category).or_default() += movement.amount;
            }
        }
    }

    let operating_expenses: Vec<ExpenseLine> = expenses
        .into_iter()
        .map(|(category, amount)| ExpenseLine { category, amount })
        .collect();
    let total_expenses: Money = operating_expenses.iter().map(|e| e.amount).sum();
    let operating_result = gross_profit - total_expenses;
    let net_result = operating_result + other_income;

    Dre {
        range,
        sales_count,
        gross_revenue,
        discounts,
        net_revenue,
        cogs,
        gross_profit,
        operating_expenses,
        total_expenses,
        operating_result,
        other_income,
        net_result,
        gross_margin_bps: gross_profit.ratio_bps(net_revenue),
        net_margin_bps: net_result.ratio_bps(net_revenue),
        cancelled_count,
        cancelled_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cash::{CashBox, CashReference, NewCashMovement};
    use crate::payable::NewPayable;
    use crate::receivable::{NewReceivable, receivables_for_sale};
    use crate::title::Settlement;
    use chrono::{NaiveDate, TimeZone, Utc};
    use retailpos_core::{
        CashBoxId, CashMovementId, LocationId, PayableId, ProductId, ReceivableId, SaleId,
    };
    use retailpos_products::{NewProduct, Product};
    use retailpos_sales::{CheckoutDetails, Payment, PaymentMethod, SaleItem};

    fn june(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn sale(method: PaymentMethod, qty: i64, discount: i64) -> Sale {
        let product = Product::create(
            ProductId::new(),
            NewProduct {
                sku: "BON-1".into(),
                name: "Boné".into(),
                barcode: None,
                description: None,
                category: None,
                brand: None,
                unit: None,
                cost_price: Money::from_cents(2_000),
                sale_price: Money::from_cents(5_000),
                min_stock: 0,
                max_stock: None,
            },
            Utc::now(),
        )
        .unwrap();
        let items = vec![SaleItem::from_product(&product, qty, None, Money::ZERO).unwrap()];
        let details = CheckoutDetails {
            number: 1,
            seller_id: None,
            location_id: LocationId::new(),
            customer_name: None,
            discount: Money::from_cents(discount),
            payment: Payment {
                method,
                amount_paid: Some(Money::from_cents(1_000_000)),
                installments: None,
                pix_txid: None,
            },
            user_id: None,
        };
        let at = Utc.with_ymd_and_hms(2024, 6, 10, 14, 0, 0).unwrap();
        Sale::checkout(SaleId::new(), items, details, at).unwrap()
    }

    #[test]
    fn income_statement_for_june() {
        let now = Utc.with_ymd_and_hms(2024, 6, 12, 9, 0, 0).unwrap();
        let completed = sale(PaymentMethod::Cash, 4, 1_000);
        let credit = sale(PaymentMethod::StoreCredit, 1, 0);
        let mut cancelled = sale(PaymentMethod::DebitCard, 2, 0);
        cancelled.cancel(None, now).unwrap();

        let mut rent = AccountPayable::create(
            PayableId::new(),
            NewPayable {
                supplier: "Imobiliária".into(),
                description: "Aluguel".into(),
                category: Some("aluguel".into()),
                document_number: None,
                amount: Money::from_cents(3_000),
                due_date: june(5),
                notes: None,
            },
            now,
        )
        .unwrap();
        rent.pay(Settlement::default(), june(5), now).unwrap();
        let unpaid = AccountPayable::create(
            PayableId::new(),
            NewPayable {
                supplier: "Energia".into(),
                description: "Conta de luz".into(),
                category: Some("utilidades".into()),
                document_number: None,
                amount: Money::from_cents(900),
                due_date: june(20),
                notes: None,
            },
            now,
        )
        .unwrap();

        let mut service = AccountReceivable::create(
            ReceivableId::new(),
            NewReceivable {
                customer: "Cliente".into(),
                description: "Ajuste de roupa".into(),
                category: None,
                document_number: None,
                amount: Money::from_cents(700),
                due_date: june(8),
                notes: None,
            },
            now,
        )
        .unwrap();
        service.receive(Settlement::default(), june(8), now).unwrap();
        let mut from_sale = receivables_for_sale(&credit, ReceivableId::new, now).unwrap();
        from_sale[0]
            .receive(Settlement { date: Some(june(11)), amount: None }, june(11), now)
            .unwrap();
        let mut receivables = vec![service];
        receivables.extend(from_sale);

        let cash = CashBox::open(CashBoxId::new(), "Caixa", Money::from_cents(50_000), None, now).unwrap();
        let manual_out = cash
            .record(
                CashMovementId::new(),
                NewCashMovement {
                    kind: CashMovementKind::Out,
                    amount: Money::from_cents(400),
                    description: "Material de limpeza".into(),
                    category: Some("limpeza".into()),
                },
                None,
                Money::from_cents(50_000),
                None,
                now,
            )
            .unwrap();
        let sale_in = cash
            .record(
                CashMovementId::new(),
                NewCashMovement {
                    kind: CashMovementKind::In,
                    amount: completed.total,
                    description: "Venda".into(),
                    category: None,
                },
                Some(CashReference::Sale(completed.id)),
                Money::from_cents(49_600),
                None,
                now,
            )
            .unwrap();

        let sales = vec![completed, credit, cancelled];
        let payables = vec![rent, unpaid];
        let movements = vec![manual_out, sale_in];
        let dre = build_dre(DreInput {
            range: DateRange::new(Some(june(1)), Some(june(30))).unwrap(),
            sales: &sales,
            payables: &payables,
            receivables: &receivables,
            cash_movements: &movements,
        });

        // 4 x 50.00 - 10.00 discount, plus 1 x 50.00 on store credit.
        assert_eq!(dre.sales_count, 2);
        assert_eq!(dre.gross_revenue, Money::from_cents(25_000));
        assert_eq!(dre.discounts, Money::from_cents(1_000));
        assert_eq!(dre.net_revenue, Money::from_cents(24_000));
        assert_eq!(dre.cogs, Money::from_cents(10_000));
        assert_eq!(dre.gross_profit, Money::from_cents(14_000));
        assert_eq!(
            dre.operating_expenses,
            vec![
                ExpenseLine { category: "aluguel".into(), amount: Money::from_cents(3_000) },
                ExpenseLine { category: "limpeza".into(), amount: Money::from_cents(400) },
            ]
        );
        assert_eq!(dre.total_expenses, Money::from_cents(3_400));
        assert_eq!(dre.operating_result, Money::from_cents(10_600));
        assert_eq!(dre.other_income, Money::from_cents(700));
        assert_eq!(dre.net_result, Money::from_cents(11_300));
        assert_eq!(dre.gross_margin_bps, 5_833);
        assert_eq!(dre.cancelled_count, 1);
        assert_eq!(dre.cancelled_total, Money::from_cents(10_000));
    }

    #[test]
    fn empty_period_has_zero_margins() {
        let dre = build_dre(DreInput {
            range: DateRange::day(june(1)),
            sales: &[],
            payables: &[],
            receivables: &[],
            cash_movements: &[],
        });
        assert_eq!(dre.net_revenue, Money::ZERO);
        assert_eq!(dre.gross_margin_bps, 0);
        assert!(dre.operating_expenses.is_empty());
    }
}
