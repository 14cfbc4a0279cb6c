use chrono::NaiveDate;
use serde::Serialize;

use retailpos_core::{CashBoxId, Money};

use crate::cash::CashBox;
use crate::title::{Title, TitleStatus};

/// Open amounts of one side of the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TitleTotals {
    pub pending_count: usize,
    pub pending: Money,
    pub overdue_count: usize,
    pub overdue: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenCashBox {
    pub id: CashBoxId,
    pub name: String,
    pub balance: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinancialSummary {
    pub payables: TitleTotals,
    pub receivables: TitleTotals,
    pub open_cash_box: Option<OpenCashBox>,
}

fn totals<'a, T: Title + 'a>(titles: impl IntoIterator<Item = &'a T>, today: NaiveDate) -> TitleTotals {
    let mut totals = TitleTotals::default();
    for title in titles {
        match title.effective_status(today) {
            TitleStatus::Pending => {
                totals.pending_count += 1;
                totals.pending += title.amount();
            }
            TitleStatus::Overdue => {
                totals.overdue_count += 1;
                totals.overdue += title.amount();
            }
            TitleStatus::Paid | TitleStatus::Cancelled => {}
        }
    }
    totals
}

/// `pending` excludes overdue titles; the two never overlap.
pub fn financial_summary<'a, P, R>(
    payables: impl IntoIterator<Item = &'a P>,
    receivables: impl IntoIterator<Item = &'a R>,
    open_box: Option<(&CashBox, Money)>,
    today: NaiveDate,
) -> FinancialSummary
where
    P: Title + 'a,
    R: Title + 'a,
{
    FinancialSummary {
        payables: totals(payables, today),
        receivables: totals(receivables, today),
        open_cash_box: open_box.map(|(cash, balance)| OpenCashBox {
            id: cash.id,
            name: cash.name.clone(),
            balance,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payable::{AccountPayable, NewPayable};
    use crate::receivable::AccountReceivable;
    use crate::title::Settlement;
    use chrono::Utc;
    use retailpos_core::PayableId;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, day).unwrap()
    }

    fn payable(cents: i64, due: NaiveDate) -> AccountPayable {
        AccountPayable::create(
            PayableId::new(),
            NewPayable {
                supplier: "Fornecedor".into(),
                description: "Compra".into(),
                category: None,
                document_number: None,
                amount: Money::from_cents(cents),
                due_date: due,
                notes: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn splits_pending_and_overdue() {
        let late = payable(1_000, d(1));
        let upcoming = payable(2_000, d(20));
        let mut paid = payable(4_000, d(2));
        paid.pay(Settlement::default(), d(2), Utc::now()).unwrap();
        let payables = vec![late, upcoming, paid];
        let receivables: Vec<AccountReceivable> = Vec::new();

        let cash = CashBox::open(CashBoxId::new(), "Caixa", Money::from_cents(100), None, Utc::now()).unwrap();
        let summary = financial_summary(&payables, &receivables, Some((&cash, Money::from_cents(350))), d(10));
        assert_eq!(summary.payables.overdue, Money::from_cents(1_000));
        assert_eq!(summary.payables.pending, Money::from_cents(2_000));
        assert_eq!(summary.payables.pending_count, 1);
        assert_eq!(summary.receivables, TitleTotals::default());
        assert_eq!(summary.open_cash_box.unwrap().balance, Money::from_cents(350));
    }
}
