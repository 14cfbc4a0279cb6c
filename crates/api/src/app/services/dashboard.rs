use chrono::{Datelike, Days, NaiveDate, Utc};
use serde::Serialize;

use retailpos_core::DateRange;
use retailpos_finance::FinancialSummary;
use retailpos_sales::{DailyTotal, PaymentMethodTotal, ProductSales, SalesSummary, by_payment_method, daily_totals, summarize, top_products};

use super::AppServices;
use crate::app::errors::ServiceError;

const TOP_PRODUCTS: usize = 5;
const TREND_DAYS: u64 = 7;

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub date: NaiveDate,
    pub today: SalesSummary,
    pub month: SalesSummary,
    pub last_7_days: Vec<DailyTotal>,
    pub top_products: Vec<ProductSales>,
    pub by_payment_method: Vec<PaymentMethodTotal>,
    pub stock_alerts: usize,
    pub financial: FinancialSummary,
}

impl AppServices {
    pub async fn dashboard(&self, date: Option<NaiveDate>) -> Result<Dashboard, ServiceError> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        let month_start = date.with_day(1).unwrap_or(date);
        let week_start = date.checked_sub_days(Days::new(TREND_DAYS - 1)).unwrap_or(date);
        let month = DateRange::new(Some(month_start), Some(date))?;

        let sales = self.stores.sales.list().await?;
        Ok(Dashboard {
            date,
            today: summarize(&sales, &DateRange::day(date)),
            month: summarize(&sales, &month),
            last_7_days: daily_totals(&sales, week_start, date)?,
            top_products: top_products(&sales, &month, TOP_PRODUCTS),
            by_payment_method: by_payment_method(&sales, &month),
            stock_alerts: self.stock_alerts().await?.len(),
            financial: self.financial_summary_on(date).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use retailpos_core::{Money, UserId};
    use retailpos_sales::PaymentMethod;

    use crate::app::services::sales::tests::{pay, request, shop};

    #[tokio::test]
    async fn dashboard_reflects_todays_sales() {
        let (services, product) = shop(3).await;
        services
            .checkout(request(&product, 2, pay(PaymentMethod::CreditCard, None, Some(2))), UserId::new())
            .await
            .unwrap();

        let dashboard = services.dashboard(None).await.unwrap();
        assert_eq!(dashboard.date, Utc::now().date_naive());
        assert_eq!(dashboard.today.count, 1);
        assert_eq!(dashboard.today.net, Money::from_cents(40_000));
        assert_eq!(dashboard.last_7_days.len(), 7);
        assert_eq!(dashboard.top_products[0].quantity, 2);
        // one unit left against a minimum of two
        assert_eq!(dashboard.stock_alerts, 1);
    }
}
