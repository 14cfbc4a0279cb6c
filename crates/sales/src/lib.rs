//! Sales domain module: sellers, POS sales, PIX charges and sales reports.
//!
//! Deterministic domain logic only; stock and cash side effects of a sale are
//! orchestrated by the caller.

pub mod pix;
pub mod report;
pub mod sale;
pub mod seller;

pub use pix::{PIX_KEY_MAX_LEN, PixCharge, PixChargeStatus, PixMerchant, PixTxId};
pub use report::{
    DailyTotal, MAX_DAILY_SPAN_DAYS, PaymentMethodTotal, ProductSales, SalesSummary,
    SellerPerformance, by_payment_method, daily_totals, seller_performance, summarize, top_products,
};
pub use sale::{CheckoutDetails, Payment, PaymentMethod, Sale, SaleItem, SaleStatus};
pub use seller::{NewSeller, Seller, SellerPatch};
