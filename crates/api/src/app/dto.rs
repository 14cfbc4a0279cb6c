//! Request/response DTOs and the JSON/query extractors used by handlers.
//!
//! Domain input types (`NewProduct`, `NewPayable`, ...) are deserialized
//! directly; this module only holds shapes that exist for HTTP.

use axum::extract::{FromRequest, FromRequestParts};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use retailpos_auth::{Role, User};
use retailpos_core::{
    CashBoxId, DateRange, DomainResult, LocationId, Money, PageRequest, ProductId, SellerId, UserId,
};
use retailpos_finance::CashBox;
use retailpos_inventory::{AlertKind, MovementKind, StockLevel};
use retailpos_sales::{
    DailyTotal, Payment, PaymentMethod, PaymentMethodTotal, PixCharge, PixChargeStatus, ProductSales,
    SaleStatus, SalesSummary,
};

use super::errors::ServiceError;

/// `Json` whose rejection renders the standard error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ServiceError))]
pub struct AppJson<T>(pub T);

/// `Query` whose rejection renders the standard error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ServiceError))]
pub struct AppQuery<T>(pub T);

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageParams {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PeriodParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl PeriodParams {
    pub fn range(&self) -> DomainResult<DateRange> {
        DateRange::new(self.from, self.to)
    }
}

// ---- auth & users ----

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CsrfResponse {
    pub csrf_token: String,
}

/// A user without its password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            active: user.active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub user: UserView,
    pub csrf_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub user: UserView,
    pub permissions: Vec<String>,
}

// ---- stock ----

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LevelFilter {
    pub product_id: Option<ProductId>,
    pub location_id: Option<LocationId>,
    /// Only levels that currently raise an alert.
    pub alerts_only: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockLevelView {
    #[serde(flatten)]
    pub level: StockLevel,
    pub sku: String,
    pub product_name: String,
    pub location_name: String,
    pub alert: Option<AlertKind>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ThresholdsInput {
    pub min_quantity: i64,
    #[serde(default)]
    pub max_quantity: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementFilter {
    pub product_id: Option<ProductId>,
    pub location_id: Option<LocationId>,
    pub kind: Option<MovementKind>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovementInput {
    pub product_id: ProductId,
    /// Defaults to the default location.
    #[serde(default)]
    pub location_id: Option<LocationId>,
    pub kind: MovementKind,
    pub quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferInput {
    pub product_id: ProductId,
    pub from_location_id: LocationId,
    pub to_location_id: LocationId,
    pub quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockAlertView {
    pub product_id: ProductId,
    pub sku: String,
    pub product_name: String,
    pub location_id: LocationId,
    pub location_name: String,
    pub kind: AlertKind,
    pub quantity: i64,
    pub min_quantity: i64,
    pub max_quantity: Option<i64>,
}

// ---- sellers & sales ----

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SellerFilter {
    pub active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaleFilter {
    pub status: Option<SaleStatus>,
    pub seller_id: Option<SellerId>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Overrides the catalog price.
    #[serde(default)]
    pub unit_price: Option<Money>,
    #[serde(default)]
    pub discount: Money,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutLine>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub seller_id: Option<SellerId>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub discount: Money,
    pub payment: Payment,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelSaleRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesReport {
    pub range: DateRange,
    pub summary: SalesSummary,
    pub by_payment_method: Vec<PaymentMethodTotal>,
    pub top_products: Vec<ProductSales>,
    pub daily: Vec<DailyTotal>,
}

// ---- POS ----

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PosProductQuery {
    pub search: Option<String>,
    pub location_id: Option<LocationId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PosProduct {
    pub id: ProductId,
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    pub category: Option<String>,
    pub unit: String,
    pub sale_price: Money,
    pub stock: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePixRequest {
    pub amount: Money,
    #[serde(default)]
    pub description: Option<String>,
}

/// A PIX charge with its status as of the response time.
#[derive(Debug, Clone, Serialize)]
pub struct PixChargeView {
    pub txid: String,
    pub amount: Money,
    pub description: Option<String>,
    pub payload: String,
    pub status: PixChargeStatus,
    pub sale_id: Option<retailpos_core::SaleId>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PixChargeView {
    pub fn at(charge: PixCharge, now: DateTime<Utc>) -> Self {
        Self {
            status: charge.effective_status(now),
            txid: charge.txid.to_string(),
            amount: charge.amount,
            description: charge.description,
            payload: charge.payload,
            sale_id: charge.sale_id,
            created_at: charge.created_at,
            expires_at: charge.expires_at,
            paid_at: charge.paid_at,
        }
    }
}

// ---- finance ----

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SettleRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub amount: Option<Money>,
    /// Register the payment as a movement on this (open) cash box.
    #[serde(default)]
    pub cash_box_id: Option<CashBoxId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenCashBoxRequest {
    pub name: String,
    #[serde(default)]
    pub opening_balance: Money,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CloseCashBoxRequest {
    #[serde(default)]
    pub counted_balance: Option<Money>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CashBoxView {
    #[serde(flatten)]
    pub cash_box: CashBox,
    pub balance: Money,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DashboardQuery {
    pub date: Option<NaiveDate>,
}
