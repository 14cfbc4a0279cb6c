//! Accounts payable and receivable, cash boxes and the financial reports.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use retailpos_core::{CashBoxId, Page, PayableId, ReceivableId};
use retailpos_finance::{
    AccountPayable, AccountReceivable, CashMovement, Dre, FinancialSummary, NewCashMovement, NewPayable,
    NewReceivable, PayablePatch, ReceivablePatch, TitleFilter,
};

use crate::app::dto::{
    AppJson, AppQuery, CashBoxView, CloseCashBoxRequest, OpenCashBoxRequest, PageParams, PeriodParams,
    SettleRequest,
};
use crate::app::routes::common::{ApiResult, created, parse_id};
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/accounts-payable", get(list_payables).post(create_payable))
        .route(
            "/accounts-payable/:id",
            get(get_payable).put(update_payable).delete(delete_payable),
        )
        .route("/accounts-payable/:id/pay", post(pay_payable))
        .route("/accounts-payable/:id/cancel", post(cancel_payable))
        .route("/accounts-receivable", get(list_receivables).post(create_receivable))
        .route(
            "/accounts-receivable/:id",
            get(get_receivable).put(update_receivable).delete(delete_receivable),
        )
        .route("/accounts-receivable/:id/receive", post(receive_receivable))
        .route("/accounts-receivable/:id/cancel", post(cancel_receivable))
        .route("/cash-boxes", get(list_cash_boxes).post(open_cash_box))
        .route("/cash-boxes/:id", get(get_cash_box))
        .route("/cash-boxes/:id/close", post(close_cash_box))
        .route("/cash-boxes/:id/movements", get(cash_movements).post(add_cash_movement))
        .route("/dre", get(dre))
        .route("/summary", get(summary))
}

// ---- payables ----

pub async fn list_payables(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(page): AppQuery<PageParams>,
    AppQuery(filter): AppQuery<TitleFilter>,
) -> ApiResult<Json<Page<AccountPayable>>> {
    require(&principal, "finance.read")?;
    Ok(Json(services.list_payables(&filter, page.request()).await?))
}

pub async fn create_payable(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<NewPayable>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, "finance.write")?;
    Ok(created(services.create_payable(body).await?))
}

pub async fn get_payable(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<AccountPayable>> {
    require(&principal, "finance.read")?;
    let id: PayableId = parse_id(&id)?;
    Ok(Json(services.get_payable(id).await?))
}

pub async fn update_payable(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    AppJson(body): AppJson<PayablePatch>,
) -> ApiResult<Json<AccountPayable>> {
    require(&principal, "finance.write")?;
    let id: PayableId = parse_id(&id)?;
    Ok(Json(services.update_payable(id, body).await?))
}

pub async fn delete_payable(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    require(&principal, "finance.write")?;
    let id: PayableId = parse_id(&id)?;
    services.delete_payable(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// An empty body pays the full amount today.
pub async fn pay_payable(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<AppJson<SettleRequest>>,
) -> ApiResult<Json<AccountPayable>> {
    require(&principal, "finance.write")?;
    let id: PayableId = parse_id(&id)?;
    let request = body.map(|AppJson(b)| b).unwrap_or_default();
    let user_id = principal.principal().user_id;
    Ok(Json(services.pay_payable(id, request, user_id).await?))
}

pub async fn cancel_payable(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<AccountPayable>> {
    require(&principal, "finance.write")?;
    let id: PayableId = parse_id(&id)?;
    Ok(Json(services.cancel_payable(id).await?))
}

// ---- receivables ----

pub async fn list_receivables(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(page): AppQuery<PageParams>,
    AppQuery(filter): AppQuery<TitleFilter>,
) -> ApiResult<Json<Page<AccountReceivable>>> {
    require(&principal, "finance.read")?;
    Ok(Json(services.list_receivables(&filter, page.request()).await?))
}

pub async fn create_receivable(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<NewReceivable>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, "finance.write")?;
    Ok(created(services.create_receivable(body).await?))
}

pub async fn get_receivable(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<AccountReceivable>> {
    require(&principal, "finance.read")?;
    let id: ReceivableId = parse_id(&id)?;
    Ok(Json(services.get_receivable(id).await?))
}

pub async fn update_receivable(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    AppJson(body): AppJson<ReceivablePatch>,
) -> ApiResult<Json<AccountReceivable>> {
    require(&principal, "finance.write")?;
    let id: ReceivableId = parse_id(&id)?;
    Ok(Json(services.update_receivable(id, body).await?))
}

pub async fn delete_receivable(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    require(&principal, "finance.write")?;
    let id: ReceivableId = parse_id(&id)?;
    services.delete_receivable(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn receive_receivable(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<AppJson<SettleRequest>>,
) -> ApiResult<Json<AccountReceivable>> {
    require(&principal, "finance.write")?;
    let id: ReceivableId = parse_id(&id)?;
    let request = body.map(|AppJson(b)| b).unwrap_or_default();
    let user_id = principal.principal().user_id;
    Ok(Json(services.receive_receivable(id, request, user_id).await?))
}

pub async fn cancel_receivable(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<AccountReceivable>> {
    require(&principal, "finance.write")?;
    let id: ReceivableId = parse_id(&id)?;
    Ok(Json(services.cancel_receivable(id).await?))
}

// ---- cash boxes ----

pub async fn list_cash_boxes(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(page): AppQuery<PageParams>,
) -> ApiResult<Json<Page<CashBoxView>>> {
    require(&principal, "cash.read")?;
    Ok(Json(services.list_cash_boxes(page.request()).await?))
}

pub async fn open_cash_box(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<OpenCashBoxRequest>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, "cash.operate")?;
    let user_id = principal.principal().user_id;
    Ok(created(services.open_cash_box(body, user_id).await?))
}

pub async fn get_cash_box(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<CashBoxView>> {
    require(&principal, "cash.read")?;
    let id: CashBoxId = parse_id(&id)?;
    Ok(Json(services.get_cash_box(id).await?))
}

pub async fn close_cash_box(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<AppJson<CloseCashBoxRequest>>,
) -> ApiResult<Json<CashBoxView>> {
    require(&principal, "cash.operate")?;
    let id: CashBoxId = parse_id(&id)?;
    let request = body.map(|AppJson(b)| b).unwrap_or_default();
    let user_id = principal.principal().user_id;
    Ok(Json(services.close_cash_box(id, request, user_id).await?))
}

pub async fn cash_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<CashMovement>>> {
    require(&principal, "cash.read")?;
    let id: CashBoxId = parse_id(&id)?;
    Ok(Json(services.cash_movements(id).await?))
}

pub async fn add_cash_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    AppJson(body): AppJson<NewCashMovement>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, "cash.operate")?;
    let id: CashBoxId = parse_id(&id)?;
    let user_id = principal.principal().user_id;
    Ok(created(services.add_cash_movement(id, body, user_id).await?))
}

// ---- reports ----

pub async fn dre(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(period): AppQuery<PeriodParams>,
) -> ApiResult<Json<Dre>> {
    require(&principal, "finance.read")?;
    Ok(Json(services.dre(period.range()?).await?))
}

pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<FinancialSummary>> {
    require(&principal, "finance.read")?;
    Ok(Json(services.financial_summary().await?))
}
