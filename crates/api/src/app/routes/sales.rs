use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    response::IntoResponse,
    routing::{get, post},
};

use retailpos_core::{Page, SaleId};
use retailpos_sales::Sale;

use crate::app::dto::{AppJson, AppQuery, CancelSaleRequest, CheckoutRequest, PageParams, PeriodParams, SaleFilter, SalesReport};
use crate::app::routes::common::{ApiResult, created, parse_id};
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_sales).post(checkout))
        .route("/summary", get(summary))
        .route("/:id", get(get_sale))
        .route("/:id/cancel", post(cancel_sale))
}

pub async fn list_sales(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(page): AppQuery<PageParams>,
    AppQuery(period): AppQuery<PeriodParams>,
    AppQuery(filter): AppQuery<SaleFilter>,
) -> ApiResult<Json<Page<Sale>>> {
    require(&principal, "sales.read")?;
    Ok(Json(services.list_sales(period.range()?, &filter, page.request()).await?))
}

pub async fn checkout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<CheckoutRequest>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, "sales.create")?;
    let user_id = principal.principal().user_id;
    Ok(created(services.checkout(body, user_id).await?))
}

/// Defaults to month-to-date.
pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(period): AppQuery<PeriodParams>,
) -> ApiResult<Json<SalesReport>> {
    require(&principal, "sales.read")?;
    Ok(Json(services.sales_report(period.range()?).await?))
}

pub async fn get_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Sale>> {
    require(&principal, "sales.read")?;
    let id: SaleId = parse_id(&id)?;
    Ok(Json(services.get_sale(id).await?))
}

pub async fn cancel_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<AppJson<CancelSaleRequest>>,
) -> ApiResult<Json<Sale>> {
    require(&principal, "sales.cancel")?;
    let id: SaleId = parse_id(&id)?;
    let reason = body.and_then(|AppJson(b)| b.reason);
    let user_id = principal.principal().user_id;
    Ok(Json(services.cancel_sale(id, reason, user_id).await?))
}
