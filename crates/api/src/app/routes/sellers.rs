use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use retailpos_core::{Page, SellerId};
use retailpos_sales::{NewSeller, Seller, SellerPatch, SellerPerformance};

use crate::app::dto::{AppJson, AppQuery, PageParams, PeriodParams, SellerFilter};
use crate::app::routes::common::{ApiResult, created, parse_id};
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_sellers).post(create_seller))
        .route("/performance", get(performance))
        .route("/:id", get(get_seller).put(update_seller).delete(delete_seller))
}

pub async fn list_sellers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(page): AppQuery<PageParams>,
    AppQuery(filter): AppQuery<SellerFilter>,
) -> ApiResult<Json<Page<Seller>>> {
    require(&principal, "sales.read")?;
    Ok(Json(services.list_sellers(&filter, page.request()).await?))
}

pub async fn performance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(period): AppQuery<PeriodParams>,
) -> ApiResult<Json<Vec<SellerPerformance>>> {
    require(&principal, "sales.read")?;
    Ok(Json(services.seller_performance(period.range()?).await?))
}

pub async fn create_seller(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<NewSeller>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, "sellers.write")?;
    Ok(created(services.create_seller(body).await?))
}

pub async fn get_seller(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Seller>> {
    require(&principal, "sales.read")?;
    let id: SellerId = parse_id(&id)?;
    Ok(Json(services.get_seller(id).await?))
}

pub async fn update_seller(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    AppJson(body): AppJson<SellerPatch>,
) -> ApiResult<Json<Seller>> {
    require(&principal, "sellers.write")?;
    let id: SellerId = parse_id(&id)?;
    Ok(Json(services.update_seller(id, body).await?))
}

/// Deactivates the seller.
pub async fn delete_seller(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    require(&principal, "sellers.write")?;
    let id: SellerId = parse_id(&id)?;
    services.deactivate_seller(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
