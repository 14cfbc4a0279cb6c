use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    response::IntoResponse,
    routing::{get, post},
};

use retailpos_sales::PixTxId;

use crate::app::dto::{AppJson, AppQuery, CreatePixRequest, PixChargeView, PosProduct, PosProductQuery};
use crate::app::routes::common::{ApiResult, created};
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/products", get(products))
        .route("/pix", post(create_pix))
        .route("/pix/:txid", get(get_pix))
        .route("/pix/:txid/confirm", post(confirm_pix))
}

/// Sellable catalog with stock at the counter's location.
pub async fn products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(query): AppQuery<PosProductQuery>,
) -> ApiResult<Json<Vec<PosProduct>>> {
    require(&principal, "sales.create")?;
    Ok(Json(services.pos_products(&query).await?))
}

pub async fn create_pix(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<CreatePixRequest>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, "pix.operate")?;
    Ok(created(services.create_pix_charge(body).await?))
}

pub async fn get_pix(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(txid): Path<String>,
) -> ApiResult<Json<PixChargeView>> {
    require(&principal, "pix.operate")?;
    let txid = PixTxId::parse(&txid)?;
    Ok(Json(services.get_pix_charge(&txid).await?))
}

/// Mock confirmation standing in for the bank webhook.
pub async fn confirm_pix(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(txid): Path<String>,
) -> ApiResult<Json<PixChargeView>> {
    require(&principal, "pix.operate")?;
    let txid = PixTxId::parse(&txid)?;
    Ok(Json(services.confirm_pix_charge(&txid).await?))
}
