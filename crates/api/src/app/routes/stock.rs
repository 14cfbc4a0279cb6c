use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use retailpos_core::{LocationId, Page, ProductId};
use retailpos_inventory::{LocationPatch, NewLocation, StockLevel, StockLocation, StockMovement};

use crate::app::dto::{
    AppJson, AppQuery, LevelFilter, MovementFilter, MovementInput, PageParams, StockAlertView, StockLevelView,
    ThresholdsInput, TransferInput,
};
use crate::app::routes::common::{ApiResult, created, parse_id};
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/locations", get(list_locations).post(create_location))
        .route("/locations/:id", put(update_location).delete(delete_location))
        .route("/levels", get(list_levels))
        .route("/levels/:product_id/:location_id", put(update_thresholds))
        .route("/movements", get(list_movements).post(create_movement))
        .route("/transfers", post(create_transfer))
        .route("/alerts", get(list_alerts))
}

pub async fn list_locations(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<Vec<StockLocation>>> {
    require(&principal, "stock.read")?;
    Ok(Json(services.list_locations().await?))
}

pub async fn create_location(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<NewLocation>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, "stock.write")?;
    Ok(created(services.create_location(body).await?))
}

pub async fn update_location(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    AppJson(body): AppJson<LocationPatch>,
) -> ApiResult<Json<StockLocation>> {
    require(&principal, "stock.write")?;
    let id: LocationId = parse_id(&id)?;
    Ok(Json(services.update_location(id, body).await?))
}

pub async fn delete_location(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    require(&principal, "stock.write")?;
    let id: LocationId = parse_id(&id)?;
    services.delete_location(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_levels(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(page): AppQuery<PageParams>,
    AppQuery(filter): AppQuery<LevelFilter>,
) -> ApiResult<Json<Page<StockLevelView>>> {
    require(&principal, "stock.read")?;
    Ok(Json(services.list_levels(&filter, page.request()).await?))
}

pub async fn update_thresholds(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((product_id, location_id)): Path<(String, String)>,
    AppJson(body): AppJson<ThresholdsInput>,
) -> ApiResult<Json<StockLevel>> {
    require(&principal, "stock.write")?;
    let product_id: ProductId = parse_id(&product_id)?;
    let location_id: LocationId = parse_id(&location_id)?;
    Ok(Json(services.set_level_thresholds(product_id, location_id, body).await?))
}

pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(page): AppQuery<PageParams>,
    AppQuery(filter): AppQuery<MovementFilter>,
) -> ApiResult<Json<Page<StockMovement>>> {
    require(&principal, "stock.read")?;
    Ok(Json(services.list_movements(&filter, page.request()).await?))
}

pub async fn create_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<MovementInput>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, "stock.write")?;
    let user_id = principal.principal().user_id;
    Ok(created(services.record_movement(body, user_id).await?))
}

pub async fn create_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<TransferInput>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, "stock.write")?;
    let user_id = principal.principal().user_id;
    Ok(created(services.transfer_stock(body, user_id).await?))
}

pub async fn list_alerts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<Vec<StockAlertView>>> {
    require(&principal, "stock.read")?;
    Ok(Json(services.stock_alerts().await?))
}
