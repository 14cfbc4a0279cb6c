use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use retailpos_core::{Page, ProductId};
use retailpos_products::{NewProduct, Product, ProductFilter, ProductPatch};

use crate::app::dto::{AppJson, AppQuery, PageParams};
use crate::app::routes::common::{ApiResult, created, parse_id};
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/categories", get(list_categories))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(page): AppQuery<PageParams>,
    AppQuery(filter): AppQuery<ProductFilter>,
) -> ApiResult<Json<Page<Product>>> {
    require(&principal, "products.read")?;
    Ok(Json(services.list_products(&filter, page.request()).await?))
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<Vec<String>>> {
    require(&principal, "products.read")?;
    Ok(Json(services.product_categories().await?))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<NewProduct>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, "products.write")?;
    Ok(created(services.create_product(body).await?))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    require(&principal, "products.read")?;
    let id: ProductId = parse_id(&id)?;
    Ok(Json(services.get_product(id).await?))
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    AppJson(body): AppJson<ProductPatch>,
) -> ApiResult<Json<Product>> {
    require(&principal, "products.write")?;
    let id: ProductId = parse_id(&id)?;
    Ok(Json(services.update_product(id, body).await?))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    require(&principal, "products.write")?;
    let id: ProductId = parse_id(&id)?;
    services.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
