use std::sync::Arc;

use axum::{Json, extract::Extension};

use crate::app::dto::{AppQuery, DashboardQuery};
use crate::app::routes::common::ApiResult;
use crate::app::services::{AppServices, Dashboard};
use crate::authz::require;
use crate::context::PrincipalContext;

pub async fn dashboard(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(query): AppQuery<DashboardQuery>,
) -> ApiResult<Json<Dashboard>> {
    require(&principal, "dashboard.read")?;
    Ok(Json(services.dashboard(query.date).await?))
}
