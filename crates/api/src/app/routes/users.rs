use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use retailpos_auth::{NewUser, UserPatch};
use retailpos_core::{Page, UserId};

use crate::app::dto::{AppJson, AppQuery, PageParams, UserView};
use crate::app::routes::common::{ApiResult, created, parse_id};
use crate::app::services::AppServices;
use crate::authz::require;
use crate::context::PrincipalContext;

const PERMISSION: &str = "users.manage";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppQuery(page): AppQuery<PageParams>,
) -> ApiResult<Json<Page<UserView>>> {
    require(&principal, PERMISSION)?;
    Ok(Json(services.list_users(page.request()).await?))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    AppJson(body): AppJson<NewUser>,
) -> ApiResult<impl IntoResponse> {
    require(&principal, PERMISSION)?;
    Ok(created(services.create_user(body).await?))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<UserView>> {
    require(&principal, PERMISSION)?;
    let id: UserId = parse_id(&id)?;
    Ok(Json(services.get_user(id).await?))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    AppJson(body): AppJson<UserPatch>,
) -> ApiResult<Json<UserView>> {
    require(&principal, PERMISSION)?;
    let id: UserId = parse_id(&id)?;
    Ok(Json(services.update_user(id, body, principal.principal().user_id).await?))
}

/// Deactivates the account.
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    require(&principal, PERMISSION)?;
    let id: UserId = parse_id(&id)?;
    services.deactivate_user(id, principal.principal().user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
