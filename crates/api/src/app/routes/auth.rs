use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};

use crate::app::dto::{AppJson, CsrfResponse, LoginRequest, LoginResponse, MeResponse, UserView};
use crate::app::routes::common::ApiResult;
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, SessionContext};
use crate::middleware::{cleared_cookie_value, session_cookie_value};

/// Routes reachable without a logged-in user.
pub fn public_router() -> Router {
    Router::new()
        .route("/csrf", get(csrf))
        .route("/login", post(login))
}

pub fn router() -> Router {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// Reuse the caller's session token, or start an anonymous session.
pub async fn csrf(
    Extension(services): Extension<Arc<AppServices>>,
    session: Option<Extension<SessionContext>>,
) -> ApiResult<impl IntoResponse> {
    let (session, fresh) = match session {
        Some(Extension(SessionContext(session))) => (session, false),
        None => (services.start_anonymous_session().await?, true),
    };
    let cookie = fresh.then(|| [(header::SET_COOKIE, session_cookie_value(&session, services.settings()))]);
    Ok((
        cookie,
        Json(CsrfResponse {
            csrf_token: session.csrf_token,
        }),
    ))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    session: Option<Extension<SessionContext>>,
    AppJson(body): AppJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let current = session.map(|Extension(SessionContext(s))| s);
    let (session, user) = services.login(current.as_ref(), &body.email, &body.password).await?;
    Ok((
        [(header::SET_COOKIE, session_cookie_value(&session, services.settings()))],
        Json(LoginResponse {
            user: UserView::from(&user),
            csrf_token: session.csrf_token,
        }),
    ))
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(SessionContext(session)): Extension<SessionContext>,
) -> ApiResult<impl IntoResponse> {
    services.logout(&session).await?;
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, cleared_cookie_value(services.settings()))],
    ))
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<MeResponse>> {
    let principal = principal.principal();
    let user = services.current_user(principal.user_id).await?;
    Ok(Json(MeResponse {
        user: UserView::from(&user),
        permissions: principal.permissions.iter().map(|p| p.as_str().to_string()).collect(),
    }))
}
