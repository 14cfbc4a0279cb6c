//! Request middleware: access log, cookie sessions with CSRF, and the
//! authenticated-principal guard.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Request, header},
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};

use retailpos_auth::Session;

use crate::app::errors::ServiceError;
use crate::app::services::{AppServices, ServiceSettings};
use crate::context::{PrincipalContext, SessionContext};

pub const SESSION_COOKIE: &str = "retailpos_sid";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// One log line per request.
pub async fn request_log(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

/// Resolve the session cookie and enforce CSRF on state-changing methods.
///
/// Runs on every route, public ones included, so that `POST /auth/login`
/// also needs a session obtained from `GET /auth/csrf`.
pub async fn session_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ServiceError> {
    let session = match session_cookie(req.headers()) {
        Some(raw) => services.resolve_session(&raw).await?,
        None => None,
    };

    if is_state_changing(req.method()) {
        let presented = req.headers().get(CSRF_HEADER).and_then(|v| v.to_str().ok());
        let valid = match (&session, presented) {
            (Some(session), Some(token)) => session.verify_csrf(token),
            _ => false,
        };
        if !valid {
            warn!(method = %req.method(), path = %req.uri().path(), "CSRF check failed");
            return Err(ServiceError::Csrf);
        }
    }

    if let Some(session) = session {
        req.extensions_mut().insert(SessionContext(session));
    }
    Ok(next.run(req).await)
}

/// Require a logged-in, active user and attach their [`PrincipalContext`].
pub async fn principal_middleware(
    State(services): State<Arc<AppServices>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ServiceError> {
    let SessionContext(session) = req
        .extensions()
        .get::<SessionContext>()
        .cloned()
        .ok_or(ServiceError::Unauthenticated)?;

    let principal = services.principal_for(&session).await?;
    req.extensions_mut().insert(PrincipalContext(principal));
    Ok(next.run(req).await)
}

fn is_state_changing(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{SESSION_COOKIE}=");
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|part| part.trim().strip_prefix(prefix.as_str()).map(str::to_string))
        .filter(|id| !id.is_empty())
}

/// `Set-Cookie` value carrying `session`.
pub fn session_cookie_value(session: &Session, settings: &ServiceSettings) -> String {
    cookie(session.id.as_str(), settings.session_ttl.num_seconds(), settings.cookie_secure)
}

/// `Set-Cookie` value that clears the session cookie.
pub fn cleared_cookie_value(settings: &ServiceSettings) -> String {
    cookie("", 0, settings.cookie_secure)
}

fn cookie(value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::{Duration, Utc};

    #[test]
    fn finds_session_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; retailpos_sid=abc123 ; lang=pt"));
        assert_eq!(session_cookie(&headers).as_deref(), Some("abc123"));

        let mut empty = HeaderMap::new();
        empty.insert(header::COOKIE, HeaderValue::from_static("retailpos_sid="));
        assert_eq!(session_cookie(&empty), None);
    }

    #[test]
    fn cookie_attributes() {
        let session = Session::anonymous(Utc::now(), Duration::hours(12));
        let mut settings = crate::app::services::ServiceSettings::from_config(&crate::config::ApiConfig::for_tests());
        let value = session_cookie_value(&session, &settings);
        assert!(value.starts_with(&format!("retailpos_sid={}", session.id)));
        assert!(value.contains("HttpOnly; SameSite=Lax; Path=/; Max-Age=43200"));
        assert!(!value.contains("Secure"));

        settings.cookie_secure = true;
        assert!(cleared_cookie_value(&settings).ends_with("Max-Age=0; Secure"));
    }

    #[test]
    fn only_writes_need_csrf() {
        assert!(is_state_changing(&Method::DELETE));
        assert!(!is_state_changing(&Method::GET));
        assert!(!is_state_changing(&Method::OPTIONS));
    }
}
