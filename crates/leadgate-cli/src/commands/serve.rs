use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use leadgate_api::{LeadgateError, Registration};
use leadgate_auth::{Outcome, RequestParts, SessionClaims, TenantScope};
use leadgate_runtime::{LeadgateRuntime, SessionGrant};
use serde::Deserialize;
use serde_json::json;

#[derive(Clone)]
struct AppState {
    runtime: Arc<LeadgateRuntime>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginBody {
    email: String,
    password: String,
}

pub async fn run(runtime: Arc<LeadgateRuntime>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "leadgate listening");
    axum::serve(listener, router(runtime)).await?;
    Ok(())
}

pub fn router(runtime: Arc<LeadgateRuntime>) -> Router {
    let state = AppState { runtime };
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
        .fallback(page)
        .layer(middleware::from_fn_with_state(state.clone(), gate))
        .with_state(state)
}

// ─── Gate middleware ────────────────────────────────────────────────────────

async fn gate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let cookie = joined_cookies(req.headers());
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut parts = RequestParts::new(&path);
    if let Some(c) = cookie.as_deref() {
        parts = parts.with_cookie_header(c);
    }
    if let Some(a) = authorization.as_deref() {
        parts = parts.with_authorization(a);
    }
    let decision = state.runtime.evaluate(&parts);

    match decision.outcome {
        Outcome::Allow => {
            if let Some(scope) = decision.tenant_scope() {
                req.extensions_mut().insert(scope);
            }
            if let Some(claims) = decision.session {
                req.extensions_mut().insert(claims);
            }
            next.run(req).await
        }
        Outcome::RedirectToLogin { location } | Outcome::RedirectToHome { location } => {
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
    }
}

/// HTTP/2 may split cookies over several headers.
fn joined_cookies(headers: &HeaderMap) -> Option<String> {
    let parts: Vec<&str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    (!parts.is_empty()).then(|| parts.join("; "))
}

// ─── Auth endpoints ─────────────────────────────────────────────────────────

async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> Response {
    let Ok(Json(body)) = body else {
        return error_response(&LeadgateError::Validation("invalid request body".to_string()));
    };
    let runtime = state.runtime.clone();
    let result = blocking(move || runtime.login(&body.email, &body.password)).await;
    match result {
        Ok(grant) => grant_response(StatusCode::OK, "Login successful", grant),
        Err(e) => error_response(&e),
    }
}

async fn signup(
    State(state): State<AppState>,
    body: Result<Json<Registration>, JsonRejection>,
) -> Response {
    let Ok(Json(registration)) = body else {
        return error_response(&LeadgateError::Validation("invalid request body".to_string()));
    };
    let runtime = state.runtime.clone();
    let result = blocking(move || runtime.register(&registration)).await;
    match result {
        Ok(grant) => grant_response(StatusCode::CREATED, "Account created", grant),
        Err(e) => error_response(&e),
    }
}

async fn me(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let mut parts = RequestParts::new(uri.path());
    if let Some(a) = authorization {
        parts = parts.with_authorization(a);
    }
    match state.runtime.whoami(&parts) {
        Ok(profile) => Json(json!({ "user": profile })).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn logout(State(state): State<AppState>) -> Response {
    match state.runtime.logout_cookie() {
        Ok(clear) => (
            StatusCode::OK,
            [(header::SET_COOKIE, clear)],
            Json(json!({ "success": true, "message": "Logged out" })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Stand-in for the application's pages: reports what the gate attached.
async fn page(
    uri: Uri,
    claims: Option<Extension<SessionClaims>>,
    scope: Option<Extension<TenantScope>>,
) -> Json<serde_json::Value> {
    Json(json!({
        "path": uri.path(),
        "userId": claims.as_ref().map(|Extension(c)| c.subject_id().to_string()),
        "tenantId": scope.as_ref().map(|Extension(s)| s.tenant_id().to_string()),
    }))
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Password hashing is CPU-bound; keep it off the async workers.
async fn blocking<F, T>(f: F) -> Result<T, LeadgateError>
where
    F: FnOnce() -> Result<T, LeadgateError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| LeadgateError::Internal(format!("worker failed: {e}")))?
}

fn grant_response(status: StatusCode, message: &str, grant: SessionGrant) -> Response {
    (
        status,
        [(header::SET_COOKIE, grant.session.set_cookie)],
        Json(json!({
            "success": true,
            "message": message,
            "token": grant.session.token,
            "user": grant.profile,
        })),
    )
        .into_response()
}

fn error_response(e: &LeadgateError) -> Response {
    let (status, message) = match e {
        LeadgateError::Validation(m) => (StatusCode::BAD_REQUEST, m.as_str()),
        LeadgateError::Auth(m) => (StatusCode::UNAUTHORIZED, m.as_str()),
        LeadgateError::Conflict(m) => (StatusCode::CONFLICT, m.as_str()),
        LeadgateError::NotFound(m) => (StatusCode::NOT_FOUND, m.as_str()),
        LeadgateError::Config(_) | LeadgateError::Internal(_) => {
            tracing::error!(error = %e, "request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    };
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request as HttpRequest;
    use leadgate_connectors::{MemoryCredentialStore, StaticSecretStore};
    use leadgate_core::GateConfig;
    use tower::ServiceExt;

    fn app() -> Router {
        let runtime = LeadgateRuntime::from_config_with(
            &GateConfig::default(),
            &StaticSecretStore::new("serve-test-secret"),
            Box::new(MemoryCredentialStore::new().unwrap()),
        )
        .unwrap();
        router(Arc::new(runtime))
    }

    fn get_req(uri: &str, cookie: Option<&str>, bearer: Option<&str>) -> HttpRequest<Body> {
        let mut b = HttpRequest::builder().uri(uri);
        if let Some(c) = cookie {
            b = b.header(header::COOKIE, c);
        }
        if let Some(t) = bearer {
            b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        b.body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn location(resp: &Response) -> &str {
        resp.headers()[header::LOCATION].to_str().unwrap()
    }

    const SIGNUP: &str = r#"{"fullName":"Ada Lovelace","companyName":"Analytical Engines","email":"ada@engines.test","password":"bernoulli"}"#;

    async fn signup_cookie(app: &Router) -> (String, String) {
        let resp = app.clone().oneshot(post_json("/api/auth/signup", SIGNUP)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let set_cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        let pair = set_cookie.split(';').next().unwrap().to_string();
        let token = body_json(resp).await["token"].as_str().unwrap().to_string();
        (pair, token)
    }

    #[tokio::test]
    async fn protected_page_without_session_redirects_to_login() {
        let resp = app().oneshot(get_req("/dashboard/leads", None, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/login?redirect=%2Fdashboard%2Fleads");
    }

    #[tokio::test]
    async fn public_page_is_served_without_session() {
        let resp = app().oneshot(get_req("/pricing", None, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["path"], "/pricing");
        assert!(body["tenantId"].is_null());
    }

    #[tokio::test]
    async fn forged_cookie_is_treated_as_absent() {
        let resp = app()
            .oneshot(get_req("/dashboard", Some("auth_token=a.b.c"), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/login?redirect=%2Fdashboard");
    }

    #[tokio::test]
    async fn signup_session_reaches_the_dashboard_with_its_tenant() {
        let app = app();
        let (cookie, _) = signup_cookie(&app).await;

        let resp = app
            .clone()
            .oneshot(get_req("/dashboard/leads", Some(&cookie), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert!(body["userId"].is_string());
        assert!(body["tenantId"].is_string());

        let resp = app.oneshot(get_req("/login", Some(&cookie), None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/dashboard");
    }

    #[tokio::test]
    async fn login_errors() {
        let app = app();
        signup_cookie(&app).await;

        let resp = app.clone().oneshot(post_json("/api/auth/login", "{}")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = app.clone().oneshot(post_json("/api/auth/login", "not json")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let wrong = r#"{"email":"ada@engines.test","password":"nope"}"#;
        let resp = app.clone().oneshot(post_json("/api/auth/login", wrong)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["error"], "invalid email or password");

        let ok = r#"{"email":"ADA@engines.test","password":"bernoulli"}"#;
        let resp = app.oneshot(post_json("/api/auth/login", ok)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key(header::SET_COOKIE));
        assert_eq!(body_json(resp).await["user"]["companyName"], "Analytical Engines");
    }

    #[tokio::test]
    async fn duplicate_signup_conflicts() {
        let app = app();
        signup_cookie(&app).await;
        let resp = app.oneshot(post_json("/api/auth/signup", SIGNUP)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn me_requires_a_bearer_token() {
        let app = app();
        let (cookie, token) = signup_cookie(&app).await;

        let resp = app.clone().oneshot(get_req("/api/auth/me", None, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = app
            .clone()
            .oneshot(get_req("/api/auth/me", Some(&cookie), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = app.oneshot(get_req("/api/auth/me", None, Some(&token))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["user"]["email"], "ada@engines.test");
    }

    #[tokio::test]
    async fn dot_segments_do_not_skip_the_gate() {
        let app = app();
        for (raw, target) in [
            ("/api/../dashboard/leads", "/login?redirect=%2Fdashboard%2Fleads"),
            ("/./dashboard", "/login?redirect=%2Fdashboard"),
            ("/static/../dashboard", "/login?redirect=%2Fdashboard"),
        ] {
            let resp = app.clone().oneshot(get_req(raw, None, None)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::FOUND, "{raw}");
            assert_eq!(location(&resp), target, "{raw}");
        }

        let (cookie, _) = signup_cookie(&app).await;
        let resp = app
            .oneshot(get_req("/api/../dashboard", Some(&cookie), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn logout_clears_the_cookie() {
        let resp = app().oneshot(post_json("/api/auth/logout", "")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let clear = resp.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(clear.starts_with("auth_token=;"));
        assert!(clear.contains("Max-Age=0"));
    }

    #[test]
    fn split_cookie_headers_are_joined() {
        let mut h = HeaderMap::new();
        h.append(header::COOKIE, "a=1".parse().unwrap());
        h.append(header::COOKIE, "auth_token=t".parse().unwrap());
        assert_eq!(joined_cookies(&h).as_deref(), Some("a=1; auth_token=t"));
        assert_eq!(joined_cookies(&HeaderMap::new()), None);
    }
}
