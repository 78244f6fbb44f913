use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{COOKIE, LOCATION, SET_COOKIE},
        Request, StatusCode,
    },
    response::Response,
    Router,
};
use caddie::{
    caddie::{config::GateConfig, router},
    session::{now_ms, AUTH_TOKEN_COOKIE, SESSION_TTL_MS, USER_DATA_COOKIE},
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tower::ServiceExt;
use ulid::Ulid;
use url::Url;

const INDEX: &str = "<html><body>caddie</body></html>";
const DASHBOARD: &str = "<html><body>tee sheet for today</body></html>";

/// Exported frontend in a temp dir, removed on drop.
struct Frontend(PathBuf);

impl Frontend {
    fn new() -> Result<Self> {
        let dir = std::env::temp_dir().join(format!("caddie-frontend-{}", Ulid::new()));
        fs::create_dir_all(dir.join("dashboard"))?;
        fs::write(dir.join("index.html"), INDEX)?;
        fs::write(dir.join("dashboard").join("index.html"), DASHBOARD)?;
        Ok(Self(dir))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for Frontend {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

fn config(frontend: &Frontend) -> Result<GateConfig> {
    Ok(GateConfig::new(Url::parse("http://127.0.0.1:1")?).with_frontend_dir(frontend.path()))
}

// Buffers the body so the response outlives the frontend dir.
async fn send(router: Router, request: Request<Body>) -> Result<Response> {
    let response = router.oneshot(request).await?;
    let (parts, body) = response.into_parts();
    let body = to_bytes(body, usize::MAX).await?;
    Ok(Response::from_parts(parts, Body::from(body)))
}

async fn send_with(
    configure: impl FnOnce(GateConfig) -> GateConfig,
    request: Request<Body>,
) -> Result<Response> {
    let frontend = Frontend::new()?;
    let app = router(configure(config(&frontend)?))?;
    send(app, request).await
}

fn valid_token() -> String {
    format!("token-1-{}", now_ms())
}

fn expired_token() -> String {
    format!("token-2-{}", now_ms() - SESSION_TTL_MS - 1)
}

async fn visit(path: &str, token: Option<&str>) -> Result<Response> {
    let mut request = Request::builder().uri(path);
    if let Some(token) = token {
        request = request.header(COOKIE, format!("{AUTH_TOKEN_COOKIE}={token}; theme=dark"));
    }
    send_with(|config| config, request.body(Body::empty())?).await
}

async fn body_text(response: Response) -> Result<String> {
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(body.to_vec())?)
}

fn location(response: &Response) -> Option<&str> {
    response.headers().get(LOCATION).and_then(|v| v.to_str().ok())
}

fn cleared_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter(|cookie| cookie.contains("Max-Age=0"))
        .filter_map(|cookie| cookie.split('=').next().map(str::to_string))
        .collect()
}

fn assert_session_cleared(response: &Response) {
    let cleared = cleared_cookies(response);
    assert!(cleared.iter().any(|name| name == AUTH_TOKEN_COOKIE));
    assert!(cleared.iter().any(|name| name == USER_DATA_COOKIE));
}

#[tokio::test]
async fn protected_without_cookie_redirects_to_login() -> Result<()> {
    let response = visit("/dashboard", None).await?;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), Some("/login"));
    assert!(response.headers().get(SET_COOKIE).is_none());
    Ok(())
}

#[tokio::test]
async fn protected_with_expired_token_redirects_and_clears() -> Result<()> {
    let response = visit("/caddies/123", Some(&expired_token())).await?;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), Some("/login"));
    assert_session_cleared(&response);
    Ok(())
}

#[tokio::test]
async fn protected_with_unknown_subject_redirects_and_clears() -> Result<()> {
    let response = visit("/golf-courses", Some(&format!("token-3-{}", now_ms()))).await?;
    assert_eq!(location(&response), Some("/login"));
    assert_session_cleared(&response);

    let response = visit("/fields/2", Some("not-a-token")).await?;
    assert_eq!(location(&response), Some("/login"));
    assert_session_cleared(&response);
    Ok(())
}

#[tokio::test]
async fn protected_with_valid_token_serves_page() -> Result<()> {
    let response = visit("/caddies/123", Some(&valid_token())).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SET_COOKIE).is_none());

    assert_eq!(body_text(response).await?, INDEX);
    Ok(())
}

#[tokio::test]
async fn encoded_and_doubled_slash_paths_are_protected() -> Result<()> {
    for path in [
        "/%64ashboard/",
        "//dashboard/",
        "/dashboard//",
        "/./dashboard/",
        "/api/../dashboard/",
        "/%63arts",
    ] {
        let response = visit(path, None).await?;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{path}");
        assert_eq!(location(&response), Some("/login"), "{path}");
        assert!(!body_text(response).await?.contains("tee sheet"), "{path}");

        let response = visit(path, Some(&expired_token())).await?;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{path}");
        assert_session_cleared(&response);
    }
    Ok(())
}

#[tokio::test]
async fn encoded_paths_serve_with_a_valid_token() -> Result<()> {
    for path in ["/dashboard/", "/%64ashboard/", "//dashboard/"] {
        let response = visit(path, Some(&valid_token())).await?;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        assert_eq!(body_text(response).await?, DASHBOARD, "{path}");
    }
    Ok(())
}

#[tokio::test]
async fn encoded_login_with_valid_token_redirects_to_dashboard() -> Result<()> {
    let response = visit("/%6Cogin", Some(&valid_token())).await?;
    assert_eq!(location(&response), Some("/dashboard"));
    Ok(())
}

#[test]
fn frontend_dir_is_removed_on_drop() -> Result<()> {
    let frontend = Frontend::new()?;
    let dir = frontend.path().to_path_buf();
    assert!(dir.join("index.html").exists());
    drop(frontend);
    assert!(!dir.exists());
    Ok(())
}

#[tokio::test]
async fn login_with_valid_token_redirects_to_dashboard() -> Result<()> {
    let response = visit("/login", Some(&valid_token())).await?;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), Some("/dashboard"));
    Ok(())
}

#[tokio::test]
async fn public_with_invalid_token_serves_page_and_clears() -> Result<()> {
    let response = visit("/register", Some(&expired_token())).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_session_cleared(&response);

    let response = visit("/login", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SET_COOKIE).is_none());
    Ok(())
}

#[tokio::test]
async fn home_clears_invalid_session_only() -> Result<()> {
    let response = visit("/", Some(&expired_token())).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_session_cleared(&response);

    let response = visit("/", Some(&valid_token())).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SET_COOKIE).is_none());
    Ok(())
}

#[tokio::test]
async fn excluded_paths_skip_the_guard() -> Result<()> {
    for path in ["/_next/static/chunks/app.js", "/favicon.ico"] {
        let response = visit(path, Some(&expired_token())).await?;
        assert!(location(&response).is_none(), "{path}");
        assert!(response.headers().get(SET_COOKIE).is_none(), "{path}");
    }
    Ok(())
}

#[tokio::test]
async fn lookalike_paths_are_not_protected() -> Result<()> {
    let response = visit("/cartsy", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(location(&response).is_none());
    Ok(())
}

#[tokio::test]
async fn custom_login_path() -> Result<()> {
    let request = Request::builder().uri("/works").body(Body::empty())?;
    let response = send_with(|config| config.with_login_path("/signin"), request).await?;
    assert_eq!(location(&response), Some("/signin"));
    Ok(())
}

#[tokio::test]
async fn logout_clears_and_redirects() -> Result<()> {
    let request = Request::builder()
        .method("POST")
        .uri("/logout")
        .header(COOKIE, format!("{AUTH_TOKEN_COOKIE}={}", valid_token()))
        .body(Body::empty())?;
    let response = send_with(|config| config, request).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
    assert_session_cleared(&response);
    Ok(())
}

#[tokio::test]
async fn health_and_request_id() -> Result<()> {
    let response = visit("/health", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-app").is_some());
    assert!(response.headers().get("x-request-id").is_some());

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-me")
        .body(Body::empty())?;
    let response = send_with(|config| config, request).await?;
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("trace-me")
    );
    Ok(())
}
