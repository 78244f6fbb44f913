use axum::{
    extract::Extension,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{error, instrument};

use crate::caddie::config::GateConfig;
use crate::session::SessionCookies;

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 303, description = "Session cookies cleared, redirect to the login page")
    ),
    tag = "session"
)]
#[instrument(skip(config))]
pub async fn logout(Extension(config): Extension<Arc<GateConfig>>) -> Response {
    let mut response = Redirect::to(config.login_path()).into_response();

    // Always clear, even if no session cookie was sent.
    if let Err(err) = SessionCookies::new(config.secure_cookies()).append_clear(response.headers_mut()) {
        error!("Failed to build session cookie deletion: {err}");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{
        header::{LOCATION, SET_COOKIE},
        StatusCode,
    };
    use url::Url;

    #[tokio::test]
    async fn logout_clears_both_cookies() {
        let Ok(url) = Url::parse("http://backend.test") else {
            panic!("valid url");
        };
        let config = Arc::new(GateConfig::new(url).with_login_path("/signin"));
        let response = logout(Extension(config)).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).and_then(|v| v.to_str().ok()),
            Some("/signin")
        );
        let cleared: Vec<&str> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        assert_eq!(cleared.len(), 2);
        assert!(cleared.iter().all(|cookie| cookie.contains("Max-Age=0")));
    }
}
