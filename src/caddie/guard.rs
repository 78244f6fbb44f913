//! Edge guard run in front of every page navigation.
//!
//! The decision is a pure function of the path, the auth-token cookie and the
//! clock. Invalid sessions are never distinguished to the client: malformed,
//! unknown-subject and expired tokens all lead to the same response.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

use crate::caddie::{
    config::GateConfig,
    routes::{RouteClass, RouteTable},
};
use crate::session::{now_ms, RequestCookies, SessionCookies, TokenPolicy};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    /// Allow, deleting both session cookies on the response.
    AllowAndClear,
    Redirect(String),
    /// Redirect, deleting both session cookies on the redirect.
    RedirectAndClear(String),
}

impl Verdict {
    #[must_use]
    pub fn clears_session(&self) -> bool {
        matches!(self, Verdict::AllowAndClear | Verdict::RedirectAndClear(_))
    }
}

#[derive(Clone, Debug)]
pub struct EdgeGuard {
    routes: RouteTable,
    policy: TokenPolicy,
    cookies: SessionCookies,
    dashboard_path: String,
}

impl EdgeGuard {
    #[must_use]
    pub fn new(config: &GateConfig) -> Self {
        Self {
            routes: RouteTable::new(config.login_path()),
            policy: config.token_policy().clone(),
            cookies: SessionCookies::new(config.secure_cookies()),
            dashboard_path: config.dashboard_path().to_string(),
        }
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decide what to do with a navigation to `path`.
    #[must_use]
    pub fn evaluate(&self, path: &str, token: Option<&str>, now_ms: u64) -> Verdict {
        let class = self.routes.classify(path);
        let session = token.map(|token| self.token_is_valid(token, now_ms));

        match (class, session) {
            (RouteClass::Protected, None) => Verdict::Redirect(self.routes.login_path().to_string()),
            (RouteClass::Protected, Some(false)) => {
                Verdict::RedirectAndClear(self.routes.login_path().to_string())
            }
            (RouteClass::Public, Some(true)) => Verdict::Redirect(self.dashboard_path.clone()),
            (RouteClass::Public | RouteClass::Home, Some(false)) => Verdict::AllowAndClear,
            _ => Verdict::Allow,
        }
    }

    fn token_is_valid(&self, token: &str, now_ms: u64) -> bool {
        match self.policy.validate(token, now_ms) {
            Ok(subject) => {
                debug!(subject, "Session token accepted");
                true
            }
            Err(reason) => {
                debug!(%reason, "Session token rejected");
                false
            }
        }
    }

    fn clear(&self, response: &mut Response) {
        if let Err(err) = self.cookies.append_clear(response.headers_mut()) {
            error!("Failed to build session cookie deletion: {err}");
        }
    }
}

/// `axum::middleware::from_fn_with_state` entry point.
pub async fn edge_guard(State(guard): State<Arc<EdgeGuard>>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if !guard.routes().is_guarded(&path) {
        return next.run(request).await;
    }

    let cookies = RequestCookies::from_headers(request.headers());
    let verdict = guard.evaluate(&path, cookies.auth_token(), now_ms());
    debug!(%path, ?verdict, "Edge guard verdict");

    match verdict {
        Verdict::Allow => next.run(request).await,
        Verdict::AllowAndClear => {
            let mut response = next.run(request).await;
            guard.clear(&mut response);
            response
        }
        Verdict::Redirect(location) => Redirect::temporary(&location).into_response(),
        Verdict::RedirectAndClear(location) => {
            let mut response = Redirect::temporary(&location).into_response();
            guard.clear(&mut response);
            response
        }
    }
}
