use std::path::{Path, PathBuf};
use url::Url;

use crate::caddie::routes::{DASHBOARD_PATH, DEFAULT_LOGIN_PATH};
use crate::session::TokenPolicy;

const DEFAULT_FRONTEND_DIR: &str = "out";

/// Runtime configuration of the gate, assembled by the CLI.
#[derive(Clone, Debug)]
pub struct GateConfig {
    backend_url: Url,
    frontend_dir: PathBuf,
    login_path: String,
    dashboard_path: String,
    token_policy: TokenPolicy,
    secure_cookies: bool,
}

impl GateConfig {
    #[must_use]
    pub fn new(backend_url: Url) -> Self {
        Self {
            backend_url,
            frontend_dir: PathBuf::from(DEFAULT_FRONTEND_DIR),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            dashboard_path: DASHBOARD_PATH.to_string(),
            token_policy: TokenPolicy::default(),
            secure_cookies: false,
        }
    }

    #[must_use]
    pub fn with_frontend_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.frontend_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    #[must_use]
    pub fn with_token_policy(mut self, policy: TokenPolicy) -> Self {
        self.token_policy = policy;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn backend_url(&self) -> &Url {
        &self.backend_url
    }

    #[must_use]
    pub fn frontend_dir(&self) -> &Path {
        &self.frontend_dir
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn dashboard_path(&self) -> &str {
        &self.dashboard_path
    }

    #[must_use]
    pub fn token_policy(&self) -> &TokenPolicy {
        &self.token_policy
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }
}
