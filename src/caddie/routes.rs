//! Static partition of request paths.

/// Prefixes that require a valid session.
pub const PROTECTED_PREFIXES: [&str; 8] = [
    "/dashboard",
    "/caddies",
    "/golf-courses",
    "/users",
    "/announcements",
    "/works",
    "/carts",
    "/fields",
];

pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const HOME_PATH: &str = "/";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// The guard never sees paths starting with these: API traffic, framework
/// assets and the favicon. Matching is a raw prefix test, so `/apis` is
/// excluded as well.
pub const MATCHER_EXCLUSIONS: [&str; 4] = ["/api", "/_next/static", "/_next/image", "/favicon.ico"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteClass {
    Protected,
    Public,
    Home,
    Neutral,
}

#[derive(Clone, Debug)]
pub struct RouteTable {
    login_path: String,
}

impl RouteTable {
    #[must_use]
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Whether the edge guard runs for `path` at all.
    ///
    /// A path is skipped only when both its raw and canonical forms are
    /// excluded, so `/api/../dashboard` is still guarded.
    #[must_use]
    pub fn is_guarded(&self, path: &str) -> bool {
        !is_excluded(path) || !is_excluded(&canonical(path))
    }

    /// Protected wins over public, public over home.
    ///
    /// Classification runs on the canonical path, the same one the file
    /// server resolves.
    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClass {
        if !self.is_guarded(path) {
            return RouteClass::Neutral;
        }

        let path = canonical(path);

        if is_protected(&path) {
            RouteClass::Protected
        } else if within(&path, &self.login_path) || within(&path, REGISTER_PATH) {
            RouteClass::Public
        } else if path == HOME_PATH {
            RouteClass::Home
        } else {
            RouteClass::Neutral
        }
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_PATH)
    }
}

/// Whether `path` falls under one of the `PROTECTED_PREFIXES`.
#[must_use]
pub fn is_protected(path: &str) -> bool {
    PROTECTED_PREFIXES
        .iter()
        .any(|prefix| within(path, prefix))
}

/// Percent-decoded path with empty and `.` segments dropped and `..`
/// resolved, always starting with `/`. Undecodable input is kept as-is; the
/// file server rejects it too.
#[must_use]
pub fn canonical(path: &str) -> String {
    let decoded = urlencoding::decode(path).unwrap_or(std::borrow::Cow::Borrowed(path));

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}

fn is_excluded(path: &str) -> bool {
    MATCHER_EXCLUSIONS
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

// `/carts` covers `/carts` and `/carts/7` but not `/cartsy`.
fn within(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
