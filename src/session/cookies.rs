//! Cookie access for the session pair.
//!
//! The server side reads the request `Cookie` header and writes `Set-Cookie`
//! headers on responses. The client side goes through `CookieStore`. Both
//! paths write or delete the auth token and the profile together.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

use super::{ProfileError, UserProfile, AUTH_TOKEN_COOKIE, SESSION_TTL_SECONDS, USER_DATA_COOKIE};

#[derive(Debug, Error)]
pub enum CookieError {
    #[error("invalid cookie header value: {0}")]
    Header(#[from] InvalidHeaderValue),
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Cookies sent with an incoming request.
#[derive(Clone, Debug, Default)]
pub struct RequestCookies {
    pairs: HashMap<String, String>,
}

impl RequestCookies {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut pairs = HashMap::new();
        for header in headers.get_all(COOKIE) {
            let Ok(value) = header.to_str() else {
                continue;
            };
            for pair in value.split(';') {
                let mut parts = pair.trim().splitn(2, '=');
                let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                    continue;
                };
                // first occurrence wins, like browsers sending the most specific path first
                pairs
                    .entry(key.trim().to_string())
                    .or_insert_with(|| val.trim().to_string());
            }
        }
        Self { pairs }
    }

    /// Non-empty value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    #[must_use]
    pub fn auth_token(&self) -> Option<&str> {
        self.get(AUTH_TOKEN_COOKIE)
    }

    #[must_use]
    pub fn user_data(&self) -> Option<&str> {
        self.get(USER_DATA_COOKIE)
    }
}

/// Builds `Set-Cookie` values for the session pair.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionCookies {
    secure: bool,
}

impl SessionCookies {
    #[must_use]
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Both cookies with the session `Max-Age`.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be encoded or either value is
    /// not a valid header.
    pub fn set(&self, token: &str, profile: &UserProfile) -> Result<[HeaderValue; 2], CookieError> {
        let token_cookie = self.cookie(AUTH_TOKEN_COOKIE, token, SESSION_TTL_SECONDS)?;
        let profile_cookie = self.cookie(USER_DATA_COOKIE, &profile.encode()?, SESSION_TTL_SECONDS)?;
        Ok([token_cookie, profile_cookie])
    }

    /// Both cookies expired immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if a header value cannot be built.
    pub fn clear(&self) -> Result<[HeaderValue; 2], InvalidHeaderValue> {
        Ok([
            self.cookie(AUTH_TOKEN_COOKIE, "", 0)?,
            self.cookie(USER_DATA_COOKIE, "", 0)?,
        ])
    }

    /// Append deletion of both cookies to `headers`.
    ///
    /// # Errors
    ///
    /// Returns an error if a header value cannot be built; `headers` is left
    /// untouched in that case.
    pub fn append_clear(&self, headers: &mut HeaderMap) -> Result<(), InvalidHeaderValue> {
        for cookie in self.clear()? {
            headers.append(SET_COOKIE, cookie);
        }
        Ok(())
    }

    fn cookie(&self, name: &str, value: &str, max_age: u64) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!("{name}={value}; Path=/; SameSite=Lax; Max-Age={max_age}");
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}

/// Client-side cookie storage.
pub trait CookieStore: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: String);
    fn remove(&self, name: &str);
}

/// Current session pair, each half optional.
#[must_use]
pub fn read_session(store: &dyn CookieStore) -> (Option<String>, Option<String>) {
    let non_empty = |name| store.get(name).filter(|value| !value.is_empty());
    (non_empty(AUTH_TOKEN_COOKIE), non_empty(USER_DATA_COOKIE))
}

/// Store a fresh session pair.
///
/// # Errors
///
/// Returns an error if the profile cannot be encoded; nothing is written then.
pub fn write_session(
    store: &dyn CookieStore,
    token: &str,
    profile: &UserProfile,
) -> Result<(), ProfileError> {
    let encoded = profile.encode()?;
    store.set(AUTH_TOKEN_COOKIE, token.to_string());
    store.set(USER_DATA_COOKIE, encoded);
    Ok(())
}

pub fn clear_session(store: &dyn CookieStore) {
    store.remove(AUTH_TOKEN_COOKIE);
    store.remove(USER_DATA_COOKIE);
}

/// In-memory `CookieStore`.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<HashMap<String, String>>,
}

impl MemoryCookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieStore for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn set(&self, name: &str, value: String) {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value);
    }

    fn remove(&self, name: &str) {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }
}
