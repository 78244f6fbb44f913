//! Session primitives shared by the edge guard and the client provider.
//!
//! A session is the pair (auth token, user profile) stored in two cookies.
//! Nothing here performs I/O: validation is a pure function of the cookie
//! contents and the wall clock, so the guard can run it on every navigation.

pub mod cookies;
pub mod profile;
pub mod token;

pub use self::cookies::{
    clear_session, read_session, write_session, CookieError, CookieStore, MemoryCookieJar,
    RequestCookies, SessionCookies,
};
pub use self::profile::{ProfileError, Role, UserProfile};
pub use self::token::{TokenError, TokenPolicy};

use std::time::{SystemTime, UNIX_EPOCH};

/// Cookie holding the opaque auth token.
pub const AUTH_TOKEN_COOKIE: &str = "caddie_auth_token";

/// Cookie holding the serialized user profile.
pub const USER_DATA_COOKIE: &str = "caddie_user_data";

/// Session lifetime; the token TTL and the cookie `Max-Age` share it.
pub const SESSION_TTL_MS: u64 = 7 * 24 * 60 * 60 * 1000;

/// Cookie `Max-Age` in seconds.
pub const SESSION_TTL_SECONDS: u64 = SESSION_TTL_MS / 1000;

/// Current wall-clock time in epoch milliseconds.
///
/// A clock before the epoch reads as zero, which makes every token look
/// issued in the future rather than panicking.
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
        })
}
