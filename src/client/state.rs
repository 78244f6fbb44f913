//! Auth session state shared with UI code.
//!
//! `AuthProvider` owns the state for one application mount: `init` runs the
//! first validation pass, `spawn_revalidation` keeps it fresh, and `teardown`
//! stops revalidation and forgets the user. Consumers read an `AuthSnapshot`
//! or subscribe to changes. Revalidations are idempotent for identical cookie
//! contents, so the last completed pass simply wins.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::{sync::watch, task::JoinHandle, time::interval};
use tracing::{debug, warn};

use crate::session::{
    clear_session, now_ms, read_session, CookieStore, Role, TokenPolicy, UserProfile,
};

const MIN_REVALIDATION_PERIOD: Duration = Duration::from_millis(10);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthSnapshot {
    user: Option<UserProfile>,
    is_loading: bool,
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self::loading()
    }
}

impl AuthSnapshot {
    /// State before the first validation pass completes.
    #[must_use]
    pub fn loading() -> Self {
        Self {
            user: None,
            is_loading: true,
        }
    }

    #[must_use]
    pub fn resolved(user: Option<UserProfile>) -> Self {
        Self {
            user,
            is_loading: false,
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Always false while loading.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.is_loading && self.user.is_some()
    }

    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.user.as_ref().is_some_and(|user| user.role == role)
    }

    #[must_use]
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.user
            .as_ref()
            .is_some_and(|user| roles.contains(&user.role))
    }
}

pub struct AuthProvider {
    cookies: Arc<dyn CookieStore>,
    policy: TokenPolicy,
    state: watch::Sender<AuthSnapshot>,
    revalidation: Mutex<Option<JoinHandle<()>>>,
}

impl AuthProvider {
    #[must_use]
    pub fn new(cookies: Arc<dyn CookieStore>, policy: TokenPolicy) -> Arc<Self> {
        let (state, _) = watch::channel(AuthSnapshot::loading());
        Arc::new(Self {
            cookies,
            policy,
            state,
            revalidation: Mutex::new(None),
        })
    }

    /// First validation pass, run on mount.
    pub fn init(&self) -> bool {
        self.revalidate(now_ms())
    }

    /// Re-read both cookies and validate them as of `now_ms`.
    ///
    /// An invalid token or an undecodable profile deletes both cookies.
    /// Returns whether a user is authenticated afterwards.
    pub fn revalidate(&self, now_ms: u64) -> bool {
        let user = self.resolve(now_ms);
        let authenticated = user.is_some();
        self.state.send_replace(AuthSnapshot::resolved(user));
        authenticated
    }

    fn resolve(&self, now_ms: u64) -> Option<UserProfile> {
        let (token, data) = read_session(self.cookies.as_ref());
        let token = token?;

        if let Err(reason) = self.policy.validate(&token, now_ms) {
            debug!(%reason, "Stored session is no longer valid");
            clear_session(self.cookies.as_ref());
            return None;
        }

        let Some(data) = data else {
            debug!("Session token without profile, clearing");
            clear_session(self.cookies.as_ref());
            return None;
        };

        match UserProfile::decode(&data) {
            Ok(profile) => Some(profile),
            Err(err) => {
                warn!("Discarding stored profile: {err}");
                clear_session(self.cookies.as_ref());
                None
            }
        }
    }

    /// Revalidate every `period` until `teardown`.
    ///
    /// The task only holds a weak reference, so dropping the provider also
    /// ends it. Calling this again replaces the previous task.
    pub fn spawn_revalidation(self: &Arc<Self>, period: Duration) {
        let provider: Weak<Self> = Arc::downgrade(self);
        let period = period.max(MIN_REVALIDATION_PERIOD);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            // the first tick completes immediately; init already covered it
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Some(provider) = provider.upgrade() else {
                    break;
                };
                provider.revalidate(now_ms());
            }
        });

        let previous = self
            .revalidation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Stop revalidation and drop the in-memory user. Cookies are kept.
    pub fn teardown(&self) {
        let task = self
            .revalidation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
        self.state.send_replace(AuthSnapshot::loading());
    }

    /// Delete both cookies and forget the user.
    pub fn logout(&self) {
        clear_session(self.cookies.as_ref());
        self.state.send_replace(AuthSnapshot::resolved(None));
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.state.borrow().has_role(role)
    }

    #[must_use]
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.state.borrow().has_any_role(roles)
    }
}

impl Drop for AuthProvider {
    fn drop(&mut self) {
        if let Some(task) = self
            .revalidation
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{
        write_session, MemoryCookieJar, AUTH_TOKEN_COOKIE, SESSION_TTL_MS, USER_DATA_COOKIE,
    };

    const NOW: u64 = 1_760_000_000_000;

    fn provider_with(token: Option<&str>, profile: Option<&str>) -> (Arc<MemoryCookieJar>, Arc<AuthProvider>) {
        let jar = Arc::new(MemoryCookieJar::new());
        if let Some(token) = token {
            jar.set(AUTH_TOKEN_COOKIE, token.to_string());
        }
        if let Some(profile) = profile {
            jar.set(USER_DATA_COOKIE, profile.to_string());
        }
        let provider = AuthProvider::new(jar.clone(), TokenPolicy::default());
        (jar, provider)
    }

    fn signed_in(now: u64, role: Role) -> (Arc<MemoryCookieJar>, Arc<AuthProvider>) {
        let jar = Arc::new(MemoryCookieJar::new());
        let profile = UserProfile::new("1", role);
        assert!(write_session(jar.as_ref(), &format!("token-1-{now}"), &profile).is_ok());
        let provider = AuthProvider::new(jar.clone(), TokenPolicy::default());
        (jar, provider)
    }

    #[test]
    fn loading_until_first_pass() {
        let (_jar, provider) = signed_in(NOW, Role::Admin);
        let snapshot = provider.snapshot();
        assert!(snapshot.is_loading());
        assert!(!snapshot.is_authenticated());
        assert!(snapshot.user().is_none());

        assert!(provider.revalidate(NOW));
        let snapshot = provider.snapshot();
        assert!(!snapshot.is_loading());
        assert!(snapshot.is_authenticated());
        assert_eq!(snapshot.user().map(|user| user.role), Some(Role::Admin));
    }

    #[test]
    fn role_predicates() {
        let (_jar, provider) = signed_in(NOW, Role::Dev);
        provider.revalidate(NOW);
        assert!(provider.has_role(Role::Dev));
        assert!(!provider.has_role(Role::Developer));
        assert!(provider.has_any_role(&[Role::Master, Role::Dev]));
        assert!(!provider.has_any_role(&[Role::Master, Role::Admin]));
        assert!(!provider.has_any_role(&[]));
    }

    #[test]
    fn predicates_false_without_user() {
        let snapshot = AuthSnapshot::resolved(None);
        for role in Role::ALL {
            assert!(!snapshot.has_role(role));
        }
        assert!(!snapshot.has_any_role(&Role::ALL));
    }

    #[test]
    fn expired_token_clears_cookies() {
        let (jar, provider) = signed_in(NOW - SESSION_TTL_MS, Role::Master);
        assert!(!provider.revalidate(NOW));
        assert!(jar.is_empty());
        assert!(!provider.snapshot().is_authenticated());
        assert!(!provider.snapshot().is_loading());
    }

    #[test]
    fn malformed_token_clears_cookies() {
        let (jar, provider) =
            provider_with(Some("garbage"), Some(r#"{"version":1,"id":"1","role":"ADMIN"}"#));
        assert!(!provider.revalidate(NOW));
        assert!(jar.is_empty());
    }

    #[test]
    fn undecodable_profile_is_no_session() {
        let token = format!("token-1-{NOW}");
        let (jar, provider) = provider_with(Some(&token), Some("%7Bnot-json"));
        assert!(!provider.revalidate(NOW));
        assert!(jar.is_empty());
    }

    #[test]
    fn token_without_profile_is_no_session() {
        let token = format!("token-2-{NOW}");
        let (jar, provider) = provider_with(Some(&token), None);
        assert!(!provider.revalidate(NOW));
        assert!(jar.is_empty());
    }

    #[test]
    fn no_token_leaves_cookies_alone() {
        let (jar, provider) =
            provider_with(None, Some(r#"{"version":1,"id":"1","role":"ADMIN"}"#));
        assert!(!provider.revalidate(NOW));
        assert_eq!(jar.len(), 1);
    }

    #[test]
    fn logout_clears_everything() {
        let (jar, provider) = signed_in(NOW, Role::Admin);
        provider.revalidate(NOW);
        provider.logout();
        assert!(jar.is_empty());
        assert!(!provider.snapshot().is_authenticated());
        assert!(!provider.snapshot().is_loading());
    }

    #[tokio::test]
    async fn init_uses_wall_clock() {
        let (_jar, provider) = signed_in(now_ms(), Role::Master);
        assert!(provider.init());
        assert!(provider.snapshot().is_authenticated());
    }

    #[tokio::test]
    async fn revalidation_picks_up_invalidated_cookies() {
        let (jar, provider) = signed_in(now_ms(), Role::Master);
        assert!(provider.init());

        let mut changes = provider.subscribe();
        provider.spawn_revalidation(Duration::from_millis(20));
        jar.set(AUTH_TOKEN_COOKIE, "token-9-0".to_string());

        let invalidated = tokio::time::timeout(
            Duration::from_secs(5),
            changes.wait_for(|snapshot| !snapshot.is_authenticated()),
        )
        .await;
        assert!(matches!(invalidated, Ok(Ok(_))));
        // release the watch read guard before teardown sends on the channel
        drop(invalidated);
        assert!(jar.is_empty());

        provider.teardown();
        assert!(provider.snapshot().is_loading());
    }
}
