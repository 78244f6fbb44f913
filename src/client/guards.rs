//! Render-time role gating.

use crate::client::state::AuthSnapshot;
use crate::session::Role;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoleRequirement {
    Role(Role),
    /// Satisfied by any listed role. An empty list is never satisfied.
    AnyOf(Vec<Role>),
}

impl RoleRequirement {
    #[must_use]
    pub fn is_met(&self, snapshot: &AuthSnapshot) -> bool {
        match self {
            Self::Role(role) => snapshot.has_role(*role),
            Self::AnyOf(roles) => snapshot.has_any_role(roles),
        }
    }

    #[must_use]
    pub fn roles(&self) -> Vec<Role> {
        match self {
            Self::Role(role) => vec![*role],
            Self::AnyOf(roles) => roles.clone(),
        }
    }
}

/// What a guarded view renders.
#[derive(Debug, PartialEq, Eq)]
pub enum Gate<T> {
    /// Session state not resolved yet.
    Loading,
    /// No user; the edge guard should have redirected already.
    Unauthenticated,
    /// Built-in access-denied affordance listing the accepted roles.
    Forbidden { required: Vec<Role> },
    /// Caller-supplied view shown instead of `Forbidden`.
    Fallback(T),
    Granted(T),
}

impl<T> Gate<T> {
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Gate::Granted(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleGuard {
    requirement: RoleRequirement,
}

impl RoleGuard {
    #[must_use]
    pub fn new(requirement: RoleRequirement) -> Self {
        Self { requirement }
    }

    #[must_use]
    pub fn role(role: Role) -> Self {
        Self::new(RoleRequirement::Role(role))
    }

    #[must_use]
    pub fn any_of(roles: impl IntoIterator<Item = Role>) -> Self {
        Self::new(RoleRequirement::AnyOf(roles.into_iter().collect()))
    }

    #[must_use]
    pub fn requirement(&self) -> &RoleRequirement {
        &self.requirement
    }

    /// Build `children` only when the requirement is met.
    pub fn render<T>(&self, snapshot: &AuthSnapshot, children: impl FnOnce() -> T) -> Gate<T> {
        self.decide(snapshot, children, None::<fn() -> T>)
    }

    /// Like `render`, but a failed role check builds `fallback` instead of
    /// the built-in denial.
    pub fn render_or<T>(
        &self,
        snapshot: &AuthSnapshot,
        children: impl FnOnce() -> T,
        fallback: impl FnOnce() -> T,
    ) -> Gate<T> {
        self.decide(snapshot, children, Some(fallback))
    }

    fn decide<T>(
        &self,
        snapshot: &AuthSnapshot,
        children: impl FnOnce() -> T,
        fallback: Option<impl FnOnce() -> T>,
    ) -> Gate<T> {
        if snapshot.is_loading() {
            return Gate::Loading;
        }

        if snapshot.user().is_none() {
            return Gate::Unauthenticated;
        }

        if self.requirement.is_met(snapshot) {
            return Gate::Granted(children());
        }

        match fallback {
            Some(fallback) => Gate::Fallback(fallback()),
            None => Gate::Forbidden {
                required: self.requirement.roles(),
            },
        }
    }
}
