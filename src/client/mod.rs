//! Client-side session state and render-time role gating.
//!
//! This mirrors the edge guard for code that renders UI: it re-validates the
//! cookie pair, exposes the current user and role predicates, and decides what
//! a role-restricted view may show. It is advisory; the edge guard and the
//! backend remain the access-control boundary.

pub mod guards;
pub mod state;

pub use self::guards::{Gate, RoleGuard, RoleRequirement};
pub use self::state::{AuthProvider, AuthSnapshot};
