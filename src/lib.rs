//! # Caddie (Dashboard Session Gate)
//!
//! `caddie` fronts the golf-course operations dashboard. It serves the exported
//! frontend, decides on every page navigation whether the visitor holds a usable
//! session, and relays `/api/v1/*` calls to the backend API from the same origin.
//!
//! ## Sessions
//!
//! A session is two cookies written together and cleared together:
//!
//! - `caddie_auth_token`: `<prefix>-<user id>-<issued at, epoch ms>`, checked
//!   structurally against an allow-list of subjects and a seven day lifetime.
//!   Tokens are not signed; the backend stays the authority on every API call.
//! - `caddie_user_data`: the URL-encoded, versioned JSON user profile, used for
//!   display and role-based rendering only.
//!
//! ## Layout
//!
//! - [`session`]: token policy, profile codec and cookie helpers.
//! - [`caddie`]: route table, edge guard middleware, proxy and the HTTP server.
//! - [`client`]: session state provider and role guard for UI code.
//! - [`cli`]: command line, telemetry and startup.

pub mod caddie;
pub mod cli;
pub mod client;
pub mod session;
