//! Opaque session token codec.
//!
//! Tokens look like `{prefix}-{subject}-{issued_at_ms}`. They carry no
//! signature: validity is the structural shape, membership of the subject in
//! the accepted set, and the issue time being younger than the TTL. Every
//! check fails closed, so malformed input never panics and never validates.

use std::collections::BTreeSet;
use thiserror::Error;

use super::SESSION_TTL_MS;

/// Default literal the first token segment must equal.
pub const DEFAULT_TOKEN_PREFIX: &str = "token";

/// Subjects accepted when nothing else is configured.
pub const DEFAULT_ACCEPTED_SUBJECTS: [&str; 2] = ["1", "2"];

const SEPARATOR: char = '-';

/// Reason a token was rejected.
///
/// Only logs and tests look at the variant; request handling treats all of
/// them as a single "invalid session" outcome.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("unknown token subject")]
    UnknownSubject,
    #[error("token expired")]
    Expired,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenPolicy {
    prefix: String,
    accepted_subjects: BTreeSet<String>,
    ttl_ms: u64,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_PREFIX)
    }
}

impl TokenPolicy {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            accepted_subjects: DEFAULT_ACCEPTED_SUBJECTS
                .iter()
                .map(ToString::to_string)
                .collect(),
            ttl_ms: SESSION_TTL_MS,
        }
    }

    #[must_use]
    pub fn with_accepted_subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepted_subjects = subjects.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn accepted_subjects(&self) -> &BTreeSet<String> {
        &self.accepted_subjects
    }

    #[must_use]
    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// True iff the token has at least three dash-separated segments and the
    /// first one is the expected prefix.
    #[must_use]
    pub fn is_valid_format(&self, token: &str) -> bool {
        let mut segments = token.split(SEPARATOR);
        segments.next() == Some(self.prefix.as_str()) && segments.count() >= 2
    }

    /// Second segment of a well-formed token.
    #[must_use]
    pub fn extract_user_id<'a>(&self, token: &'a str) -> Option<&'a str> {
        if !self.is_valid_format(token) {
            return None;
        }
        token.split(SEPARATOR).nth(1)
    }

    /// True when the issue time is unparsable or at least one TTL old.
    #[must_use]
    pub fn is_expired(&self, token: &str, now_ms: u64) -> bool {
        let Some(issued_at) = token
            .split(SEPARATOR)
            .nth(2)
            .and_then(|segment| segment.parse::<u64>().ok())
        else {
            return true;
        };

        now_ms.saturating_sub(issued_at) >= self.ttl_ms
    }

    /// Format, then subject, then expiry; stops at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first check that rejected the token.
    pub fn validate<'a>(&self, token: &'a str, now_ms: u64) -> Result<&'a str, TokenError> {
        let subject = self.extract_user_id(token).ok_or(TokenError::Malformed)?;

        if !self.accepted_subjects.contains(subject) {
            return Err(TokenError::UnknownSubject);
        }

        if self.is_expired(token, now_ms) {
            return Err(TokenError::Expired);
        }

        Ok(subject)
    }

    #[must_use]
    pub fn is_valid(&self, token: &str, now_ms: u64) -> bool {
        self.validate(token, now_ms).is_ok()
    }

    /// Mint a token for `subject` issued at `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Malformed` when the subject is empty or contains
    /// the segment separator, since the result could not be decoded again.
    pub fn issue(&self, subject: &str, now_ms: u64) -> Result<String, TokenError> {
        if subject.is_empty() || subject.contains(SEPARATOR) {
            return Err(TokenError::Malformed);
        }
        Ok(format!("{}{SEPARATOR}{subject}{SEPARATOR}{now_ms}", self.prefix))
    }
}
