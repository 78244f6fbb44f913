//! User profile snapshot stored in the `caddie_user_data` cookie.
//!
//! The cookie holds percent-encoded JSON with an explicit schema version.
//! Anything that does not decode into the current schema is rejected, and
//! callers treat a rejected profile as "no session".

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

/// Schema version written by `UserProfile::new` and required on decode.
pub const PROFILE_VERSION: u8 = 1;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile cookie is not valid percent-encoded UTF-8")]
    Encoding,
    #[error("profile cookie is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported profile version {0}")]
    UnsupportedVersion(u8),
    #[error("profile has an empty id")]
    MissingId,
}

/// Dashboard roles.
///
/// `DEV` and `DEVELOPER` both appear in issued profiles and are kept as
/// distinct roles; guards must name whichever ones they accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Master,
    Admin,
    Dev,
    Developer,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Master, Role::Admin, Role::Dev, Role::Developer];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Master => "MASTER",
            Role::Admin => "ADMIN",
            Role::Dev => "DEV",
            Role::Developer => "DEVELOPER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub version: u8,
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Course the account is scoped to; unset for cross-course roles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub golf_course_id: Option<u64>,
}

impl UserProfile {
    #[must_use]
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            version: PROFILE_VERSION,
            id: id.into(),
            role,
            name: None,
            email: None,
            phone: None,
            golf_course_id: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_golf_course(mut self, golf_course_id: u64) -> Self {
        self.golf_course_id = Some(golf_course_id);
        self
    }

    /// Decode a raw cookie value.
    ///
    /// # Errors
    ///
    /// Fails on bad percent-encoding, invalid JSON, a schema version other
    /// than `PROFILE_VERSION`, or an empty id.
    pub fn decode(raw: &str) -> Result<Self, ProfileError> {
        let json = urlencoding::decode(raw).map_err(|_| ProfileError::Encoding)?;
        let profile: Self = serde_json::from_str(&json)?;

        if profile.version != PROFILE_VERSION {
            return Err(ProfileError::UnsupportedVersion(profile.version));
        }

        if profile.id.trim().is_empty() {
            return Err(ProfileError::MissingId);
        }

        Ok(profile)
    }

    /// Encode into a cookie-safe value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<String, ProfileError> {
        let json = serde_json::to_string(self)?;
        Ok(urlencoding::encode(&json).into_owned())
    }
}

// Older profiles carry numeric ids.
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(u64),
        Text(String),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Number(number) => number.to_string(),
        Id::Text(text) => text,
    })
}
