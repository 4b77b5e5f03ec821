//! Data structures for authentication-related entities.
//!
//! This module defines the operator credentials, the session record written
//! to both stores, and the results handed back by login and validity checks.
//! Field names on the wire follow the camelCase JSON the admin pages read.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::SessionFault;

/// Role granted to the single operator identity.
pub const ADMIN_ROLE: &str = "Admin";

/// The configured operator credential pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Email is compared trimmed and case-insensitively, the password exactly.
    pub fn matches(&self, email: &str, password: &str) -> bool {
        email.trim().to_lowercase() == self.email.to_lowercase() && password == self.password
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(with = "iso8601")]
    pub login_time: DateTime<Utc>,
    /// Keys written by other clients are carried through refreshes untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Session {
    pub fn new(name: &str, email: &str, login_time: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            role: ADMIN_ROLE.to_string(),
            login_time,
            extra: Map::new(),
        }
    }

    /// Parses a stored session, rejecting records with a missing or empty
    /// `loginTime`, `email` or `name`.
    pub fn decode(raw: &str) -> Result<Self, SessionFault> {
        let stored: StoredSession =
            serde_json::from_str(raw).map_err(|e| SessionFault::Corrupt(e.to_string()))?;

        let name = non_empty(stored.name, "name")?;
        let email = non_empty(stored.email, "email")?;
        let login_time = non_empty(stored.login_time, "loginTime")?;
        let login_time = DateTime::parse_from_rfc3339(&login_time)
            .map_err(|e| SessionFault::Corrupt(format!("loginTime {login_time:?}: {e}")))?
            .with_timezone(&Utc);

        Ok(Self {
            name,
            email,
            role: stored.role.unwrap_or_default(),
            login_time,
            extra: stored.extra,
        })
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Lenient mirror of [`Session`] used to tell missing fields from bad JSON.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    name: Option<String>,
    email: Option<String>,
    role: Option<String>,
    login_time: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

fn non_empty(value: Option<String>, field: &str) -> Result<String, SessionFault> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SessionFault::Corrupt(format!("missing {field}")))
}

/// Millisecond-precision UTC timestamps with a `Z` suffix.
mod iso8601 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_login_time(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LoginOutcome {
    Success { success: bool, user: Session },
    Failure { success: bool, error: String },
}

impl LoginOutcome {
    pub fn success(user: Session) -> Self {
        LoginOutcome::Success {
            success: true,
            user,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        LoginOutcome::Failure {
            success: false,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, LoginOutcome::Success { .. })
    }

    pub fn user(&self) -> Option<&Session> {
        match self {
            LoginOutcome::Success { user, .. } => Some(user),
            LoginOutcome::Failure { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthStatus {
    #[serde(rename = "isAuth")]
    pub is_auth: bool,
    pub user: Option<Session>,
}

impl AuthStatus {
    pub fn authenticated(user: Session) -> Self {
        Self {
            is_auth: true,
            user: Some(user),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            is_auth: false,
            user: None,
        }
    }
}

/// Formats a timestamp the way it is stored in `loginTime`.
pub fn format_login_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
