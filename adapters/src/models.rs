//! Generic data models for the `adapters` crate.
//!
//! These models describe what a session store holds (the two logical slots
//! and the entry they form together) and the cookie representation used by
//! the cookie-jar adapter, so the session manager can treat every backend
//! through the same shapes.

use crate::errors::StoreError;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::fmt;

/// RFC 1123 layout used by the `expires` cookie attribute.
const EXPIRES_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// The two logical values every store keeps for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The fixed presence-marker token.
    Token,
    /// The JSON-serialized session record.
    Session,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::Token, Slot::Session];
}

/// A complete token + session pair as read from one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub token: String,
    pub session: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    #[default]
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "strict" => Some(SameSite::Strict),
            "lax" => Some(SameSite::Lax),
            "none" => Some(SameSite::None),
            _ => None,
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => f.write_str("Strict"),
            SameSite::Lax => f.write_str("Lax"),
            SameSite::None => f.write_str("None"),
        }
    }
}

/// Attributes stamped on every cookie the jar writes.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    pub max_age: Duration,
    pub path: String,
    pub same_site: SameSite,
    pub secure: bool,
}

impl CookiePolicy {
    pub fn new(max_age: Duration, secure: bool) -> Self {
        Self {
            max_age,
            path: "/".to_string(),
            same_site: SameSite::Strict,
            secure,
        }
    }
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self::new(Duration::minutes(30), false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub expires: DateTime<Utc>,
    pub path: String,
    pub same_site: SameSite,
    pub secure: bool,
}

impl Cookie {
    pub fn new(name: &str, value: &str, now: DateTime<Utc>, policy: &CookiePolicy) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            expires: now + policy.max_age,
            path: policy.path.clone(),
            same_site: policy.same_site,
            secure: policy.secure,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }

    /// Renders the cookie the way a `Set-Cookie` header carries it.
    pub fn to_header(&self) -> String {
        let mut header = format!(
            "{}={}; expires={}; path={}; SameSite={}",
            self.name,
            self.value,
            self.expires.format(EXPIRES_FORMAT),
            self.path,
            self.same_site
        );
        if self.secure {
            header.push_str("; Secure");
        }
        header
    }

    /// Parses a line produced by [`Cookie::to_header`].
    ///
    /// The value runs up to the first `;`, so values must not contain one.
    pub fn parse(line: &str) -> Result<Self, StoreError> {
        let mut parts = line.split(';').map(str::trim);
        let pair = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| StoreError::MalformedCookie(line.to_string()))?;
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| StoreError::MalformedCookie(line.to_string()))?;
        if name.is_empty() {
            return Err(StoreError::MalformedCookie(line.to_string()));
        }

        let mut expires = None;
        let mut path = "/".to_string();
        let mut same_site = SameSite::default();
        let mut secure = false;

        for attr in parts.filter(|p| !p.is_empty()) {
            let (key, val) = attr.split_once('=').unwrap_or((attr, ""));
            match key.to_ascii_lowercase().as_str() {
                "expires" => expires = Some(parse_expires(val)?),
                "path" => path = val.to_string(),
                "samesite" => {
                    same_site = SameSite::parse(val)
                        .ok_or_else(|| StoreError::MalformedCookie(line.to_string()))?
                }
                "secure" => secure = true,
                _ => {}
            }
        }

        Ok(Self {
            name: name.to_string(),
            value: value.to_string(),
            expires: expires.ok_or_else(|| StoreError::MalformedCookie(line.to_string()))?,
            path,
            same_site,
            secure,
        })
    }
}

fn parse_expires(value: &str) -> Result<DateTime<Utc>, StoreError> {
    let trimmed = value
        .strip_suffix(" GMT")
        .or_else(|| value.strip_suffix(" UTC"))
        .ok_or_else(|| StoreError::MalformedCookie(format!("bad expires: {value}")))?;
    NaiveDateTime::parse_from_str(trimmed, "%a, %d %b %Y %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| StoreError::MalformedCookie(format!("bad expires {value}: {e}")))
}
