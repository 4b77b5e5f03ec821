//! Cookie-jar adapter for session storage.
//!
//! Holds the `authToken` and `userData` cookies with an absolute expiry
//! stamped at write time. The jar can be kept in memory only or persisted to
//! a file containing one `Set-Cookie` line per cookie, which is rewritten
//! after every mutation.

use crate::clock::Clock;
use crate::errors::StoreError;
use crate::models::{Cookie, CookiePolicy, Slot};
use crate::SessionStore;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const TOKEN_COOKIE: &str = "authToken";
pub const SESSION_COOKIE: &str = "userData";

pub struct CookieStore {
    jar: BTreeMap<String, Cookie>,
    policy: CookiePolicy,
    clock: Arc<dyn Clock>,
    path: Option<PathBuf>,
}

impl CookieStore {
    pub fn in_memory(policy: CookiePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            jar: BTreeMap::new(),
            policy,
            clock,
            path: None,
        }
    }

    /// Opens a jar file, starting empty if it does not exist yet.
    pub fn open(
        path: impl AsRef<Path>,
        policy: CookiePolicy,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut jar = BTreeMap::new();

        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                match Cookie::parse(line) {
                    Ok(cookie) => {
                        jar.insert(cookie.name.clone(), cookie);
                    }
                    Err(e) => warn!("skipping unreadable line in {}: {}", path.display(), e),
                }
            }
        }

        Ok(Self {
            jar,
            policy,
            clock,
            path: Some(path),
        })
    }

    pub fn policy(&self) -> &CookiePolicy {
        &self.policy
    }

    /// Returns a live cookie by name.
    pub fn get(&self, name: &str) -> Option<&Cookie> {
        let now = self.clock.now();
        self.jar.get(name).filter(|c| !c.is_expired(now))
    }

    /// `Set-Cookie` lines for every live cookie.
    pub fn headers(&self) -> Vec<String> {
        let now = self.clock.now();
        self.jar
            .values()
            .filter(|c| !c.is_expired(now))
            .map(Cookie::to_header)
            .collect()
    }

    fn cookie_name(slot: Slot) -> &'static str {
        match slot {
            Slot::Token => TOKEN_COOKIE,
            Slot::Session => SESSION_COOKIE,
        }
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let now = self.clock.now();
        self.jar.retain(|_, c| !c.is_expired(now));

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let mut content = String::new();
        for cookie in self.jar.values() {
            content.push_str(&cookie.to_header());
            content.push('\n');
        }
        fs::write(path, content).map_err(|e| StoreError::io(path, e))
    }
}

impl SessionStore for CookieStore {
    fn backend(&self) -> &'static str {
        "cookie"
    }

    fn read(&self, slot: Slot) -> Result<Option<String>, StoreError> {
        Ok(self.get(Self::cookie_name(slot)).map(|c| c.value.clone()))
    }

    fn write(&mut self, slot: Slot, value: &str) -> Result<(), StoreError> {
        let name = Self::cookie_name(slot);
        if value.contains(';') {
            return Err(StoreError::MalformedCookie(format!(
                "value for {name} contains ';'"
            )));
        }
        let cookie = Cookie::new(name, value, self.clock.now(), &self.policy);
        debug!("setting cookie {} until {}", name, cookie.expires);
        self.jar.insert(name.to_string(), cookie);
        self.persist()
    }

    fn remove(&mut self, slot: Slot) -> Result<(), StoreError> {
        self.jar.remove(Self::cookie_name(slot));
        self.persist()
    }
}
