//! Core business logic for the authentication system.
//!
//! The session manager checks the operator credentials, writes the session to
//! the cookie jar and the local store together, and decides on every check
//! whether the stored session is valid, due for a refresh, or finished.
//! Expiry is only observed when a check runs; nothing here runs on a timer.

use std::path::Path;
use std::sync::Arc;

use adapters::{Clock, CookiePolicy, CookieStore, DualStore, LocalStore, SessionStore, StoredEntry};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use super::errors::{AuthError, SessionFault, INVALID_CREDENTIALS};
use super::models::{AuthStatus, Credentials, LoginOutcome, Session};
use super::routes::AdminRoute;
use crate::config::Config;
use crate::errors::AppError;

/// Everything the manager needs to know about the operator and the timing.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub credentials: Credentials,
    pub operator_name: String,
    pub token: String,
    /// A session older than this is discarded.
    pub ttl: Duration,
    /// A session older than this is re-stamped on the next check.
    pub refresh_after: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Config::default().session_settings()
    }
}

pub struct SessionManager<P = CookieStore, F = LocalStore> {
    settings: SessionSettings,
    stores: DualStore<P, F>,
    clock: Arc<dyn Clock>,
}

impl SessionManager<CookieStore, LocalStore> {
    /// Opens the file-backed cookie jar and local store under `data_dir`.
    pub fn open(config: &Config, data_dir: &Path, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        let policy = CookiePolicy::new(config.session.ttl(), config.api.is_https());
        let cookies = CookieStore::open(
            data_dir.join(&config.storage.cookie_file),
            policy,
            clock.clone(),
        )?;
        let local = LocalStore::open(data_dir.join(&config.storage.local_file))?;

        Ok(Self::new(
            config.session_settings(),
            DualStore::new(cookies, local),
            clock,
        ))
    }
}

impl<P: SessionStore, F: SessionStore> SessionManager<P, F> {
    pub fn new(settings: SessionSettings, stores: DualStore<P, F>, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            stores,
            clock,
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn stores(&self) -> &DualStore<P, F> {
        &self.stores
    }

    pub fn stores_mut(&mut self) -> &mut DualStore<P, F> {
        &mut self.stores
    }

    /// Starts a session when the credentials match. Nothing is stored on a
    /// mismatch, and the failure never says which half was wrong.
    pub fn login(&mut self, email: &str, password: &str) -> LoginOutcome {
        match self.try_login(email, password) {
            Ok(user) => {
                info!(email = %user.email, "operator logged in");
                LoginOutcome::success(user)
            }
            Err(AuthError::InvalidCredentials) => {
                warn!("rejected login attempt");
                LoginOutcome::failure(INVALID_CREDENTIALS)
            }
            Err(e) => {
                error!(error = %e, "failed to store new session");
                self.logout();
                LoginOutcome::failure(e.public_message())
            }
        }
    }

    fn try_login(&mut self, email: &str, password: &str) -> Result<Session, AuthError> {
        if !self.settings.credentials.matches(email, password) {
            return Err(AuthError::InvalidCredentials);
        }

        let session = Session::new(
            &self.settings.operator_name,
            &self.settings.credentials.email,
            self.clock.now(),
        );
        let entry = self.entry_for(&session)?;
        self.stores.write_all(&entry)?;
        Ok(session)
    }

    /// Validates the stored session, refreshing or healing storage as a side
    /// effect. Corrupt, expired and unreadable sessions are cleared and all
    /// report the same unauthenticated status.
    pub fn is_authenticated(&mut self) -> AuthStatus {
        match self.check() {
            Ok(Some(session)) => AuthStatus::authenticated(session),
            Ok(None) => AuthStatus::anonymous(),
            Err(fault) => {
                match &fault {
                    SessionFault::Expired { .. } => info!(%fault, "ending session"),
                    _ => warn!(%fault, "discarding stored session"),
                }
                self.logout();
                AuthStatus::anonymous()
            }
        }
    }

    /// Clears both stores. Safe to call with nothing stored.
    pub fn logout(&mut self) {
        match self.stores.clear_all() {
            Ok(()) => debug!("session storage cleared"),
            Err(e) => warn!(error = %e, "failed to clear session storage"),
        }
    }

    /// Entry guard for protected pages: hands the login path to `redirect`
    /// and returns `false` when there is no valid session.
    pub fn require_auth<R>(&mut self, redirect: R) -> bool
    where
        R: FnOnce(&str),
    {
        if self.is_authenticated().is_auth {
            return true;
        }
        redirect(AdminRoute::Login.path());
        false
    }

    fn check(&mut self) -> Result<Option<Session>, SessionFault> {
        let now = self.clock.now();

        if let Some(entry) = self.stores.read_primary()? {
            let session = Session::decode(&entry.session)?;
            return self.keep_alive(session, now, false).map(Some);
        }

        // Cookies are gone but the local store still holds a session: rebuild
        // the jar with a fresh stamp so both stores agree again.
        if let Some(entry) = self.stores.read_fallback()? {
            let session = Session::decode(&entry.session)?;
            let session = self.keep_alive(session, now, true)?;
            debug!("rebuilt cookies from local store");
            return Ok(Some(session));
        }

        Ok(None)
    }

    /// Applies the sliding expiry and returns the session to report. A
    /// re-stamp rewrites both stores; `force` re-stamps a live session
    /// regardless of its age.
    fn keep_alive(
        &mut self,
        mut session: Session,
        now: DateTime<Utc>,
        force: bool,
    ) -> Result<Session, SessionFault> {
        let elapsed = now - session.login_time;
        if elapsed < Duration::zero() {
            return Err(SessionFault::Corrupt(format!(
                "loginTime {} is in the future",
                session.login_time
            )));
        }
        if elapsed > self.settings.ttl {
            return Err(SessionFault::Expired { elapsed });
        }
        if !force && elapsed <= self.settings.refresh_after {
            return Ok(session);
        }

        session.login_time = now;
        let entry = self.entry_for(&session)?;
        self.stores.write_all(&entry)?;
        debug!(idle_minutes = elapsed.num_minutes(), "refreshed session");
        Ok(session)
    }

    fn entry_for(&self, session: &Session) -> Result<StoredEntry, serde_json::Error> {
        Ok(StoredEntry {
            token: self.settings.token.clone(),
            session: session.encode()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapters::{ManualClock, Slot, StoreError};
    use chrono::TimeZone;

    const EMAIL: &str = "contact@kayease.com";
    const PASSWORD: &str = "Kayease@123";

    struct Harness {
        clock: Arc<ManualClock>,
        manager: SessionManager<CookieStore, LocalStore>,
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap()
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::new(start()));
        let cookies = CookieStore::in_memory(CookiePolicy::default(), clock.clone());
        let manager = SessionManager::new(
            SessionSettings::default(),
            DualStore::new(cookies, LocalStore::in_memory()),
            clock.clone(),
        );
        Harness { clock, manager }
    }

    fn stored_session<S: SessionStore>(store: &S) -> Option<Session> {
        store
            .read_entry()
            .unwrap()
            .map(|e| Session::decode(&e.session).unwrap())
    }

    #[test]
    fn login_accepts_email_in_any_case() {
        let mut h = harness();
        let outcome = h.manager.login("Contact@Kayease.com", PASSWORD);

        assert!(outcome.is_success());
        let user = outcome.user().unwrap();
        assert_eq!(user.role, "Admin");
        assert_eq!(user.name, "Admin User");
        assert_eq!(user.email, EMAIL);
        assert_eq!(user.login_time, start());
    }

    #[test]
    fn login_writes_token_and_session_to_both_stores() {
        let mut h = harness();
        h.manager.login(EMAIL, PASSWORD);

        let stores = h.manager.stores();
        assert_eq!(
            stores.primary().read(Slot::Token).unwrap().as_deref(),
            Some("Kayease-admin-token")
        );
        assert_eq!(
            stores.fallback().get("authToken"),
            Some("Kayease-admin-token")
        );
        assert!(stores.fallback().get("user").is_some());
        assert_eq!(
            stored_session(stores.primary()),
            stored_session(stores.fallback())
        );
    }

    #[test]
    fn failed_login_is_generic_and_stores_nothing() {
        let mut h = harness();
        for (email, password) in [
            (EMAIL, "Kayease@123 "),
            (EMAIL, "kayease@123"),
            ("someone@kayease.com", PASSWORD),
            ("", ""),
        ] {
            let outcome = h.manager.login(email, password);
            assert_eq!(outcome, LoginOutcome::failure("Invalid email or password"));
        }

        assert!(h.manager.stores().read_primary().unwrap().is_none());
        assert!(h.manager.stores().read_fallback().unwrap().is_none());
    }

    #[test]
    fn fresh_session_is_returned_unmodified() {
        let mut h = harness();
        h.manager.login(EMAIL, PASSWORD);
        h.clock.advance(Duration::minutes(10));

        let status = h.manager.is_authenticated();
        assert!(status.is_auth);
        assert_eq!(status.user.unwrap().login_time, start());
    }

    #[test]
    fn aging_session_is_refreshed_in_both_stores() {
        let mut h = harness();
        h.manager.login(EMAIL, PASSWORD);
        h.clock.advance(Duration::minutes(26));
        let now = h.clock.now();

        let status = h.manager.is_authenticated();
        assert!(status.is_auth);
        assert_eq!(status.user.unwrap().login_time, now);

        let stores = h.manager.stores();
        assert_eq!(stored_session(stores.primary()).unwrap().login_time, now);
        assert_eq!(stored_session(stores.fallback()).unwrap().login_time, now);

        // The refreshed stamp is fresh, so the next check leaves it alone.
        h.clock.advance(Duration::minutes(1));
        assert_eq!(h.manager.is_authenticated().user.unwrap().login_time, now);
    }

    #[test]
    fn refresh_threshold_is_exclusive() {
        let mut h = harness();
        h.manager.login(EMAIL, PASSWORD);
        h.clock.advance(Duration::minutes(25));

        assert_eq!(
            h.manager.is_authenticated().user.unwrap().login_time,
            start()
        );
    }

    #[test]
    fn sliding_refresh_keeps_session_alive_past_the_first_window() {
        let mut h = harness();
        h.manager.login(EMAIL, PASSWORD);

        for _ in 0..4 {
            h.clock.advance(Duration::minutes(26));
            assert!(h.manager.is_authenticated().is_auth);
        }
    }

    #[test]
    fn expired_session_logs_out_both_stores() {
        let mut h = harness();
        h.manager.login(EMAIL, PASSWORD);
        // Cookies are rewritten without touching loginTime so that only the
        // session age decides.
        let entry = h.manager.stores().read_fallback().unwrap().unwrap();
        h.clock.advance(Duration::minutes(31));
        h.manager.stores_mut().primary_mut().write_entry(&entry).unwrap();

        let status = h.manager.is_authenticated();
        assert!(!status.is_auth);
        assert!(status.user.is_none());
        assert!(h.manager.stores().read_primary().unwrap().is_none());
        assert!(h.manager.stores().read_fallback().unwrap().is_none());
    }

    #[test]
    fn expired_local_session_is_discarded_once_cookies_lapse() {
        let mut h = harness();
        h.manager.login(EMAIL, PASSWORD);
        h.clock.advance(Duration::minutes(31));

        assert!(!h.manager.is_authenticated().is_auth);
        assert!(h.manager.stores().fallback().get("user").is_none());
        assert!(h.manager.stores().fallback().get("authToken").is_none());
    }

    #[test]
    fn logout_is_idempotent() {
        let mut h = harness();
        h.manager.login(EMAIL, PASSWORD);

        h.manager.logout();
        h.manager.logout();

        assert!(h.manager.stores().read_primary().unwrap().is_none());
        assert!(h.manager.stores().read_fallback().unwrap().is_none());
        assert!(!h.manager.is_authenticated().is_auth);
    }

    #[test]
    fn cookies_are_rebuilt_from_local_store_with_a_fresh_stamp() {
        let mut h = harness();
        h.manager.login(EMAIL, PASSWORD);
        h.manager.stores_mut().primary_mut().clear().unwrap();
        h.clock.advance(Duration::minutes(10));
        let healed_at = h.clock.now();

        let status = h.manager.is_authenticated();
        assert!(status.is_auth);
        assert_eq!(status.user.as_ref().unwrap().login_time, healed_at);

        let stores = h.manager.stores();
        assert_eq!(
            stores.read_primary().unwrap(),
            stores.read_fallback().unwrap()
        );
        assert_eq!(stored_session(stores.fallback()).unwrap().login_time, healed_at);

        // The window restarts at the heal, not at the original login.
        h.clock.advance(Duration::minutes(21));
        assert!(h.manager.is_authenticated().is_auth);
    }

    #[test]
    fn login_time_in_the_future_is_corrupt() {
        let mut h = harness();
        h.manager
            .stores_mut()
            .fallback_mut()
            .write_entry(&StoredEntry {
                token: "Kayease-admin-token".into(),
                session: Session::new("Admin User", EMAIL, start() + Duration::hours(6))
                    .encode()
                    .unwrap(),
            })
            .unwrap();

        assert!(!h.manager.is_authenticated().is_auth);
        assert!(h.manager.stores().read_fallback().unwrap().is_none());
        assert!(h.manager.stores().read_primary().unwrap().is_none());
    }

    #[test]
    fn healing_an_aging_local_session_also_refreshes_it() {
        let mut h = harness();
        h.manager.login(EMAIL, PASSWORD);
        h.manager.stores_mut().primary_mut().clear().unwrap();
        h.clock.advance(Duration::minutes(27));
        let now = h.clock.now();

        let status = h.manager.is_authenticated();
        assert_eq!(status.user.unwrap().login_time, now);
        assert_eq!(
            stored_session(h.manager.stores().primary()).unwrap().login_time,
            now
        );
    }

    #[test]
    fn half_written_cookies_fall_back_to_local_store() {
        let mut h = harness();
        h.manager.login(EMAIL, PASSWORD);
        h.manager
            .stores_mut()
            .primary_mut()
            .remove(Slot::Session)
            .unwrap();

        assert!(h.manager.is_authenticated().is_auth);
        assert!(h.manager.stores().read_primary().unwrap().is_some());
    }

    #[test]
    fn corrupt_cookie_clears_everything() {
        let mut h = harness();
        h.manager.login(EMAIL, PASSWORD);
        h.manager
            .stores_mut()
            .primary_mut()
            .write(Slot::Session, "{not json")
            .unwrap();

        assert!(!h.manager.is_authenticated().is_auth);
        assert!(h.manager.stores().read_primary().unwrap().is_none());
        assert!(h.manager.stores().read_fallback().unwrap().is_none());
    }

    #[test]
    fn cookie_missing_required_field_clears_everything() {
        let mut h = harness();
        h.manager.login(EMAIL, PASSWORD);
        h.manager
            .stores_mut()
            .primary_mut()
            .write(
                Slot::Session,
                r#"{"name":"Admin User","role":"Admin","loginTime":"2025-03-14T09:00:00.000Z"}"#,
            )
            .unwrap();

        assert!(!h.manager.is_authenticated().is_auth);
        assert!(h.manager.stores().read_fallback().unwrap().is_none());
    }

    #[test]
    fn corrupt_local_session_clears_everything() {
        let mut h = harness();
        h.manager
            .stores_mut()
            .fallback_mut()
            .write_entry(&StoredEntry {
                token: "Kayease-admin-token".into(),
                session: "42".into(),
            })
            .unwrap();

        assert!(!h.manager.is_authenticated().is_auth);
        assert!(h.manager.stores().fallback().get("authToken").is_none());
    }

    #[test]
    fn nothing_stored_is_simply_unauthenticated() {
        let mut h = harness();
        assert_eq!(h.manager.is_authenticated(), AuthStatus::anonymous());
    }

    #[test]
    fn require_auth_redirects_to_login() {
        let mut h = harness();
        let mut target = None;
        assert!(!h.manager.require_auth(|path| target = Some(path.to_string())));
        assert_eq!(target.as_deref(), Some("/login"));

        h.manager.login(EMAIL, PASSWORD);
        let mut called = false;
        assert!(h.manager.require_auth(|_| called = true));
        assert!(!called);
    }

    /// Store that can read but refuses every write.
    struct ReadOnly(LocalStore);

    impl SessionStore for ReadOnly {
        fn backend(&self) -> &'static str {
            "read-only"
        }

        fn read(&self, slot: Slot) -> Result<Option<String>, StoreError> {
            self.0.read(slot)
        }

        fn write(&mut self, _slot: Slot, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io {
                path: "read-only".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }

        fn remove(&mut self, slot: Slot) -> Result<(), StoreError> {
            self.0.remove(slot)
        }
    }

    #[test]
    fn storage_failure_during_login_is_reported_without_panicking() {
        let clock = Arc::new(ManualClock::new(start()));
        let mut manager = SessionManager::new(
            SessionSettings::default(),
            DualStore::new(ReadOnly(LocalStore::in_memory()), LocalStore::in_memory()),
            clock,
        );

        let outcome = manager.login(EMAIL, PASSWORD);
        assert_eq!(outcome, LoginOutcome::failure("Unable to start session"));
        assert!(manager.stores().read_fallback().unwrap().is_none());
    }

    #[test]
    fn storage_failure_during_heal_collapses_to_unauthenticated() {
        let clock = Arc::new(ManualClock::new(start()));
        let mut local = LocalStore::in_memory();
        local
            .write_entry(&StoredEntry {
                token: "Kayease-admin-token".into(),
                session: Session::new("Admin User", EMAIL, start()).encode().unwrap(),
            })
            .unwrap();
        let mut manager = SessionManager::new(
            SessionSettings::default(),
            DualStore::new(ReadOnly(LocalStore::in_memory()), local),
            clock,
        );

        assert!(!manager.is_authenticated().is_auth);
        assert!(manager.stores().read_fallback().unwrap().is_none());
    }

    mod login_properties {
        use proptest::prelude::*;

        use super::*;

        fn recase(text: &str, upper: &[bool]) -> String {
            text.chars()
                .zip(upper.iter().copied().chain(std::iter::repeat(false)))
                .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() })
                .collect()
        }

        fn nothing_stored(manager: &SessionManager) -> bool {
            manager.stores().read_primary().unwrap().is_none()
                && manager.stores().read_fallback().unwrap().is_none()
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(128))]

            #[test]
            fn email_matches_in_any_case_with_surrounding_whitespace(
                upper in proptest::collection::vec(any::<bool>(), EMAIL.len()),
                lead in "[ \t]{0,3}",
                trail in "[ \t\n]{0,3}",
            ) {
                let mut h = harness();
                let email = format!("{lead}{}{trail}", recase(EMAIL, &upper));

                let outcome = h.manager.login(&email, PASSWORD);
                prop_assert!(outcome.is_success(), "{:?} was rejected", email);
                prop_assert_eq!(outcome.user().unwrap().email.as_str(), EMAIL);
                prop_assert!(h.manager.stores().read_fallback().unwrap().is_some());
            }

            #[test]
            fn any_other_password_fails_and_stores_nothing(
                password in any::<String>().prop_filter("must differ", |p| p != PASSWORD),
            ) {
                let mut h = harness();
                prop_assert_eq!(
                    h.manager.login(EMAIL, &password),
                    LoginOutcome::failure("Invalid email or password")
                );
                prop_assert!(nothing_stored(&h.manager));
            }

            #[test]
            fn any_other_email_fails_and_stores_nothing(
                email in "[a-zA-Z0-9._ ]{0,16}@?[a-zA-Z.]{0,12}"
                    .prop_filter("must differ", |e: &String| !e.trim().eq_ignore_ascii_case(EMAIL)),
            ) {
                let mut h = harness();
                prop_assert_eq!(
                    h.manager.login(&email, PASSWORD),
                    LoginOutcome::failure("Invalid email or password")
                );
                prop_assert!(nothing_stored(&h.manager));
            }
        }
    }
}
