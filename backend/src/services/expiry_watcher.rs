//! Optional poller that notices when the admin session has ended.
//!
//! The session manager only observes expiry when something checks it. This
//! watcher performs that check on a fixed interval and notifies a handler the
//! first time a previously valid session is gone, then stops. Each poll is an
//! ordinary `is_authenticated` call, so it also drives the sliding refresh.

use std::time::Duration;

use adapters::SessionStore;
use async_trait::async_trait;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::auth::{AuthStatus, Session, SessionManager};

/// Receives the end-of-session notification.
#[async_trait]
pub trait ExpiryHandler: Send + Sync {
    async fn on_expired(&self, last_seen: &Session);
}

#[derive(Debug, Clone, PartialEq)]
pub enum WatchState {
    /// No session has been observed yet.
    Idle,
    Active(Session),
    /// A session was observed and is now gone.
    Ended(Session),
}

pub struct ExpiryWatcher<P, F> {
    manager: SessionManager<P, F>,
    period: Duration,
    last_seen: Option<Session>,
}

impl<P: SessionStore, F: SessionStore> ExpiryWatcher<P, F> {
    pub fn new(manager: SessionManager<P, F>, period: Duration) -> Self {
        Self {
            manager,
            period,
            last_seen: None,
        }
    }

    pub fn manager(&self) -> &SessionManager<P, F> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut SessionManager<P, F> {
        &mut self.manager
    }

    pub fn into_manager(self) -> SessionManager<P, F> {
        self.manager
    }

    /// Runs one check and folds it into the watch state.
    pub fn poll(&mut self) -> WatchState {
        let AuthStatus { user, .. } = self.manager.is_authenticated();
        match (user, self.last_seen.take()) {
            (Some(user), _) => {
                self.last_seen = Some(user.clone());
                WatchState::Active(user)
            }
            (None, Some(previous)) => WatchState::Ended(previous),
            (None, None) => WatchState::Idle,
        }
    }

    /// Polls until an observed session ends, then notifies `handler`.
    ///
    /// Returns immediately with `None` when there is no session to watch.
    pub async fn run<H: ExpiryHandler>(&mut self, handler: &H) -> Option<Session> {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.poll() {
                WatchState::Idle => {
                    debug!("no session to watch");
                    return None;
                }
                WatchState::Active(session) => {
                    debug!(login_time = %session.login_time, "session still valid");
                }
                WatchState::Ended(session) => {
                    info!(email = %session.email, "admin session ended");
                    handler.on_expired(&session).await;
                    return Some(session);
                }
            }
        }
    }
}
