//! Core `adapters` crate for abstracting where an admin session is stored.
//!
//! This crate defines the `SessionStore` trait, which outlines the generic
//! read/write/remove operations over the two session slots, and provides the
//! concrete implementations (cookie jar, persistent local store) together
//! with the write-through `DualStore` that keeps them in sync.

pub mod clock;
pub mod cookie;
pub mod dual;
pub mod errors;
pub mod local;
pub mod models;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cookie::CookieStore;
pub use dual::DualStore;
pub use errors::StoreError;
pub use local::LocalStore;
pub use models::{Cookie, CookiePolicy, SameSite, Slot, StoredEntry};

/// A backend able to hold the session token and the serialized session.
///
/// Each implementation maps the logical [`Slot`]s to its own key names.
pub trait SessionStore: Send {
    /// Short name used in log lines.
    fn backend(&self) -> &'static str;

    fn read(&self, slot: Slot) -> Result<Option<String>, StoreError>;

    fn write(&mut self, slot: Slot, value: &str) -> Result<(), StoreError>;

    /// Removing an absent slot is not an error.
    fn remove(&mut self, slot: Slot) -> Result<(), StoreError>;

    /// Returns the token and session only when both are present and non-empty.
    fn read_entry(&self) -> Result<Option<StoredEntry>, StoreError> {
        let token = self.read(Slot::Token)?.filter(|t| !t.is_empty());
        let session = self.read(Slot::Session)?.filter(|s| !s.is_empty());
        Ok(match (token, session) {
            (Some(token), Some(session)) => Some(StoredEntry { token, session }),
            _ => None,
        })
    }

    fn write_entry(&mut self, entry: &StoredEntry) -> Result<(), StoreError> {
        self.write(Slot::Token, &entry.token)?;
        self.write(Slot::Session, &entry.session)
    }

    /// Removes both slots, attempting the second even if the first fails.
    fn clear(&mut self) -> Result<(), StoreError> {
        let token = self.remove(Slot::Token);
        let session = self.remove(Slot::Session);
        token.and(session)
    }
}
