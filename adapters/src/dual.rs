//! Write-through pairing of two session stores.
//!
//! Every write and clear goes to both stores. Reads are left to the caller so
//! it can apply the precedence it needs (primary first, fallback second).

use crate::errors::StoreError;
use crate::models::StoredEntry;
use crate::SessionStore;
use log::warn;

pub struct DualStore<P, F> {
    primary: P,
    fallback: F,
}

impl<P: SessionStore, F: SessionStore> DualStore<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn fallback(&self) -> &F {
        &self.fallback
    }

    pub fn primary_mut(&mut self) -> &mut P {
        &mut self.primary
    }

    pub fn fallback_mut(&mut self) -> &mut F {
        &mut self.fallback
    }

    pub fn read_primary(&self) -> Result<Option<StoredEntry>, StoreError> {
        self.primary.read_entry()
    }

    pub fn read_fallback(&self) -> Result<Option<StoredEntry>, StoreError> {
        self.fallback.read_entry()
    }

    /// Writes the entry to both stores.
    pub fn write_all(&mut self, entry: &StoredEntry) -> Result<(), StoreError> {
        let primary = self.primary.write_entry(entry);
        let fallback = self.fallback.write_entry(entry);
        self.first_error(primary, fallback)
    }

    pub fn clear_all(&mut self) -> Result<(), StoreError> {
        let primary = self.primary.clear();
        let fallback = self.fallback.clear();
        self.first_error(primary, fallback)
    }

    fn first_error(
        &self,
        primary: Result<(), StoreError>,
        fallback: Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        match (primary, fallback) {
            (Err(e), Err(other)) => {
                warn!("{} store also failed: {}", self.fallback.backend(), other);
                Err(e)
            }
            (primary, fallback) => primary.and(fallback),
        }
    }
}
