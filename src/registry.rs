/// Fixed-capacity table of tracked tags.
///
/// Entries are kept in a dense `heapless::Vec`: removal shifts later entries
/// down, so live entries always occupy `[0, len)` in insertion order and no
/// stale slot is ever visible. No allocation; capacity is a const generic.
use core::fmt;

use heapless::Vec;

use crate::config::MAX_TAGS;
use crate::estimator::AngleEstimator;
use crate::radio::{Address, SyncHandle};

/// First value of a fresh entry's sequence counter.
pub const SEQUENCE_START: u8 = 9;

/// Protocol state of a tracked tag.
///
/// Connectionless tags go straight to `Running` once CTE sampling is enabled;
/// the intermediate states belong to the connection-oriented variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagState {
    Scanning,
    Opening,
    DiscoverServices,
    DiscoverCharacteristics,
    EnableNotifications,
    EnableCte,
    Running,
}

/// One tracked tag.
#[derive(Debug)]
pub struct TagEntry<S> {
    /// Sync (or connection) handle correlating this entry with the stack
    pub handle: SyncHandle,
    pub identity: Address,
    /// Last observed RSSI, `None` until the first report
    pub rssi: Option<i8>,
    /// CTE service handle (connection-oriented only)
    pub service_handle: Option<u32>,
    /// CTE enable characteristic handle (connection-oriented only)
    pub notify_char_handle: Option<u16>,
    pub state: TagState,
    pub estimator: S,
    sequence: u8,
}

impl<S> TagEntry<S> {
    /// Current value of the diagnostic sequence counter.
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Return the current sequence value and step the counter 9, 8, ... 0, 9.
    pub fn next_sequence(&mut self) -> u8 {
        let current = self.sequence;
        self.sequence = if current == 0 {
            SEQUENCE_START
        } else {
            current - 1
        };
        current
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// All slots are in use
    Full,
    /// No entry with the given handle
    NotFound,
    /// An entry with the given handle already exists
    DuplicateHandle,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Full => write!(f, "tag table full"),
            RegistryError::NotFound => write!(f, "tag not found"),
            RegistryError::DuplicateHandle => write!(f, "handle already tracked"),
        }
    }
}

/// Table of up to `N` tracked tags. Owns the estimator backend so every
/// entry's estimator state is opened and closed with the entry itself.
pub struct Registry<E: AngleEstimator, const N: usize = MAX_TAGS> {
    entries: Vec<TagEntry<E::State>, N>,
    estimator: E,
}

impl<E: AngleEstimator, const N: usize> Registry<E, N> {
    /// Create an empty table.
    pub fn new(estimator: E) -> Self {
        Self {
            entries: Vec::new(),
            estimator,
        }
    }

    /// Append a new entry and open its estimator state.
    ///
    /// The returned reference is valid until the table is next mutated.
    pub fn add(
        &mut self,
        handle: SyncHandle,
        identity: Address,
        state: TagState,
    ) -> Result<&mut TagEntry<E::State>, RegistryError> {
        if self.is_full() {
            return Err(RegistryError::Full);
        }
        if self.find_by_handle(handle).is_some() {
            return Err(RegistryError::DuplicateHandle);
        }

        let entry = TagEntry {
            handle,
            identity,
            rssi: None,
            service_handle: None,
            notify_char_handle: None,
            state,
            estimator: self.estimator.open(&identity),
            sequence: SEQUENCE_START,
        };
        if let Err(entry) = self.entries.push(entry) {
            self.estimator.close(entry.estimator);
            return Err(RegistryError::Full);
        }

        let index = self.entries.len() - 1;
        Ok(&mut self.entries[index])
    }

    /// Remove the entry for `handle`, closing its estimator state and
    /// compacting the table.
    pub fn remove(&mut self, handle: SyncHandle) -> Result<(), RegistryError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.handle == handle)
            .ok_or(RegistryError::NotFound)?;

        let entry = self.entries.remove(index);
        self.estimator.close(entry.estimator);
        Ok(())
    }

    pub fn find_by_handle(&self, handle: SyncHandle) -> Option<&TagEntry<E::State>> {
        self.entries.iter().find(|e| e.handle == handle)
    }

    pub fn find_by_handle_mut(&mut self, handle: SyncHandle) -> Option<&mut TagEntry<E::State>> {
        self.entries.iter_mut().find(|e| e.handle == handle)
    }

    pub fn find_by_identity(&self, identity: &Address) -> Option<&TagEntry<E::State>> {
        self.entries.iter().find(|e| e.identity == *identity)
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= N
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Apply `f` to every live entry, in insertion order.
    pub fn for_each_active<F>(&mut self, f: F)
    where
        F: FnMut(&mut TagEntry<E::State>),
    {
        self.entries.iter_mut().for_each(f);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagEntry<E::State>> {
        self.entries.iter()
    }
}
