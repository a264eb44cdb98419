//! In-memory device registry.
//!
//! Registered states are what consumers see. States that were decoded but
//! not allowed to register (unused light and outlet channels) go to a
//! shadow table instead: they are never announced, but encoding still reads
//! them so a command on one channel does not clobber its neighbours.

use kocom_common::{DeviceKey, DeviceState, Platform};
use kocom_protocol::StateLookup;
use std::collections::{BTreeMap, HashMap};

/// Result of offering a state to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// First state for this identity; it is now registered.
    Inserted,
    /// Registered state replaced with different content.
    Changed,
    /// Registered state already had this content.
    Unchanged,
    /// Not registrable; kept in the shadow table.
    Shadowed,
}

impl Upsert {
    /// Whether the identity was registered by this call.
    pub fn is_new(self) -> bool {
        self == Upsert::Inserted
    }

    /// Whether consumers should hear about this call.
    pub fn is_changed(self) -> bool {
        matches!(self, Upsert::Inserted | Upsert::Changed)
    }
}

/// Registered and shadow device states.
#[derive(Debug, Default)]
pub struct Registry {
    states: HashMap<DeviceKey, DeviceState>,
    shadow: HashMap<DeviceKey, DeviceState>,
    /// unique id -> key, per platform.
    by_platform: HashMap<Platform, BTreeMap<String, DeviceKey>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a decoded state.
    ///
    /// An unknown identity is registered only when `allow_insert` is set.
    /// A known one is replaced when platform, value or attributes differ; a
    /// platform change moves it between platform indexes.
    pub fn upsert(&mut self, state: DeviceState, allow_insert: bool) -> Upsert {
        let key = state.key;
        let Some(old) = self.states.get_mut(&key) else {
            if !allow_insert {
                self.shadow.insert(key, state);
                return Upsert::Shadowed;
            }
            self.shadow.remove(&key);
            self.index(&state);
            self.states.insert(key, state);
            return Upsert::Inserted;
        };

        if old.same_content(&state) {
            old.raw_frame = state.raw_frame;
            return Upsert::Unchanged;
        }

        let old_platform = old.platform;
        *old = state;
        if old_platform != old.platform {
            if let Some(index) = self.by_platform.get_mut(&old_platform) {
                index.remove(&key.unique_id());
            }
            let platform = old.platform;
            self.by_platform
                .entry(platform)
                .or_default()
                .insert(key.unique_id(), key);
        }
        Upsert::Changed
    }

    /// Registered state, falling back to the shadow table when asked.
    pub fn get(&self, key: &DeviceKey, include_shadow: bool) -> Option<&DeviceState> {
        self.states
            .get(key)
            .or_else(|| include_shadow.then(|| self.shadow.get(key)).flatten())
    }

    /// Move a shadow state into the registered set.
    ///
    /// Returns the registered state, or `None` when `key` has no shadow.
    pub fn promote(&mut self, key: &DeviceKey) -> Option<&DeviceState> {
        let state = self.shadow.remove(key)?;
        self.index(&state);
        Some(&*self.states.entry(*key).or_insert(state))
    }

    /// Registered states exposed as `platform`, ordered by unique id.
    pub fn all_by_platform(&self, platform: Platform) -> Vec<DeviceState> {
        self.by_platform
            .get(&platform)
            .map(|index| {
                index
                    .values()
                    .filter_map(|key| self.states.get(key).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All registered states.
    pub fn states(&self) -> impl Iterator<Item = &DeviceState> {
        self.states.values()
    }

    /// Number of registered states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of shadow states.
    pub fn shadow_len(&self) -> usize {
        self.shadow.len()
    }

    fn index(&mut self, state: &DeviceState) {
        self.by_platform
            .entry(state.platform)
            .or_default()
            .insert(state.key.unique_id(), state.key);
    }
}

impl StateLookup for Registry {
    fn lookup(&self, key: &DeviceKey) -> Option<&DeviceState> {
        self.get(key, true)
    }
}
