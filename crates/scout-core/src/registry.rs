//! Discovered-device registry
//!
//! Maps device identifiers to [`Peripheral`] records. Updates are per-id
//! last-write-wins; iteration order is stable first-seen order so a device
//! list does not reshuffle as advertising data refreshes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::device::{DeviceId, Peripheral};

/// Registry of discovered peripherals, keyed by device id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceRegistry {
    entries: HashMap<DeviceId, Peripheral>,
    /// First-seen insertion order of the keys in `entries`
    order: Vec<DeviceId>,
}

impl DeviceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a peripheral.
    ///
    /// A repeated sighting of the same id overwrites the stored record
    /// but keeps its first-seen position. Returns true if the id was new.
    pub fn upsert(&mut self, peripheral: Peripheral) -> bool {
        let inserted = !self.entries.contains_key(&peripheral.id);
        if inserted {
            self.order.push(peripheral.id.clone());
        }
        self.entries.insert(peripheral.id.clone(), peripheral);
        inserted
    }

    /// Look up a peripheral by id
    pub fn get(&self, id: &DeviceId) -> Option<&Peripheral> {
        self.entries.get(id)
    }

    /// Whether the registry contains the given id
    pub fn contains(&self, id: &DeviceId) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of discovered devices
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Iterate peripherals in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &Peripheral> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// Clone the peripherals into a vector, in first-seen order
    pub fn devices(&self) -> Vec<Peripheral> {
        self.iter().cloned().collect()
    }
}
