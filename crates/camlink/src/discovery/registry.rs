//! Shared result set for a discovery run.
//!
//! One entry per address, in insertion order. The first probe to insert an address
//! owns it: later probes of the same address are dropped, the name can be filled in
//! once, and the entry is handed to the caller's callback exactly once.

use std::net::Ipv4Addr;
use std::sync::Mutex;

use super::Camera;
use crate::ignore_poison::IgnorePoison;

struct Entry {
    camera: Camera,
    enriched: bool,
    notified: bool,
}

#[derive(Default)]
pub(crate) struct Registry {
    entries: Mutex<Vec<Entry>>,
}

impl Registry {
    pub fn contains(&self, address: Ipv4Addr) -> bool {
        self.entries.lock_ignore_poison().iter().any(|e| e.camera.address == address)
    }

    /// Inserts `camera` unless its address is already present. Returns whether it was inserted.
    pub fn insert_if_absent(&self, camera: Camera) -> bool {
        let mut entries = self.entries.lock_ignore_poison();
        if entries.iter().any(|e| e.camera.address == camera.address) {
            return false;
        }
        entries.push(Entry {
            camera,
            enriched: false,
            notified: false,
        });
        true
    }

    /// Sets the name of an entry. Only the first call per address has any effect.
    pub fn enrich(&self, address: Ipv4Addr, name: Option<String>) -> bool {
        let mut entries = self.entries.lock_ignore_poison();
        match entries.iter_mut().find(|e| e.camera.address == address) {
            Some(entry) if !entry.enriched => {
                entry.enriched = true;
                entry.camera.name = name;
                true
            }
            _ => false,
        }
    }

    /// Marks an entry notified and returns a copy, unless it was already notified.
    pub fn take_for_notify(&self, address: Ipv4Addr) -> Option<Camera> {
        let mut entries = self.entries.lock_ignore_poison();
        let entry = entries
            .iter_mut()
            .find(|e| e.camera.address == address && !e.notified)?;
        entry.notified = true;
        Some(entry.camera.clone())
    }

    /// Marks every entry not yet notified as notified and returns them.
    pub fn take_unnotified(&self) -> Vec<Camera> {
        self.entries
            .lock_ignore_poison()
            .iter_mut()
            .filter(|e| !e.notified)
            .map(|e| {
                e.notified = true;
                e.camera.clone()
            })
            .collect()
    }

    pub fn snapshot(&self) -> Vec<Camera> {
        self.entries.lock_ignore_poison().iter().map(|e| e.camera.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock_ignore_poison().len()
    }
}
