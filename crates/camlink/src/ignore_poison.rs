//! Extension trait to ignore mutex poisoning.
//!
//! The discovery registry and the bridge's client slot both hold state that stays
//! consistent even if a holder panicked mid-call: a half-enriched camera entry is
//! still a valid entry, and a client left behind by a panic is torn down on the next
//! connect. This trait replaces `.lock().unwrap_or_else(|e| e.into_inner())` with a
//! readable `.lock_ignore_poison()` call.

use std::sync::{Mutex, MutexGuard};

pub trait IgnorePoison<T> {
    /// Locks the mutex, ignoring poison.
    fn lock_ignore_poison(&self) -> MutexGuard<'_, T>;
}

impl<T> IgnorePoison<T> for Mutex<T> {
    fn lock_ignore_poison(&self) -> MutexGuard<'_, T> {
        self.lock().unwrap_or_else(|e| e.into_inner())
    }
}
