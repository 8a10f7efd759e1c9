//! Per-run, per-category duplicate tracking.
//!
//! A fingerprint moves through two states inside its category: in flight
//! (claimed by a worker that is copying the file) and copied. Claiming is an
//! atomic check-then-insert. A claim on an in-flight fingerprint blocks until
//! the owner reports back, so a failed copy hands the fingerprint to the next
//! file with the same content instead of losing both.

use crate::file_category::Category;
use crate::hasher::Fingerprint;
use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    InFlight,
    Copied,
}

/// Result of [`DedupIndex::claim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The caller owns the fingerprint and must call [`DedupIndex::complete`].
    Owner,
    /// Content already copied in this category.
    Duplicate,
}

#[derive(Debug, Default)]
struct Shard {
    slots: Mutex<HashMap<Fingerprint, Slot>>,
    settled: Condvar,
}

impl Shard {
    fn lock(&self) -> MutexGuard<'_, HashMap<Fingerprint, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Fingerprints copied so far in the current run, one lock per category.
#[derive(Debug, Default)]
pub struct DedupIndex {
    shards: [Shard; Category::ALL.len()],
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn shard(&self, category: Category) -> &Shard {
        &self.shards[category as usize]
    }

    /// Claims `fingerprint` within `category`.
    pub fn claim(&self, category: Category, fingerprint: Fingerprint) -> Claim {
        let shard = self.shard(category);
        let mut slots = shard.lock();
        loop {
            match slots.get(&fingerprint) {
                None => {
                    slots.insert(fingerprint, Slot::InFlight);
                    return Claim::Owner;
                }
                Some(Slot::Copied) => return Claim::Duplicate,
                Some(Slot::InFlight) => {
                    slots = shard
                        .settled
                        .wait(slots)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
            }
        }
    }

    /// Settles a claim. Only a successful copy marks the content as seen.
    pub fn complete(&self, category: Category, fingerprint: Fingerprint, copied: bool) {
        let shard = self.shard(category);
        {
            let mut slots = shard.lock();
            if copied {
                slots.insert(fingerprint, Slot::Copied);
            } else {
                slots.remove(&fingerprint);
            }
        }
        shard.settled.notify_all();
    }
}

#[cfg(test)]
impl DedupIndex {
    /// Whether `fingerprint` has been copied in `category`.
    pub fn contains(&self, category: Category, fingerprint: &Fingerprint) -> bool {
        self.shard(category).lock().get(fingerprint) == Some(&Slot::Copied)
    }

    /// Number of copied fingerprints in `category`.
    pub fn len(&self, category: Category) -> usize {
        self.shard(category)
            .lock()
            .values()
            .filter(|slot| **slot == Slot::Copied)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|c| self.len(*c) == 0)
    }
}
