//! Per-resource serialization.
//!
//! Each member, book and copy gets its own async mutex, created on first use.
//! Operations lock in a fixed order (member, then book, then copy) and never
//! reach back for an earlier lock while holding a later one.
//!
//! A held lock is represented by [`Held`]. Component methods that must run
//! under a lock take `&Held<K>` instead of an id, so the key they act on is
//! always the one that is locked.

use std::{fmt, hash::Hash, sync::Arc, time::Duration};

use dashmap::DashMap;
use stacks_core::{
  Error, Result,
  id::{BookId, CopyId, MemberId},
};
use tokio::sync::{Mutex, OwnedMutexGuard};

type Slots<K> = Arc<DashMap<K, Arc<Mutex<()>>>>;

/// Proof that the lock for `key` is held. Dropping it releases the lock.
#[must_use = "dropping a Held releases the lock immediately"]
pub struct Held<K: Eq + Hash> {
  key:   K,
  guard: Option<OwnedMutexGuard<()>>,
  slots: Slots<K>,
}

impl<K: Eq + Hash + Copy> Held<K> {
  pub fn key(&self) -> K { self.key }
}

impl<K: Eq + Hash + fmt::Debug> fmt::Debug for Held<K> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Held").field(&self.key).finish()
  }
}

impl<K: Eq + Hash> Drop for Held<K> {
  fn drop(&mut self) {
    drop(self.guard.take());
    evict_idle(&self.slots, &self.key);
  }
}

/// Drop the slot for `key` once only the table refers to it. Waiters hold
/// their own reference, so a contended slot is never evicted.
fn evict_idle<K: Eq + Hash>(slots: &DashMap<K, Arc<Mutex<()>>>, key: &K) {
  slots.remove_if(key, |_, slot| Arc::strong_count(slot) == 1);
}

/// A table of async mutexes keyed by resource id. Slots exist only while
/// someone holds or waits for them.
pub struct KeyedLocks<K> {
  kind:    &'static str,
  slots:   Slots<K>,
  timeout: Duration,
}

impl<K> KeyedLocks<K>
where
  K: Eq + Hash + Copy + fmt::Display,
{
  pub fn new(kind: &'static str, timeout: Duration) -> Self {
    Self { kind, slots: Arc::new(DashMap::new()), timeout }
  }

  /// Wait for the lock on `key`, giving up after the configured timeout.
  pub async fn acquire(&self, key: K) -> Result<Held<K>> {
    // The map shard guard must not live across the await below.
    let slot = Arc::clone(self.slots.entry(key).or_default().value());

    match tokio::time::timeout(self.timeout, slot.lock_owned()).await {
      Ok(guard) => Ok(Held {
        key,
        guard: Some(guard),
        slots: Arc::clone(&self.slots),
      }),
      Err(_) => {
        evict_idle(&self.slots, &key);
        tracing::warn!(kind = self.kind, %key, "timed out waiting for lock");
        Err(Error::ConcurrencyConflict {
          resource: format!("{} {key}", self.kind),
        })
      }
    }
  }

  #[cfg(test)]
  fn len(&self) -> usize { self.slots.len() }
}

/// The three lock tables the circulation components share.
pub struct Locks {
  pub members: KeyedLocks<MemberId>,
  pub books:   KeyedLocks<BookId>,
  pub copies:  KeyedLocks<CopyId>,
}

impl Locks {
  pub fn new(timeout: Duration) -> Self {
    Self {
      members: KeyedLocks::new("member", timeout),
      books:   KeyedLocks::new("book", timeout),
      copies:  KeyedLocks::new("copy", timeout),
    }
  }
}
