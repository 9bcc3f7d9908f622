//! Per-event write scopes
//!
//! A keyed mutex map: writers touching the same event queue behind one
//! `tokio::sync::Mutex`, writers on different events never meet. Entries are
//! dropped from the map as soon as nobody holds or awaits them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::error::{EngineError, EngineResult};
use crate::models::EventId;

type LockMap = HashMap<EventId, Arc<AsyncMutex<()>>>;

/// Registry of per-event write locks
#[derive(Debug, Clone, Default)]
pub struct EventLocks {
    inner: Arc<Mutex<LockMap>>,
}

impl EventLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive write access to `event_id`
    ///
    /// Gives up with `ConcurrencyConflict` after `timeout`.
    pub async fn acquire(&self, event_id: EventId, timeout: Duration) -> EngineResult<EventGuard> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(event_id).or_default())
        };

        // `lock_owned` consumes the Arc; a timed-out wait drops it here
        let acquired = tokio::time::timeout(timeout, lock.lock_owned()).await;

        match acquired {
            Ok(guard) => Ok(EventGuard {
                event_id,
                locks: Arc::clone(&self.inner),
                guard: Some(guard),
            }),
            Err(_) => {
                self.release_entry(event_id);
                Err(EngineError::conflict(
                    Some(event_id),
                    format!("write scope busy for more than {}ms", timeout.as_millis()),
                ))
            }
        }
    }

    /// Number of events with a live lock entry
    pub fn active(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn release_entry(&self, event_id: EventId) {
        release_entry(&self.inner, event_id);
    }
}

fn release_entry(locks: &Mutex<LockMap>, event_id: EventId) {
    let mut map = locks.lock().unwrap_or_else(PoisonError::into_inner);
    if map
        .get(&event_id)
        .is_some_and(|lock| Arc::strong_count(lock) == 1)
    {
        map.remove(&event_id);
    }
}

/// Exclusive write scope on one event, released on drop
#[derive(Debug)]
pub struct EventGuard {
    event_id: EventId,
    locks: Arc<Mutex<LockMap>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl EventGuard {
    pub fn event_id(&self) -> EventId {
        self.event_id
    }
}

impl Drop for EventGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        release_entry(&self.locks, self.event_id);
    }
}
