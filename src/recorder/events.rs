//! Recording events
//!
//! Every coordinator transition is published as a [`RecordingNotice`] to all
//! subscribers, in the order the transitions happened.

use super::state::{OwnerId, RecorderSnapshot};
use parking_lot::{Mutex, ReentrantMutex};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Events emitted during recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum RecordingEvent {
    /// Capture started
    Started,
    /// Capture paused
    Paused,
    /// Capture resumed
    Resumed,
    /// Capture finalized, upload in flight
    Uploading,
    /// Upload succeeded
    Saved { url: String },
    /// Nothing was captured
    Discarded,
    /// Upload failed; the capture was dropped
    UploadFailed { message: String },
    /// The device ended the track mid-capture
    Interrupted,
    /// Device acquisition failed; reservation rolled back
    StartFailed { message: String },
    /// Pending start was cancelled before the device resolved
    StartCancelled,
}

/// A transition as seen by subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingNotice {
    pub snapshot: RecorderSnapshot,
    /// Owner the event is about; set even when the snapshot is already idle
    pub subject: Option<OwnerId>,
    pub event: RecordingEvent,
}

type Listener = Arc<dyn Fn(&RecordingNotice) + Send + Sync>;

struct Entry {
    id: u64,
    active: Arc<AtomicBool>,
    listener: Listener,
}

/// Ordered fan-out of notices to registered listeners
///
/// Notices are queued by the coordinator while it holds its session lock and
/// delivered later by [`EventBus::drain`]. Only one thread drains at a time,
/// and a drain triggered from inside a listener returns immediately so the
/// outer drain keeps delivery in order.
pub struct EventBus {
    listeners: Mutex<Vec<Entry>>,
    queue: Mutex<VecDeque<RecordingNotice>>,
    dispatch: ReentrantMutex<Cell<bool>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            listeners: Mutex::new(Vec::new()),
            queue: Mutex::new(VecDeque::new()),
            dispatch: ReentrantMutex::new(Cell::new(false)),
            next_id: AtomicU64::new(0),
        })
    }

    /// Register a listener for every subsequent notice
    pub(crate) fn subscribe<F>(self: &Arc<Self>, listener: F) -> Subscription
    where
        F: Fn(&RecordingNotice) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        self.listeners.lock().push(Entry {
            id,
            active: active.clone(),
            listener: Arc::new(listener),
        });
        tracing::debug!("Subscriber {} registered", id);

        Subscription {
            id,
            active,
            bus: Arc::downgrade(self),
        }
    }

    /// Number of live subscriptions
    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Queue a notice for delivery
    pub(crate) fn enqueue(&self, notice: RecordingNotice) {
        self.queue.lock().push_back(notice);
    }

    /// Deliver queued notices in order
    pub(crate) fn drain(&self) {
        let guard = self.dispatch.lock();
        if guard.replace(true) {
            return;
        }
        let _draining = DrainingFlag(&*guard);

        loop {
            let Some(notice) = self.queue.lock().pop_front() else {
                break;
            };
            let listeners: Vec<(Arc<AtomicBool>, Listener)> = self
                .listeners
                .lock()
                .iter()
                .map(|entry| (entry.active.clone(), entry.listener.clone()))
                .collect();

            tracing::debug!(
                "Delivering {:?} (seq {}) to {} subscriber(s)",
                notice.event,
                notice.snapshot.sequence,
                listeners.len()
            );
            for (active, listener) in listeners {
                if active.load(Ordering::Acquire) {
                    listener(&notice);
                }
            }
        }
    }

    fn remove(&self, id: u64) {
        self.listeners.lock().retain(|entry| entry.id != id);
        // Wait out any delivery in progress on another thread
        drop(self.dispatch.lock());
    }
}

struct DrainingFlag<'a>(&'a Cell<bool>);

impl Drop for DrainingFlag<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Handle returned by `subscribe`; dropping it unsubscribes
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    bus: Weak<EventBus>,
}

impl Subscription {
    /// Stop receiving notices
    ///
    /// Once this returns the listener is never invoked again.
    pub fn unsubscribe(self) {
        drop(self);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
            tracing::debug!("Subscriber {} removed", self.id);
        }
    }
}
