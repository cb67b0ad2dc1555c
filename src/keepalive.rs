//! Background keep-alive
//!
//! Best-effort guard that keeps the platform from throttling capture while
//! the view is hidden: a silent looping audio output plus a screen wake lock.
//! Missing platform support is never an error.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeepAliveError {
    #[error("not supported on this platform")]
    Unsupported,

    #[error("{0}")]
    Platform(String),
}

/// Visibility of the hosting view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Looped silent audio output
pub trait SilentOutput: Send + Sync {
    fn start_loop(&self) -> Result<(), KeepAliveError>;

    /// Stop the loop. Must tolerate the loop already being gone.
    fn stop_loop(&self);
}

/// Source of screen wake locks
pub trait WakeLockProvider: Send + Sync {
    fn request(&self) -> Result<Box<dyn WakeLock>, KeepAliveError>;
}

/// A held wake lock
pub trait WakeLock: Send {
    /// Release the lock. Must tolerate the platform having released it.
    fn release(&mut self);

    /// Whether the platform already dropped the lock (e.g. on hide)
    fn is_released(&self) -> bool;
}

#[derive(Default)]
struct Held {
    acquired: bool,
    looping: bool,
    wake_lock: Option<Box<dyn WakeLock>>,
}

/// Singleton keep-alive owned by the coordinator
pub struct KeepAliveResource {
    output: Option<Arc<dyn SilentOutput>>,
    wake_locks: Option<Arc<dyn WakeLockProvider>>,
    held: Mutex<Held>,
}

impl KeepAliveResource {
    pub fn new(
        output: Option<Arc<dyn SilentOutput>>,
        wake_locks: Option<Arc<dyn WakeLockProvider>>,
    ) -> Self {
        Self {
            output,
            wake_locks,
            held: Mutex::new(Held::default()),
        }
    }

    /// A keep-alive with no platform support
    pub fn disabled() -> Self {
        Self::new(None, None)
    }

    pub fn is_acquired(&self) -> bool {
        self.held.lock().acquired
    }

    pub fn holds_wake_lock(&self) -> bool {
        self.held
            .lock()
            .wake_lock
            .as_ref()
            .is_some_and(|lock| !lock.is_released())
    }

    /// Start the silent loop and take a wake lock
    pub fn acquire(&self) {
        let mut held = self.held.lock();
        held.acquired = true;

        if !held.looping {
            if let Some(output) = &self.output {
                match output.start_loop() {
                    Ok(()) => held.looping = true,
                    Err(e) => tracing::warn!("Silent audio loop unavailable: {}", e),
                }
            }
        }

        self.request_wake_lock(&mut held);
    }

    /// Stop the loop and drop the wake lock
    pub fn release(&self) {
        let mut held = self.held.lock();
        if !held.acquired {
            return;
        }
        held.acquired = false;

        if held.looping {
            if let Some(output) = &self.output {
                output.stop_loop();
            }
            held.looping = false;
        }
        if let Some(mut lock) = held.wake_lock.take() {
            lock.release();
        }
        tracing::debug!("Keep-alive released");
    }

    /// Take a new wake lock if the platform dropped ours
    ///
    /// No-op unless the keep-alive is currently acquired.
    pub fn reacquire_wake_lock(&self) {
        let mut held = self.held.lock();
        if !held.acquired {
            return;
        }
        self.request_wake_lock(&mut held);
    }

    fn request_wake_lock(&self, held: &mut Held) {
        if held
            .wake_lock
            .as_ref()
            .is_some_and(|lock| !lock.is_released())
        {
            return;
        }
        let Some(provider) = &self.wake_locks else {
            return;
        };
        match provider.request() {
            Ok(lock) => {
                held.wake_lock = Some(lock);
                tracing::debug!("Wake lock acquired");
            }
            Err(e) => tracing::warn!("Wake lock unavailable: {}", e),
        }
    }
}

impl Drop for KeepAliveResource {
    fn drop(&mut self) {
        self.release();
    }
}
