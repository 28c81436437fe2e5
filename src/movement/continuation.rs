//! Movement continuation and pause synchronization
//!
//! A multi-checkpoint move is split into sequential document updates. Between
//! updates the movement can be held by any number of pause requests, each
//! identified by a caller-supplied key; the queued continuation fires only
//! once every key has been released. The latch resolves `false` when the
//! movement is stopped or superseded, which invalidates all outstanding
//! waiters at once.

use crate::core::types::MovementId;
use crate::movement::waypoint::MovementWaypoint;
use ahash::AHashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use uuid::Uuid;

struct LatchInner {
    keys: AHashSet<String>,
    waiters: Vec<oneshot::Sender<bool>>,
    resolved: Option<bool>,
}

/// Countdown latch keyed by caller-supplied pause keys
pub struct PauseLatch {
    inner: Mutex<LatchInner>,
}

impl PauseLatch {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LatchInner {
                keys: AHashSet::new(),
                waiters: Vec::new(),
                resolved: None,
            }),
        }
    }

    /// Register a pause key; false if the key is already held or the latch
    /// has already resolved
    pub fn register(&self, key: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.resolved.is_some() {
            return false;
        }
        inner.keys.insert(key.to_string())
    }

    /// Release one key; returns whether the key was held
    pub fn release(&self, key: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let held = inner.keys.remove(key);
        if held && inner.keys.is_empty() && inner.resolved.is_none() {
            for waiter in inner.waiters.drain(..) {
                let _ = waiter.send(true);
            }
        }
        held
    }

    /// Resolve the latch once and for all; later waiters observe the value
    pub fn resolve(&self, value: bool) {
        let mut inner = self.inner.lock().unwrap();
        if inner.resolved.is_some() {
            return;
        }
        inner.resolved = Some(value);
        inner.keys.clear();
        for waiter in inner.waiters.drain(..) {
            let _ = waiter.send(value);
        }
    }

    pub fn is_paused(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.resolved.is_none() && !inner.keys.is_empty()
    }

    pub fn is_resolved(&self) -> Option<bool> {
        self.inner.lock().unwrap().resolved
    }

    /// A future resolving once all keys are released (`true`) or the latch
    /// is resolved (its value)
    pub fn waiter(&self) -> ResumeWaiter {
        let mut inner = self.inner.lock().unwrap();
        if let Some(value) = inner.resolved {
            return ResumeWaiter(WaiterInner::Ready(value));
        }
        if inner.keys.is_empty() {
            return ResumeWaiter(WaiterInner::Ready(true));
        }
        let (tx, rx) = oneshot::channel();
        inner.waiters.push(tx);
        ResumeWaiter(WaiterInner::Waiting(rx))
    }
}

impl Default for PauseLatch {
    fn default() -> Self {
        Self::new()
    }
}

enum WaiterInner {
    Ready(bool),
    Waiting(oneshot::Receiver<bool>),
}

/// Future handed to each pause registrant
///
/// Resolves `true` when the movement may proceed, `false` when it was
/// stopped or superseded.
pub struct ResumeWaiter(WaiterInner);

impl Future for ResumeWaiter {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        match &mut self.0 {
            WaiterInner::Ready(value) => Poll::Ready(*value),
            WaiterInner::Waiting(rx) => {
                Pin::new(rx).poll(cx).map(|result| result.unwrap_or(false))
            }
        }
    }
}

/// Release handle returned by a keyless pause
pub struct PauseGuard {
    latch: Arc<PauseLatch>,
    key: String,
}

impl PauseGuard {
    pub(crate) fn new(latch: Arc<PauseLatch>, key: String) -> Self {
        Self { latch, key }
    }

    /// Release this hold; the movement proceeds once no other hold remains
    pub fn release(self) {
        self.latch.release(&self.key);
    }
}

/// Handle to the queued continuation of a committed movement
///
/// `ready()` resolves once every pause is released; the caller then waits
/// for its move animation and issues the follow-up update.
pub struct ContinuationHandle {
    pub movement_id: MovementId,
    latch: Arc<PauseLatch>,
}

impl std::fmt::Debug for ContinuationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContinuationHandle")
            .field("movement_id", &self.movement_id)
            .field("is_paused", &self.latch.is_paused())
            .finish()
    }
}

impl ContinuationHandle {
    pub(crate) fn new(movement_id: MovementId, latch: Arc<PauseLatch>) -> Self {
        Self { movement_id, latch }
    }

    pub fn is_paused(&self) -> bool {
        self.latch.is_paused()
    }

    pub fn ready(&self) -> ResumeWaiter {
        self.latch.waiter()
    }
}

/// Per-token continuation bookkeeping
///
/// Exclusively owned and mutated by the token's move machinery; callers
/// interact only through the pause/resume/stop surface.
pub struct MovementContinuation {
    movement_id: Option<MovementId>,
    continue_counter: u32,
    latch: Arc<PauseLatch>,
    /// Passed waypoints not persisted to history, carried across the chain
    pub(crate) unrecorded_waypoints: Vec<MovementWaypoint>,
}

impl MovementContinuation {
    pub fn new() -> Self {
        Self {
            movement_id: None,
            continue_counter: 0,
            latch: Arc::new(PauseLatch::new()),
            unrecorded_waypoints: Vec::new(),
        }
    }

    pub fn movement_id(&self) -> Option<MovementId> {
        self.movement_id
    }

    pub fn continue_counter(&self) -> u32 {
        self.continue_counter
    }

    pub(crate) fn latch(&self) -> Arc<PauseLatch> {
        Arc::clone(&self.latch)
    }

    /// Begin tracking a new movement; any previous latch is invalidated
    pub(crate) fn begin(&mut self, movement_id: MovementId, continuing: bool) {
        self.latch.resolve(false);
        self.latch = Arc::new(PauseLatch::new());
        self.movement_id = Some(movement_id);
        if continuing {
            self.continue_counter += 1;
        } else {
            self.continue_counter = 0;
            self.unrecorded_waypoints.clear();
        }
    }

    /// Drop the tracked movement, resolving outstanding waiters
    pub(crate) fn finish(&mut self, proceed: bool) {
        self.latch.resolve(proceed);
        self.movement_id = None;
    }

    pub fn is_paused(&self) -> bool {
        self.latch.is_paused()
    }
}

impl Default for MovementContinuation {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MovementContinuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovementContinuation")
            .field("movement_id", &self.movement_id)
            .field("continue_counter", &self.continue_counter)
            .field("paused", &self.is_paused())
            .finish()
    }
}

/// Generate a fresh key for a keyless pause
pub(crate) fn anonymous_pause_key() -> String {
    format!("pause-{}", Uuid::new_v4())
}
