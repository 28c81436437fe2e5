//! Typed observer registry
//!
//! The movement core notifies consumers through per-event observer lists.
//! The pre-move observer may veto: any `Deny` aborts the movement exactly
//! like a full obstruction; `NoOpinion` abstains.

pub mod log;

pub use log::{EventLog, LogEntry, LoggedEvent};

use crate::core::types::{RegionId, TokenId, UserId};
use crate::movement::operation::MovementOperation;
use crate::region::behavior::RegionEventType;
use std::sync::Arc;

/// Observer verdict on a pending movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Veto {
    Allow,
    Deny,
    NoOpinion,
}

/// Fired before a movement commits; observers may veto
pub struct PreMoveEvent<'a> {
    pub token: TokenId,
    pub movement: &'a MovementOperation,
}

/// Fired after a movement transaction commits
pub struct MoveEvent {
    pub token: TokenId,
    pub movement: Arc<MovementOperation>,
    pub user: UserId,
}

/// Fired when a region's containment relationship to a token changes
pub struct RegionEvent {
    pub event: RegionEventType,
    pub region: RegionId,
    pub token: TokenId,
    pub movement: Option<Arc<MovementOperation>>,
}

type PreMoveObserver = Box<dyn Fn(&PreMoveEvent) -> Veto>;
type MoveObserver = Box<dyn Fn(&MoveEvent)>;
type TokenObserver = Box<dyn Fn(TokenId)>;
type RegionObserver = Box<dyn Fn(&RegionEvent)>;

/// Observer registry, one list per event name
#[derive(Default)]
pub struct EventBus {
    pre_move: Vec<PreMoveObserver>,
    moved: Vec<MoveObserver>,
    stopped: Vec<TokenObserver>,
    paused: Vec<TokenObserver>,
    recorded: Vec<TokenObserver>,
    region: Vec<RegionObserver>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_pre_move(&mut self, observer: impl Fn(&PreMoveEvent) -> Veto + 'static) {
        self.pre_move.push(Box::new(observer));
    }

    pub fn on_move(&mut self, observer: impl Fn(&MoveEvent) + 'static) {
        self.moved.push(Box::new(observer));
    }

    pub fn on_stop(&mut self, observer: impl Fn(TokenId) + 'static) {
        self.stopped.push(Box::new(observer));
    }

    pub fn on_pause(&mut self, observer: impl Fn(TokenId) + 'static) {
        self.paused.push(Box::new(observer));
    }

    pub fn on_record(&mut self, observer: impl Fn(TokenId) + 'static) {
        self.recorded.push(Box::new(observer));
    }

    pub fn on_region_event(&mut self, observer: impl Fn(&RegionEvent) + 'static) {
        self.region.push(Box::new(observer));
    }

    /// Poll every pre-move observer; any deny aborts
    pub fn call_pre_move(&self, event: &PreMoveEvent) -> bool {
        for observer in &self.pre_move {
            if observer(event) == Veto::Deny {
                return false;
            }
        }
        true
    }

    pub fn emit_move(&self, event: &MoveEvent) {
        for observer in &self.moved {
            observer(event);
        }
    }

    pub fn emit_stop(&self, token: TokenId) {
        for observer in &self.stopped {
            observer(token);
        }
    }

    pub fn emit_pause(&self, token: TokenId) {
        for observer in &self.paused {
            observer(token);
        }
    }

    pub fn emit_record(&self, token: TokenId) {
        for observer in &self.recorded {
            observer(token);
        }
    }

    pub fn emit_region_event(&self, event: &RegionEvent) {
        for observer in &self.region {
            observer(event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("pre_move", &self.pre_move.len())
            .field("moved", &self.moved.len())
            .field("region", &self.region.len())
            .finish()
    }
}
