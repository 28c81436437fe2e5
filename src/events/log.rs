//! Append-only log of fired events

use crate::core::types::{MovementId, RegionId, TokenId};
use crate::movement::operation::MovementState;
use crate::region::behavior::RegionEventType;
use serde::{Deserialize, Serialize};

/// A logged occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoggedEvent {
    MovementCommitted {
        token: TokenId,
        movement: MovementId,
        state: MovementState,
    },
    MovementStopped {
        token: TokenId,
    },
    MovementPaused {
        token: TokenId,
    },
    MovementRecorded {
        token: TokenId,
    },
    Region {
        event: RegionEventType,
        region: RegionId,
        token: TokenId,
    },
    TurnChanged {
        turn: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u32,
    pub event: LoggedEvent,
}

/// The complete event log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    pub entries: Vec<LogEntry>,
    next_id: u32,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, event: LoggedEvent) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(LogEntry { id, event });
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Region events logged for the given token, in firing order
    pub fn region_events_for(&self, token: TokenId) -> Vec<(RegionEventType, RegionId)> {
        self.entries
            .iter()
            .filter_map(|e| match &e.event {
                LoggedEvent::Region {
                    event,
                    region,
                    token: t,
                } if *t == token => Some((*event, *region)),
                _ => None,
            })
            .collect()
    }
}
