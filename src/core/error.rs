use crate::core::types::{MovementId, RegionId, TokenId, UserId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TabletopError {
    #[error("Token not found: {0:?}")]
    TokenNotFound(TokenId),

    #[error("Region not found: {0:?}")]
    RegionNotFound(RegionId),

    #[error("Waypoint coordinate must be a finite number: {field} = {value}")]
    NonFiniteCoordinate { field: &'static str, value: f64 },

    #[error("Waypoint elevation must be a finite number: {0}")]
    NonFiniteElevation(f64),

    #[error("Waypoint footprint must be finite and strictly positive: {field} = {value}")]
    InvalidFootprint { field: &'static str, value: f64 },

    #[error("Unknown movement action: {0:?}")]
    UnknownAction(String),

    #[error("Movement action registry parse error: {0}")]
    ActionRegistryParse(String),

    #[error("User {user:?} may not control movement {movement:?}")]
    MovementPermission { user: UserId, movement: MovementId },

    #[error("Movement {movement:?} is already paused under key {key:?}")]
    DuplicatePauseKey { movement: MovementId, key: String },

    #[error("Token {0:?} has no movement in progress")]
    NoActiveMovement(TokenId),

    #[error("Initiating user {0:?} is still connected")]
    InitiatorConnected(UserId),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TabletopError>;
