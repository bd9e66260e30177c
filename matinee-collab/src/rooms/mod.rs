mod code;
mod connection;
mod control;
mod playback;
mod presence;
mod room;

pub use code::*;
pub use connection::*;
pub use control::*;
pub use playback::*;
pub use presence::*;
pub use room::*;

use thiserror::Error;

use crate::{ErrorReason, StoreError};

#[derive(Debug, Error)]
pub enum HubError {
    /// The credential presented at connect time is missing or invalid
    #[error("invalid credentials")]
    AuthenticationFailed,
    #[error("room {code} doesn't exist")]
    RoomNotFound { code: String },
    /// The room exists but rejects new joins
    #[error("room {code} is not active")]
    RoomNotActive { code: String },
    /// The user is not a participant of the room
    #[error("user is not a participant of this room")]
    NotAuthorized,
    /// The user is a participant but may not control playback
    #[error("user may not control playback in this room")]
    Forbidden,
    #[error("{0}")]
    InvalidArgument(String),
    /// Something went wrong with the backing store
    #[error(transparent)]
    Store(StoreError),
}

impl HubError {
    pub fn reason(&self) -> ErrorReason {
        match self {
            Self::AuthenticationFailed => ErrorReason::AuthenticationFailed,
            Self::RoomNotFound { .. } => ErrorReason::RoomNotFound,
            Self::RoomNotActive { .. } | Self::NotAuthorized => ErrorReason::NotAuthorized,
            Self::Forbidden => ErrorReason::Forbidden,
            Self::InvalidArgument(_) => ErrorReason::InvalidArgument,
            Self::Store(_) => ErrorReason::BackingStoreUnavailable,
        }
    }
}

impl From<PlaybackError> for HubError {
    fn from(value: PlaybackError) -> Self {
        Self::InvalidArgument(value.to_string())
    }
}
