use async_trait::async_trait;
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

use crate::RoomCode;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A resource in the store doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: String,
    },
    /// The store could not be reached, or failed transiently
    #[error("backing store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(resource: &'static str, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            identifier: identifier.into(),
        }
    }
}

/// Represents a type that durably stores rooms, sessions, and chat history.
///
/// The hub is the only writer of `playback_state` and `current_media`, and
/// only appends to chat. Everything else on a room is owned by the CRUD layer
/// that fronts the same store.
#[async_trait]
pub trait RoomStore: Send + Sync + 'static {
    /// Resolves an opaque credential to the session it belongs to.
    async fn session_by_token(&self, token: &str) -> StoreResult<SessionData>;

    async fn room_by_code(&self, code: &RoomCode) -> StoreResult<RoomData>;
    async fn is_participant(&self, code: &RoomCode, user_id: &str) -> StoreResult<bool>;

    async fn update_playback_state(
        &self,
        code: &RoomCode,
        state: PlaybackStateData,
    ) -> StoreResult<RoomData>;
    async fn update_current_media(
        &self,
        code: &RoomCode,
        media: Option<MediaData>,
    ) -> StoreResult<RoomData>;

    /// Appends a message to a room's history, assigning its id and timestamp.
    async fn append_message(&self, code: &RoomCode, new_message: NewMessage)
        -> StoreResult<MessageData>;
}
