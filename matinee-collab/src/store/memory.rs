use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::{
    MediaData, MessageData, NewMessage, PlaybackStateData, RoomData, RoomStore,
    SessionData, StoreError, StoreResult, UserId,
};
use crate::RoomCode;

/// An in-process [RoomStore]. Backs the demo binary and the test suite.
///
/// Rooms, sessions, and permissions are seeded through the public helpers,
/// standing in for the CRUD layer that owns them in a full deployment.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    next_message_id: AtomicU64,
    unavailable: AtomicBool,
    playback_unavailable: AtomicBool,
}

#[derive(Default)]
struct MemoryState {
    rooms: HashMap<RoomCode, StoredRoom>,
    sessions: HashMap<String, UserId>,
}

struct StoredRoom {
    data: RoomData,
    messages: Vec<MessageData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a room document.
    pub fn put_room(&self, data: RoomData) {
        let mut state = self.state.write();

        match state.rooms.get_mut(&data.code) {
            Some(stored) => stored.data = data,
            None => {
                state.rooms.insert(
                    data.code.clone(),
                    StoredRoom {
                        data,
                        messages: Vec::new(),
                    },
                );
            }
        }
    }

    /// Registers a credential for a user, standing in for session issuance.
    pub fn put_session(&self, token: impl Into<String>, user_id: impl Into<String>) {
        self.state
            .write()
            .sessions
            .insert(token.into(), user_id.into());
    }

    /// Simulates an outage. While set, every operation fails with
    /// [StoreError::Unavailable].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Simulates an outage hitting only playback-state writes, for exercising
    /// operations that span more than one durable write.
    pub fn set_playback_unavailable(&self, unavailable: bool) {
        self.playback_unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn session_by_token(&self, token: &str) -> StoreResult<SessionData> {
        self.check_available()?;

        self.state
            .read()
            .sessions
            .get(token)
            .map(|user_id| SessionData {
                token: token.to_string(),
                user_id: user_id.clone(),
            })
            .ok_or_else(|| StoreError::not_found("session", token))
    }

    async fn room_by_code(&self, code: &RoomCode) -> StoreResult<RoomData> {
        self.check_available()?;

        self.state
            .read()
            .rooms
            .get(code)
            .map(|stored| stored.data.clone())
            .ok_or_else(|| StoreError::not_found("room", code.as_str()))
    }

    async fn is_participant(&self, code: &RoomCode, user_id: &str) -> StoreResult<bool> {
        let room = self.room_by_code(code).await?;
        Ok(room.participant_ids.iter().any(|p| p == user_id))
    }

    async fn update_playback_state(
        &self,
        code: &RoomCode,
        state: PlaybackStateData,
    ) -> StoreResult<RoomData> {
        self.check_available()?;

        if self.playback_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }

        let mut guard = self.state.write();
        let stored = guard
            .rooms
            .get_mut(code)
            .ok_or_else(|| StoreError::not_found("room", code.as_str()))?;

        stored.data.playback_state = state;
        Ok(stored.data.clone())
    }

    async fn update_current_media(
        &self,
        code: &RoomCode,
        media: Option<MediaData>,
    ) -> StoreResult<RoomData> {
        self.check_available()?;

        let mut guard = self.state.write();
        let stored = guard
            .rooms
            .get_mut(code)
            .ok_or_else(|| StoreError::not_found("room", code.as_str()))?;

        stored.data.current_media = media;
        Ok(stored.data.clone())
    }

    async fn append_message(
        &self,
        code: &RoomCode,
        new_message: NewMessage,
    ) -> StoreResult<MessageData> {
        self.check_available()?;

        let mut guard = self.state.write();
        let stored = guard
            .rooms
            .get_mut(code)
            .ok_or_else(|| StoreError::not_found("room", code.as_str()))?;

        let message = MessageData {
            id: self
                .next_message_id
                .fetch_add(1, Ordering::SeqCst)
                .to_string(),
            author_id: new_message.author_id,
            text: new_message.text,
            timestamp: Utc::now(),
            reply_to: new_message.reply_to,
        };

        stored.messages.push(message.clone());
        Ok(message)
    }
}
