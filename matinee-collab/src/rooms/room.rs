use chrono::Utc;
use log::info;
use tokio::sync::Mutex;

use super::{can_control, playback, HubError, Transition};
use crate::{HubContext, MessageData, NewMessage, RoomCode, RoomEvent, RoomStore, StoreError};

use super::ConnectionId;

/// The longest chat message the hub accepts, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// The in-process handle for a room: the serialization point for everything
/// that mutates it.
///
/// The room document itself lives in the store; this holds only the gate that
/// linearizes read-authorize-apply-persist-broadcast cycles, so concurrent
/// operations on one room agree on a single order while other rooms proceed
/// in parallel.
pub struct Room<S> {
    code: RoomCode,
    context: HubContext<S>,
    gate: Mutex<()>,
}

impl<S> Room<S>
where
    S: RoomStore,
{
    pub fn new(context: &HubContext<S>, code: RoomCode) -> Self {
        Self {
            code,
            context: context.clone(),
            gate: Mutex::new(()),
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Fetches the current room document from the store.
    pub async fn data(&self) -> Result<crate::RoomData, HubError> {
        self.context
            .store
            .room_by_code(&self.code)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => {
                    // The store no longer knows this room, drop the handle
                    self.context.evict_room(&self.code);

                    HubError::RoomNotFound {
                        code: self.code.to_string(),
                    }
                }
                e => HubError::Store(e),
            })
    }

    /// Validates, applies, persists, and broadcasts a playback transition on
    /// behalf of a user. The originator does not receive the resulting
    /// media-sync event; it already has local optimistic state.
    ///
    /// Persistence strictly precedes the broadcast. A store failure aborts
    /// the operation with nothing sent, and the timeline-before-media write
    /// order keeps the durable document coherent if a load is interrupted
    /// between its two writes.
    pub async fn apply_transition(
        &self,
        user_id: &str,
        connection_id: ConnectionId,
        transition: Transition,
    ) -> Result<(), HubError> {
        let _guard = self.gate.lock().await;

        let data = self.data().await?;

        if !can_control(&data, user_id) {
            return Err(HubError::Forbidden);
        }

        let now = Utc::now();
        let applied = playback::apply(
            data.current_media.as_ref(),
            &data.playback_state,
            &transition,
            now,
        )?;

        let store = &self.context.store;

        // The timeline write goes first. An interrupted load then reads as
        // the old media paused at the start, never new media on a stale
        // timeline.
        store
            .update_playback_state(&self.code, applied.playback_state.clone())
            .await
            .map_err(HubError::Store)?;

        if applied.media_changed {
            store
                .update_current_media(&self.code, applied.current_media.clone())
                .await
                .map_err(HubError::Store)?;
        }

        info!(
            "Applied {:?} in room {} for user {}",
            transition.action(),
            self.code,
            user_id
        );

        self.context.presence.broadcast(
            &self.code,
            RoomEvent::MediaSync {
                action: transition.action(),
                current_time: transition.current_time(),
                media: transition.media().cloned(),
                user_id: user_id.to_string(),
                timestamp: now,
            },
            Some(connection_id),
        );

        Ok(())
    }

    /// Persists a chat message and echoes its stored shape to the whole room,
    /// author included, so the sender's copy carries the assigned id and
    /// timestamp.
    pub async fn send_message(
        &self,
        user_id: &str,
        text: String,
        reply_to: Option<String>,
    ) -> Result<MessageData, HubError> {
        let _guard = self.gate.lock().await;

        let trimmed = text.trim();

        if trimmed.is_empty() {
            return Err(HubError::InvalidArgument(
                "messages cannot be empty".to_string(),
            ));
        }

        if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(HubError::InvalidArgument(format!(
                "messages are capped at {MAX_MESSAGE_LENGTH} characters"
            )));
        }

        let message = self
            .context
            .store
            .append_message(
                &self.code,
                NewMessage {
                    author_id: user_id.to_string(),
                    text: trimmed.to_string(),
                    reply_to,
                },
            )
            .await
            .map_err(HubError::Store)?;

        self.context.presence.broadcast(
            &self.code,
            RoomEvent::ChatMessage {
                room_code: self.code.clone(),
                message: message.clone(),
            },
            None,
        );

        Ok(message)
    }

    /// Forwards a request for playback control to the owner's connection, if
    /// the owner is online. Out-of-band: nothing is persisted or mutated.
    pub async fn request_control(&self, user_id: &str) -> Result<(), HubError> {
        let data = self.data().await?;

        if can_control(&data, user_id) {
            return Err(HubError::InvalidArgument(
                "user can already control playback".to_string(),
            ));
        }

        self.context.presence.send_to(
            &data.owner_id,
            RoomEvent::ControlRequest {
                user_id: user_id.to_string(),
                room_code: self.code.clone(),
            },
        );

        self.context.presence.send_to(
            user_id,
            RoomEvent::ControlRequestSent {
                room_code: self.code.clone(),
            },
        );

        Ok(())
    }
}
