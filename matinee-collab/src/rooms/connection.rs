use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use log::info;
use serde::Serialize;
use tokio::sync::mpsc::channel;

use super::{HubError, Transition};
use crate::{
    util::ID_COUNTER, Departure, EventReceiver, HubContext, MessageData, RoomCode, RoomData,
    RoomEvent, RoomStore, UserId, EVENT_BUFFER,
};

pub type ConnectionId = u64;

/// What a connection sees right after joining a room: the full document plus
/// who is actually here, as opposed to the historical participant list.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub room: RoomData,
    pub live_user_ids: Vec<UserId>,
}

/// A single authenticated connection to the hub.
///
/// All room operations are addressed through this handle, and the events the
/// hub pushes back arrive on it as a [Stream]. Dropping the handle runs the
/// same bookkeeping as an explicit disconnect, exactly once.
pub struct ConnectionHandle<S> {
    id: ConnectionId,
    user_id: UserId,
    context: HubContext<S>,
    receiver: EventReceiver,
}

impl<S> ConnectionHandle<S>
where
    S: RoomStore,
{
    /// Registers a fresh connection with the membership index. If this
    /// supersedes an earlier connection for the same user, the room that
    /// connection occupied is told the user left.
    pub(crate) fn register(context: &HubContext<S>, user_id: UserId) -> Self {
        let (sender, receiver) = channel(EVENT_BUFFER);
        let id = ID_COUNTER.fetch_add(1);

        let superseded = context.presence.register(&user_id, id, sender);

        if let Some(departure) = superseded {
            broadcast_departure(context, &user_id, departure);
        }

        info!("User {user_id} connected");

        Self {
            id,
            user_id,
            context: context.clone(),
            receiver,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Joins a room, leaving the current one (if any) as part of the same
    /// switch. The connection is never counted in two rooms, nor orphaned in
    /// none mid-switch.
    ///
    /// Authorization to be in the room is re-validated against the store
    /// before any membership change; a store failure therefore leaves the
    /// index untouched.
    pub async fn join(&self, room_code: &RoomCode) -> Result<RoomSnapshot, HubError> {
        let room = self.context.room(room_code);
        let data = room.data().await?;

        if !data.is_active {
            return Err(HubError::RoomNotActive {
                code: room_code.to_string(),
            });
        }

        let is_participant = self
            .context
            .store
            .is_participant(room_code, &self.user_id)
            .await
            .map_err(HubError::Store)?;

        if !is_participant {
            return Err(HubError::NotAuthorized);
        }

        let shift = self
            .context
            .presence
            .join(&self.user_id, self.id, room_code)
            .ok_or_else(|| {
                HubError::InvalidArgument("connection is no longer tracked".to_string())
            })?;

        if let Some(departure) = shift.departed {
            broadcast_departure(&self.context, &self.user_id, departure);
        }

        self.context.presence.broadcast(
            room_code,
            RoomEvent::UserJoined {
                user_id: self.user_id.clone(),
                room_code: room_code.clone(),
                live_user_ids: shift.live_user_ids.clone(),
            },
            None,
        );

        info!("User {} joined room {}", self.user_id, room_code);

        Ok(RoomSnapshot {
            room: data,
            live_user_ids: shift.live_user_ids,
        })
    }

    /// Leaves the current room, if any. Never errors.
    pub fn leave(&self) {
        if let Some(departure) = self.context.presence.leave(&self.user_id, self.id) {
            info!("User {} left room {}", self.user_id, departure.room_code);
            broadcast_departure(&self.context, &self.user_id, departure);
        }
    }

    /// Removes the connection from the index and notifies the room it was in.
    /// Idempotent, and also run when the handle is dropped.
    pub fn disconnect(&self) {
        if let Some(departure) = self.context.presence.disconnect(&self.user_id, self.id) {
            info!("User {} disconnected from {}", self.user_id, departure.room_code);
            broadcast_departure(&self.context, &self.user_id, departure);
        }
    }

    /// Applies a playback transition to the room this connection occupies.
    pub async fn media_sync(&self, transition: Transition) -> Result<(), HubError> {
        self.current_room()?
            .apply_transition(&self.user_id, self.id, transition)
            .await
    }

    /// Sends a chat message to the room this connection occupies.
    pub async fn chat(
        &self,
        text: String,
        reply_to: Option<String>,
    ) -> Result<MessageData, HubError> {
        self.current_room()?
            .send_message(&self.user_id, text, reply_to)
            .await
    }

    /// Asks the room's owner for playback control.
    pub async fn request_control(&self) -> Result<(), HubError> {
        self.current_room()?.request_control(&self.user_id).await
    }

    /// Returns a pending event without waiting, if one is queued.
    pub fn try_recv(&mut self) -> Option<RoomEvent> {
        self.receiver.try_recv().ok()
    }

    fn current_room(&self) -> Result<std::sync::Arc<super::Room<S>>, HubError> {
        let code = self
            .context
            .presence
            .room_of(&self.user_id, self.id)
            .ok_or_else(|| {
                HubError::InvalidArgument("connection has not joined a room".to_string())
            })?;

        Ok(self.context.room(&code))
    }
}

fn broadcast_departure<S>(context: &HubContext<S>, user_id: &str, departure: Departure) {
    context.presence.broadcast(
        &departure.room_code,
        RoomEvent::UserLeft {
            user_id: user_id.to_string(),
            room_code: departure.room_code.clone(),
            live_user_ids: departure.live_user_ids,
        },
        None,
    );
}

impl<S> fmt::Debug for ConnectionHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl<S> Stream for ConnectionHandle<S>
where
    S: RoomStore,
{
    type Item = RoomEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl<S> Drop for ConnectionHandle<S> {
    fn drop(&mut self) {
        if let Some(departure) = self.context.presence.disconnect(&self.user_id, self.id) {
            broadcast_departure(&self.context, &self.user_id, departure);
        }
    }
}
