use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{Receiver, Sender};

use crate::{HubError, MediaData, MessageData, RoomCode, RoomData, UserId};

/// How many events a connection may fall behind before deliveries to it are
/// dropped. Delivery is best-effort, at-most-once; a slow client never stalls
/// the rest of the room.
pub const EVENT_BUFFER: usize = 64;

pub type EventSender = Sender<RoomEvent>;
pub type EventReceiver = Receiver<RoomEvent>;

/// Events pushed to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RoomEvent {
    /// Full snapshot sent to a connection right after it joins a room
    RoomState {
        room: RoomData,
        live_user_ids: Vec<UserId>,
    },
    /// A user's connection joined a room
    UserJoined {
        user_id: UserId,
        room_code: RoomCode,
        live_user_ids: Vec<UserId>,
    },
    /// A user's connection left a room, switched away, or dropped
    UserLeft {
        user_id: UserId,
        room_code: RoomCode,
        live_user_ids: Vec<UserId>,
    },
    /// A playback transition was applied to the room's timeline
    MediaSync {
        action: SyncAction,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_time: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        media: Option<MediaData>,
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },
    /// A chat message, in its persisted shape
    ChatMessage {
        room_code: RoomCode,
        message: MessageData,
    },
    /// A participant asked the owner for playback control
    ControlRequest {
        user_id: UserId,
        room_code: RoomCode,
    },
    /// Confirmation to the requester that their request reached the hub
    ControlRequestSent { room_code: RoomCode },
    /// An operation was rejected. Delivered only to the requester.
    Error {
        reason: ErrorReason,
        message: String,
    },
}

/// The kinds of playback transition a media-sync event can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Load,
    Play,
    Pause,
    Seek,
    Ended,
}

/// Stable, machine-readable rejection reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorReason {
    AuthenticationFailed,
    RoomNotFound,
    NotAuthorized,
    Forbidden,
    InvalidArgument,
    BackingStoreUnavailable,
}

impl RoomEvent {
    /// Shapes a rejected operation into the event sent back to the requester.
    pub fn from_error(error: &HubError) -> Self {
        Self::Error {
            reason: error.reason(),
            message: error.to_string(),
        }
    }
}
