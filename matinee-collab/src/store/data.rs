use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::RoomCode;

/// The type used to identify users across the system.
/// Issued by the account layer, opaque to the hub.
pub type UserId = String;

/// A matinee room, as stored durably.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomData {
    pub code: RoomCode,
    pub name: String,
    /// The user that created the room. Immutable, always a participant.
    pub owner_id: UserId,
    /// Users authorized to be in the room. Distinct from who is currently connected.
    pub participant_ids: Vec<UserId>,
    pub permissions: PermissionsData,
    /// What is currently loaded, if anything.
    pub current_media: Option<MediaData>,
    pub playback_state: PlaybackStateData,
    /// Inactive rooms reject new joins.
    pub is_active: bool,
}

/// Who besides the owner may mutate playback state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PermissionsData {
    pub allow_participant_control: bool,
    /// When non-empty, an explicit allow-list consulted after the coarse gate.
    pub allowed_controllers: Vec<UserId>,
}

/// A piece of media that can be loaded into a room.
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct MediaData {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

/// The authoritative playback timeline of a room.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackStateData {
    pub is_playing: bool,
    /// Offset into the media, in seconds. Never negative.
    pub current_time: f64,
    pub last_updated: DateTime<Utc>,
}

impl Default for PlaybackStateData {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_time: 0.,
            last_updated: Utc::now(),
        }
    }
}

/// A chat message as persisted. Id and timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageData {
    pub id: String,
    pub author_id: UserId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

/// A chat message before the store has shaped it.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub author_id: UserId,
    pub text: String,
    pub reply_to: Option<String>,
}

/// An authenticated session, resolved from an opaque credential.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub token: String,
    pub user_id: UserId,
}
